// Sequence module - Timed sequences, playback and recording

pub mod flatten;
pub mod model;
pub mod player;
pub mod recorder;
pub mod transport;

pub use flatten::{merge_tracks, prepare, sort_events, with_absolute_delta_times};
pub use model::{Sequence, SequenceError};
pub use player::{PlayerCursor, SequencePlayer};
pub use recorder::Recorder;
pub use transport::{DEFAULT_NOTE_OFF_VELOCITY, TransportPlayer};
