// MIDI module
// Message model and note bookkeeping shared by every pipeline stage

pub mod message;
pub mod notes;

pub use message::{Message, MessageError, MessageKind, PITCH_BEND_CENTER};
pub use notes::{NoteTracker, SoundingNote};
