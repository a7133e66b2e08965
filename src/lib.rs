// MIDI Stream - Library exports
// Look-ahead MIDI clock, sequence playback/recording and MPE zone management

pub mod clock;
pub mod config;
pub mod midi;
pub mod mpe;
pub mod pipeline;
pub mod sequence;

// Re-export commonly used types for convenience
pub use clock::{
    ClockBatch, ClockControl, ClockOperator, ManualClock, ManualTimer, MonotonicClock,
    PeriodicTimer, Quantizer, Tempo, ThreadTimer, TimeSource, TimerHandle, generate,
};
pub use config::{ConfigError, EngineConfig};
pub use midi::{Message, MessageError, MessageKind, NoteTracker};
pub use mpe::{ChannelPolicy, KeyRange, KeyRangePolicy, LeastNotes, MpeStage, MpeZone, make_zone};
pub use pipeline::{
    CancelHandle, Pipeline, PipelineInput, Stage, pipeline, pipeline_from_config,
};
pub use sequence::{
    PlayerCursor, Recorder, Sequence, SequenceError, SequencePlayer, TransportPlayer, prepare,
};
