// Clock module
// Look-ahead MIDI clock generation, live clock operator and input quantization

pub mod generator;
pub mod operator;
pub mod quantizer;
pub mod tempo;
pub mod time_source;
pub mod timer;

pub use generator::{ClockBatch, generate};
pub use operator::{ClockControl, ClockOperator};
pub use quantizer::Quantizer;
pub use tempo::{MAX_BPM, MIDI_CLOCK_PPQN, MIN_BPM, Tempo, ms_per_tick};
pub use time_source::{ManualClock, MonotonicClock, TimeSource};
pub use timer::{ManualTimer, PeriodicTimer, ThreadTimer, TickCallback, TimerHandle};
