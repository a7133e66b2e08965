// MPE module - MIDI Polyphonic Expression zones and channel allocation

pub mod policy;
pub mod stage;
pub mod zone;

pub use policy::{ChannelPolicy, KeyRange, KeyRangePolicy, LeastNotes};
pub use stage::MpeStage;
pub use zone::{
    ActiveNote, DEFAULT_TIMBRE_CONTROLLER, LOWER_ZONE_MASTER, MpeZone, UPPER_ZONE_MASTER,
    make_zone,
};
