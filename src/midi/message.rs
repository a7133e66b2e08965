// MIDI Message - Logical MIDI events flowing through the pipelines
// Closed set of message kinds with optional scheduling fields

use crate::sequence::Sequence;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Center value of a 14-bit pitch bend
pub const PITCH_BEND_CENTER: u16 = 8192;

/// Error raised when a field is read from a message kind that doesn't carry it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("field '{field}' is not available on {kind} messages")]
    FieldNotApplicable {
        field: &'static str,
        kind: &'static str,
    },
}

/// The kind of a MIDI message and its data bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageKind {
    // Channel voice
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    PolyPressure { channel: u8, note: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit value, 8192 = centered
    PitchBend { channel: u8, value: u16 },

    // System common
    SongPosition { beats: u16 },
    SongSelect { song: u8 },
    TuneRequest,

    // System real-time
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,

    // Meta
    Tempo { micros_per_quarter: u32 },
    EndOfTrack,
    /// Carries a whole sequence (recorder output, live sequence swap input)
    SequenceSnapshot(Arc<Sequence>),
}

impl MessageKind {
    /// Short name of the kind, used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::NoteOn { .. } => "note-on",
            MessageKind::NoteOff { .. } => "note-off",
            MessageKind::PolyPressure { .. } => "poly-pressure",
            MessageKind::ControlChange { .. } => "control-change",
            MessageKind::ProgramChange { .. } => "program-change",
            MessageKind::ChannelPressure { .. } => "channel-pressure",
            MessageKind::PitchBend { .. } => "pitch-bend",
            MessageKind::SongPosition { .. } => "song-position",
            MessageKind::SongSelect { .. } => "song-select",
            MessageKind::TuneRequest => "tune-request",
            MessageKind::Clock => "clock",
            MessageKind::Start => "start",
            MessageKind::Continue => "continue",
            MessageKind::Stop => "stop",
            MessageKind::ActiveSensing => "active-sensing",
            MessageKind::Reset => "reset",
            MessageKind::Tempo { .. } => "tempo",
            MessageKind::EndOfTrack => "end-of-track",
            MessageKind::SequenceSnapshot(_) => "sequence-snapshot",
        }
    }
}

/// A MIDI message with its scheduling context
///
/// `timestamp` is absolute scheduler time in milliseconds (playback/output side),
/// `delta_time` is ticks since the previous event of a stored track.
/// Transformations never mutate a message in place: builders return a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_time: Option<u64>,

    /// Ticks since the start of the track (set when a sequence is flattened)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_delta_time: Option<u64>,

    /// Timestamp snapped to the clock grid (set by the quantizer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantized_timestamp: Option<f64>,
}

impl From<MessageKind> for Message {
    fn from(kind: MessageKind) -> Self {
        Message::new(kind)
    }
}

impl Message {
    /// Create a message without any timing information
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            timestamp: None,
            delta_time: None,
            absolute_delta_time: None,
            quantized_timestamp: None,
        }
    }

    pub fn note_on(note: u8, velocity: u8, channel: u8) -> Self {
        Self::new(MessageKind::NoteOn {
            channel: channel & 0x0F,
            note: note & 0x7F,
            velocity: velocity & 0x7F,
        })
    }

    pub fn note_off(note: u8, velocity: u8, channel: u8) -> Self {
        Self::new(MessageKind::NoteOff {
            channel: channel & 0x0F,
            note: note & 0x7F,
            velocity: velocity & 0x7F,
        })
    }

    pub fn poly_pressure(note: u8, pressure: u8, channel: u8) -> Self {
        Self::new(MessageKind::PolyPressure {
            channel: channel & 0x0F,
            note: note & 0x7F,
            pressure: pressure & 0x7F,
        })
    }

    pub fn control_change(controller: u8, value: u8, channel: u8) -> Self {
        Self::new(MessageKind::ControlChange {
            channel: channel & 0x0F,
            controller: controller & 0x7F,
            value: value & 0x7F,
        })
    }

    pub fn program_change(program: u8, channel: u8) -> Self {
        Self::new(MessageKind::ProgramChange {
            channel: channel & 0x0F,
            program: program & 0x7F,
        })
    }

    pub fn channel_pressure(pressure: u8, channel: u8) -> Self {
        Self::new(MessageKind::ChannelPressure {
            channel: channel & 0x0F,
            pressure: pressure & 0x7F,
        })
    }

    /// Pitch bend with a 14-bit value (clamped to 0..=16383)
    pub fn pitch_bend(value: u16, channel: u8) -> Self {
        Self::new(MessageKind::PitchBend {
            channel: channel & 0x0F,
            value: value.min(0x3FFF),
        })
    }

    pub fn song_position(beats: u16) -> Self {
        Self::new(MessageKind::SongPosition {
            beats: beats.min(0x3FFF),
        })
    }

    pub fn song_select(song: u8) -> Self {
        Self::new(MessageKind::SongSelect { song: song & 0x7F })
    }

    /// Bare MIDI clock pulse at the given timestamp
    pub fn clock(timestamp: f64) -> Self {
        Self::new(MessageKind::Clock).at(timestamp)
    }

    pub fn start() -> Self {
        Self::new(MessageKind::Start)
    }

    pub fn continue_playback() -> Self {
        Self::new(MessageKind::Continue)
    }

    pub fn stop() -> Self {
        Self::new(MessageKind::Stop)
    }

    /// Tempo meta event from a bpm value
    pub fn tempo_change(bpm: f64) -> Self {
        let micros_per_quarter = (60_000_000.0 / bpm.max(f64::MIN_POSITIVE)).round() as u32;
        Self::new(MessageKind::Tempo { micros_per_quarter })
    }

    pub fn end_of_track() -> Self {
        Self::new(MessageKind::EndOfTrack)
    }

    /// Meta event wrapping a sequence value
    pub fn sequence_snapshot(sequence: Arc<Sequence>) -> Self {
        Self::new(MessageKind::SequenceSnapshot(sequence))
    }

    /// Copy of this message with a new timestamp
    pub fn at(&self, timestamp: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..self.clone()
        }
    }

    /// Copy of this message with a new delta time
    pub fn with_delta(&self, delta_time: u64) -> Self {
        Self {
            delta_time: Some(delta_time),
            ..self.clone()
        }
    }

    /// Copy of this message moved to another channel
    /// Messages without a channel are returned unchanged
    pub fn with_channel(&self, channel: u8) -> Self {
        let channel = channel & 0x0F;
        let mut kind = self.kind.clone();
        match &mut kind {
            MessageKind::NoteOn { channel: c, .. }
            | MessageKind::NoteOff { channel: c, .. }
            | MessageKind::PolyPressure { channel: c, .. }
            | MessageKind::ControlChange { channel: c, .. }
            | MessageKind::ProgramChange { channel: c, .. }
            | MessageKind::ChannelPressure { channel: c, .. }
            | MessageKind::PitchBend { channel: c, .. } => *c = channel,
            _ => {}
        }
        Self {
            kind,
            ..self.clone()
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    fn not_applicable(&self, field: &'static str) -> MessageError {
        MessageError::FieldNotApplicable {
            field,
            kind: self.kind_name(),
        }
    }

    /// Channel (0-15) of a channel voice message
    pub fn channel(&self) -> Result<u8, MessageError> {
        match self.kind {
            MessageKind::NoteOn { channel, .. }
            | MessageKind::NoteOff { channel, .. }
            | MessageKind::PolyPressure { channel, .. }
            | MessageKind::ControlChange { channel, .. }
            | MessageKind::ProgramChange { channel, .. }
            | MessageKind::ChannelPressure { channel, .. }
            | MessageKind::PitchBend { channel, .. } => Ok(channel),
            _ => Err(self.not_applicable("channel")),
        }
    }

    pub fn note(&self) -> Result<u8, MessageError> {
        match self.kind {
            MessageKind::NoteOn { note, .. }
            | MessageKind::NoteOff { note, .. }
            | MessageKind::PolyPressure { note, .. } => Ok(note),
            _ => Err(self.not_applicable("note")),
        }
    }

    pub fn velocity(&self) -> Result<u8, MessageError> {
        match self.kind {
            MessageKind::NoteOn { velocity, .. } | MessageKind::NoteOff { velocity, .. } => {
                Ok(velocity)
            }
            _ => Err(self.not_applicable("velocity")),
        }
    }

    pub fn controller(&self) -> Result<u8, MessageError> {
        match self.kind {
            MessageKind::ControlChange { controller, .. } => Ok(controller),
            _ => Err(self.not_applicable("controller")),
        }
    }

    /// Value of a control change
    pub fn value(&self) -> Result<u8, MessageError> {
        match self.kind {
            MessageKind::ControlChange { value, .. } => Ok(value),
            _ => Err(self.not_applicable("value")),
        }
    }

    pub fn pressure(&self) -> Result<u8, MessageError> {
        match self.kind {
            MessageKind::PolyPressure { pressure, .. }
            | MessageKind::ChannelPressure { pressure, .. } => Ok(pressure),
            _ => Err(self.not_applicable("pressure")),
        }
    }

    pub fn pitch_bend_value(&self) -> Result<u16, MessageError> {
        match self.kind {
            MessageKind::PitchBend { value, .. } => Ok(value),
            _ => Err(self.not_applicable("pitch bend")),
        }
    }

    pub fn program(&self) -> Result<u8, MessageError> {
        match self.kind {
            MessageKind::ProgramChange { program, .. } => Ok(program),
            _ => Err(self.not_applicable("program")),
        }
    }

    /// Tempo carried by a tempo meta event, in bpm
    pub fn tempo_bpm(&self) -> Result<f64, MessageError> {
        match self.kind {
            MessageKind::Tempo { micros_per_quarter } if micros_per_quarter > 0 => {
                Ok(60_000_000.0 / micros_per_quarter as f64)
            }
            _ => Err(self.not_applicable("tempo")),
        }
    }

    /// Sequence wrapped by a snapshot meta event
    pub fn sequence(&self) -> Option<&Arc<Sequence>> {
        match &self.kind {
            MessageKind::SequenceSnapshot(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Note-on with a non-zero velocity
    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, MessageKind::NoteOn { velocity, .. } if velocity > 0)
    }

    /// Note-off, or note-on with velocity 0
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.kind,
            MessageKind::NoteOff { .. } | MessageKind::NoteOn { velocity: 0, .. }
        )
    }

    pub fn is_control_change(&self) -> bool {
        matches!(self.kind, MessageKind::ControlChange { .. })
    }

    pub fn is_pitch_bend(&self) -> bool {
        matches!(self.kind, MessageKind::PitchBend { .. })
    }

    pub fn is_channel_pressure(&self) -> bool {
        matches!(self.kind, MessageKind::ChannelPressure { .. })
    }

    pub fn is_midi_clock(&self) -> bool {
        matches!(self.kind, MessageKind::Clock)
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, MessageKind::Start)
    }

    pub fn is_stop(&self) -> bool {
        matches!(self.kind, MessageKind::Stop)
    }

    pub fn is_continue(&self) -> bool {
        matches!(self.kind, MessageKind::Continue)
    }

    pub fn is_tempo_change(&self) -> bool {
        matches!(self.kind, MessageKind::Tempo { .. })
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self.kind, MessageKind::EndOfTrack)
    }

    pub fn is_sequence_snapshot(&self) -> bool {
        matches!(self.kind, MessageKind::SequenceSnapshot(_))
    }

    /// Start, Stop or Continue
    pub fn is_transport(&self) -> bool {
        self.is_start() || self.is_stop() || self.is_continue()
    }

    pub fn is_channel_message(&self) -> bool {
        self.channel().is_ok()
    }
}
