// Sequence - Timed multi-track container of MIDI messages
// Immutable value: every operation returns a new sequence

use super::flatten::prepare;
use crate::midi::Message;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sequence error types
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Sequence has no events")]
    Empty,

    #[error("Looped sequence has zero length (all events on tick 0)")]
    ZeroLengthLoop,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A timed, multi-track sequence
///
/// Events inside a track carry `delta_time` (ticks since the previous event of
/// the same track). `time_division` is ticks per quarter note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Standard MIDI file format (0 = single track, 1 = parallel tracks)
    pub format_type: u16,

    /// Ticks per quarter note
    pub time_division: u16,

    pub tracks: Vec<Vec<Message>>,

    /// Whether playback wraps around at the last event
    #[serde(default)]
    pub looped: bool,
}

impl Sequence {
    pub fn new(format_type: u16, time_division: u16, tracks: Vec<Vec<Message>>) -> Self {
        Self {
            format_type,
            time_division,
            tracks,
            looped: false,
        }
    }

    /// Format 0 sequence holding one track
    pub fn single_track(time_division: u16, events: Vec<Message>) -> Self {
        Self::new(0, time_division, vec![events])
    }

    /// Single empty track, the starting point of a recording
    pub fn empty(time_division: u16) -> Self {
        Self::single_track(time_division, Vec::new())
    }

    /// Copy of this sequence with the loop flag set
    pub fn with_loop(&self, looped: bool) -> Self {
        Self {
            looped,
            ..self.clone()
        }
    }

    /// Copy of this sequence with `message` appended to `track`
    /// Missing tracks up to `track` are created empty
    pub fn push_event(&self, track: usize, message: Message) -> Self {
        let mut next = self.clone();
        if next.tracks.len() <= track {
            next.tracks.resize_with(track + 1, Vec::new);
        }
        next.tracks[track].push(message);
        next
    }

    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    /// Absolute tick of the last event once flattened
    pub fn max_tick(&self) -> Option<u64> {
        prepare(self)
            .tracks
            .first()
            .and_then(|track| track.last())
            .and_then(|event| event.absolute_delta_time)
    }

    pub fn to_ron(&self) -> Result<String, SequenceError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SequenceError::Serialization(e.to_string()))
    }

    pub fn from_ron(data: &str) -> Result<Self, SequenceError> {
        ron::from_str(data).map_err(|e| SequenceError::Serialization(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), SequenceError> {
        fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SequenceError> {
        let data = fs::read_to_string(path)?;
        Self::from_ron(&data)
    }
}
