// Note Tracker - Tracks sounding notes so they can be silenced later
// Used by the transport player to flush note-offs on Stop

use super::message::{Message, MessageKind};

/// A note currently sounding (NoteOn sent, waiting for NoteOff)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundingNote {
    pub channel: u8,
    pub note: u8,
}

/// Ordered set of sounding notes, keyed by (channel, note)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteTracker {
    sounding: Vec<SoundingNote>,
}

impl NoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the tracked set from one outgoing message
    pub fn observe(&mut self, message: &Message) {
        match message.kind {
            MessageKind::NoteOn {
                channel,
                note,
                velocity,
            } if velocity > 0 => {
                let entry = SoundingNote { channel, note };
                if !self.sounding.contains(&entry) {
                    self.sounding.push(entry);
                }
            }
            MessageKind::NoteOn { channel, note, .. } | MessageKind::NoteOff { channel, note, .. } => {
                self.sounding
                    .retain(|n| !(n.channel == channel && n.note == note));
            }
            _ => {}
        }
    }

    pub fn is_sounding(&self, channel: u8, note: u8) -> bool {
        self.sounding
            .iter()
            .any(|n| n.channel == channel && n.note == note)
    }

    pub fn len(&self) -> usize {
        self.sounding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounding.is_empty()
    }

    pub fn clear(&mut self) {
        self.sounding.clear();
    }

    /// Build a note-off for every sounding note and forget them
    /// Note-offs come out in the order the notes started
    pub fn drain_note_offs(&mut self, velocity: u8, timestamp: Option<f64>) -> Vec<Message> {
        self.sounding
            .drain(..)
            .map(|n| {
                let mut off = Message::note_off(n.note, velocity, n.channel);
                off.timestamp = timestamp;
                off
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_note_on_and_off() {
        let mut tracker = NoteTracker::new();

        tracker.observe(&Message::note_on(60, 100, 0));
        tracker.observe(&Message::note_on(64, 100, 1));
        assert_eq!(tracker.len(), 2);
        assert!(tracker.is_sounding(0, 60));

        tracker.observe(&Message::note_off(60, 0, 0));
        assert_eq!(tracker.len(), 1);
        assert!(!tracker.is_sounding(0, 60));

        // Velocity 0 note-on releases too
        tracker.observe(&Message::note_on(64, 0, 1));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_same_note_different_channels() {
        let mut tracker = NoteTracker::new();
        tracker.observe(&Message::note_on(60, 100, 0));
        tracker.observe(&Message::note_on(60, 100, 2));
        tracker.observe(&Message::note_on(60, 90, 0));
        assert_eq!(tracker.len(), 2);

        tracker.observe(&Message::note_off(60, 0, 2));
        assert!(tracker.is_sounding(0, 60));
        assert!(!tracker.is_sounding(2, 60));
    }

    #[test]
    fn test_drain_note_offs() {
        let mut tracker = NoteTracker::new();
        tracker.observe(&Message::note_on(60, 100, 0));
        tracker.observe(&Message::note_on(67, 100, 3));

        let offs = tracker.drain_note_offs(127, Some(42.0));

        assert_eq!(offs.len(), 2);
        assert_eq!(offs[0], Message::note_off(60, 127, 0).at(42.0));
        assert_eq!(offs[1], Message::note_off(67, 127, 3).at(42.0));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_ignores_other_messages() {
        let mut tracker = NoteTracker::new();
        tracker.observe(&Message::clock(0.0));
        tracker.observe(&Message::control_change(74, 10, 0));
        assert!(tracker.is_empty());
    }
}
