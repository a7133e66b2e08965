// Channel Policies - Member channel selection for new MPE notes

use super::zone::MpeZone;
use std::cmp::Reverse;

/// Picks the member channel for a note that is not active yet
pub trait ChannelPolicy {
    /// `None` when no channel can host the note
    fn select_channel(&self, zone: &MpeZone, note: u8) -> Option<u8>;
}

/// Least-notes-first: the member channel hosting the fewest active notes
/// Ties go to the channel listed first in the zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeastNotes;

impl ChannelPolicy for LeastNotes {
    fn select_channel(&self, zone: &MpeZone, _note: u8) -> Option<u8> {
        zone.channels()
            .iter()
            .copied()
            .min_by_key(|&channel| zone.notes_on_channel(channel))
    }
}

/// A channel reserved for a range of note numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    pub channel: u8,
    pub min_note: u8,
    pub max_note: u8,
    /// Preference among equally loaded channels, higher wins
    pub weight: u32,
}

impl KeyRange {
    pub fn new(channel: u8, min_note: u8, max_note: u8, weight: u32) -> Self {
        Self {
            channel,
            min_note,
            max_note,
            weight,
        }
    }

    pub fn contains(&self, note: u8) -> bool {
        (self.min_note..=self.max_note).contains(&note)
    }
}

/// Key-range policy: among ranges containing the note, the channel with the
/// fewest active notes, then the highest weight, then table order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRangePolicy {
    ranges: Vec<KeyRange>,
}

impl KeyRangePolicy {
    pub fn new(ranges: Vec<KeyRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }
}

impl ChannelPolicy for KeyRangePolicy {
    fn select_channel(&self, zone: &MpeZone, note: u8) -> Option<u8> {
        let selected = self
            .ranges
            .iter()
            .filter(|range| range.contains(note))
            .min_by_key(|range| (zone.notes_on_channel(range.channel), Reverse(range.weight)))
            .map(|range| range.channel);

        if selected.is_none() {
            log::warn!("no key range covers note {}", note);
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::Message;

    fn split_keyboard() -> KeyRangePolicy {
        KeyRangePolicy::new(vec![
            KeyRange::new(1, 0, 59, 1),
            KeyRange::new(2, 60, 127, 1),
            KeyRange::new(3, 60, 127, 5),
        ])
    }

    #[test]
    fn test_least_notes_ties_to_first_channel() {
        let zone = MpeZone::upper(3).unwrap();
        assert_eq!(LeastNotes.select_channel(&zone, 60), Some(12));
    }

    #[test]
    fn test_least_notes_prefers_idle_channel() {
        let zone = MpeZone::lower(3)
            .unwrap()
            .process(&Message::note_on(60, 100, 1))
            .process(&Message::note_on(62, 100, 1));
        assert_eq!(LeastNotes.select_channel(&zone, 64), Some(3));
    }

    #[test]
    fn test_least_notes_without_channels() {
        let zone = MpeZone::lower(0).unwrap();
        assert_eq!(LeastNotes.select_channel(&zone, 60), None);
    }

    #[test]
    fn test_key_range_selection() {
        let policy = split_keyboard();
        let zone = MpeZone::lower(3).unwrap();

        assert_eq!(policy.select_channel(&zone, 40), Some(1));
        // Both upper ranges idle: weight decides
        assert_eq!(policy.select_channel(&zone, 72), Some(3));

        // Load wins over weight
        let zone = zone.process_with(&Message::note_on(72, 100, 1), &policy);
        assert_eq!(zone.find_note(72).unwrap().channel, 3);
        assert_eq!(policy.select_channel(&zone, 76), Some(2));
    }

    #[test]
    fn test_key_range_no_match() {
        let policy = KeyRangePolicy::new(vec![KeyRange::new(1, 60, 72, 1)]);
        let zone = MpeZone::lower(3).unwrap();
        assert_eq!(policy.select_channel(&zone, 20), None);

        // The zone is left unchanged
        let next = zone.process_with(&Message::note_on(20, 100, 1), &policy);
        assert_eq!(next, zone);
    }

    #[test]
    fn test_key_range_contains_bounds() {
        let range = KeyRange::new(1, 60, 72, 0);
        assert!(range.contains(60));
        assert!(range.contains(72));
        assert!(!range.contains(59));
        assert!(!range.contains(73));
    }
}
