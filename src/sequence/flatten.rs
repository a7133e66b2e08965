// Sequence Flattening - Multi-track sequence to one playable track
// with_absolute_delta_times -> merge_tracks -> sort_events

use super::model::Sequence;
use crate::midi::Message;

/// Stamp every event with its absolute tick (running sum of delta times per track)
/// Events without a delta time count as 0
pub fn with_absolute_delta_times(sequence: &Sequence) -> Sequence {
    let tracks = sequence
        .tracks
        .iter()
        .map(|track| {
            let mut running = 0u64;
            track
                .iter()
                .map(|event| {
                    running += event.delta_time.unwrap_or(0);
                    Message {
                        absolute_delta_time: Some(running),
                        ..event.clone()
                    }
                })
                .collect()
        })
        .collect();

    Sequence {
        tracks,
        ..sequence.clone()
    }
}

/// Concatenate all tracks into a single track (format 0)
pub fn merge_tracks(sequence: &Sequence) -> Sequence {
    let merged: Vec<Message> = sequence.tracks.iter().flatten().cloned().collect();

    Sequence {
        format_type: 0,
        tracks: vec![merged],
        ..sequence.clone()
    }
}

/// Stable sort of every track by absolute tick
/// Same-tick events keep their source order (track order after a merge)
pub fn sort_events(sequence: &Sequence) -> Sequence {
    let tracks = sequence
        .tracks
        .iter()
        .map(|track| {
            let mut sorted = track.clone();
            sorted.sort_by_key(|event| event.absolute_delta_time.unwrap_or(0));
            sorted
        })
        .collect();

    Sequence {
        tracks,
        ..sequence.clone()
    }
}

/// Flatten a sequence into one playable, absolute-time-ordered track
pub fn prepare(sequence: &Sequence) -> Sequence {
    sort_events(&merge_tracks(&with_absolute_delta_times(sequence)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tracks() -> Sequence {
        Sequence::new(
            1,
            24,
            vec![
                vec![
                    Message::note_on(60, 100, 0).with_delta(0),
                    Message::note_off(60, 0, 0).with_delta(10),
                ],
                vec![
                    Message::note_on(62, 100, 0).with_delta(5),
                    Message::note_on(64, 100, 0).with_delta(5),
                    Message::note_off(62, 0, 0),
                ],
            ],
        )
    }

    fn ticks(sequence: &Sequence, track: usize) -> Vec<u64> {
        sequence.tracks[track]
            .iter()
            .map(|e| e.absolute_delta_time.unwrap())
            .collect()
    }

    #[test]
    fn test_absolute_delta_times_per_track() {
        let stamped = with_absolute_delta_times(&two_tracks());
        assert_eq!(ticks(&stamped, 0), vec![0, 10]);
        assert_eq!(ticks(&stamped, 1), vec![5, 10, 10]);
    }

    #[test]
    fn test_merge_tracks() {
        let merged = merge_tracks(&two_tracks());
        assert_eq!(merged.format_type, 0);
        assert_eq!(merged.tracks.len(), 1);
        assert_eq!(merged.tracks[0].len(), 5);
        assert_eq!(merged.time_division, 24);
    }

    #[test]
    fn test_prepare_orders_by_tick() {
        let source = two_tracks();
        let prepared = prepare(&source);

        assert_eq!(ticks(&prepared, 0), vec![0, 5, 10, 10, 10]);
        let notes: Vec<u8> = prepared.tracks[0]
            .iter()
            .map(|e| e.note().unwrap())
            .collect();
        // Same-tick events keep track order: track 0 first, then track 1 in order
        assert_eq!(notes, vec![60, 62, 60, 64, 62]);
        assert!(prepared.tracks[0][2].is_note_off());
        assert!(prepared.tracks[0][3].is_note_on());
    }

    #[test]
    fn test_prepare_does_not_mutate_input() {
        let source = two_tracks();
        let snapshot = source.clone();
        let _ = prepare(&source);
        assert_eq!(source, snapshot);
        assert!(source.tracks[0][0].absolute_delta_time.is_none());
    }

    #[test]
    fn test_prepare_keeps_loop_flag() {
        let prepared = prepare(&two_tracks().with_loop(true));
        assert!(prepared.looped);
    }

    #[test]
    fn test_prepare_empty() {
        let prepared = prepare(&Sequence::new(1, 24, vec![]));
        assert_eq!(prepared.tracks.len(), 1);
        assert!(prepared.tracks[0].is_empty());
    }
}
