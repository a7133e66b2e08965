// Sequence Player - Replays a flattened sequence against MIDI clock pulses
// One clock pulse = one tick; cursors are plain values returned by each step

use super::flatten::prepare;
use super::model::{Sequence, SequenceError};
use crate::midi::Message;
use std::sync::Arc;

/// Resumable playback position
///
/// `position` indexes the first not-yet-consumed event of the playable track,
/// so the remaining projection is `playable[position..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerCursor {
    current_tick: u64,
    position: usize,
}

impl PlayerCursor {
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// Sequence player - converts clock pulses into due sequence events
///
/// The playable projection is computed once at construction and shared by
/// every cursor; the source sequence is never touched again.
#[derive(Debug, Clone)]
pub struct SequencePlayer {
    playable: Arc<[Message]>,
    max_tick: u64,
    looped: bool,
}

impl SequencePlayer {
    /// Build a player for `sequence`
    ///
    /// Fails for sequences without events, and for looped sequences whose last
    /// event sits on tick 0 (they would wrap on every pulse). A non-looped
    /// sequence with every event on tick 0 is accepted: it plays them all on
    /// the first pulse and is finished.
    pub fn new(sequence: &Sequence) -> Result<Self, SequenceError> {
        let prepared = prepare(sequence);
        let playable: Vec<Message> = prepared.tracks.into_iter().flatten().collect();

        let max_tick = match playable.last() {
            Some(event) => event.absolute_delta_time.unwrap_or(0),
            None => return Err(SequenceError::Empty),
        };

        if sequence.looped && max_tick == 0 {
            return Err(SequenceError::ZeroLengthLoop);
        }

        Ok(Self {
            playable: playable.into(),
            max_tick,
            looped: sequence.looped,
        })
    }

    /// Absolute tick of the last event
    pub fn max_tick(&self) -> u64 {
        self.max_tick
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    /// The flattened, tick-ordered events
    pub fn playable(&self) -> &[Message] {
        &self.playable
    }

    /// Events not yet consumed by `cursor`
    pub fn remaining(&self, cursor: &PlayerCursor) -> &[Message] {
        &self.playable[cursor.position.min(self.playable.len())..]
    }

    /// Cursor at the start of the sequence
    pub fn cursor(&self) -> PlayerCursor {
        PlayerCursor::default()
    }

    /// Cursor starting at `tick`
    /// Events before `tick` are skipped, never replayed
    pub fn cursor_at(&self, tick: u64) -> PlayerCursor {
        let tick = if self.looped && tick > self.max_tick {
            tick % self.max_tick
        } else {
            tick
        };
        let position = self
            .playable
            .partition_point(|event| event.absolute_delta_time.unwrap_or(0) < tick);

        PlayerCursor {
            current_tick: tick,
            position,
        }
    }

    /// True once a non-looped sequence has emitted its last event
    pub fn is_finished(&self, cursor: &PlayerCursor) -> bool {
        !self.looped && cursor.position >= self.playable.len()
    }

    /// Advance by one clock pulse
    ///
    /// Returns the next cursor and the events due on the current tick, stamped
    /// with the pulse's timestamp. On a looped sequence, reaching `max_tick`
    /// emits the tail events and then the tick-0 events in the same step, and
    /// the next cursor continues from tick 1.
    pub fn step(&self, cursor: PlayerCursor, pulse: &Message) -> (PlayerCursor, Vec<Message>) {
        let tick = cursor.current_tick;
        let mut due = Vec::new();
        let position = self.collect_due(tick, cursor.position, pulse.timestamp, &mut due);

        let next = if self.looped && tick >= self.max_tick {
            let position = self.collect_due(0, 0, pulse.timestamp, &mut due);
            PlayerCursor {
                current_tick: 1,
                position,
            }
        } else {
            PlayerCursor {
                current_tick: tick + 1,
                position,
            }
        };

        (next, due)
    }

    /// Fold `step` over a batch of pulses
    pub fn step_batch(
        &self,
        cursor: PlayerCursor,
        pulses: &[Message],
    ) -> (PlayerCursor, Vec<Message>) {
        pulses
            .iter()
            .fold((cursor, Vec::new()), |(cursor, mut due), pulse| {
                let (next, events) = self.step(cursor, pulse);
                due.extend(events);
                (next, due)
            })
    }

    /// Push every event on `tick` starting at `position`, return the new position
    fn collect_due(
        &self,
        tick: u64,
        mut position: usize,
        timestamp: Option<f64>,
        due: &mut Vec<Message>,
    ) -> usize {
        while let Some(event) = self.playable.get(position) {
            let at = event.absolute_delta_time.unwrap_or(0);
            if at > tick {
                break;
            }
            if at == tick {
                due.push(Message {
                    timestamp,
                    ..event.clone()
                });
            }
            // Events behind the tick were seeked past: dropped
            position += 1;
        }
        position
    }
}
