// Transport Player - Start/Stop/Continue control over a sequence player
// Swallows clock pulses while stopped, silences sounding notes on Stop

use super::model::{Sequence, SequenceError};
use super::player::{PlayerCursor, SequencePlayer};
use crate::config::EngineConfig;
use crate::midi::{Message, MessageKind, NoteTracker};
use crate::pipeline::Stage;

/// Default velocity of the note-offs synthesized on Stop
pub const DEFAULT_NOTE_OFF_VELOCITY: u8 = 127;

/// Transport-controlled sequence playback
///
/// Consumes clock pulses, transport messages and sequence snapshots; every
/// other message passes through unchanged. Without a playable sequence the
/// transport still tracks its state but never emits sequence events.
#[derive(Debug, Clone)]
pub struct TransportPlayer {
    player: Option<SequencePlayer>,
    cursor: PlayerCursor,
    playing: bool,
    notes: NoteTracker,
    note_off_velocity: u8,
}

impl TransportPlayer {
    /// Stopped transport over `sequence`
    pub fn new(sequence: &Sequence) -> Result<Self, SequenceError> {
        let player = SequencePlayer::new(sequence)?;
        Ok(Self {
            cursor: player.cursor(),
            player: Some(player),
            ..Self::empty()
        })
    }

    /// Stopped transport with no sequence loaded
    /// Waits for a sequence snapshot message
    pub fn empty() -> Self {
        Self {
            player: None,
            cursor: PlayerCursor::default(),
            playing: false,
            notes: NoteTracker::new(),
            note_off_velocity: DEFAULT_NOTE_OFF_VELOCITY,
        }
    }

    /// Empty transport using the configured note-off velocity
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::empty().with_note_off_velocity(config.note_off_velocity)
    }

    /// Velocity used for the note-offs sent on Stop
    pub fn with_note_off_velocity(mut self, velocity: u8) -> Self {
        self.note_off_velocity = velocity.min(127);
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn cursor(&self) -> PlayerCursor {
        self.cursor
    }

    pub fn player(&self) -> Option<&SequencePlayer> {
        self.player.as_ref()
    }

    /// Notes started by playback and not released yet
    pub fn sounding_notes(&self) -> &NoteTracker {
        &self.notes
    }

    /// Move playback to `tick` without changing the playing state
    pub fn seek(&mut self, tick: u64) {
        if let Some(player) = &self.player {
            self.cursor = player.cursor_at(tick);
        }
    }

    /// Handle one incoming message, return what goes downstream
    pub fn handle(&mut self, message: Message) -> Vec<Message> {
        match &message.kind {
            MessageKind::Clock => self.on_pulse(&message),
            MessageKind::Start => {
                self.cursor = PlayerCursor::default();
                self.notes.clear();
                self.playing = true;
                log::debug!("transport start");
                Vec::new()
            }
            MessageKind::Continue => {
                self.playing = true;
                log::debug!("transport continue at tick {}", self.cursor.current_tick());
                Vec::new()
            }
            MessageKind::Stop => {
                self.playing = false;
                let note_offs = self
                    .notes
                    .drain_note_offs(self.note_off_velocity, message.timestamp);
                log::debug!("transport stop, silencing {} notes", note_offs.len());
                note_offs
            }
            MessageKind::SequenceSnapshot(sequence) => {
                self.swap_sequence(sequence);
                Vec::new()
            }
            _ => vec![message],
        }
    }

    fn on_pulse(&mut self, pulse: &Message) -> Vec<Message> {
        if !self.playing {
            return Vec::new();
        }
        let Some(player) = &self.player else {
            return Vec::new();
        };

        let (next, due) = player.step(self.cursor, pulse);
        self.cursor = next;
        for event in &due {
            self.notes.observe(event);
        }
        if !due.is_empty() {
            log::trace!("tick {}: {} due events", next.current_tick(), due.len());
        }
        due
    }

    fn swap_sequence(&mut self, sequence: &Sequence) {
        self.player = match SequencePlayer::new(sequence) {
            Ok(player) => {
                log::debug!(
                    "transport loaded sequence: {} events, max tick {}",
                    player.playable().len(),
                    player.max_tick()
                );
                Some(player)
            }
            Err(e) => {
                log::warn!("transport ignoring unplayable sequence: {}", e);
                None
            }
        };
        self.cursor = PlayerCursor::default();
    }
}

impl Default for TransportPlayer {
    fn default() -> Self {
        Self::empty()
    }
}

impl Stage for TransportPlayer {
    fn process(&mut self, message: Message) -> Vec<Message> {
        self.handle(message)
    }
}
