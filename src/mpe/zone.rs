// MPE Zone - Per-note channel state for MIDI Polyphonic Expression
// A zone is one master channel plus a block of member channels

use super::policy::{ChannelPolicy, LeastNotes};
use crate::midi::{Message, MessageKind, PITCH_BEND_CENTER};

/// Master channel of the lower zone
pub const LOWER_ZONE_MASTER: u8 = 0;

/// Master channel of the upper zone
pub const UPPER_ZONE_MASTER: u8 = 15;

/// Default controller carrying per-note timbre (CC74)
pub const DEFAULT_TIMBRE_CONTROLLER: u8 = 74;

/// A note sounding on one member channel, with its expression state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveNote {
    pub note: u8,
    pub channel: u8,
    pub velocity: u8,
    pub pitch_bend: u16,
    pub timbre: u8,
    pub pressure: u8,
}

impl ActiveNote {
    pub fn new(note: u8, channel: u8, velocity: u8) -> Self {
        Self {
            note,
            channel,
            velocity,
            pitch_bend: PITCH_BEND_CENTER,
            timbre: 64,
            pressure: 0,
        }
    }
}

/// MPE zone state
///
/// A value type: `process` returns the next zone and leaves `self` untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpeZone {
    master_channel: u8,
    member_count: u8,
    channels: Vec<u8>,
    active_notes: Vec<ActiveNote>,
    timbre_controller: u8,
}

/// Build a zone from its master channel (0 or 15) and member count (below 16)
///
/// Lower zone members are channels `1..=member_count`; upper zone members are
/// `(15 - member_count)..=14`. Returns `None` for any other layout.
pub fn make_zone(master_channel: u8, member_count: u8) -> Option<MpeZone> {
    if member_count >= 16 {
        return None;
    }
    let channels: Vec<u8> = match master_channel {
        LOWER_ZONE_MASTER => (1..=member_count).collect(),
        UPPER_ZONE_MASTER => (15 - member_count..15).collect(),
        _ => return None,
    };

    Some(MpeZone {
        master_channel,
        member_count,
        channels,
        active_notes: Vec::new(),
        timbre_controller: DEFAULT_TIMBRE_CONTROLLER,
    })
}

impl MpeZone {
    /// Lower zone (master channel 0)
    pub fn lower(member_count: u8) -> Option<Self> {
        make_zone(LOWER_ZONE_MASTER, member_count)
    }

    /// Upper zone (master channel 15)
    pub fn upper(member_count: u8) -> Option<Self> {
        make_zone(UPPER_ZONE_MASTER, member_count)
    }

    /// Copy of this zone listening for timbre on another controller
    pub fn with_timbre_controller(&self, controller: u8) -> Self {
        Self {
            timbre_controller: controller & 0x7F,
            ..self.clone()
        }
    }

    pub fn master_channel(&self) -> u8 {
        self.master_channel
    }

    pub fn member_count(&self) -> u8 {
        self.member_count
    }

    /// Member channels, in allocation order
    pub fn channels(&self) -> &[u8] {
        &self.channels
    }

    pub fn active_notes(&self) -> &[ActiveNote] {
        &self.active_notes
    }

    pub fn timbre_controller(&self) -> u8 {
        self.timbre_controller
    }

    /// Number of active notes hosted by `channel`
    pub fn notes_on_channel(&self, channel: u8) -> usize {
        self.active_notes
            .iter()
            .filter(|n| n.channel == channel)
            .count()
    }

    /// First active entry for `note`, on any channel
    pub fn find_note(&self, note: u8) -> Option<&ActiveNote> {
        self.active_notes.iter().find(|n| n.note == note)
    }

    /// True for channel messages on one of the zone's member channels
    pub fn is_on_zone(&self, message: &Message) -> bool {
        message
            .channel()
            .is_ok_and(|channel| self.channels.contains(&channel))
    }

    pub fn is_on_master_channel(&self, message: &Message) -> bool {
        message
            .channel()
            .is_ok_and(|channel| channel == self.master_channel)
    }

    /// Member channel a note-on for `note` would land on
    /// An already active note keeps its channel; otherwise `policy` decides
    pub fn allocate(&self, note: u8, policy: &dyn ChannelPolicy) -> Option<u8> {
        match self.find_note(note) {
            Some(active) => Some(active.channel),
            None => policy.select_channel(self, note),
        }
    }

    /// Next zone state after `message`, allocating with least-notes-first
    pub fn process(&self, message: &Message) -> MpeZone {
        self.process_with(message, &LeastNotes)
    }

    /// Next zone state after `message`, allocating with `policy`
    ///
    /// Messages on the master channel or outside the zone leave it unchanged.
    pub fn process_with(&self, message: &Message, policy: &dyn ChannelPolicy) -> MpeZone {
        if !self.is_on_zone(message) || self.is_on_master_channel(message) {
            return self.clone();
        }
        let Ok(channel) = message.channel() else {
            return self.clone();
        };

        let mut next = self.clone();
        match message.kind {
            MessageKind::NoteOn { .. } if message.is_note_on() => next.note_on(message, policy),
            MessageKind::NoteOn { note, .. } | MessageKind::NoteOff { note, .. } => {
                next.note_off(note, channel)
            }
            MessageKind::ChannelPressure { pressure, .. } => {
                next.update_channel(channel, |n| n.pressure = pressure)
            }
            MessageKind::ControlChange {
                controller, value, ..
            } if controller == self.timbre_controller => {
                next.update_channel(channel, |n| n.timbre = value)
            }
            MessageKind::PitchBend { value, .. } => {
                next.update_channel(channel, |n| n.pitch_bend = value)
            }
            _ => {}
        }
        next
    }

    fn note_on(&mut self, message: &Message, policy: &dyn ChannelPolicy) {
        let (Ok(note), Ok(velocity)) = (message.note(), message.velocity()) else {
            return;
        };

        // Retrigger: keep the entry and its channel
        if let Some(active) = self.active_notes.iter_mut().find(|n| n.note == note) {
            active.velocity = velocity;
            return;
        }

        match policy.select_channel(self, note) {
            Some(channel) => self
                .active_notes
                .push(ActiveNote::new(note, channel, velocity)),
            None => log::warn!("no MPE channel available for note {}", note),
        }
    }

    /// Removes only the first entry matching (note, channel)
    fn note_off(&mut self, note: u8, channel: u8) {
        if let Some(index) = self
            .active_notes
            .iter()
            .position(|n| n.note == note && n.channel == channel)
        {
            self.active_notes.remove(index);
        }
    }

    fn update_channel(&mut self, channel: u8, mut update: impl FnMut(&mut ActiveNote)) {
        self.active_notes
            .iter_mut()
            .filter(|n| n.channel == channel)
            .for_each(|n| update(n));
    }
}
