// MPE Stage - Routes incoming notes onto the zone's member channels

use super::policy::{ChannelPolicy, LeastNotes};
use super::zone::MpeZone;
use crate::config::EngineConfig;
use crate::midi::{Message, MessageKind};
use crate::pipeline::Stage;

/// Stream stage owning one zone
///
/// Note-ons move to the member channel picked by the policy, note-offs follow
/// their note to the channel it was given. Everything else on the zone is
/// folded into the zone state unchanged; master channel and off-zone
/// messages pass straight through.
pub struct MpeStage {
    zone: MpeZone,
    policy: Box<dyn ChannelPolicy + Send>,
}

impl MpeStage {
    pub fn new(zone: MpeZone) -> Self {
        Self::with_policy(zone, LeastNotes)
    }

    /// Least-notes-first stage reading timbre from the configured controller
    pub fn from_config(zone: MpeZone, config: &EngineConfig) -> Self {
        Self::new(zone.with_timbre_controller(config.timbre_controller))
    }

    pub fn with_policy<P>(zone: MpeZone, policy: P) -> Self
    where
        P: ChannelPolicy + Send + 'static,
    {
        Self {
            zone,
            policy: Box::new(policy),
        }
    }

    pub fn zone(&self) -> &MpeZone {
        &self.zone
    }

    /// Rewrite one message and advance the zone
    pub fn route(&mut self, message: Message) -> Message {
        if !self.zone.is_on_zone(&message) || self.zone.is_on_master_channel(&message) {
            return message;
        }

        let routed = match message.kind {
            MessageKind::NoteOn { note, .. } if message.is_note_on() => {
                match self.zone.allocate(note, self.policy.as_ref()) {
                    Some(channel) => message.with_channel(channel),
                    None => message,
                }
            }
            MessageKind::NoteOn { note, .. } | MessageKind::NoteOff { note, .. } => {
                match self.zone.find_note(note) {
                    Some(active) => message.with_channel(active.channel),
                    None => message,
                }
            }
            _ => message,
        };

        self.zone = self.zone.process_with(&routed, self.policy.as_ref());
        routed
    }
}

impl std::fmt::Debug for MpeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpeStage")
            .field("zone", &self.zone)
            .finish_non_exhaustive()
    }
}

impl Stage for MpeStage {
    fn process(&mut self, message: Message) -> Vec<Message> {
        vec![self.route(message)]
    }
}
