// Recorder - Captures a live message stream into a sequence
// Delta times count the clock pulses seen between two recorded events

use super::model::Sequence;
use crate::midi::{Message, MessageKind};
use crate::pipeline::Stage;
use std::sync::Arc;

/// Records messages into the single track of a growing sequence
///
/// Each recorded message is forwarded, followed by a sequence snapshot
/// carrying the updated sequence. Clock pulses, transport messages and
/// snapshots pass through without being recorded.
#[derive(Debug, Clone)]
pub struct Recorder {
    sequence: Arc<Sequence>,
    delta: u64,
    recording: bool,
    time_division: u16,
}

impl Recorder {
    pub fn new(time_division: u16) -> Self {
        Self {
            sequence: Arc::new(Sequence::empty(time_division)),
            delta: 0,
            recording: false,
            time_division,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The sequence recorded so far
    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.sequence
    }

    /// Pulses counted since the last recorded event
    pub fn pending_delta(&self) -> u64 {
        self.delta
    }

    pub fn handle(&mut self, message: Message) -> Vec<Message> {
        match message.kind {
            MessageKind::Clock => {
                if self.recording {
                    self.delta += 1;
                }
                vec![message]
            }
            MessageKind::Start => {
                self.sequence = Arc::new(Sequence::empty(self.time_division));
                self.delta = 0;
                self.recording = true;
                log::debug!("recorder start");
                vec![message]
            }
            MessageKind::Continue => {
                self.recording = true;
                log::debug!("recorder continue");
                vec![message]
            }
            MessageKind::Stop => {
                self.recording = false;
                log::debug!(
                    "recorder stop, {} events recorded",
                    self.sequence.event_count()
                );
                vec![message]
            }
            MessageKind::SequenceSnapshot(_) => vec![message],
            _ if self.recording => {
                self.record(&message);
                vec![message, Message::sequence_snapshot(Arc::clone(&self.sequence))]
            }
            _ => vec![message],
        }
    }

    fn record(&mut self, message: &Message) {
        let event = Message {
            delta_time: Some(self.delta),
            timestamp: None,
            absolute_delta_time: None,
            quantized_timestamp: None,
            ..message.clone()
        };
        self.delta = 0;

        // Snapshots handed out earlier keep the old value
        let sequence = Arc::make_mut(&mut self.sequence);
        if sequence.tracks.is_empty() {
            sequence.tracks.push(Vec::new());
        }
        sequence.tracks[0].push(event);
    }
}

impl Stage for Recorder {
    fn process(&mut self, message: Message) -> Vec<Message> {
        self.handle(message)
    }
}
