// Quantizer - Snaps live messages to the MIDI clock grid
// Scans an interleaved stream of clock pulses and messages

use crate::midi::Message;
use crate::pipeline::Stage;

/// Snaps each non-clock message to the nearest clock pulse
///
/// The grid spacing is the interval between the two most recent pulses.
/// A message exactly half-way between two pulses snaps to the earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quantizer {
    resolution: f64,
    last_clock_timestamp: f64,
}

impl Quantizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval between the last two observed pulses (0 until a pulse is seen)
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn last_clock_timestamp(&self) -> f64 {
        self.last_clock_timestamp
    }

    /// Observe one message and return it, quantized if possible
    pub fn quantize(&mut self, message: Message) -> Message {
        if message.is_midi_clock() {
            let timestamp = message.timestamp.unwrap_or(self.last_clock_timestamp);
            self.resolution = timestamp - self.last_clock_timestamp;
            self.last_clock_timestamp = timestamp;
            return message;
        }

        if self.resolution == 0.0 {
            return message;
        }

        let Some(timestamp) = message.timestamp else {
            return message;
        };

        let offset = timestamp - self.last_clock_timestamp;
        let quantized = if offset <= self.resolution / 2.0 {
            self.last_clock_timestamp
        } else {
            self.last_clock_timestamp + self.resolution
        };

        Message {
            quantized_timestamp: Some(quantized),
            ..message
        }
    }
}

impl Stage for Quantizer {
    fn process(&mut self, message: Message) -> Vec<Message> {
        vec![self.quantize(message)]
    }
}
