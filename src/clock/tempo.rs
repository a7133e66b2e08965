// Tempo - Beats per minute and tick spacing
// Converts a tempo and a time division into milliseconds per clock tick

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard MIDI clock resolution (pulses per quarter note)
pub const MIDI_CLOCK_PPQN: u16 = 24;

/// Slowest accepted tempo
pub const MIN_BPM: f64 = 20.0;

/// Fastest accepted tempo
pub const MAX_BPM: f64 = 999.0;

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo
    /// Returns `None` outside [`MIN_BPM`, `MAX_BPM`] (NaN included)
    pub fn new(bpm: f64) -> Option<Self> {
        if (MIN_BPM..=MAX_BPM).contains(&bpm) {
            Some(Self { bpm })
        } else {
            None
        }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in milliseconds
    pub fn beat_duration_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Duration of one tick in milliseconds for the given time division
    pub fn ms_per_tick(&self, time_division: u16) -> f64 {
        ms_per_tick(self.bpm, time_division)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// `60000 / (bpm * time_division)`
pub fn ms_per_tick(bpm: f64, time_division: u16) -> f64 {
    60_000.0 / (bpm * time_division as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo() {
        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.bpm(), 120.0);
        assert_eq!(tempo.beat_duration_ms(), 500.0);
        assert_eq!(tempo.to_string(), "120.0 BPM");
    }

    #[test]
    fn test_invalid_tempo() {
        assert!(Tempo::new(0.0).is_none());
        assert!(Tempo::new(-10.0).is_none());
        assert!(Tempo::new(f64::NAN).is_none());
        assert!(Tempo::new(f64::INFINITY).is_none());
        assert!(Tempo::new(19.9).is_none());
        assert!(Tempo::new(1000.0).is_none());
        assert!(Tempo::new(1e9).is_none());
    }

    #[test]
    fn test_tempo_bounds_inclusive() {
        assert_eq!(Tempo::new(MIN_BPM).map(|t| t.bpm()), Some(20.0));
        assert_eq!(Tempo::new(MAX_BPM).map(|t| t.bpm()), Some(999.0));
    }

    #[test]
    fn test_ms_per_tick() {
        // 1 tick per beat at 60 BPM = one second
        assert_eq!(ms_per_tick(60.0, 1), 1000.0);
        // 1000 ticks per beat at 60 BPM = one millisecond
        assert_eq!(ms_per_tick(60.0, 1000), 1.0);

        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.ms_per_tick(MIDI_CLOCK_PPQN), 500.0 / 24.0);
    }
}
