// Clock Operator - Continuous MIDI clock from a periodic timer
// Folds timer samples through the look-ahead generator, tempo adjustable live

use super::generator::generate;
use super::tempo::Tempo;
use super::timer::{PeriodicTimer, TimerHandle};
use crate::config::EngineConfig;
use crate::midi::Message;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Live clock parameters shared with the timer thread
/// Thread-safe via atomics; changes apply from the next timer sample on
#[derive(Debug, Clone)]
pub struct ClockControl {
    bpm_bits: Arc<AtomicU64>,
    time_division: Arc<AtomicU32>,
}

impl ClockControl {
    fn new(tempo: Tempo, time_division: u16) -> Self {
        Self {
            bpm_bits: Arc::new(AtomicU64::new(tempo.bpm().to_bits())),
            time_division: Arc::new(AtomicU32::new(time_division as u32)),
        }
    }

    /// Current tempo in BPM
    pub fn tempo(&self) -> f64 {
        f64::from_bits(self.bpm_bits.load(Ordering::Relaxed))
    }

    /// Change the tempo without restarting the clock
    /// Returns false (and keeps the old tempo) for invalid values
    pub fn set_tempo(&self, bpm: f64) -> bool {
        match Tempo::new(bpm) {
            Some(tempo) => {
                self.bpm_bits.store(tempo.bpm().to_bits(), Ordering::Relaxed);
                log::debug!("clock tempo set to {}", tempo);
                true
            }
            None => {
                log::warn!("ignoring invalid clock tempo {}", bpm);
                false
            }
        }
    }

    pub fn time_division(&self) -> u16 {
        self.time_division.load(Ordering::Relaxed) as u16
    }

    /// Change ticks per quarter note without restarting the clock
    pub fn set_time_division(&self, time_division: u16) -> bool {
        if time_division == 0 {
            log::warn!("ignoring zero clock time division");
            return false;
        }
        self.time_division
            .store(time_division as u32, Ordering::Relaxed);
        log::debug!("clock time division set to {}", time_division);
        true
    }
}

/// Look-ahead MIDI clock
///
/// Each timer sample triggers one generator pass over `[now, now + look_ahead)`.
/// The timer resolution must not exceed the look-ahead window, otherwise ticks
/// can fall between two windows; `EngineConfig::validate` checks this.
#[derive(Debug)]
pub struct ClockOperator {
    control: ClockControl,
    look_ahead_ms: f64,
    resolution_ms: f64,
    last_tick_time: Option<f64>,
}

impl ClockOperator {
    pub fn new(tempo: Tempo, time_division: u16, look_ahead_ms: f64, resolution_ms: f64) -> Self {
        Self {
            control: ClockControl::new(tempo, time_division.max(1)),
            look_ahead_ms,
            resolution_ms,
            last_tick_time: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Tempo::new(config.bpm).unwrap_or_default(),
            config.time_division,
            config.look_ahead_ms,
            config.resolution_ms,
        )
    }

    /// Handle for live tempo/time-division changes
    pub fn control(&self) -> ClockControl {
        self.control.clone()
    }

    pub fn set_tempo(&self, bpm: f64) -> bool {
        self.control.set_tempo(bpm)
    }

    pub fn set_time_division(&self, time_division: u16) -> bool {
        self.control.set_time_division(time_division)
    }

    pub fn look_ahead_ms(&self) -> f64 {
        self.look_ahead_ms
    }

    pub fn resolution_ms(&self) -> f64 {
        self.resolution_ms
    }

    pub fn last_tick_time(&self) -> Option<f64> {
        self.last_tick_time
    }

    /// Process one timer sample
    /// Returns `None` when the window holds no new pulse
    pub fn sample(&mut self, now: f64) -> Option<Vec<Message>> {
        let batch = generate(
            self.control.time_division(),
            self.control.tempo(),
            self.last_tick_time,
            now,
            self.look_ahead_ms,
        );
        self.last_tick_time = batch.last_tick_time;

        if batch.pulses.is_empty() {
            None
        } else {
            log::trace!("clock batch of {} pulses at {:.3} ms", batch.pulses.len(), now);
            Some(batch.pulses)
        }
    }

    /// Subscribe to a periodic timer and push every non-empty pulse batch to `sink`
    /// Cancel (or drop) the returned handle to stop the clock
    pub fn start<T, F>(mut self, timer: &T, mut sink: F) -> TimerHandle
    where
        T: PeriodicTimer,
        F: FnMut(Vec<Message>) + Send + 'static,
    {
        let resolution_ms = self.resolution_ms;
        log::debug!(
            "clock started: {:.1} BPM, {} PPQN, {:.1} ms look-ahead",
            self.control.tempo(),
            self.control.time_division(),
            self.look_ahead_ms
        );
        timer.subscribe(
            resolution_ms,
            Box::new(move |now| {
                if let Some(pulses) = self.sample(now) {
                    sink(pulses);
                }
            }),
        )
    }
}
