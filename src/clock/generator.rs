// Look-Ahead Clock Generator - MIDI Clock pulses for a scheduling window
// Pure function of its inputs: the caller owns the last emitted tick time

use super::tempo::ms_per_tick;
use crate::midi::Message;

/// Result of one scheduling pass
#[derive(Debug, Clone, PartialEq)]
pub struct ClockBatch {
    /// Clock pulses in ascending timestamp order
    pub pulses: Vec<Message>,
    /// Timestamp of the last emitted pulse (or the previous value if none)
    pub last_tick_time: Option<f64>,
}

/// Generate the clock pulses falling inside `[now, now + look_ahead)`
///
/// * `last_tick_time == None` starts the clock: the first pulse lands exactly on `now`.
/// * Otherwise pulses continue at `last_tick_time + k * ms_per_tick` for every tick
///   strictly after the last one and before the horizon. Ticks already in the past
///   relative to `now` are still emitted (catch-up), nothing is dropped.
///
/// Tick times are computed from the base time by multiplication, not by repeated
/// addition, so long runs don't drift.
pub fn generate(
    time_division: u16,
    bpm: f64,
    last_tick_time: Option<f64>,
    now: f64,
    look_ahead: f64,
) -> ClockBatch {
    let tick_ms = ms_per_tick(bpm, time_division);
    let horizon = now + look_ahead;
    if !(tick_ms.is_finite() && tick_ms > 0.0 && horizon.is_finite()) {
        return ClockBatch {
            pulses: Vec::new(),
            last_tick_time,
        };
    }

    let (base, first) = match last_tick_time {
        None => (now, 0u64),
        Some(last) => (last, 1u64),
    };

    let mut pulses = Vec::new();
    let mut k = first;
    loop {
        let tick_time = base + k as f64 * tick_ms;
        if tick_time >= horizon {
            break;
        }
        pulses.push(Message::clock(tick_time));
        k += 1;
    }

    let last_tick_time = match pulses.last().and_then(|p| p.timestamp) {
        Some(t) => Some(t),
        // A cold start with an empty window still anchors the clock at `now`
        None => last_tick_time.or(Some(now)),
    };

    ClockBatch {
        pulses,
        last_tick_time,
    }
}
