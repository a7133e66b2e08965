// Periodic Timer - Invokes a callback at a fixed wall-clock resolution
// Cancellation is idempotent and no callback runs once cancel() has returned

use super::time_source::TimeSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Callback receiving the time source's `now()` on every timer tick
pub type TickCallback = Box<dyn FnMut(f64) + Send + 'static>;

/// A source of periodic ticks
pub trait PeriodicTimer {
    fn subscribe(&self, resolution_ms: f64, callback: TickCallback) -> TimerHandle;
}

/// Handle to a timer subscription
/// Dropping the handle cancels the subscription
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl TimerHandle {
    fn new(cancelled: Arc<AtomicBool>, worker: Option<thread::JoinHandle<()>>) -> Self {
        Self { cancelled, worker }
    }

    /// Stop the subscription
    /// Waits for an in-flight callback unless called from inside that callback
    pub fn cancel(&mut self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            log::debug!("timer subscription cancelled");
        }

        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() {
                worker.thread().unpark();
                let _ = worker.join();
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Timer driven by a background thread
///
/// Ticks are scheduled against fixed deadlines (start + k * resolution) so the
/// sleep jitter of one tick doesn't accumulate into the next. The thread parks
/// between ticks and is woken by `cancel`, so long periods don't delay it.
#[derive(Debug, Clone)]
pub struct ThreadTimer<S> {
    source: S,
}

impl<S: TimeSource + Clone + 'static> ThreadTimer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: TimeSource + Clone + 'static> PeriodicTimer for ThreadTimer<S> {
    /// A resolution that is not a representable duration yields an already
    /// cancelled handle
    fn subscribe(&self, resolution_ms: f64, mut callback: TickCallback) -> TimerHandle {
        let period = match Duration::try_from_secs_f64(resolution_ms.max(0.1) / 1000.0) {
            Ok(period) => period,
            Err(e) => {
                log::warn!("timer resolution {} ms rejected: {}", resolution_ms, e);
                return TimerHandle::new(Arc::new(AtomicBool::new(true)), None);
            }
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let source = self.source.clone();

        log::debug!("starting timer thread ({:.1} ms resolution)", resolution_ms);

        let worker = thread::spawn(move || {
            let start = Instant::now();
            let mut tick: u32 = 0;

            while !flag.load(Ordering::SeqCst) {
                callback(source.now());

                tick = tick.wrapping_add(1);
                let deadline = period
                    .checked_mul(tick)
                    .and_then(|offset| start.checked_add(offset));
                park_until(&flag, deadline);
            }
        });

        TimerHandle::new(cancelled, Some(worker))
    }
}

/// Park until `deadline` or cancellation
/// A deadline past what `Instant` can represent waits for cancellation only
fn park_until(cancelled: &AtomicBool, deadline: Option<Instant>) {
    while !cancelled.load(Ordering::SeqCst) {
        match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if deadline <= now {
                    return;
                }
                thread::park_timeout(deadline - now);
            }
            None => thread::park(),
        }
    }
}

#[derive(Clone)]
struct ManualSubscription {
    cancelled: Arc<AtomicBool>,
    callback: Arc<Mutex<TickCallback>>,
}

/// Timer fired by hand, for tests and offline rendering
///
/// Callbacks run without the subscription list locked, so they may subscribe
/// or query the timer. A callback must not `fire` the timer that runs it.
#[derive(Clone, Default)]
pub struct ManualTimer {
    subscriptions: Arc<Mutex<Vec<ManualSubscription>>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<ManualSubscription>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Invoke every live subscription with `now`
    /// Returns how many callbacks ran; subscriptions added meanwhile wait for the next fire
    pub fn fire(&self, now: f64) -> usize {
        let live: Vec<ManualSubscription> = {
            let mut subscriptions = self.subscriptions();
            subscriptions.retain(|s| !s.cancelled.load(Ordering::SeqCst));
            subscriptions.clone()
        };

        let mut fired = 0;
        for subscription in &live {
            if !subscription.cancelled.load(Ordering::SeqCst) {
                let mut callback = subscription
                    .callback
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                (&mut **callback)(now);
                fired += 1;
            }
        }
        fired
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions()
            .iter()
            .filter(|s| !s.cancelled.load(Ordering::SeqCst))
            .count()
    }
}

impl PeriodicTimer for ManualTimer {
    fn subscribe(&self, _resolution_ms: f64, callback: TickCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.subscriptions().push(ManualSubscription {
            cancelled: Arc::clone(&cancelled),
            callback: Arc::new(Mutex::new(callback)),
        });
        TimerHandle::new(cancelled, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::time_source::{ManualClock, MonotonicClock};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_manual_timer_fires_subscribers() {
        let timer = ManualTimer::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let _handle = timer.subscribe(
            25.0,
            Box::new(move |now| sink.lock().unwrap().push(now)),
        );

        assert_eq!(timer.fire(0.0), 1);
        assert_eq!(timer.fire(25.0), 1);
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 25.0]);
    }

    #[test]
    fn test_cancel_is_idempotent_and_final() {
        let timer = ManualTimer::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let mut handle = timer.subscribe(
            25.0,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        timer.fire(0.0);
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        assert_eq!(timer.fire(25.0), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_cancels() {
        let timer = ManualTimer::new();
        {
            let _handle = timer.subscribe(25.0, Box::new(|_| {}));
            assert_eq!(timer.subscriber_count(), 1);
        }
        assert_eq!(timer.subscriber_count(), 0);
    }

    #[test]
    fn test_thread_timer_delivers_source_time() {
        let clock = ManualClock::new(42.0);
        let timer = ThreadTimer::new(clock);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut handle = timer.subscribe(
            1.0,
            Box::new(move |now| sink.lock().unwrap().push(now)),
        );
        thread::sleep(Duration::from_millis(20));
        handle.cancel();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&t| t == 42.0));
    }

    #[test]
    fn test_thread_timer_stops_after_cancel() {
        let timer = ThreadTimer::new(MonotonicClock::new());
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let mut handle = timer.subscribe(
            1.0,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        thread::sleep(Duration::from_millis(10));
        handle.cancel();

        let after_cancel = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_callbacks_can_query_and_subscribe() {
        let timer = ManualTimer::new();
        let counts = Arc::new(Mutex::new(Vec::new()));
        let extra = Arc::new(Mutex::new(Vec::new()));

        let (inner, seen, handles) = (timer.clone(), Arc::clone(&counts), Arc::clone(&extra));
        let _handle = timer.subscribe(
            25.0,
            Box::new(move |_| {
                seen.lock().unwrap().push(inner.subscriber_count());
                let mut handles = handles.lock().unwrap();
                if handles.is_empty() {
                    handles.push(inner.subscribe(25.0, Box::new(|_| {})));
                }
            }),
        );

        // The subscription added during the first fire joins on the second
        assert_eq!(timer.fire(0.0), 1);
        assert_eq!(timer.fire(25.0), 2);
        assert_eq!(*counts.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_unrepresentable_resolution_yields_cancelled_handle() {
        let timer = ThreadTimer::new(MonotonicClock::new());
        let count = Arc::new(AtomicUsize::new(0));

        for resolution in [f64::INFINITY, 1e300] {
            let counter = Arc::clone(&count);
            let handle = timer.subscribe(
                resolution,
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
            assert!(handle.is_cancelled());
        }
        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_long_period_cancels_promptly() {
        let timer = ThreadTimer::new(MonotonicClock::new());
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        // One hour between ticks
        let mut handle = timer.subscribe(
            3_600_000.0,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        handle.cancel();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
