//! Frame-timing primitives.
//!
//! A [`FrameTiming`] behaves like a host's animation-frame scheduler:
//! callers request a frame and get an id back, and on the next display
//! refresh every request pending at that moment fires with the same
//! timestamp. Requests are one-shot; a loop keeps itself alive by
//! requesting again from inside its callback.

use async_trait::async_trait;
use framecast_core::{FramecastError, FramecastResult, Timestamp};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Handle to a requested frame callback, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(u64);

impl FrameRequestId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// One display refresh: the timestamp and the requests it fires.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTick {
    pub timestamp: Timestamp,
    pub callbacks: Vec<FrameRequestId>,
}

#[async_trait]
pub trait FrameTiming: Send {
    /// Request a callback on the next refresh.
    fn request_frame(&mut self) -> FrameRequestId;

    /// Cancel a pending request. Unknown or already-fired ids are ignored.
    fn cancel_frame(&mut self, id: FrameRequestId);

    /// Number of requests waiting for the next refresh.
    fn pending(&self) -> usize;

    /// Wait for the next refresh and take every request pending at that moment.
    async fn next_tick(&mut self) -> FrameTick;
}

/// Request bookkeeping shared by the clock implementations.
#[derive(Debug, Default)]
struct RequestQueue {
    next_id: u64,
    pending: Vec<FrameRequestId>,
}

impl RequestQueue {
    fn request(&mut self) -> FrameRequestId {
        self.next_id += 1;
        let id = FrameRequestId(self.next_id);
        self.pending.push(id);
        id
    }

    fn cancel(&mut self, id: FrameRequestId) {
        self.pending.retain(|pending| *pending != id);
    }

    fn take(&mut self, timestamp: Timestamp) -> FrameTick {
        FrameTick {
            timestamp,
            callbacks: std::mem::take(&mut self.pending),
        }
    }
}

/// Refresh-rate driven clock backed by a tokio interval.
///
/// Timestamps are milliseconds since the clock was created. Missed refreshes
/// are skipped rather than replayed.
#[derive(Debug)]
pub struct AnimationFrameClock {
    period: std::time::Duration,
    origin: Instant,
    interval: Option<Interval>,
    queue: RequestQueue,
}

impl AnimationFrameClock {
    /// Create a clock ticking at `refresh_rate` Hz.
    ///
    /// The interval is armed lazily on the first wait, so the clock can be
    /// built outside the runtime that drives it.
    pub fn new(refresh_rate: f64) -> FramecastResult<Self> {
        if !refresh_rate.is_finite() || refresh_rate <= 0.0 {
            return Err(FramecastError::InvalidArgument(format!(
                "refresh rate must be a positive number of Hz, got {}",
                refresh_rate
            )));
        }
        Ok(Self {
            period: std::time::Duration::from_secs_f64(1.0 / refresh_rate),
            origin: Instant::now(),
            interval: None,
            queue: RequestQueue::default(),
        })
    }

    pub fn period(&self) -> std::time::Duration {
        self.period
    }
}

#[async_trait]
impl FrameTiming for AnimationFrameClock {
    fn request_frame(&mut self) -> FrameRequestId {
        self.queue.request()
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        self.queue.cancel(id);
    }

    fn pending(&self) -> usize {
        self.queue.pending.len()
    }

    async fn next_tick(&mut self) -> FrameTick {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        let at = interval.tick().await;
        let timestamp = Timestamp::from_elapsed(at.saturating_duration_since(self.origin));
        self.queue.take(timestamp)
    }
}

/// A clock whose refreshes are triggered explicitly through a
/// [`ManualClockHandle`]. Deterministic; used to drive exact timestamps.
#[derive(Debug)]
pub struct ManualFrameClock {
    ticks: mpsc::UnboundedReceiver<Timestamp>,
    queue: RequestQueue,
}

/// Sender side of a [`ManualFrameClock`].
#[derive(Debug, Clone)]
pub struct ManualClockHandle {
    ticks: mpsc::UnboundedSender<Timestamp>,
}

impl ManualFrameClock {
    pub fn new() -> (Self, ManualClockHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                ticks: rx,
                queue: RequestQueue::default(),
            },
            ManualClockHandle { ticks: tx },
        )
    }
}

impl ManualClockHandle {
    /// Queue one refresh at `millis`. Returns false once the clock is gone.
    pub fn tick(&self, millis: f64) -> bool {
        self.ticks.send(Timestamp::from_millis(millis)).is_ok()
    }
}

#[async_trait]
impl FrameTiming for ManualFrameClock {
    fn request_frame(&mut self) -> FrameRequestId {
        self.queue.request()
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        self.queue.cancel(id);
    }

    fn pending(&self) -> usize {
        self.queue.pending.len()
    }

    async fn next_tick(&mut self) -> FrameTick {
        match self.ticks.recv().await {
            Some(timestamp) => self.queue.take(timestamp),
            // Every handle dropped: no refresh will ever come.
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_refresh_rate() {
        assert!(AnimationFrameClock::new(0.0).is_err());
        assert!(AnimationFrameClock::new(-60.0).is_err());
        assert!(AnimationFrameClock::new(f64::INFINITY).is_err());
        let clock = AnimationFrameClock::new(50.0).unwrap();
        assert_eq!(clock.period(), std::time::Duration::from_millis(20));
    }

    #[test]
    fn test_request_and_cancel() {
        let (mut clock, _handle) = ManualFrameClock::new();
        let a = clock.request_frame();
        let b = clock.request_frame();
        assert_ne!(a, b);
        assert_eq!(clock.pending(), 2);
        clock.cancel_frame(a);
        clock.cancel_frame(a);
        assert_eq!(clock.pending(), 1);
    }

    #[tokio::test]
    async fn test_manual_tick_fires_all_pending() {
        let (mut clock, handle) = ManualFrameClock::new();
        let a = clock.request_frame();
        let b = clock.request_frame();
        assert!(handle.tick(16.5));

        let tick = clock.next_tick().await;
        assert_eq!(tick.timestamp, Timestamp::from_millis(16.5));
        assert_eq!(tick.callbacks, vec![a, b]);
        assert_eq!(clock.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_clock_timestamps_advance() {
        let mut clock = AnimationFrameClock::new(60.0).unwrap();
        let id = clock.request_frame();
        let first = clock.next_tick().await;
        assert_eq!(first.callbacks, vec![id]);

        let second = clock.next_tick().await;
        assert!(second.callbacks.is_empty());
        let delta = second.timestamp.as_millis() - first.timestamp.as_millis();
        assert!((delta - 1000.0 / 60.0).abs() < 1.0, "delta was {}", delta);
    }
}
