#![forbid(unsafe_code)]

//! Scroll sample throttler.
//!
//! Raw scroll events arrive far faster than a window needs recomputing. The
//! throttler keeps only the most recent sample and releases it at most once per
//! scheduling quantum.
//!
//! # Usage
//!
//! ```
//! use vlist_runtime::throttle::{FrameOutcome, PushOutcome, Quantum, ScrollThrottler};
//!
//! let mut throttler = ScrollThrottler::new(Quantum::FrameTick);
//!
//! // First sample of a quantum asks the host for a frame.
//! assert_eq!(throttler.push(10.0), PushOutcome::RequestFrame);
//! // Later samples only replace the pending value.
//! assert_eq!(throttler.push(40.0), PushOutcome::Coalesced);
//!
//! // The frame callback drains the latest sample.
//! match throttler.frame() {
//!     FrameOutcome::Recompute(signal) => assert_eq!(signal.offset, 40.0),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! # Invariants
//!
//! - **Latest-wins**: the last pushed sample is always eventually released.
//! - **At most once**: a sample is released by exactly one signal.
//! - **Ordered**: signal sequence numbers strictly increase.
//! - **One frame per quantum**: only the first sample of a quantum returns
//!   [`PushOutcome::RequestFrame`].
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Frame with nothing pending | [`FrameOutcome::Idle`] |
//! | Interval not yet elapsed | [`FrameOutcome::Defer`]; caller re-requests a frame |
//! | `Interval(Duration::ZERO)` | Behaves like [`Quantum::FrameTick`] |

use std::time::{Duration, Instant};

/// Default minimum interval for [`Quantum::Interval`].
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(16);

#[inline]
fn duration_since_or_zero(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier).unwrap_or(Duration::ZERO)
}

/// Scheduling quantum for releasing scroll samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quantum {
    /// One host frame callback.
    #[default]
    FrameTick,
    /// Minimum wall-clock interval between released samples.
    Interval(Duration),
}

impl Quantum {
    /// Interval quantum with [`DEFAULT_INTERVAL`].
    #[must_use]
    pub const fn default_interval() -> Self {
        Self::Interval(DEFAULT_INTERVAL)
    }

    /// Interval length; zero for [`Quantum::FrameTick`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        match self {
            Self::FrameTick => Duration::ZERO,
            Self::Interval(d) => *d,
        }
    }

    /// Stable lowercase name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FrameTick => "frame_tick",
            Self::Interval(_) => "interval",
        }
    }
}

/// Result of pushing a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// First sample of a quantum: the host must schedule a frame callback.
    RequestFrame,
    /// A frame is already scheduled; the sample replaced the pending one.
    Coalesced,
}

/// A released sample, ready for window recomputation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecomputeSignal {
    /// Latest scroll offset.
    pub offset: f64,
    /// Monotonic sequence number.
    pub seq: u64,
    /// Number of samples folded into this signal (including the released one).
    pub coalesced: u32,
    /// Time from the first sample of the batch to its release.
    pub latency: Duration,
}

/// Result of a frame callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Nothing pending.
    Idle,
    /// Release the pending sample.
    Recompute(RecomputeSignal),
    /// Sample pending but the interval has not elapsed; schedule another frame.
    Defer,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Samples pushed.
    pub samples: u64,
    /// Signals released.
    pub signals: u64,
    /// Samples replaced before release.
    pub coalesced: u64,
    /// Frame requests issued.
    pub frames_requested: u64,
    /// Frames that deferred a pending sample.
    pub deferred: u64,
    /// Pending samples discarded by [`ScrollThrottler::cancel`].
    pub cancelled: u64,
    /// Worst [`RecomputeSignal::latency`] seen so far.
    pub max_latency: Duration,
}

/// Trailing-edge scroll throttler.
#[derive(Debug, Clone)]
pub struct ScrollThrottler {
    quantum: Quantum,
    pending: Option<f64>,
    pending_samples: u32,
    pending_since: Option<Instant>,
    frame_requested: bool,
    last_release: Option<Instant>,
    next_seq: u64,
    stats: ThrottleStats,
}

impl ScrollThrottler {
    /// Create a throttler with the given quantum.
    #[must_use]
    pub fn new(quantum: Quantum) -> Self {
        Self {
            quantum,
            pending: None,
            pending_samples: 0,
            pending_since: None,
            frame_requested: false,
            last_release: None,
            next_seq: 0,
            stats: ThrottleStats::default(),
        }
    }

    /// Configured quantum.
    #[inline]
    #[must_use]
    pub fn quantum(&self) -> Quantum {
        self.quantum
    }

    /// Push a scroll sample.
    pub fn push(&mut self, offset: f64) -> PushOutcome {
        self.push_at(offset, Instant::now())
    }

    /// Push a scroll sample at a specific time (for testing).
    ///
    /// `now` stamps the first sample of a batch; the released signal reports
    /// its latency from there.
    pub fn push_at(&mut self, offset: f64, now: Instant) -> PushOutcome {
        self.stats.samples += 1;
        if self.pending.replace(offset).is_some() {
            self.stats.coalesced += 1;
        } else {
            self.pending_since = Some(now);
        }
        self.pending_samples = self.pending_samples.saturating_add(1);

        if self.frame_requested {
            tracing::trace!(
                target: "vlist.throttle",
                offset,
                pending_samples = self.pending_samples,
                "coalesce"
            );
            return PushOutcome::Coalesced;
        }

        self.frame_requested = true;
        self.stats.frames_requested += 1;
        tracing::trace!(target: "vlist.throttle", offset, "request_frame");
        PushOutcome::RequestFrame
    }

    /// Handle a frame callback.
    pub fn frame(&mut self) -> FrameOutcome {
        self.frame_at(Instant::now())
    }

    /// Handle a frame callback at a specific time (for testing).
    pub fn frame_at(&mut self, now: Instant) -> FrameOutcome {
        if self.pending.is_none() {
            self.frame_requested = false;
            return FrameOutcome::Idle;
        }

        if let Some(wait) = self.remaining_interval(now)
            && !wait.is_zero()
        {
            self.stats.deferred += 1;
            self.stats.frames_requested += 1;
            tracing::trace!(
                target: "vlist.throttle",
                wait_us = wait.as_micros() as u64,
                "defer"
            );
            return FrameOutcome::Defer;
        }

        let Some(offset) = self.pending.take() else {
            return FrameOutcome::Idle;
        };
        let latency = self
            .pending_since
            .take()
            .map_or(Duration::ZERO, |since| duration_since_or_zero(now, since));
        let signal = RecomputeSignal {
            offset,
            seq: self.next_seq,
            coalesced: std::mem::take(&mut self.pending_samples),
            latency,
        };
        self.next_seq += 1;
        self.frame_requested = false;
        self.last_release = Some(now);
        self.stats.signals += 1;
        self.stats.max_latency = self.stats.max_latency.max(latency);

        tracing::trace!(
            target: "vlist.throttle",
            offset,
            seq = signal.seq,
            coalesced = signal.coalesced,
            latency_us = latency.as_micros() as u64,
            "release"
        );
        FrameOutcome::Recompute(signal)
    }

    /// Time until the pending sample can be released, or `None` if idle.
    ///
    /// For [`Quantum::FrameTick`] this is always zero: the next frame releases it.
    #[must_use]
    pub fn time_until_flush(&self, now: Instant) -> Option<Duration> {
        self.pending?;
        Some(self.remaining_interval(now).unwrap_or(Duration::ZERO))
    }

    /// Remaining interval before release is allowed; `None` for frame ticks or
    /// before the first release.
    fn remaining_interval(&self, now: Instant) -> Option<Duration> {
        let Quantum::Interval(interval) = self.quantum else {
            return None;
        };
        let last = self.last_release?;
        Some(interval.saturating_sub(duration_since_or_zero(now, last)))
    }

    /// Drop any pending sample and forget the outstanding frame request.
    ///
    /// Returns `true` if a frame request was outstanding, so the caller can
    /// cancel it with the host.
    pub fn cancel(&mut self) -> bool {
        if self.pending.take().is_some() {
            self.stats.cancelled += 1;
        }
        self.pending_samples = 0;
        self.pending_since = None;
        std::mem::replace(&mut self.frame_requested, false)
    }

    /// Whether a sample is waiting for release.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a frame request is outstanding.
    #[inline]
    #[must_use]
    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> ThrottleStats {
        self.stats
    }
}

impl Default for ScrollThrottler {
    fn default() -> Self {
        Self::new(Quantum::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn expect_signal(outcome: FrameOutcome) -> RecomputeSignal {
        match outcome {
            FrameOutcome::Recompute(signal) => signal,
            other => panic!("expected Recompute, got {other:?}"),
        }
    }

    #[test]
    fn hundred_samples_one_signal() {
        let mut t = ScrollThrottler::new(Quantum::FrameTick);
        let base = Instant::now();

        let mut requests = 0;
        for i in 0u32..100 {
            let at = base + Duration::from_micros(u64::from(i) * 100);
            if t.push_at(f64::from(i) * 3.0, at) == PushOutcome::RequestFrame {
                requests += 1;
            }
        }
        assert_eq!(requests, 1);

        let signal = expect_signal(t.frame_at(base + ms(16)));
        assert_eq!(signal.offset, 297.0);
        assert_eq!(signal.coalesced, 100);
        assert_eq!(signal.seq, 0);
        assert_eq!(signal.latency, ms(16));
        assert_eq!(t.frame_at(base + ms(32)), FrameOutcome::Idle);

        let stats = t.stats();
        assert_eq!(stats.samples, 100);
        assert_eq!(stats.signals, 1);
        assert_eq!(stats.coalesced, 99);
        assert_eq!(stats.frames_requested, 1);
        assert_eq!(stats.max_latency, ms(16));
    }

    #[test]
    fn next_quantum_requests_again() {
        let mut t = ScrollThrottler::default();
        assert_eq!(t.push(1.0), PushOutcome::RequestFrame);
        let _ = t.frame();
        assert!(!t.frame_requested());
        assert_eq!(t.push(2.0), PushOutcome::RequestFrame);
        let signal = expect_signal(t.frame());
        assert_eq!(signal.seq, 1);
        assert_eq!(signal.coalesced, 1);
    }

    #[test]
    fn idle_frame_clears_request() {
        let mut t = ScrollThrottler::default();
        assert_eq!(t.frame(), FrameOutcome::Idle);
        let _ = t.push(5.0);
        assert!(t.cancel());
        assert_eq!(t.frame(), FrameOutcome::Idle);
        assert_eq!(t.stats().cancelled, 1);
    }

    #[test]
    fn interval_defers_until_elapsed() {
        let mut t = ScrollThrottler::new(Quantum::Interval(ms(50)));
        let base = Instant::now();

        assert_eq!(t.push_at(10.0, base), PushOutcome::RequestFrame);
        // First release is never throttled.
        assert_eq!(expect_signal(t.frame_at(base + ms(1))).offset, 10.0);

        assert_eq!(t.push_at(20.0, base + ms(5)), PushOutcome::RequestFrame);
        assert_eq!(t.frame_at(base + ms(17)), FrameOutcome::Defer);
        assert!(t.frame_requested());
        assert_eq!(t.push_at(30.0, base + ms(20)), PushOutcome::Coalesced);
        assert_eq!(t.time_until_flush(base + ms(21)), Some(ms(30)));
        assert_eq!(t.frame_at(base + ms(33)), FrameOutcome::Defer);

        let signal = expect_signal(t.frame_at(base + ms(51)));
        assert_eq!(signal.offset, 30.0);
        assert_eq!(signal.coalesced, 2);
        // Measured from the push at +5ms, not from the coalesced one at +20ms.
        assert_eq!(signal.latency, ms(46));
        assert_eq!(t.stats().deferred, 2);
        assert_eq!(t.stats().max_latency, ms(46));
    }

    #[test]
    fn latency_restarts_after_cancel() {
        let mut t = ScrollThrottler::new(Quantum::FrameTick);
        let base = Instant::now();
        let _ = t.push_at(1.0, base);
        assert!(t.cancel());
        let _ = t.push_at(2.0, base + ms(40));
        let signal = expect_signal(t.frame_at(base + ms(45)));
        assert_eq!(signal.latency, ms(5));
    }

    #[test]
    fn zero_interval_acts_like_frame_tick() {
        let mut t = ScrollThrottler::new(Quantum::Interval(Duration::ZERO));
        let base = Instant::now();
        let _ = t.push_at(1.0, base);
        let _ = expect_signal(t.frame_at(base));
        let _ = t.push_at(2.0, base);
        assert_eq!(expect_signal(t.frame_at(base)).offset, 2.0);
    }

    #[test]
    fn time_until_flush_idle_is_none() {
        let t = ScrollThrottler::new(Quantum::default_interval());
        assert_eq!(t.time_until_flush(Instant::now()), None);
        let mut t = ScrollThrottler::new(Quantum::FrameTick);
        let _ = t.push(3.0);
        assert_eq!(t.time_until_flush(Instant::now()), Some(Duration::ZERO));
    }

    #[test]
    fn quantum_helpers() {
        assert_eq!(Quantum::default(), Quantum::FrameTick);
        assert_eq!(Quantum::default_interval().interval(), ms(16));
        assert_eq!(Quantum::FrameTick.interval(), Duration::ZERO);
        assert_eq!(Quantum::FrameTick.as_str(), "frame_tick");
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    mod property {
        use super::*;
        use proptest::prelude::*;

        /// Sample offsets interleaved with frame callbacks.
        #[derive(Debug, Clone)]
        enum Step {
            Push(f64, u64),
            Frame(u64),
        }

        fn step() -> impl Strategy<Value = Step> {
            prop_oneof![
                3 => (0u32..100_000, 0u64..10).prop_map(|(o, dt)| Step::Push(f64::from(o), dt)),
                1 => (0u64..40).prop_map(Step::Frame),
            ]
        }

        fn quantum() -> impl Strategy<Value = Quantum> {
            prop_oneof![
                Just(Quantum::FrameTick),
                (1u64..60).prop_map(|n| Quantum::Interval(Duration::from_millis(n))),
            ]
        }

        fn run(
            quantum: Quantum,
            steps: &[Step],
        ) -> (ScrollThrottler, Vec<RecomputeSignal>, Option<f64>, Instant) {
            let mut t = ScrollThrottler::new(quantum);
            let mut now = Instant::now();
            let mut signals = Vec::new();
            let mut last_pushed = None;
            for step in steps {
                match *step {
                    Step::Push(offset, dt) => {
                        now += Duration::from_millis(dt);
                        let _ = t.push_at(offset, now);
                        last_pushed = Some(offset);
                    }
                    Step::Frame(dt) => {
                        now += Duration::from_millis(dt);
                        if let FrameOutcome::Recompute(s) = t.frame_at(now) {
                            signals.push(s);
                        }
                    }
                }
            }
            (t, signals, last_pushed, now)
        }

        proptest! {
            /// Sequence numbers are strictly increasing and dense.
            #[test]
            fn signals_are_ordered(
                q in quantum(),
                steps in proptest::collection::vec(step(), 0..200),
            ) {
                let (_, signals, _, _) = run(q, &steps);
                for (i, s) in signals.iter().enumerate() {
                    prop_assert_eq!(s.seq, i as u64);
                }
            }

            /// Every sample is accounted for exactly once.
            #[test]
            fn no_sample_counted_twice(
                q in quantum(),
                steps in proptest::collection::vec(step(), 0..200),
            ) {
                let (t, signals, _, _) = run(q, &steps);
                let released: u64 = signals.iter().map(|s| u64::from(s.coalesced)).sum();
                let pending = u64::from(t.pending_samples);
                prop_assert_eq!(released + pending, t.stats().samples);
            }

            /// The final sample is never dropped.
            #[test]
            fn latest_sample_is_released(
                q in quantum(),
                steps in proptest::collection::vec(step(), 1..200),
            ) {
                let (mut t, mut signals, last_pushed, mut now) = run(q, &steps);
                for _ in 0..10 {
                    now += Duration::from_millis(100);
                    if let FrameOutcome::Recompute(s) = t.frame_at(now) {
                        signals.push(s);
                    }
                }
                if let Some(last) = last_pushed {
                    prop_assert_eq!(signals.last().map(|s| s.offset), Some(last));
                }
                prop_assert!(!t.has_pending());
            }

            /// A signal is never older than the session that produced it.
            #[test]
            fn latency_is_bounded_by_elapsed_time(
                q in quantum(),
                steps in proptest::collection::vec(step(), 0..200),
            ) {
                let total: u64 = steps
                    .iter()
                    .map(|s| match *s {
                        Step::Push(_, dt) | Step::Frame(dt) => dt,
                    })
                    .sum();
                let (t, signals, _, _) = run(q, &steps);
                for s in &signals {
                    prop_assert!(s.latency <= Duration::from_millis(total));
                }
                let worst = signals.iter().map(|s| s.latency).max().unwrap_or_default();
                prop_assert_eq!(t.stats().max_latency, worst);
            }

            /// Only the first sample after a release asks for a frame.
            #[test]
            fn one_frame_request_per_quantum(
                offsets in proptest::collection::vec(0u32..10_000, 1..100),
            ) {
                let mut t = ScrollThrottler::new(Quantum::FrameTick);
                let base = Instant::now();
                let requests = offsets
                    .iter()
                    .filter(|o| t.push_at(f64::from(**o), base) == PushOutcome::RequestFrame)
                    .count();
                prop_assert_eq!(requests, 1);
            }
        }
    }
}
