//! Trailing-edge scroll debouncer.
//!
//! Scroll notifications arrive far faster than pagination needs to look at
//! them. The debouncer owns a single "last scheduled evaluation" deadline that
//! every new scroll event pushes back; the host ticks it once per frame and
//! evaluates only when it fires.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use scrollfeed_core::debounce::{DebounceAction, DebounceConfig, ScrollDebouncer};
//! use web_time::Instant;
//!
//! let mut debouncer = ScrollDebouncer::new(DebounceConfig::default());
//! let t0 = Instant::now();
//!
//! debouncer.handle_scroll_at(t0);
//! assert_eq!(debouncer.tick_at(t0 + Duration::from_millis(50)), DebounceAction::None);
//! assert!(matches!(
//!     debouncer.tick_at(t0 + Duration::from_millis(100)),
//!     DebounceAction::Evaluate { .. }
//! ));
//! ```
//!
//! # Invariants
//!
//! - **Latest-wins**: a burst of scroll events yields exactly one evaluation.
//! - **Trailing edge**: the evaluation happens `delay` after the *last* event.
//! - **Bounded latency** (optional): with `max_wait` set, a continuous burst
//!   still evaluates at least every `max_wait`.
//! - **Deterministic**: identical event/tick sequences yield identical actions.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `delay = 0` | Evaluate on the first tick after the event |
//! | Tick without pending event | `DebounceAction::None` |
//! | Clock goes backwards | Elapsed time clamps to zero |

#![forbid(unsafe_code)]

use std::time::Duration;

use web_time::Instant;

#[inline]
fn duration_since_or_zero(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::ZERO)
}

/// Configuration for the scroll debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebounceConfig {
    /// Quiet period after the last scroll event before evaluating.
    pub delay: Duration,

    /// Upper bound on how long a continuous burst may postpone evaluation.
    /// `None` means a burst can postpone indefinitely.
    pub max_wait: Option<Duration>,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            max_wait: None,
        }
    }
}

impl DebounceConfig {
    /// Set the quiet period.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Bound the latency of a continuous burst.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Action returned by [`ScrollDebouncer::tick_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceAction {
    /// Nothing to do this tick.
    None,

    /// Run the deferred evaluation now.
    Evaluate {
        /// Scroll events folded into this evaluation.
        coalesced: u64,
        /// Time from the first event in the burst to now.
        waited: Duration,
        /// Whether `max_wait` forced the evaluation.
        forced_by_deadline: bool,
    },
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// Scroll events received.
    pub events: u64,
    /// Evaluations fired.
    pub evaluations: u64,
    /// Evaluations forced by `max_wait`.
    pub forced: u64,
}

/// Engine-owned debounce timer for scroll evaluation.
#[derive(Debug, Clone)]
pub struct ScrollDebouncer {
    config: DebounceConfig,

    /// Timestamp of the first event in the current burst.
    window_start: Option<Instant>,

    /// Timestamp of the most recent event; the deadline is this plus `delay`.
    last_event: Option<Instant>,

    /// Events in the current burst.
    events_in_window: u64,

    stats: DebounceStats,
}

impl ScrollDebouncer {
    /// Create an idle debouncer.
    #[must_use]
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            window_start: None,
            last_event: None,
            events_in_window: 0,
            stats: DebounceStats::default(),
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    /// Record a scroll event, rescheduling the pending evaluation.
    pub fn handle_scroll(&mut self) {
        self.handle_scroll_at(Instant::now());
    }

    /// Record a scroll event at a specific time (for testing).
    pub fn handle_scroll_at(&mut self, now: Instant) {
        self.stats.events += 1;
        self.events_in_window += 1;
        if self.window_start.is_none() {
            self.window_start = Some(now);
        }
        self.last_event = Some(now);
    }

    /// Tick the debouncer (call each frame).
    pub fn tick(&mut self) -> DebounceAction {
        self.tick_at(Instant::now())
    }

    /// Tick at a specific time (for testing).
    pub fn tick_at(&mut self, now: Instant) -> DebounceAction {
        let (Some(window_start), Some(last_event)) = (self.window_start, self.last_event) else {
            return DebounceAction::None;
        };

        if let Some(max_wait) = self.config.max_wait
            && duration_since_or_zero(now, window_start) >= max_wait
        {
            return self.fire(now, window_start, true);
        }

        if duration_since_or_zero(now, last_event) >= self.config.delay {
            return self.fire(now, window_start, false);
        }

        DebounceAction::None
    }

    /// Time until the pending evaluation fires, or `None` if nothing is pending.
    #[must_use]
    pub fn time_until_apply(&self, now: Instant) -> Option<Duration> {
        let window_start = self.window_start?;
        let last_event = self.last_event?;

        let trailing = self
            .config
            .delay
            .saturating_sub(duration_since_or_zero(now, last_event));
        let remaining = match self.config.max_wait {
            Some(max_wait) => {
                trailing.min(max_wait.saturating_sub(duration_since_or_zero(now, window_start)))
            }
            None => trailing,
        };
        Some(remaining)
    }

    /// Whether an evaluation is scheduled.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// Drop any scheduled evaluation.
    pub fn cancel(&mut self) {
        if self.has_pending() {
            tracing::trace!(coalesced = self.events_in_window, "scroll evaluation cancelled");
        }
        self.window_start = None;
        self.last_event = None;
        self.events_in_window = 0;
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> DebounceStats {
        self.stats
    }

    fn fire(&mut self, now: Instant, window_start: Instant, forced: bool) -> DebounceAction {
        let action = DebounceAction::Evaluate {
            coalesced: self.events_in_window,
            waited: duration_since_or_zero(now, window_start),
            forced_by_deadline: forced,
        };
        self.stats.evaluations += 1;
        if forced {
            self.stats.forced += 1;
        }
        self.window_start = None;
        self.last_event = None;
        self.events_in_window = 0;
        action
    }
}

impl Default for ScrollDebouncer {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}
