#![forbid(unsafe_code)]

//! Pagination state machine.
//!
//! ```text
//!            trigger(top)               trigger(bottom)
//!   ┌──────┐ ─────────────► ┌─────────────┐   ┌────────────────┐
//!   │ Idle │                │ FetchingTop │   │ FetchingBottom │
//!   └──────┘ ◄───────────── └─────────────┘   └────────────────┘
//!      ▲      settle (ok / error / discard)           │
//!      └──────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. At most one fetch is in flight.
//! 2. At most one of `markers.before` / `markers.after` is set, and only while
//!    the matching fetch is in flight.
//! 3. Once a direction reports `has_more = false` it is never fetched again.
//! 4. No fetch is issued while `len >= total_count`.
//!
//! # Trigger priority
//!
//! Candidates are considered in a fixed order: the edge trigger, then a hole
//! before the focus range, then a hole after it. The first candidate that
//! passes the guards fires; the rest are dropped until the next evaluation.

use std::fmt;
use std::sync::{Arc, Weak};

use scrollfeed_core::ScrollMetrics;

use crate::gap::GapReport;
use crate::item::FetchDirection;

/// Fetch activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaginationState {
    /// No fetch in flight.
    #[default]
    Idle,
    /// Fetching content above the first anchored item.
    FetchingTop,
    /// Fetching content below the last anchored item.
    FetchingBottom,
}

impl PaginationState {
    /// Get the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingTop => "fetching_top",
            Self::FetchingBottom => "fetching_bottom",
        }
    }

    /// Direction of the in-flight fetch.
    #[must_use]
    pub const fn direction(self) -> Option<FetchDirection> {
        match self {
            Self::Idle => None,
            Self::FetchingTop => Some(FetchDirection::Top),
            Self::FetchingBottom => Some(FetchDirection::Bottom),
        }
    }

    const fn fetching(direction: FetchDirection) -> Self {
        match direction {
            FetchDirection::Top => Self::FetchingTop,
            FetchDirection::Bottom => Self::FetchingBottom,
        }
    }
}

impl fmt::Display for PaginationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys at which a loader placeholder is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMarkers<K> {
    /// Anchor of the in-flight top fetch.
    pub before: Option<K>,
    /// Anchor of the in-flight bottom fetch.
    pub after: Option<K>,
}

impl<K> Default for FetchMarkers<K> {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
        }
    }
}

/// Why a fetch was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerReason {
    /// The viewport reached a content edge.
    Edge,
    /// A hole was found next to the focus range.
    Gap,
}

impl TriggerReason {
    /// Get the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Edge => "edge",
            Self::Gap => "gap",
        }
    }
}

/// A fetch the engine would like to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger<K> {
    /// Where to fetch.
    pub direction: FetchDirection,
    /// Item the fetch extends from.
    pub anchor: K,
    /// What caused it.
    pub reason: TriggerReason,
}

/// Build the ordered candidate list for one evaluation.
///
/// Inverse feeds trigger at the very top, forward feeds within
/// `threshold_ratio × scroll_height` of the bottom.
pub fn trigger_candidates<K: Clone>(
    metrics: ScrollMetrics,
    inverse: bool,
    threshold_ratio: f64,
    first: Option<&K>,
    last: Option<&K>,
    gaps: GapReport<K>,
) -> Vec<Trigger<K>> {
    let mut out = Vec::with_capacity(3);
    if inverse {
        if metrics.is_at_top()
            && let Some(first) = first
        {
            out.push(Trigger {
                direction: FetchDirection::Top,
                anchor: first.clone(),
                reason: TriggerReason::Edge,
            });
        }
    } else if metrics.is_near_bottom(threshold_ratio)
        && let Some(last) = last
    {
        out.push(Trigger {
            direction: FetchDirection::Bottom,
            anchor: last.clone(),
            reason: TriggerReason::Edge,
        });
    }
    if let Some(anchor) = gaps.before {
        out.push(Trigger {
            direction: FetchDirection::Top,
            anchor,
            reason: TriggerReason::Gap,
        });
    }
    if let Some(anchor) = gaps.after {
        out.push(Trigger {
            direction: FetchDirection::Bottom,
            anchor,
            reason: TriggerReason::Gap,
        });
    }
    out
}

/// Handle identifying one issued fetch.
///
/// Holds a weak reference to the issuing engine's liveness token, so a
/// ticket outlives neither an unmount nor the engine itself.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    id: u64,
    direction: FetchDirection,
    liveness: Weak<()>,
}

impl FetchTicket {
    /// Sequence number of the fetch.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Direction of the fetch.
    #[must_use]
    pub fn direction(&self) -> FetchDirection {
        self.direction
    }

    /// Whether the issuing engine is still mounted.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.liveness.strong_count() > 0
    }
}

impl PartialEq for FetchTicket {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.direction == other.direction && Weak::ptr_eq(&self.liveness, &other.liveness)
    }
}

impl Eq for FetchTicket {}

/// A fetch the host must perform, then report through `Feed::complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest<K> {
    /// Where to fetch.
    pub direction: FetchDirection,
    /// Item to extend from.
    pub anchor: K,
    /// What caused it.
    pub reason: TriggerReason,
    /// Handle to settle the fetch with.
    pub ticket: FetchTicket,
}

/// How a fetch settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was merged (possibly with zero items).
    Merged {
        /// Direction of the fetch.
        direction: FetchDirection,
        /// Items merged.
        count: usize,
    },
    /// The capability had nothing to merge.
    Empty {
        /// Direction of the fetch.
        direction: FetchDirection,
    },
    /// The capability failed; the direction may be retried.
    Failed {
        /// Direction of the fetch.
        direction: FetchDirection,
    },
    /// The page failed validation and was skipped.
    Rejected {
        /// Direction of the fetch.
        direction: FetchDirection,
    },
    /// An item of the page could not be measured; the page was skipped.
    Unmeasurable {
        /// Direction of the fetch.
        direction: FetchDirection,
        /// Position of the offending item in the measured sequence.
        index: usize,
    },
    /// The ticket was stale; nothing changed.
    Discarded,
}

impl FetchOutcome {
    /// Get the stable string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Merged { .. } => "merged",
            Self::Empty { .. } => "empty",
            Self::Failed { .. } => "failed",
            Self::Rejected { .. } => "rejected",
            Self::Unmeasurable { .. } => "unmeasurable",
            Self::Discarded => "discarded",
        }
    }

    /// Items merged, zero for every other outcome.
    #[must_use]
    pub const fn merged(&self) -> usize {
        match self {
            Self::Merged { count, .. } => *count,
            _ => 0,
        }
    }
}

/// Pagination bookkeeping for one feed.
#[derive(Debug, Clone)]
pub struct Pagination<K> {
    state: PaginationState,
    markers: FetchMarkers<K>,
    more_top: bool,
    more_bottom: bool,
    in_flight: Option<u64>,
    next_id: u64,
}

impl<K> Default for Pagination<K> {
    fn default() -> Self {
        Self {
            state: PaginationState::Idle,
            markers: FetchMarkers::default(),
            more_top: true,
            more_bottom: true,
            in_flight: None,
            next_id: 1,
        }
    }
}

impl<K: Clone + fmt::Debug> Pagination<K> {
    /// Idle, with both directions open.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Loader placement.
    #[must_use]
    pub fn markers(&self) -> &FetchMarkers<K> {
        &self.markers
    }

    /// Whether `direction` may still have content.
    #[must_use]
    pub fn has_more(&self, direction: FetchDirection) -> bool {
        match direction {
            FetchDirection::Top => self.more_top,
            FetchDirection::Bottom => self.more_bottom,
        }
    }

    /// Record the server's `has_more` answer for `direction`.
    pub fn set_has_more(&mut self, direction: FetchDirection, more: bool) {
        match direction {
            FetchDirection::Top => self.more_top = more,
            FetchDirection::Bottom => self.more_bottom = more,
        }
        if !more {
            tracing::debug!(direction = direction.as_str(), "direction exhausted");
        }
    }

    fn marker(&self, direction: FetchDirection) -> Option<&K> {
        match direction {
            FetchDirection::Top => self.markers.before.as_ref(),
            FetchDirection::Bottom => self.markers.after.as_ref(),
        }
    }

    /// Guards every trigger must pass.
    #[must_use]
    pub fn can_fetch(&self, direction: FetchDirection, len: usize, total_count: Option<usize>) -> bool {
        self.state == PaginationState::Idle
            && self.marker(direction).is_none()
            && self.has_more(direction)
            && total_count.is_none_or(|total| len < total)
    }

    /// The first candidate that passes the guards.
    pub fn select(
        &self,
        candidates: Vec<Trigger<K>>,
        len: usize,
        total_count: Option<usize>,
    ) -> Option<Trigger<K>> {
        candidates.into_iter().find(|t| {
            let ok = self.can_fetch(t.direction, len, total_count);
            if !ok {
                tracing::trace!(
                    direction = t.direction.as_str(),
                    reason = t.reason.as_str(),
                    "trigger suppressed"
                );
            }
            ok
        })
    }

    /// Enter the fetching state for `trigger` and hand out its ticket.
    pub fn begin(&mut self, trigger: Trigger<K>, liveness: &Arc<()>) -> FetchRequest<K> {
        let id = self.next_id;
        self.next_id += 1;
        self.state = PaginationState::fetching(trigger.direction);
        self.in_flight = Some(id);
        match trigger.direction {
            FetchDirection::Top => self.markers.before = Some(trigger.anchor.clone()),
            FetchDirection::Bottom => self.markers.after = Some(trigger.anchor.clone()),
        }
        FetchRequest {
            direction: trigger.direction,
            anchor: trigger.anchor,
            reason: trigger.reason,
            ticket: FetchTicket {
                id,
                direction: trigger.direction,
                liveness: Arc::downgrade(liveness),
            },
        }
    }

    /// Return to idle if `ticket` is the fetch in flight.
    ///
    /// Returns `None` for a ticket that is not in flight.
    pub fn settle(&mut self, ticket: &FetchTicket) -> Option<FetchDirection> {
        if self.in_flight != Some(ticket.id) {
            return None;
        }
        self.clear();
        Some(ticket.direction)
    }

    /// Drop the in-flight fetch without settling it.
    pub fn abandon(&mut self) -> Option<FetchDirection> {
        let direction = self.state.direction();
        self.clear();
        direction
    }

    fn clear(&mut self) {
        self.state = PaginationState::Idle;
        self.in_flight = None;
        self.markers = FetchMarkers::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(direction: FetchDirection, anchor: u32) -> Trigger<u32> {
        Trigger {
            direction,
            anchor,
            reason: TriggerReason::Edge,
        }
    }

    #[test]
    fn begin_sets_state_and_marker() {
        let token = Arc::new(());
        let mut p = Pagination::new();
        let req = p.begin(trigger(FetchDirection::Top, 7), &token);
        assert_eq!(p.state(), PaginationState::FetchingTop);
        assert_eq!(p.markers().before, Some(7));
        assert_eq!(p.markers().after, None);
        assert_eq!(req.anchor, 7);
        assert!(req.ticket.is_live());
    }

    #[test]
    fn single_flight() {
        let token = Arc::new(());
        let mut p = Pagination::new();
        p.begin(trigger(FetchDirection::Bottom, 1), &token);
        assert!(!p.can_fetch(FetchDirection::Top, 10, None));
        assert!(!p.can_fetch(FetchDirection::Bottom, 10, None));
        let picked = p.select(vec![trigger(FetchDirection::Top, 0)], 10, None);
        assert_eq!(picked, None);
    }

    #[test]
    fn settle_requires_the_in_flight_ticket() {
        let token = Arc::new(());
        let mut p = Pagination::new();
        let first = p.begin(trigger(FetchDirection::Top, 1), &token);
        assert_eq!(p.settle(&first.ticket), Some(FetchDirection::Top));
        assert_eq!(p.state(), PaginationState::Idle);
        assert_eq!(p.markers(), &FetchMarkers::default());
        // Settling twice is a no-op.
        assert_eq!(p.settle(&first.ticket), None);

        let second = p.begin(trigger(FetchDirection::Top, 1), &token);
        assert_ne!(first.ticket, second.ticket);
        assert_eq!(p.settle(&first.ticket), None);
        assert_eq!(p.state(), PaginationState::FetchingTop);
    }

    #[test]
    fn exhausted_direction_is_never_selected() {
        let mut p = Pagination::<u32>::new();
        p.set_has_more(FetchDirection::Bottom, false);
        assert!(!p.can_fetch(FetchDirection::Bottom, 1, None));
        assert!(p.can_fetch(FetchDirection::Top, 1, None));
    }

    #[test]
    fn total_count_is_a_ceiling() {
        let p = Pagination::<u32>::new();
        assert!(p.can_fetch(FetchDirection::Top, 199, Some(200)));
        assert!(!p.can_fetch(FetchDirection::Top, 200, Some(200)));
        assert!(!p.can_fetch(FetchDirection::Top, 250, Some(200)));
    }

    #[test]
    fn select_takes_first_passing_candidate() {
        let mut p = Pagination::new();
        p.set_has_more(FetchDirection::Top, false);
        let picked = p.select(
            vec![trigger(FetchDirection::Top, 1), trigger(FetchDirection::Bottom, 9)],
            10,
            None,
        );
        assert_eq!(picked.map(|t| t.anchor), Some(9));
    }

    #[test]
    fn tickets_die_with_their_token() {
        let token = Arc::new(());
        let mut p = Pagination::new();
        let req = p.begin(trigger(FetchDirection::Top, 1), &token);
        drop(token);
        assert!(!req.ticket.is_live());
        assert_eq!(p.abandon(), Some(FetchDirection::Top));
        assert_eq!(p.state(), PaginationState::Idle);
    }

    #[test]
    fn candidates_are_ordered_edge_then_gaps() {
        let metrics = ScrollMetrics::new(0.0, 2000.0, 500.0);
        let gaps = GapReport {
            before: Some(5),
            after: Some(8),
        };
        let c = trigger_candidates(metrics, true, 0.3, Some(&0), Some(&20), gaps);
        let got: Vec<_> = c.iter().map(|t| (t.direction, t.anchor, t.reason)).collect();
        assert_eq!(
            got,
            vec![
                (FetchDirection::Top, 0, TriggerReason::Edge),
                (FetchDirection::Top, 5, TriggerReason::Gap),
                (FetchDirection::Bottom, 8, TriggerReason::Gap),
            ]
        );
    }

    #[test]
    fn forward_edge_uses_content_ratio() {
        // 10000px of content: the window is the last 3000px.
        let far = ScrollMetrics::new(6000.0, 10_000.0, 500.0);
        let near = ScrollMetrics::new(6600.0, 10_000.0, 500.0);
        assert!(trigger_candidates(far, false, 0.3, Some(&0), Some(&9), GapReport::default()).is_empty());
        let c = trigger_candidates(near, false, 0.3, Some(&0), Some(&9), GapReport::default());
        assert_eq!(c[0].direction, FetchDirection::Bottom);
        assert_eq!(c[0].anchor, 9);
    }
}
