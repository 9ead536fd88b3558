#![forbid(unsafe_code)]

//! New-item arrival tracking.
//!
//! When the reader leaves the live edge, the moment is recorded. Every item
//! merged afterwards whose timestamp is newer than that moment counts as
//! unseen, and the first such item is latched as the jump target for
//! "scroll to latest". Returning to the live edge clears everything.

use scrollfeed_core::Timestamp;

/// Unseen-item counter with a latched jump target.
#[derive(Debug, Clone)]
pub struct ArrivalTracker<K> {
    enabled: bool,
    left_edge_at: Option<Timestamp>,
    count: usize,
    target: Option<K>,
}

impl<K: Clone> ArrivalTracker<K> {
    /// Create a tracker; a disabled tracker never counts.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            left_edge_at: None,
            count: 0,
            target: None,
        }
    }

    /// Whether counting is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// When the reader left the live edge, if they are away from it.
    #[must_use]
    pub fn threshold(&self) -> Option<Timestamp> {
        self.left_edge_at
    }

    /// Items counted since leaving the live edge.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The first unseen item, if latched.
    #[must_use]
    pub fn target(&self) -> Option<&K> {
        self.target.as_ref()
    }

    /// Record the reader's position relative to the live edge.
    ///
    /// The threshold is set once per excursion; staying away does not move it.
    pub fn observe_edge(&mut self, at_edge: bool, now: Timestamp) {
        if at_edge {
            self.reset();
        } else if self.enabled && self.left_edge_at.is_none() {
            tracing::trace!(threshold = %now, "left live edge");
            self.left_edge_at = Some(now);
        }
    }

    /// Count merged items newer than the threshold. Returns how many counted.
    pub fn observe_merge<'a, I>(&mut self, items: I) -> usize
    where
        K: 'a,
        I: IntoIterator<Item = (&'a K, Option<Timestamp>)>,
    {
        let Some(threshold) = self.left_edge_at.filter(|_| self.enabled) else {
            return 0;
        };
        let mut counted = 0;
        for (key, timestamp) in items {
            if timestamp.is_some_and(|ts| ts > threshold) {
                counted += 1;
                if self.target.is_none() {
                    self.target = Some(key.clone());
                }
            }
        }
        self.count += counted;
        counted
    }

    /// Consume the latched target.
    pub fn take_target(&mut self) -> Option<K> {
        self.target.take()
    }

    /// Forget the threshold, the count, and the target.
    pub fn reset(&mut self) {
        self.left_edge_at = None;
        self.count = 0;
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(tracker: &mut ArrivalTracker<&'static str>, items: &[(&'static str, u64)]) -> usize {
        tracker.observe_merge(items.iter().map(|(k, ts)| (k, Some(Timestamp(*ts)))))
    }

    #[test]
    fn counts_only_items_newer_than_departure() {
        let mut t = ArrivalTracker::new(true);
        t.observe_edge(false, Timestamp(1_000));
        assert_eq!(merge(&mut t, &[("old", 900), ("same", 1_000), ("a", 1_001), ("b", 2_000)]), 2);
        assert_eq!(t.count(), 2);
        assert_eq!(t.target(), Some(&"a"));
    }

    #[test]
    fn threshold_is_sticky_while_away() {
        let mut t = ArrivalTracker::<&str>::new(true);
        t.observe_edge(false, Timestamp(10));
        t.observe_edge(false, Timestamp(50));
        assert_eq!(t.threshold(), Some(Timestamp(10)));
    }

    #[test]
    fn target_latches_the_first_arrival() {
        let mut t = ArrivalTracker::new(true);
        t.observe_edge(false, Timestamp(0));
        merge(&mut t, &[("first", 5)]);
        merge(&mut t, &[("second", 6), ("third", 7)]);
        assert_eq!(t.count(), 3);
        assert_eq!(t.take_target(), Some("first"));
        assert_eq!(t.take_target(), None);
    }

    #[test]
    fn returning_to_edge_resets() {
        let mut t = ArrivalTracker::new(true);
        t.observe_edge(false, Timestamp(0));
        merge(&mut t, &[("x", 5)]);
        t.observe_edge(true, Timestamp(9));
        assert_eq!(t.count(), 0);
        assert_eq!(t.threshold(), None);
        assert_eq!(t.target(), None);
        // Back at the edge nothing is counted.
        assert_eq!(merge(&mut t, &[("y", 10)]), 0);
    }

    #[test]
    fn disabled_tracker_never_counts() {
        let mut t = ArrivalTracker::new(false);
        t.observe_edge(false, Timestamp(0));
        assert_eq!(t.threshold(), None);
        assert_eq!(merge(&mut t, &[("x", 5)]), 0);
    }

    #[test]
    fn untimed_items_are_ignored() {
        let mut t = ArrivalTracker::new(true);
        t.observe_edge(false, Timestamp(0));
        let counted = t.observe_merge([(&"k", None)]);
        assert_eq!(counted, 0);
    }
}
