#![forbid(unsafe_code)]

//! Visible range calculation.
//!
//! Given the offset table and the viewport, picks the inclusive index range
//! worth materializing. Both edges are found by binary search, so the cost is
//! `O(log n)` regardless of how much content is loaded.
//!
//! # Invariants
//!
//! 1. Every item whose slot intersects `[scroll_top, scroll_top + viewport_height]`
//!    lies in the returned range.
//! 2. `0 <= start <= end < len`.
//! 3. An empty table has no range.
//!
//! # Start edge
//!
//! The two modes scan from different reference lines. Inverse feeds start at
//! the last item beginning strictly above `scroll_top`. Forward feeds start at
//! the last item beginning at or above `scroll_top - viewport_height`, which
//! keeps one extra screen of already-read content mounted.

use std::ops::RangeInclusive;

/// Inclusive index range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleRange {
    /// First index.
    pub start: usize,
    /// Last index (inclusive).
    pub end: usize,
}

impl VisibleRange {
    /// Create a range; `end` is raised to `start` if smaller.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// The window shown before any viewport metrics exist: the first
    /// `min(len, INITIAL_WINDOW)` items.
    #[must_use]
    pub fn initial(len: usize) -> Option<Self> {
        let last = len.checked_sub(1)?;
        Some(Self::new(0, last.min(INITIAL_WINDOW - 1)))
    }

    /// Number of indices covered.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; a range covers at least one index.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `index` is covered.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// Iterate the covered indices.
    #[must_use]
    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Items rendered before the first measurement.
pub const INITIAL_WINDOW: usize = 21;

/// Compute the rendered range, widened by `buffer` items on each side.
///
/// Returns `None` when `offsets` is empty.
#[must_use]
pub fn compute_visible_range(
    offsets: &[f64],
    scroll_top: f64,
    viewport_height: f64,
    buffer: usize,
    inverse: bool,
) -> Option<VisibleRange> {
    let last = offsets.len().checked_sub(1)?;

    // Offsets are non-decreasing, so each predicate holds on a prefix.
    let start = if inverse {
        offsets.partition_point(|&o| o < scroll_top)
    } else {
        offsets.partition_point(|&o| o <= scroll_top - viewport_height)
    }
    .saturating_sub(1);

    let bottom = scroll_top + viewport_height;
    let end = offsets.partition_point(|&o| o <= bottom).min(last);

    Some(VisibleRange::new(
        start.saturating_sub(buffer),
        end.saturating_add(buffer).min(last),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uniform(n: usize, h: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * h).collect()
    }

    #[test]
    fn empty_has_no_range() {
        assert_eq!(compute_visible_range(&[], 0.0, 500.0, 3, true), None);
        assert_eq!(VisibleRange::initial(0), None);
    }

    #[test]
    fn single_item_is_always_visible() {
        for inverse in [false, true] {
            let r = compute_visible_range(&[0.0], 0.0, 800.0, 0, inverse).unwrap();
            assert_eq!(r, VisibleRange::new(0, 0));
            let r = compute_visible_range(&[0.0], 9999.0, 800.0, 5, inverse).unwrap();
            assert_eq!(r, VisibleRange::new(0, 0));
        }
    }

    #[test]
    fn inverse_starts_at_item_straddling_the_top() {
        // 100 items of 50px; viewport [1025, 1525].
        let offsets = uniform(100, 50.0);
        let r = compute_visible_range(&offsets, 1025.0, 500.0, 0, true).unwrap();
        assert_eq!(r.start, 20);
        // First offset past 1525 is 1550 at index 31.
        assert_eq!(r.end, 31);
    }

    #[test]
    fn forward_keeps_a_screen_above() {
        let offsets = uniform(100, 50.0);
        let r = compute_visible_range(&offsets, 1000.0, 500.0, 0, false).unwrap();
        // Last offset <= 500 is index 10.
        assert_eq!(r.start, 10);
        assert_eq!(r.end, 31);
    }

    #[test]
    fn buffer_widens_and_clamps() {
        let offsets = uniform(10, 50.0);
        let r = compute_visible_range(&offsets, 0.0, 100.0, 4, true).unwrap();
        assert_eq!(r.start, 0);
        assert_eq!(r.end, 7);
        let r = compute_visible_range(&offsets, 400.0, 100.0, 4, true).unwrap();
        assert_eq!(r.end, 9);
    }

    #[test]
    fn initial_window_is_capped() {
        assert_eq!(VisibleRange::initial(5), Some(VisibleRange::new(0, 4)));
        assert_eq!(VisibleRange::initial(500), Some(VisibleRange::new(0, 20)));
        assert_eq!(VisibleRange::initial(500).map(|r| r.len()), Some(INITIAL_WINDOW));
    }

    #[test]
    fn range_helpers() {
        let r = VisibleRange::new(3, 1);
        assert_eq!(r, VisibleRange::new(3, 3));
        assert_eq!(r.len(), 1);
        assert!(r.contains(3));
        assert!(!r.contains(4));
        assert_eq!(VisibleRange::new(2, 5).indices().count(), 4);
    }

    proptest! {
        #[test]
        fn property_intersecting_items_are_covered(
            heights in proptest::collection::vec(1.0f64..200.0, 1..80),
            top_frac in 0.0f64..1.0,
            viewport in 0.0f64..2000.0,
            buffer in 0usize..4,
            inverse in any::<bool>(),
        ) {
            let mut offsets = Vec::with_capacity(heights.len());
            let mut acc = 0.0;
            for h in &heights {
                offsets.push(acc);
                acc += h;
            }
            let total = acc;
            let scroll_top = top_frac * total;
            let bottom = scroll_top + viewport;

            let r = compute_visible_range(&offsets, scroll_top, viewport, buffer, inverse).unwrap();
            prop_assert!(r.start <= r.end);
            prop_assert!(r.end < offsets.len());

            for i in 0..offsets.len() {
                let start = offsets[i];
                let end = offsets.get(i + 1).copied().unwrap_or(total);
                if start < bottom && end > scroll_top {
                    prop_assert!(r.contains(i), "item {} [{}, {}) missing from {:?}", i, start, end, r);
                }
            }
        }
    }
}
