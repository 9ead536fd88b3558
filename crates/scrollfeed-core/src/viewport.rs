#![forbid(unsafe_code)]

//! The minimal boundary between the engine and the host's scroll container.
//!
//! The host owns the real scroll primitive (a DOM element, a terminal pane, a
//! GPU surface). The engine only ever reads three numbers from it and writes
//! one back:
//!
//! - [`ScrollMetrics`]: `scroll_top`, `scroll_height`, `client_height`
//! - [`Viewport::scroll_to`]: request a new `scroll_top`
//!
//! A viewport that is not yet mounted or measurable reports `None` from
//! [`Viewport::metrics`]; every engine operation treats that as a no-op and
//! retries on the next layout pass.

/// Snapshot of a scroll container's geometry, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top of the content.
    pub scroll_top: f64,
    /// Total height of the scrollable content.
    pub scroll_height: f64,
    /// Height of the visible area.
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Create a new metrics snapshot.
    #[must_use]
    pub const fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Largest legal `scroll_top`.
    #[must_use]
    pub fn max_scroll_top(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    /// Pixels between the bottom of the visible area and the end of content.
    #[must_use]
    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.scroll_top - self.client_height).max(0.0)
    }

    /// Whether the viewport sits at the bottom edge, within `tolerance` pixels.
    #[must_use]
    pub fn is_at_bottom(&self, tolerance: f64) -> bool {
        self.scroll_height - self.scroll_top <= self.client_height + tolerance
    }

    /// Whether the viewport sits at (or above) the top edge.
    #[must_use]
    pub fn is_at_top(&self) -> bool {
        self.scroll_top <= 0.0
    }

    /// Whether the bottom of the visible area is within `ratio × scroll_height`
    /// of the end of content.
    ///
    /// The window scales with how much content is loaded, not with the
    /// viewport height.
    #[must_use]
    pub fn is_near_bottom(&self, ratio: f64) -> bool {
        let threshold = self.scroll_height * ratio;
        self.scroll_top + self.client_height >= self.scroll_height - threshold
    }
}

/// A host scroll container.
pub trait Viewport {
    /// Current geometry, or `None` if the container is not mounted yet.
    fn metrics(&self) -> Option<ScrollMetrics>;

    /// Move the container to `offset`. Hosts clamp to their own legal range.
    fn scroll_to(&mut self, offset: f64);
}

impl<V: Viewport + ?Sized> Viewport for &mut V {
    fn metrics(&self) -> Option<ScrollMetrics> {
        (**self).metrics()
    }

    fn scroll_to(&mut self, offset: f64) {
        (**self).scroll_to(offset);
    }
}

impl<V: Viewport + ?Sized> Viewport for Box<V> {
    fn metrics(&self) -> Option<ScrollMetrics> {
        (**self).metrics()
    }

    fn scroll_to(&mut self, offset: f64) {
        (**self).scroll_to(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_scroll_top_never_negative() {
        let short = ScrollMetrics::new(0.0, 300.0, 1000.0);
        assert_eq!(short.max_scroll_top(), 0.0);

        let tall = ScrollMetrics::new(0.0, 1050.0, 1000.0);
        assert_eq!(tall.max_scroll_top(), 50.0);
    }

    #[test]
    fn at_bottom_uses_tolerance() {
        let m = ScrollMetrics::new(40.0, 1050.0, 1000.0);
        assert!(!m.is_at_bottom(0.0));
        assert!(m.is_at_bottom(10.0));
        assert!(ScrollMetrics::new(50.0, 1050.0, 1000.0).is_at_bottom(0.0));
    }

    #[test]
    fn at_top_includes_overscroll() {
        assert!(ScrollMetrics::new(0.0, 500.0, 100.0).is_at_top());
        assert!(ScrollMetrics::new(-4.0, 500.0, 100.0).is_at_top());
        assert!(!ScrollMetrics::new(1.0, 500.0, 100.0).is_at_top());
    }

    #[test]
    fn near_bottom_scales_with_content() {
        // 30% of 1000 = 300; bottom of view at 700 qualifies.
        let m = ScrollMetrics::new(600.0, 1000.0, 100.0);
        assert!(m.is_near_bottom(0.3));
        let m = ScrollMetrics::new(599.0, 1000.0, 100.0);
        assert!(!m.is_near_bottom(0.3));
    }

    #[test]
    fn distance_from_bottom() {
        let m = ScrollMetrics::new(100.0, 1000.0, 200.0);
        assert_eq!(m.distance_from_bottom(), 700.0);
    }

    struct Fixed(Option<ScrollMetrics>, Vec<f64>);

    impl Viewport for Fixed {
        fn metrics(&self) -> Option<ScrollMetrics> {
            self.0
        }
        fn scroll_to(&mut self, offset: f64) {
            self.1.push(offset);
        }
    }

    #[test]
    fn mut_ref_forwards() {
        let mut v = Fixed(Some(ScrollMetrics::new(1.0, 2.0, 3.0)), Vec::new());
        {
            let mut r = &mut v;
            assert_eq!(Viewport::metrics(&r).map(|m| m.scroll_top), Some(1.0));
            Viewport::scroll_to(&mut r, 7.0);
        }
        assert_eq!(v.1, vec![7.0]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn max_scroll_top_is_at_bottom_and_in_range(height in 0u32..200_000, client in 0u32..5_000) {
            let (height, client) = (f64::from(height), f64::from(client));
            let max = ScrollMetrics::new(0.0, height, client).max_scroll_top();
            prop_assert!(max >= 0.0);
            prop_assert!(max <= height);

            let m = ScrollMetrics::new(max, height, client);
            prop_assert!(m.is_at_bottom(0.0));
            prop_assert!(m.is_near_bottom(0.0));
            prop_assert_eq!(m.distance_from_bottom(), 0.0);
        }
    }
}
