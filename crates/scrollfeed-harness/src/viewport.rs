#![forbid(unsafe_code)]

//! In-memory scroll container.

use scrollfeed::{ScrollMetrics, Viewport};

/// A scroll container that clamps like a browser element.
#[derive(Debug, Clone, PartialEq)]
pub struct SimViewport {
    scroll_top: f64,
    content_height: f64,
    client_height: f64,
    mounted: bool,
}

impl SimViewport {
    /// An empty, mounted container of the given visible height.
    #[must_use]
    pub fn new(client_height: f64) -> Self {
        Self {
            scroll_top: 0.0,
            content_height: 0.0,
            client_height: client_height.max(0.0),
            mounted: true,
        }
    }

    /// Resize the inner content; the scroll position is clamped to the new extent.
    pub fn set_content_height(&mut self, height: f64) {
        self.content_height = height.max(0.0);
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
    }

    /// Scroll relative to the current position.
    pub fn scroll_by(&mut self, dy: f64) {
        self.scroll_to(self.scroll_top + dy);
    }

    /// Current scroll position.
    #[must_use]
    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    /// Current inner content height.
    #[must_use]
    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    /// Visible height.
    #[must_use]
    pub fn client_height(&self) -> f64 {
        self.client_height
    }

    /// Largest reachable scroll position.
    #[must_use]
    pub fn max_scroll_top(&self) -> f64 {
        (self.content_height - self.client_height).max(0.0)
    }

    /// Whether the container is attached.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Attach or detach the container.
    pub fn set_mounted(&mut self, mounted: bool) {
        self.mounted = mounted;
    }
}

impl Viewport for SimViewport {
    fn metrics(&self) -> Option<ScrollMetrics> {
        self.mounted.then(|| {
            ScrollMetrics::new(self.scroll_top, self.content_height, self.client_height)
        })
    }

    fn scroll_to(&mut self, offset: f64) {
        if offset.is_finite() {
            self.scroll_top = offset.clamp(0.0, self.max_scroll_top());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrolling_is_clamped() {
        let mut vp = SimViewport::new(500.0);
        vp.set_content_height(2000.0);
        vp.scroll_to(9000.0);
        assert_eq!(vp.scroll_top(), 1500.0);
        vp.scroll_by(-2000.0);
        assert_eq!(vp.scroll_top(), 0.0);
        vp.scroll_to(f64::NAN);
        assert_eq!(vp.scroll_top(), 0.0);
    }

    #[test]
    fn shrinking_content_pulls_scroll_back() {
        let mut vp = SimViewport::new(500.0);
        vp.set_content_height(2000.0);
        vp.scroll_to(1500.0);
        vp.set_content_height(800.0);
        assert_eq!(vp.scroll_top(), 300.0);
    }

    #[test]
    fn unmounted_reports_no_metrics() {
        let mut vp = SimViewport::new(100.0);
        assert!(vp.metrics().is_some());
        vp.set_mounted(false);
        assert_eq!(vp.metrics(), None);
    }
}
