#![forbid(unsafe_code)]

//! Feed configuration.

use scrollfeed_core::DebounceConfig;

use crate::sequence::Requirements;

/// Default loader placeholder height in pixels.
pub const DEFAULT_LOADER_HEIGHT: f64 = 100.0;

/// Default forward-mode bottom trigger window, as a fraction of content height.
pub const DEFAULT_THRESHOLD_RATIO: f64 = 0.3;

/// Default at-bottom tolerance in pixels.
pub const DEFAULT_LIVE_EDGE_TOLERANCE: f64 = 10.0;

/// Configuration for a [`Feed`](crate::Feed).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeedConfig {
    /// Chat-style feed: newest content at the bottom, history fetched at the top.
    pub inverse: bool,
    /// Extra items rendered on each side of the visible range.
    pub buffer: usize,
    /// Known total size; no fetch is issued once the sequence reaches it.
    pub total_count: Option<usize>,
    /// Count items arriving while the reader is away from the live edge.
    pub show_new_items_count: bool,
    /// Fetch into holes between declared neighbors.
    pub gap_detection: bool,
    /// Loader placeholder height in pixels.
    pub loader_height: f64,
    /// Forward-mode bottom trigger window, as a fraction of content height.
    pub threshold_ratio: f64,
    /// At-bottom tolerance in pixels.
    pub live_edge_tolerance: f64,
    /// Scroll evaluation debouncing.
    pub debounce: DebounceConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            inverse: false,
            buffer: 0,
            total_count: None,
            show_new_items_count: false,
            gap_detection: false,
            loader_height: DEFAULT_LOADER_HEIGHT,
            threshold_ratio: DEFAULT_THRESHOLD_RATIO,
            live_edge_tolerance: DEFAULT_LIVE_EDGE_TOLERANCE,
            debounce: DebounceConfig::default(),
        }
    }
}

fn non_negative(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

impl FeedConfig {
    /// Preset for a chat-style feed.
    #[must_use]
    pub fn inverse() -> Self {
        Self {
            inverse: true,
            ..Self::default()
        }
    }

    /// Set inverse mode.
    #[must_use]
    pub fn with_inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    /// Set the render buffer.
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Set the known total.
    #[must_use]
    pub fn with_total_count(mut self, total_count: Option<usize>) -> Self {
        self.total_count = total_count;
        self
    }

    /// Enable arrival counting.
    #[must_use]
    pub fn with_new_items_count(mut self, enabled: bool) -> Self {
        self.show_new_items_count = enabled;
        self
    }

    /// Enable gap detection.
    #[must_use]
    pub fn with_gap_detection(mut self, enabled: bool) -> Self {
        self.gap_detection = enabled;
        self
    }

    /// Set the loader height. Negative or non-finite values fall back to the default.
    #[must_use]
    pub fn with_loader_height(mut self, height: f64) -> Self {
        self.loader_height = non_negative(height, DEFAULT_LOADER_HEIGHT);
        self
    }

    /// Set the forward-mode trigger ratio, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_threshold_ratio(mut self, ratio: f64) -> Self {
        self.threshold_ratio = non_negative(ratio, DEFAULT_THRESHOLD_RATIO).min(1.0);
        self
    }

    /// Set the at-bottom tolerance.
    #[must_use]
    pub fn with_live_edge_tolerance(mut self, tolerance: f64) -> Self {
        self.live_edge_tolerance = non_negative(tolerance, DEFAULT_LIVE_EDGE_TOLERANCE);
        self
    }

    /// Set scroll debouncing.
    #[must_use]
    pub fn with_debounce(mut self, debounce: DebounceConfig) -> Self {
        self.debounce = debounce;
        self
    }

    /// Item fields the enabled features depend on.
    #[must_use]
    pub fn requirements(&self) -> Requirements {
        Requirements {
            links: self.gap_detection,
            timestamps: self.show_new_items_count,
        }
    }
}
