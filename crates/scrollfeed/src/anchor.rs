#![forbid(unsafe_code)]

//! Scroll anchoring.
//!
//! Keeps the reader's position stable while content changes under them. Runs
//! after layout has been applied by the host (so `scroll_height` reflects the
//! current offsets) and before the frame is shown.
//!
//! # Rules, in priority order
//!
//! 1. **Initial placement** (once): jump to the start item, or to the bottom
//!    in inverse mode. Forward feeds without a start item latch in place.
//! 2. **Prepend compensation**: content inserted above the reader by the host
//!    is compensated on the next pass. While a top fetch is in flight the
//!    pass only reports growth as deferred. When the fetch settles with a page
//!    taller than one loader, the next pass shifts `scroll_top` by
//!    `page_height - loader_height`; shorter pages disarm without a shift.
//! 3. **Live-edge pin** (inverse only): if the reader was at the bottom when
//!    the layout changed, stay at the bottom.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Viewport unmounted (`metrics()` is `None`) | No-op; state unchanged |
//! | Items present but content not measured yet | Initial placement waits |
//! | Top fetch produced nothing | Pending compensation is cancelled by the caller |
//! | Top page no taller than the loader | Disarmed without a shift; the pin works again |

use scrollfeed_core::{ScrollMetrics, Viewport};

use crate::item::FetchDirection;

/// What a layout pass did to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorAction {
    /// First placement latched; `scroll_top` is where the viewport was put
    /// (or left, for forward feeds without a start item).
    InitialPlacement {
        /// Target scroll position.
        scroll_top: f64,
    },
    /// Prepended content was compensated.
    Compensated {
        /// Pixels added to `scroll_top`.
        delta: f64,
        /// New scroll position.
        scroll_top: f64,
    },
    /// A top fetch is still in flight; compensation waits for it to settle.
    Deferred {
        /// Content growth since the fetch started.
        grown: f64,
    },
    /// Pinned to the live edge.
    Pinned {
        /// New scroll position.
        scroll_top: f64,
    },
}

impl AnchorAction {
    /// Stable name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InitialPlacement { .. } => "initial_placement",
            Self::Compensated { .. } => "compensated",
            Self::Deferred { .. } => "deferred",
            Self::Pinned { .. } => "pinned",
        }
    }
}

/// Inputs for one anchoring pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorInput {
    /// Inverse (chat-style) feed.
    pub inverse: bool,
    /// Offset of the resolved start item, if one was requested and found.
    pub start_offset: Option<f64>,
    /// Loader placeholder height.
    pub loader_height: f64,
    /// At-bottom tolerance in pixels.
    pub live_edge_tolerance: f64,
    /// The offset table changed since the previous pass.
    pub layout_changed: bool,
    /// The sequence holds at least one item.
    pub has_items: bool,
}

/// Anchoring state carried across layout passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollAnchor {
    initial_done: bool,
    pending_top: Option<f64>,
    queued_shift: f64,
    at_live_edge: bool,
}

impl ScrollAnchor {
    /// Fresh state. Inverse feeds begin at the live edge.
    #[must_use]
    pub fn new(inverse: bool) -> Self {
        Self {
            initial_done: false,
            pending_top: None,
            queued_shift: 0.0,
            at_live_edge: inverse,
        }
    }

    /// Whether initial placement has latched.
    #[must_use]
    pub fn initial_placement_done(&self) -> bool {
        self.initial_done
    }

    /// Whether the reader was last seen at the live edge.
    #[must_use]
    pub fn at_live_edge(&self) -> bool {
        self.at_live_edge
    }

    /// Record the reader's position relative to the live edge.
    pub fn set_at_live_edge(&mut self, at_edge: bool) {
        self.at_live_edge = at_edge;
    }

    /// Content height recorded when the pending top fetch started.
    #[must_use]
    pub fn pending_compensation(&self) -> Option<f64> {
        self.pending_top
    }

    /// Note a fetch about to start. Top fetches arm compensation against the
    /// current content height.
    pub fn record_fetch(&mut self, direction: FetchDirection, content_height: f64) {
        if direction == FetchDirection::Top {
            self.pending_top = Some(content_height);
        }
    }

    /// Queue a shift for `delta` pixels inserted above the reader outside of
    /// a fetch. A pending top fetch discounts the same growth.
    pub fn queue_shift(&mut self, delta: f64) {
        if delta > 0.0 {
            self.queued_shift += delta;
            if let Some(prev_height) = self.pending_top.as_mut() {
                *prev_height += delta;
            }
        }
    }

    /// Disarm compensation after a top fetch that merged nothing.
    pub fn cancel_compensation(&mut self) {
        self.pending_top = None;
    }

    /// Settle the pending top fetch once its page of `page_height` pixels has
    /// replaced the loader. Growth beyond the loader is queued for the next
    /// pass; anything else just disarms.
    pub fn settle_top(&mut self, page_height: f64, loader_height: f64) {
        self.pending_top = None;
        let delta = page_height - loader_height;
        if delta > 0.0 {
            self.queued_shift += delta;
        }
    }

    /// Run one anchoring pass against `viewport`.
    ///
    /// Returns `None` when nothing was done, including when the viewport is
    /// unmounted.
    pub fn apply<V: Viewport + ?Sized>(
        &mut self,
        viewport: &mut V,
        input: &AnchorInput,
    ) -> Option<AnchorAction> {
        let metrics = viewport.metrics()?;

        if !self.initial_done {
            return self.place_initially(viewport, metrics, input);
        }

        if self.queued_shift > 0.0 {
            let delta = std::mem::take(&mut self.queued_shift);
            let scroll_top = metrics.scroll_top + delta;
            viewport.scroll_to(scroll_top);
            return Some(AnchorAction::Compensated { delta, scroll_top });
        }

        if let Some(prev_height) = self.pending_top {
            return Some(AnchorAction::Deferred {
                grown: metrics.scroll_height - prev_height,
            });
        }

        if input.inverse && input.layout_changed && self.at_live_edge {
            let scroll_top = metrics.max_scroll_top();
            viewport.scroll_to(scroll_top);
            return Some(AnchorAction::Pinned { scroll_top });
        }

        None
    }

    fn place_initially<V: Viewport + ?Sized>(
        &mut self,
        viewport: &mut V,
        metrics: ScrollMetrics,
        input: &AnchorInput,
    ) -> Option<AnchorAction> {
        if input.has_items && metrics.scroll_height <= 0.0 {
            return None;
        }

        let target = match input.start_offset {
            Some(offset) => Some(offset.min(metrics.max_scroll_top())),
            None if input.inverse => Some(metrics.max_scroll_top()),
            None => None,
        };
        self.initial_done = true;

        let scroll_top = match target {
            Some(target) => {
                viewport.scroll_to(target);
                target
            }
            None => metrics.scroll_top,
        };
        if input.inverse {
            self.at_live_edge =
                metrics.scroll_height - scroll_top <= metrics.client_height + input.live_edge_tolerance;
        }
        Some(AnchorAction::InitialPlacement { scroll_top })
    }
}
