#![forbid(unsafe_code)]

//! Render planning.
//!
//! The engine does not draw. It turns the visible range and the offset table
//! into an ordered list of absolutely positioned slots, and hands each slot to
//! a host-supplied [`FeedRenderer`].

use crate::item::FetchDirection;
use crate::layout::OffsetTable;
use crate::range::VisibleRange;

/// One positioned element of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderSlot {
    /// Loader placeholder for an in-flight fetch.
    Loader {
        /// Which fetch it belongs to.
        direction: FetchDirection,
        /// Pixel offset of the placeholder.
        top: f64,
        /// Placeholder height.
        height: f64,
    },
    /// A materialized item.
    Item {
        /// Index in the sequence.
        index: usize,
        /// Pixel offset of the item itself (past any leading loader).
        top: f64,
        /// Measured item height.
        height: f64,
    },
}

/// Everything the host needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPlan {
    /// Slots in display order.
    pub slots: Vec<RenderSlot>,
    /// Total scrollable height; the host sizes its inner content to this.
    pub content_height: f64,
    /// Unseen-item count to show, when arrival tracking is on and non-zero.
    pub new_items: Option<usize>,
}

impl RenderPlan {
    /// Build the plan for `range`.
    ///
    /// Loaders are emitted next to their anchor item only when that item is in
    /// range, so an off-screen fetch draws nothing.
    #[must_use]
    pub fn build(offsets: &OffsetTable, range: Option<VisibleRange>, new_items: Option<usize>) -> Self {
        let mut slots = Vec::new();
        if let Some(range) = range {
            slots.reserve(range.len() + 1);
            for index in range.indices() {
                let (Some(offset), Some(height)) = (offsets.offset_of(index), offsets.height_of(index))
                else {
                    break;
                };
                if offsets.loader_before() == Some(index) {
                    slots.push(RenderSlot::Loader {
                        direction: FetchDirection::Top,
                        top: offset,
                        height: offsets.loader_height(),
                    });
                }
                let top = offsets.item_top(index).unwrap_or(offset);
                slots.push(RenderSlot::Item { index, top, height });
                if offsets.loader_after() == Some(index) {
                    slots.push(RenderSlot::Loader {
                        direction: FetchDirection::Bottom,
                        top: top + height,
                        height: offsets.loader_height(),
                    });
                }
            }
        }
        Self {
            slots,
            content_height: offsets.content_height(),
            new_items: new_items.filter(|&n| n > 0),
        }
    }

    /// Number of item slots.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, RenderSlot::Item { .. }))
            .count()
    }
}

/// Host-side drawing of feed elements.
///
/// `Output` is whatever the host's UI layer composes: widgets, strings,
/// display-list entries.
pub trait FeedRenderer<T> {
    /// Rendered element type.
    type Output;

    /// Draw `item` at `top` with the given measured `height`.
    fn render_item(&mut self, item: &T, index: usize, top: f64, height: f64) -> Self::Output;

    /// Draw a loader placeholder.
    fn render_loader(&mut self, direction: FetchDirection, top: f64, height: f64) -> Self::Output;

    /// Draw the "N new items" affordance.
    fn render_arrival_indicator(&mut self, count: usize) -> Self::Output;
}
