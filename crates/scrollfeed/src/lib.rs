#![forbid(unsafe_code)]

//! Windowed rendering for large, growing, bidirectionally paginated feeds.
//!
//! Only items intersecting the viewport (plus a buffer) are rendered. Content
//! is fetched at either end or into holes between declared neighbors, the
//! reader's position is held steady while history is prepended above them, and
//! items arriving while the reader is away from the live edge are counted.
//!
//! The engine is sans-IO: it reads a [`Viewport`], emits [`FetchRequest`]s and
//! [`RenderPlan`]s, and never blocks. See [`Feed`] for the driving loop.
//!
//! # Example
//!
//! ```
//! use scrollfeed::{FeedBuilder, FeedConfig, FeedItem};
//!
//! #[derive(Debug, Clone)]
//! struct Line(u32);
//!
//! impl FeedItem for Line {
//!     type Key = u32;
//!     fn key(&self) -> &u32 {
//!         &self.0
//!     }
//! }
//!
//! let feed = FeedBuilder::new((0..100).map(Line).collect(), |_: &Line| 24.0)
//!     .config(FeedConfig::inverse().with_buffer(3))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(feed.content_height(), 2400.0);
//! assert_eq!(feed.visible_range().map(|r| r.len()), Some(21));
//! ```

pub mod anchor;
pub mod arrival;
pub mod config;
pub mod error;
pub mod feed;
pub mod gap;
pub mod item;
pub mod layout;
pub mod pagination;
pub mod range;
pub mod render;
pub mod sequence;
pub mod source;

pub use anchor::AnchorAction;
pub use config::FeedConfig;
pub use error::{FeedError, FetchError, LayoutError, ValidationError};
pub use feed::{ErrorReporter, Feed, FeedBuilder};
pub use item::{FeedItem, FetchDirection, FetchPage, Links};
pub use layout::{OffsetTable, compute_offsets};
pub use pagination::{FetchMarkers, FetchOutcome, FetchRequest, FetchTicket, PaginationState, TriggerReason};
pub use range::{VisibleRange, compute_visible_range};
pub use render::{FeedRenderer, RenderPlan, RenderSlot};
pub use sequence::Sequence;
pub use source::{FetchFuture, FetchResult, FetchSource};

pub use scrollfeed_core::{DebounceConfig, ManualClock, ScrollMetrics, SystemClock, Timestamp, Viewport, WallClock};
