#![forbid(unsafe_code)]

//! Item contract and fetch-facing value types.

use std::fmt;
use std::hash::Hash;

use scrollfeed_core::Timestamp;

/// Declared logical neighbors of an item.
///
/// `None` on either side means a true sequence boundary. A `Some` key that is
/// not present in the materialized sequence is a gap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Links<K> {
    /// Key of the item logically before this one.
    pub prev: Option<K>,
    /// Key of the item logically after this one.
    pub next: Option<K>,
}

impl<K> Links<K> {
    /// Create links.
    #[must_use]
    pub fn new(prev: Option<K>, next: Option<K>) -> Self {
        Self { prev, next }
    }

    /// An item with no neighbors on either side.
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            prev: None,
            next: None,
        }
    }
}

/// An entry in a feed.
///
/// Only the key is mandatory. `links` is required when gap detection is
/// enabled and `timestamp` when arrival tracking is enabled; items missing
/// either are rejected with a
/// [`ValidationError`](crate::error::ValidationError).
pub trait FeedItem {
    /// Unique identifier.
    type Key: Clone + Eq + Hash + fmt::Debug;

    /// The item's unique key.
    fn key(&self) -> &Self::Key;

    /// Declared neighbors, or `None` if the item carries no link fields.
    fn links(&self) -> Option<Links<Self::Key>> {
        None
    }

    /// Creation time, or `None` if the item carries no timestamp.
    fn timestamp(&self) -> Option<Timestamp> {
        None
    }
}

/// Which end of the sequence a fetch extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchDirection {
    /// Prepend older content above the first item.
    Top,
    /// Append content below the last item.
    Bottom,
}

impl FetchDirection {
    /// Get the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl fmt::Display for FetchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch of items returned by a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPage<T> {
    /// Whether more items exist beyond this page in the fetched direction.
    pub has_more: bool,
    /// Items in display order.
    pub items: Vec<T>,
}

impl<T> FetchPage<T> {
    /// Create a page.
    #[must_use]
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { has_more, items }
    }

    /// A final page: nothing exists beyond it.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, false)
    }
}
