#![forbid(unsafe_code)]

//! The host's fetch capability.
//!
//! The engine never performs I/O itself. Hosts either drive fetches by hand
//! (take a [`FetchRequest`](crate::FetchRequest), fetch, call
//! [`Feed::complete`](crate::Feed::complete)) or hand a [`FetchSource`] to
//! [`Feed::fetch_with`](crate::Feed::fetch_with).

use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;
use crate::item::{FeedItem, FetchDirection, FetchPage};

/// Result of one fetch: a page, nothing at all, or a failure.
pub type FetchResult<T> = Result<Option<FetchPage<T>>, FetchError>;

/// Boxed future returned by [`FetchSource::fetch`].
pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = FetchResult<T>> + 'a>>;

/// Asynchronous page provider.
pub trait FetchSource<T: FeedItem> {
    /// Fetch the page adjacent to `anchor` in `direction`.
    ///
    /// For [`FetchDirection::Top`] the page holds items logically before
    /// `anchor`, in display order; for [`FetchDirection::Bottom`], items after.
    fn fetch<'a>(&'a self, direction: FetchDirection, anchor: &'a T::Key) -> FetchFuture<'a, T>;
}

impl<T, F, Fut> FetchSource<T> for F
where
    T: FeedItem,
    F: Fn(FetchDirection, &T::Key) -> Fut,
    Fut: Future<Output = FetchResult<T>> + 'static,
{
    fn fetch<'a>(&'a self, direction: FetchDirection, anchor: &'a T::Key) -> FetchFuture<'a, T> {
        Box::pin(self(direction, anchor))
    }
}
