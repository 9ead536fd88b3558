#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! | Error | Raised by | Handling |
//! |-------|-----------|----------|
//! | [`ValidationError`] | construction, host mutations, fetched pages | returned to the host; fetched pages are skipped and reported |
//! | [`FetchError`] | the fetch capability | recovered: marker cleared, state idle, reported |
//! | [`LayoutError`] | a height function returning a negative or non-finite value | propagated; the previous layout stays in place |
//!
//! Item keys are carried as their `Debug` rendering so the error types stay
//! free of the item's generic parameters.

use std::fmt;

/// An item lacks a field that an enabled feature depends on, or repeats a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Gap detection is enabled but the item declares no links.
    MissingLinks {
        /// Debug rendering of the offending key.
        key: String,
    },
    /// Arrival tracking is enabled but the item has no timestamp.
    MissingTimestamp {
        /// Debug rendering of the offending key.
        key: String,
    },
    /// The key already exists in the sequence or earlier in the same batch.
    DuplicateKey {
        /// Debug rendering of the offending key.
        key: String,
    },
}

impl ValidationError {
    pub(crate) fn missing_links(key: &impl fmt::Debug) -> Self {
        Self::MissingLinks {
            key: format!("{key:?}"),
        }
    }

    pub(crate) fn missing_timestamp(key: &impl fmt::Debug) -> Self {
        Self::MissingTimestamp {
            key: format!("{key:?}"),
        }
    }

    pub(crate) fn duplicate_key(key: &impl fmt::Debug) -> Self {
        Self::DuplicateKey {
            key: format!("{key:?}"),
        }
    }

    /// Debug rendering of the offending key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::MissingLinks { key }
            | Self::MissingTimestamp { key }
            | Self::DuplicateKey { key } => key,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLinks { key } => {
                write!(f, "item {key} has no prev/next links but gap detection is enabled")
            }
            Self::MissingTimestamp { key } => {
                write!(f, "item {key} has no timestamp but new-item counting is enabled")
            }
            Self::DuplicateKey { key } => write!(f, "duplicate item key {key}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// A height function produced an unusable value.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutError {
    /// Position of the item in the sequence (or batch) being measured.
    pub index: usize,
    /// The value returned by the height function.
    pub height: f64,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "height of item at index {} is {}; heights must be finite and non-negative",
            self.index, self.height
        )
    }
}

impl std::error::Error for LayoutError {}

/// The fetch capability failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    message: String,
}

impl FetchError {
    /// Create from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any error, keeping its display text.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(err.to_string())
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch failed: {}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// Any error the engine surfaces.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    /// See [`ValidationError`].
    Validation(ValidationError),
    /// See [`FetchError`].
    Fetch(FetchError),
    /// See [`LayoutError`].
    Layout(LayoutError),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation error: {e}"),
            Self::Fetch(e) => e.fmt(f),
            Self::Layout(e) => write!(f, "layout error: {e}"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Fetch(e) => Some(e),
            Self::Layout(e) => Some(e),
        }
    }
}

impl From<ValidationError> for FeedError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<FetchError> for FeedError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<LayoutError> for FeedError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}
