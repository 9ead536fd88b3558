#![forbid(unsafe_code)]

//! Core: the host viewport boundary, wall clocks, and scroll debouncing.

pub mod debounce;
pub mod time;
pub mod viewport;

pub use debounce::{DebounceAction, DebounceConfig, DebounceStats, ScrollDebouncer};
pub use time::{ManualClock, SystemClock, Timestamp, WallClock};
pub use viewport::{ScrollMetrics, Viewport};
