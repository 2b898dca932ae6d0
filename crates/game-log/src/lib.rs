//! Client log tailer.
//!
//! Follows the located `Client.txt` across appends, truncation, replacement
//! and deletion, parses each complete line against a pattern table and hands
//! the resulting events to a callback in log order.

mod cursor;
mod file_id;
pub mod parser;
mod stats;
mod tailer;
mod watch;

pub use cursor::Cursor;
pub use file_id::FileId;
pub use parser::{Anchor, LineParser, PATTERNS, ParseOutcome, Pattern};
pub use stats::{StatsSnapshot, TailStats};
pub use tailer::{PollOutcome, ResetReason, StartAt, TailOptions, TailState, Tailer};
pub use watch::{LogWatcher, OnEventFn, channel_sink, run_tail_loop};

use zonewatch_locator::LocateError;

/// Errors surfaced to the caller of the tailer.
///
/// Everything else (missing file, read failures, malformed lines) is handled
/// internally and only shows up in logs and [`StatsSnapshot`].
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error("configuration error: {0}")]
    Configuration(#[from] LocateError),

    #[error("tail task failed: {0}")]
    Task(String),
}
