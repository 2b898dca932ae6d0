pub mod events;

// Re-export primary types for convenience.
pub use events::{AreaEvent, LevelUpEvent, LogEvent, TIMESTAMP_FORMAT, ZoneEvent};
