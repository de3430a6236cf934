//! Timestamp and clock formatting utilities

use chrono::{DateTime, Local, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current local wall-clock time formatted for history entries
pub fn history_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format a millisecond position as "mm:ss"
pub fn format_clock(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Format a position/duration pair as "mm:ss / mm:ss"
pub fn format_progress(position_ms: u64, duration_ms: u64) -> String {
    format!(
        "{} / {}",
        format_clock(position_ms),
        format_clock(duration_ms)
    )
}
