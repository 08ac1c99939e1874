use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time in seconds since the Unix epoch
pub fn current_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// Format a duration in seconds in a human-readable format
pub fn format_duration(seconds: u64, include_seconds: bool) -> String {
    if seconds < 60 {
        if include_seconds {
            format!("{} seconds", seconds)
        } else {
            String::from("under a minute")
        }
    } else if seconds < 3600 {
        format!("{} minutes", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours", seconds / 3600)
    } else {
        format!("{} days", seconds / 86400)
    }
}
