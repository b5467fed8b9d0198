//! Per-file freshness timestamps.
//!
//! Timestamps are Unix milliseconds as `i64`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    to_millis(SystemTime::now())
}

/// Convert a system time to Unix milliseconds, clamping pre-epoch times to 0.
pub fn to_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Whether a file last changed at `timestamp` must be scanned again.
///
/// True when nothing was recorded or the file is newer than the record.
pub fn is_stale(recorded: Option<i64>, timestamp: i64) -> bool {
    match recorded {
        None => true,
        Some(recorded) => timestamp > recorded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_is_stale() {
        assert!(is_stale(None, 0));
        assert!(is_stale(Some(100), 101));
        assert!(!is_stale(Some(100), 100));
        assert!(!is_stale(Some(100), 99));
    }

    #[test]
    fn test_to_millis() {
        assert_eq!(to_millis(UNIX_EPOCH + Duration::from_millis(1500)), 1500);
        assert_eq!(to_millis(UNIX_EPOCH - Duration::from_secs(1)), 0);
        assert!(now_millis() > 1_600_000_000_000);
    }
}
