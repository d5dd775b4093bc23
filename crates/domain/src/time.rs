//! Timestamps for snapshots and events.

use chrono::{DateTime, Utc};

/// UTC timestamp used for `last_changed`, `last_updated` and event times.
pub type Timestamp = DateTime<Utc>;

/// Current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_not_go_backwards() {
        let first = now();
        let second = now();
        assert!(second >= first);
    }
}
