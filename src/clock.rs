//! Server-authoritative clock.
//!
//! The server stores only `phase_started_at` plus the phase duration; every
//! consumer derives "time remaining" from those against a current timestamp.
//! No peer-reported countdown value is ever trusted.

use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds left in a phase as a pure function of `now`. Negative once the
/// phase has expired.
pub fn remaining_secs(started_at: DateTime<Utc>, duration_secs: u64, now: DateTime<Utc>) -> i64 {
    duration_secs as i64 - (now - started_at).num_seconds()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn remaining_counts_down_from_duration() {
        let start = Utc::now();
        assert_eq!(remaining_secs(start, 30, start), 30);
        assert_eq!(remaining_secs(start, 30, start + TimeDelta::seconds(12)), 18);
    }

    #[test]
    fn remaining_goes_negative_after_expiry() {
        let start = Utc::now();
        assert_eq!(remaining_secs(start, 5, start + TimeDelta::seconds(9)), -4);
    }
}
