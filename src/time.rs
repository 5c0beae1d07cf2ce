//! Time utilities: unix timestamps and timestamp randomization.

use rand::rngs::OsRng;
use rand::Rng;

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Draw a timestamp uniformly from `[timestamp - range, timestamp + range]`.
///
/// Used on sealed envelopes so a relay cannot correlate an event's
/// `created_at` with the real send time. Uses `OsRng`.
pub fn randomize_timestamp(timestamp: i64, range_seconds: i64) -> i64 {
    timestamp + OsRng.gen_range(-range_seconds..=range_seconds)
}
