use ahash::RandomState;
use std::collections::HashMap as StdHashMap;
use std::time::{Duration, Instant};

pub type HashMap<K, V> = StdHashMap<K, V, RandomState>;

/// Microseconds elapsed since `origin`, saturating at zero for instants that
/// precede it.
pub fn micros_since(origin: Instant, now: Instant) -> i64 {
    let elapsed = now.saturating_duration_since(origin);
    i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX)
}

/// Interval between refreshes for a rate in Hz. Rates below 1Hz are clamped.
pub fn refresh_interval(refresh_rate: f32) -> Duration {
    Duration::from_secs_f32(1.0 / refresh_rate.max(1.0))
}
