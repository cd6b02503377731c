//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default simulation rate: 30 ticks per second
pub const DEFAULT_TICK_RATE: u32 = 30;

/// Interval between two ticks at the given rate
pub fn tick_interval(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)))
}

/// Seconds elapsed between two millisecond timestamps (never negative)
pub fn elapsed_secs(since_millis: u64, now_millis: u64) -> f32 {
    now_millis.saturating_sub(since_millis) as f32 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_hz_is_about_33ms() {
        assert_eq!(tick_interval(30).as_micros(), 33_333);
        assert_eq!(tick_interval(0), Duration::from_secs(1));
    }

    #[test]
    fn elapsed_secs_saturates() {
        assert_eq!(elapsed_secs(1_000, 2_500), 1.5);
        assert_eq!(elapsed_secs(2_000, 1_000), 0.0);
    }
}
