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

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 10; // 10 ticks per second (100 ms period)
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Snapshots go out every second tick to bound bandwidth
pub const SNAPSHOT_EVERY_TICKS: u64 = 2;

/// Fixed delta time for the simulation (in seconds)
///
/// The tick loop always advances by this amount regardless of scheduler
/// jitter, so simulation speed stays independent of wall clock.
pub fn tick_delta() -> f32 {
    1.0 / SIMULATION_TPS as f32
}
