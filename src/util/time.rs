//! Time utilities for the simulation and render clocks

use std::time::{Duration, Instant};

/// Simulation tick rate (host only)
pub const SIMULATION_TPS: u32 = 60;
/// Local render / input sampling rate (both sides)
pub const RENDER_TPS: u32 = 60;
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;
pub const RENDER_INTERVAL_MICROS: u64 = 1_000_000 / RENDER_TPS as u64;

/// Wall-clock length of one simulation tick
pub fn tick_duration() -> Duration {
    Duration::from_micros(TICK_DURATION_MICROS)
}

/// Wall-clock length of one render/input sampling tick
pub fn render_interval() -> Duration {
    Duration::from_micros(RENDER_INTERVAL_MICROS)
}

/// Convert a number of seconds into whole simulation ticks
pub const fn secs_to_ticks(secs: u32) -> u32 {
    secs * SIMULATION_TPS
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_duration_matches_rate() {
        assert!(tick_duration() > Duration::from_millis(16));
        assert!(tick_duration() < Duration::from_millis(17));
        assert_eq!(secs_to_ticks(3), 180);
    }
}
