//! Fixed-step simulation clock
//!
//! Fixed 60Hz tick rate; real frame time is accumulated and drained in
//! whole steps so the simulation stays frame-rate independent.

use std::time::Duration;

/// Fixed simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms
pub const TICK_DURATION_SECS: f32 = 1.0 / TICK_RATE_HZ as f32;

/// Upper bound on steps drained per frame, so a long stall cannot snowball.
pub const MAX_STEPS_PER_FRAME: u32 = 5;

/// Accumulates real time and hands out fixed steps.
pub struct FixedStep {
    tick_count: u64,
    accumulator: Duration,
}

impl FixedStep {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            accumulator: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Add `frame_time` and return how many fixed steps are now due.
    ///
    /// Time beyond `MAX_STEPS_PER_FRAME` steps is dropped.
    pub fn accumulate(&mut self, frame_time: Duration) -> u32 {
        self.accumulator += frame_time;
        let mut steps = 0;
        while self.accumulator >= TICK_DURATION && steps < MAX_STEPS_PER_FRAME {
            self.accumulator -= TICK_DURATION;
            self.tick_count += 1;
            steps += 1;
        }
        if steps == MAX_STEPS_PER_FRAME && self.accumulator >= TICK_DURATION {
            tracing::warn!(
                dropped_ms = self.accumulator.as_secs_f32() * 1000.0,
                "fixed step fell behind, dropping accumulated time"
            );
            self.accumulator = Duration::ZERO;
        }
        steps
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_whole_steps() {
        let mut clock = FixedStep::new();
        assert_eq!(clock.accumulate(Duration::from_millis(10)), 0);
        assert_eq!(clock.accumulate(Duration::from_millis(10)), 1);
        assert_eq!(clock.tick_count(), 1);
    }

    #[test]
    fn test_caps_steps_after_stall() {
        let mut clock = FixedStep::new();
        assert_eq!(clock.accumulate(Duration::from_secs(2)), MAX_STEPS_PER_FRAME);
        assert_eq!(clock.accumulate(Duration::ZERO), 0);
    }
}
