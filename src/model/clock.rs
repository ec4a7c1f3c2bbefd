use std::time::{Duration, Instant};

/// Monotonic millisecond counter that can also block the calling thread.
pub trait Clock {
    fn now_ms(&self) -> u64;

    fn sleep_ms(&self, ms: u64);
}

/// Wall clock measured from process start, in the spirit of a tick counter.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Per-frame time step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    pub last_frame_ms: u64,
    pub delta_ms: f32,
}

impl FrameClock {
    pub fn new(start_ms: u64) -> Self {
        Self { last_frame_ms: start_ms, delta_ms: 0.0 }
    }

    /// Advance to `now_ms` and return the elapsed milliseconds. A reading
    /// older than the previous one yields zero rather than a negative step.
    pub fn tick(&mut self, now_ms: u64) -> f32 {
        self.delta_ms = now_ms.saturating_sub(self.last_frame_ms) as f32;
        self.last_frame_ms = now_ms;
        self.delta_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_difference_of_readings() {
        let mut clock = FrameClock::new(100);
        assert_eq!(clock.tick(116), 16.0);
        assert_eq!(clock.tick(150), 34.0);
        assert_eq!(clock.last_frame_ms, 150);
    }

    #[test]
    fn delta_never_negative() {
        let readings = [0, 5, 5, 3, 40, 39, 1000, 0, 17];
        let mut clock = FrameClock::new(10);
        for now in readings {
            assert!(clock.tick(now) >= 0.0);
        }
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        clock.sleep_ms(2);
        assert!(clock.now_ms() >= a + 2);
    }
}
