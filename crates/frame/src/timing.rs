use std::time::{Duration, Instant};

/// Timing of one tick.
#[derive(Debug, Clone, Copy)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    pub now: Instant,
}

/// Produces clamped delta times so a stall (debugger, minimized window)
/// does not turn into one huge content step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            dt_min,
            dt_max,
        }
    }

    /// Restart the baseline, e.g. after the window was restored.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;
        FrameTime {
            dt: dt.as_secs_f32(),
            now,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Duration::from_micros(100), Duration::from_millis(250))
    }
}

/// Rolling window of frame durations.
#[derive(Debug)]
pub struct FrameTimer {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn window(&self) -> &[Duration] {
        &self.history[..self.count()]
    }

    pub fn average(&self) -> Duration {
        let count = self.count();
        if count == 0 {
            return Duration::ZERO;
        }
        self.window().iter().sum::<Duration>() / count as u32
    }

    pub fn max(&self) -> Duration {
        self.window().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.window().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        if self.filled {
            self.capacity
        } else {
            self.index
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_clamps_long_stalls() {
        let mut clock = FrameClock::new(Duration::ZERO, Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        let t = clock.tick();
        assert!(t.dt <= 0.005 + f32::EPSILON);
    }

    #[test]
    fn clock_enforces_minimum() {
        let mut clock = FrameClock::new(Duration::from_millis(10), Duration::from_millis(100));
        let t = clock.tick();
        assert!(t.dt >= 0.01 - f32::EPSILON);
    }

    #[test]
    fn timer_tracks_history() {
        let mut timer = FrameTimer::new(3);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.average(), Duration::from_millis(20));
        assert_eq!(timer.max(), Duration::from_millis(30));
        assert_eq!(timer.min(), Duration::from_millis(10));
    }

    #[test]
    fn timer_wraps_around() {
        let mut timer = FrameTimer::new(2);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.average(), Duration::from_millis(25));
    }

    #[test]
    fn empty_timer_reports_zero() {
        let timer = FrameTimer::new(0);
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.average(), Duration::ZERO);
        assert_eq!(timer.max(), Duration::ZERO);
    }
}
