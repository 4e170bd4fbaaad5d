use std::time::{Duration, Instant};

use super::chrono::Chrono;
use super::clock::{Clock, MonotonicClock};

/// Frame timing snapshot returned by [`Timer::update`].
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous update, in seconds.
    pub dt: f32,

    /// Time elapsed since the timer was created.
    pub program_time: Duration,

    /// Monotonic timestamp taken at the update.
    pub now: Instant,

    /// Monotonic frame counter (0 for the first update).
    pub frame_index: u64,
}

/// Frame clock for the render loop.
///
/// The delta is only recomputed by [`update`](Self::update). Skipping an update leaves the
/// previous delta in place; nothing expires it.
#[derive(Debug, Clone)]
pub struct Timer<C: Clock = MonotonicClock> {
    clock: C,
    start: Instant,
    last: Instant,
    delta: Duration,
    frame_index: u64,
    clamp: Option<(Duration, Duration)>,
}

impl Timer<MonotonicClock> {
    /// Creates a timer on the monotonic system clock.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl Default for Timer<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Timer<C> {
    /// Creates a timer reading instants from `clock`. The start instant is captured now.
    pub fn with_clock(clock: C) -> Self {
        let start = clock.now();
        Self {
            clock,
            start,
            last: start,
            delta: Duration::ZERO,
            frame_index: 0,
            clamp: None,
        }
    }

    /// Clamps every computed delta into `[min, max]`.
    ///
    /// Keeps downstream simulation stable after debugger pauses or long stalls. Inverted
    /// bounds are swapped.
    pub fn with_delta_clamp(mut self, min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max {
            (min, max)
        } else {
            log::warn!("delta clamp bounds inverted ({min:?} > {max:?}); swapping");
            (max, min)
        };
        self.clamp = Some((min, max));
        self
    }

    /// Advances the frame clock. Call once per loop iteration.
    pub fn update(&mut self) -> FrameTime {
        let now = self.clock.now();
        let mut dt = now.saturating_duration_since(self.last);

        if let Some((min, max)) = self.clamp {
            dt = dt.clamp(min, max);
        }

        self.last = now;
        self.delta = dt;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            program_time: now.saturating_duration_since(self.start),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }

    /// Delta computed by the most recent `update()`.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Elapsed time since the timer was created, read live from the clock.
    pub fn program_time(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    /// Number of `update()` calls so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }
}

impl<C: Clock + Clone> Timer<C> {
    /// Returns a stopped stopwatch sharing this timer's clock source.
    pub fn create_chrono(&self) -> Chrono<C> {
        Chrono::with_clock(self.clock.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    const TICK: Duration = Duration::from_millis(16);

    #[test]
    fn sixty_ticks_of_sixteen_ms() {
        let clock = ManualClock::new();
        let mut timer = Timer::with_clock(clock.clone());

        for _ in 0..60 {
            clock.advance(TICK);
            let ft = timer.update();
            assert!((ft.dt - 0.016).abs() < 1e-6);
            assert_eq!(timer.delta(), TICK);
        }

        assert_eq!(timer.program_time(), Duration::from_millis(960));
        assert_eq!(timer.frame_count(), 60);
    }

    #[test]
    fn program_time_ignores_update_cadence() {
        let clock = ManualClock::new();
        let timer = Timer::with_clock(clock.clone());

        clock.advance(Duration::from_millis(250));
        assert_eq!(timer.program_time(), Duration::from_millis(250));
        assert_eq!(timer.delta(), Duration::ZERO);
    }

    #[test]
    fn delta_stays_stale_without_update() {
        let clock = ManualClock::new();
        let mut timer = Timer::with_clock(clock.clone());

        clock.advance(TICK);
        timer.update();
        clock.advance(Duration::from_secs(3));

        assert_eq!(timer.delta(), TICK);
    }

    #[test]
    fn clamp_bounds_long_stalls() {
        let clock = ManualClock::new();
        let mut timer = Timer::with_clock(clock.clone())
            .with_delta_clamp(Duration::from_micros(100), Duration::from_millis(250));

        clock.advance(Duration::from_secs(5));
        let ft = timer.update();

        assert_eq!(timer.delta(), Duration::from_millis(250));
        assert_eq!(ft.program_time, Duration::from_secs(5));
    }

    #[test]
    fn inverted_clamp_bounds_are_swapped() {
        let clock = ManualClock::new();
        let mut timer = Timer::with_clock(clock.clone())
            .with_delta_clamp(Duration::from_millis(250), Duration::from_micros(100));

        clock.advance(Duration::from_secs(5));
        timer.update();
        assert_eq!(timer.delta(), Duration::from_millis(250));

        clock.advance(Duration::from_micros(10));
        timer.update();
        assert_eq!(timer.delta(), Duration::from_micros(100));
    }

    #[test]
    fn frame_index_counts_from_zero() {
        let mut timer = Timer::with_clock(ManualClock::new());
        assert_eq!(timer.update().frame_index, 0);
        assert_eq!(timer.update().frame_index, 1);
    }
}
