use std::time::{Duration, Instant};

use super::clock::{Clock, MonotonicClock};

/// Independent stopwatch for ad hoc interval measurement.
///
/// Unrelated to the frame clock: starting, stopping or resetting a `Chrono` never affects a
/// `Timer`, and vice versa.
#[derive(Debug, Clone)]
pub struct Chrono<C: Clock = MonotonicClock> {
    clock: C,
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl Chrono<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl Default for Chrono<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Chrono<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            started_at: None,
            accumulated: Duration::ZERO,
        }
    }

    /// Starts (or resumes) measuring. No-op while running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now());
        }
    }

    /// Stops measuring and folds the running interval into the total.
    pub fn stop(&mut self) -> Duration {
        if let Some(t0) = self.started_at.take() {
            self.accumulated += self.clock.now().saturating_duration_since(t0);
        }
        self.accumulated
    }

    /// Stops and zeroes the stopwatch.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    /// Zeroes the stopwatch and starts it again; returns the elapsed time before the restart.
    pub fn restart(&mut self) -> Duration {
        let elapsed = self.elapsed();
        self.reset();
        self.start();
        elapsed
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Total measured time, including the running interval.
    pub fn elapsed(&self) -> Duration {
        let running = self
            .started_at
            .map(|t0| self.clock.now().saturating_duration_since(t0))
            .unwrap_or_default();
        self.accumulated + running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{ManualClock, Timer};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn stopped_chrono_does_not_accumulate() {
        let clock = ManualClock::new();
        let mut chrono = Chrono::with_clock(clock.clone());

        clock.advance(ms(100));
        assert_eq!(chrono.elapsed(), Duration::ZERO);

        chrono.start();
        clock.advance(ms(40));
        assert_eq!(chrono.stop(), ms(40));

        clock.advance(ms(500));
        assert_eq!(chrono.elapsed(), ms(40));
    }

    #[test]
    fn resume_accumulates_intervals() {
        let clock = ManualClock::new();
        let mut chrono = Chrono::with_clock(clock.clone());

        chrono.start();
        clock.advance(ms(10));
        chrono.stop();
        chrono.start();
        clock.advance(ms(15));

        assert!(chrono.is_running());
        assert_eq!(chrono.elapsed(), ms(25));
    }

    #[test]
    fn restart_returns_previous_and_zeroes() {
        let clock = ManualClock::new();
        let mut chrono = Chrono::with_clock(clock.clone());

        chrono.start();
        clock.advance(ms(30));
        assert_eq!(chrono.restart(), ms(30));
        assert_eq!(chrono.elapsed(), Duration::ZERO);
        assert!(chrono.is_running());
    }

    #[test]
    fn chrono_is_independent_of_timer_updates() {
        let clock = ManualClock::new();
        let mut timer = Timer::with_clock(clock.clone());
        let mut chrono = timer.create_chrono();

        chrono.start();
        clock.advance(ms(16));
        timer.update();
        chrono.reset();
        clock.advance(ms(16));
        timer.update();

        assert_eq!(chrono.elapsed(), Duration::ZERO);
        assert_eq!(timer.delta(), ms(16));
    }
}
