use std::time::{Duration, Instant};

/// Paces a callback to a target frequency.
///
/// A rate of `0` Hz means "as fast as possible": the pacer is always due and
/// has no deadline. When the caller falls more than one period behind, the
/// schedule restarts from the current instant instead of firing a burst of
/// catch-up ticks.
#[derive(Debug, Clone)]
pub struct FixedRate {
    period: Option<Duration>,
    next: Instant,
}

impl FixedRate {
    pub fn new(hz: f64, start: Instant) -> Self {
        let period = (hz.is_finite() && hz > 0.0).then(|| Duration::from_secs_f64(1.0 / hz));
        Self { period, next: start }
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Returns `true` when a tick is due at `now` and schedules the next one.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(period) = self.period else {
            return true;
        };
        if now < self.next {
            return false;
        }

        self.next += period;
        if self.next <= now {
            self.next = now + period;
        }
        true
    }

    /// Instant of the next tick, or `None` when unpaced.
    pub fn deadline(&self) -> Option<Instant> {
        self.period.map(|_| self.next)
    }
}
