use std::time::{Duration, Instant};

/// Repeating timer polled from the event loop.
///
/// Starting an already running scheduler does nothing; stopping clears the
/// pending deadline so no further tick fires.
#[derive(Debug)]
pub struct TickScheduler {
    period: Duration,
    next_due: Option<Instant>,
}

impl TickScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns `false` when the scheduler was already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.next_due.is_some() {
            return false;
        }
        self.next_due = Some(now + self.period);
        tracing::debug!(period_ms = self.period.as_millis() as u64, "tick scheduler started");
        true
    }

    pub fn stop(&mut self) -> bool {
        let was_running = self.next_due.take().is_some();
        if was_running {
            tracing::debug!("tick scheduler stopped");
        }
        was_running
    }

    /// Fires at most once per call. Missed periods are skipped rather than replayed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let mut next = due + self.period;
        if next <= now {
            let behind = now.duration_since(due).as_nanos() / self.period.as_nanos();
            next = u32::try_from(behind + 1)
                .ok()
                .and_then(|periods| self.period.checked_mul(periods))
                .and_then(|skip| due.checked_add(skip))
                .unwrap_or(now + self.period);
        }
        self.next_due = Some(next);
        true
    }

    /// Time left until the next tick, `None` while stopped.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
    }
}
