use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

#[must_use]
pub fn now_millis() -> Millis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Millis
}

/// Fixed-period timer driven by an external clock. Stopping is idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTimer {
    period_ms: Millis,
    next_due: Option<Millis>,
}

impl IntervalTimer {
    #[must_use]
    pub fn new(period_ms: Millis) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_due: None,
        }
    }

    pub fn start(&mut self, now: Millis) {
        self.next_due = Some(now.saturating_add(self.period_ms));
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns how many periods elapsed up to `now` and reschedules past them.
    pub fn fire_due(&mut self, now: Millis) -> u32 {
        let Some(due) = self.next_due else {
            return 0;
        };
        if now < due {
            return 0;
        }

        let elapsed = (now - due) / self.period_ms + 1;
        self.next_due = Some(due.saturating_add(elapsed.saturating_mul(self.period_ms)));
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }
}
