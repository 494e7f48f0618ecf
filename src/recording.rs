use crate::timer::{IntervalTimer, Millis};

/// What a recording sequence wants done on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStep {
    Snapshot,
    SnapshotAndFinish,
}

/// Simulated recording: one snapshot now, then one per interval until the
/// snapshot count exceeds `duration / interval`.
#[derive(Debug, Clone)]
pub struct RecordingSequence {
    entity: String,
    total: f64,
    count: u32,
    timer: IntervalTimer,
}

impl RecordingSequence {
    /// Starts a sequence; the caller takes the immediate snapshot.
    #[must_use]
    pub fn start(entity: impl Into<String>, duration_secs: f64, interval_ms: Millis, now: Millis) -> Self {
        let interval_secs = interval_ms.max(1) as f64 / 1000.0;
        let mut timer = IntervalTimer::new(interval_ms);
        timer.start(now);
        Self {
            entity: entity.into(),
            total: duration_secs / interval_secs,
            count: 1,
            timer,
        }
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub fn snapshots_taken(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.timer.is_running()
    }

    /// Advances the sequence to `now`, returning one step per elapsed tick.
    pub fn advance(&mut self, now: Millis) -> Vec<RecordingStep> {
        let ticks = self.timer.fire_due(now);
        let mut steps = Vec::with_capacity(ticks as usize);
        for _ in 0..ticks {
            self.count = self.count.saturating_add(1);
            if f64::from(self.count) > self.total {
                self.timer.stop();
                steps.push(RecordingStep::SnapshotAndFinish);
                break;
            }
            steps.push(RecordingStep::Snapshot);
        }
        steps
    }

    pub fn stop(&mut self) {
        self.timer.stop();
    }
}
