//! Batch control signals and the pause-aware batch clock.
//!
//! The orchestrator broadcasts [`ControlSignal`]s to a batch's workers
//! over a `tokio::sync::watch` channel. The [`BatchClock`] tracks the
//! batch's start instant plus accumulated pause time, so every worker can
//! recompute its pause-shifted planned start without coordinating with
//! its siblings.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Control state broadcast to a batch's session workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlSignal {
    /// Execute the plan.
    Run,
    /// Suspend at the next action boundary.
    Pause,
    /// Stop permanently; in-flight action still completes.
    Cancel,
}

/// Shared per-batch clock; all planned offsets shift by the accumulated
/// pause time.
#[derive(Debug)]
pub struct BatchClock {
    started: Instant,
    pause_total: Mutex<Duration>,
    paused_since: Mutex<Option<Instant>>,
}

impl Default for BatchClock {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchClock {
    /// Start the clock now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            pause_total: Mutex::new(Duration::ZERO),
            paused_since: Mutex::new(None),
        }
    }

    /// Mark the batch paused; idempotent while already paused.
    pub fn pause(&self) {
        let mut paused = self.paused_since.lock();
        if paused.is_none() {
            *paused = Some(Instant::now());
        }
    }

    /// Mark the batch resumed, folding the open pause into the total.
    pub fn resume(&self) {
        if let Some(since) = self.paused_since.lock().take() {
            *self.pause_total.lock() += since.elapsed();
        }
    }

    /// Accumulated pause time, not counting an open pause.
    pub fn pause_total(&self) -> Duration {
        *self.pause_total.lock()
    }

    /// The pause-shifted deadline for a planned offset.
    ///
    /// Workers recompute this after every wakeup; a pause that happened
    /// while they slept pushes the deadline out.
    pub fn shifted_deadline(&self, offset_secs: i64) -> Instant {
        let offset = Duration::from_secs(offset_secs.max(0).unsigned_abs());
        self.started + offset + self.pause_total()
    }
}
