//! One task per session, driving its action plan to a terminal status.
//!
//! The worker waits for its pause-shifted planned start, then executes
//! actions strictly in plan order. Control signals are honored at action
//! boundaries only; an in-flight action always completes and its outcome
//! is recorded. Rate denial backs off and retries the same action. Three
//! consecutive failed actions, or any persistence failure on the worker's
//! own writes, escalate the session to `failed` without touching its
//! siblings.

use std::sync::Arc;
use std::time::Duration;

use ember_core::enums::SessionStatus;
use ember_core::types::Session;
use ember_store::{StoreError, WarmupStore};
use tokio::sync::watch;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, error, info, warn};

use crate::control::{BatchClock, ControlSignal};
use crate::providers::{ActionExecutor, ActionOutcome};
use crate::rate::RateLimiter;

const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Drives one session's action plan.
pub struct SessionWorker {
    store: Arc<WarmupStore>,
    limiter: Arc<RateLimiter>,
    executor: Arc<dyn ActionExecutor>,
    clock: Arc<BatchClock>,
    control: watch::Receiver<ControlSignal>,
    cooldown: Duration,
    session: Session,
}

impl SessionWorker {
    /// Create a worker for one planned session.
    pub fn new(
        store: Arc<WarmupStore>,
        limiter: Arc<RateLimiter>,
        executor: Arc<dyn ActionExecutor>,
        clock: Arc<BatchClock>,
        control: watch::Receiver<ControlSignal>,
        cooldown: Duration,
        session: Session,
    ) -> Self {
        Self {
            store,
            limiter,
            executor,
            clock,
            control,
            cooldown,
            session,
        }
    }

    /// Run the session to a terminal status and return it.
    pub async fn run(mut self) -> SessionStatus {
        let session_id = self.session.id.clone();

        // 1. Wait for the pause-shifted planned start.
        if !self.wait_for_start().await {
            debug!(session_id, "cancelled before start");
            self.try_set_status(SessionStatus::Cancelled);
            return SessionStatus::Cancelled;
        }

        // 2. Stamp the observed start (first write wins) and go running.
        if let Err(e) = self.store.mark_session_started(&session_id) {
            error!(session_id, error = %e, "failed to mark session started");
            self.try_set_status(SessionStatus::Failed);
            return SessionStatus::Failed;
        }
        self.try_set_status(SessionStatus::Running);
        let run_started = Instant::now();
        info!(session_id, profile_id = %self.session.profile_id, "session started");

        let actions = match self.store.actions_for_session(&session_id) {
            Ok(actions) => actions,
            Err(e) => {
                error!(session_id, error = %e, "failed to load action plan");
                return self.finish(SessionStatus::Failed, run_started);
            }
        };

        // 3. Execute the plan in order.
        let mut consecutive_failures = 0_u32;
        for action in actions {
            if action.executed_at.is_some() {
                continue;
            }

            if self.observe_control().await == ControlSignal::Cancel {
                return self.finish(SessionStatus::Cancelled, run_started);
            }

            // Humanized pre-action delay.
            sleep(Duration::from_secs(action.delay_before_secs.max(0).unsigned_abs())).await;

            // Admission: denial is a backoff signal, retry the same action.
            loop {
                if self.observe_control().await == ControlSignal::Cancel {
                    return self.finish(SessionStatus::Cancelled, run_started);
                }
                if self.limiter.try_acquire(&self.session.profile_id) {
                    break;
                }
                debug!(session_id, action_id = %action.id, "rate limited, backing off");
                sleep(self.cooldown).await;
            }

            let outcome = match self.executor.execute(&action).await {
                Ok(outcome) => outcome,
                // Executor errors are data, not faults.
                Err(e) => ActionOutcome {
                    success: false,
                    details: serde_json::json!({ "error": e.to_string() }),
                },
            };

            match self
                .store
                .record_action_outcome(&action.id, outcome.success, &outcome.details)
            {
                Ok(_) if outcome.success => consecutive_failures = 0,
                Ok(_) => {
                    consecutive_failures += 1;
                    warn!(
                        session_id,
                        action_id = %action.id,
                        consecutive_failures,
                        "action failed"
                    );
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        warn!(session_id, "consecutive failure limit hit, escalating");
                        return self.finish(SessionStatus::Failed, run_started);
                    }
                }
                // The batch went terminal under us; stop quietly.
                Err(StoreError::BatchTerminal(_)) => {
                    return self.finish(SessionStatus::Cancelled, run_started);
                }
                Err(e) => {
                    error!(session_id, action_id = %action.id, error = %e, "outcome write failed");
                    return self.finish(SessionStatus::Failed, run_started);
                }
            }
        }

        info!(session_id, "session completed");
        self.finish(SessionStatus::Completed, run_started)
    }

    /// Wait until the planned start, tracking pause shifts and signals.
    ///
    /// Returns `false` on cancel.
    async fn wait_for_start(&mut self) -> bool {
        loop {
            let signal = *self.control.borrow_and_update();
            match signal {
                ControlSignal::Cancel => return false,
                ControlSignal::Pause => {
                    if self.control.changed().await.is_err() {
                        return false;
                    }
                }
                ControlSignal::Run => {
                    // Recompute after every wakeup: a pause while we slept
                    // pushes the deadline out.
                    let deadline = self
                        .clock
                        .shifted_deadline(self.session.planned_start_offset_secs);
                    if Instant::now() >= deadline {
                        return true;
                    }
                    tokio::select! {
                        () = sleep_until(deadline) => {}
                        changed = self.control.changed() => {
                            if changed.is_err() {
                                return false;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Resolve the current control signal, parking while paused.
    async fn observe_control(&mut self) -> ControlSignal {
        loop {
            let signal = *self.control.borrow_and_update();
            match signal {
                ControlSignal::Run => return ControlSignal::Run,
                ControlSignal::Cancel => return ControlSignal::Cancel,
                ControlSignal::Pause => {
                    debug!(session_id = %self.session.id, "paused at action boundary");
                    self.try_set_status(SessionStatus::Paused);
                    if self.control.changed().await.is_err() {
                        return ControlSignal::Cancel;
                    }
                    let resumed = *self.control.borrow() == ControlSignal::Run;
                    if resumed {
                        self.try_set_status(SessionStatus::Running);
                    }
                }
            }
        }
    }

    /// Reach a terminal status, recording the observed duration.
    fn finish(self, status: SessionStatus, run_started: Instant) -> SessionStatus {
        let elapsed = i64::try_from(run_started.elapsed().as_secs()).unwrap_or(i64::MAX);
        if let Err(e) = self
            .store
            .set_session_actual_duration(&self.session.id, elapsed)
        {
            warn!(session_id = %self.session.id, error = %e, "failed to record duration");
        }
        self.try_set_status(status);
        status
    }

    /// Set the session status, tolerating a race with an external
    /// transition (orchestrator cancel marks sessions terminal first).
    fn try_set_status(&self, status: SessionStatus) {
        match self.store.set_session_status(&self.session.id, status) {
            Ok(_) | Err(StoreError::IllegalTransition { .. }) => {}
            Err(e) => {
                warn!(session_id = %self.session.id, error = %e, "status update failed");
            }
        }
    }
}
