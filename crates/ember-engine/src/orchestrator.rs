//! Batch lifecycle front door.
//!
//! The orchestrator owns the store, the rate limiter, the collaborator
//! capabilities, and per-batch control state (a watch sender plus the
//! shared batch clock). Batches move through
//! `pending → running → paused/running → terminal`; every transition is
//! validated by the store's state machine before any side effect.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use ember_core::enums::{ActivityLevel, BatchStatus, SessionStatus};
use ember_core::types::{Batch, Profile};
use ember_settings::WarmupSettings;
use ember_store::{BatchProgress, CreateProfileParams, WarmupStore};
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::control::{BatchClock, ControlSignal};
use crate::errors::{EngineError, Result};
use crate::graph::RelationshipGraphBuilder;
use crate::providers::{ActionExecutor, MessageProvider, PersonaProvider};
use crate::rate::RateLimiter;
use crate::schedule::ScheduleBuilder;
use crate::worker::SessionWorker;

const SUPERVISOR_POLL: Duration = Duration::from_secs(1);

/// Control state for one live batch.
struct BatchHandle {
    control: watch::Sender<ControlSignal>,
    clock: Arc<BatchClock>,
}

/// Owns batch lifecycle operations and worker supervision.
pub struct Orchestrator {
    store: Arc<WarmupStore>,
    limiter: Arc<RateLimiter>,
    settings: WarmupSettings,
    persona: Arc<dyn PersonaProvider>,
    messages: Arc<dyn MessageProvider>,
    executor: Arc<dyn ActionExecutor>,
    shutdown: CancellationToken,
    batches: DashMap<String, BatchHandle>,
}

impl Orchestrator {
    /// Create an orchestrator over the given store and collaborators.
    ///
    /// The rate limiter is constructed here from the settings snapshot and
    /// shared by every worker the orchestrator spawns.
    pub fn new(
        store: Arc<WarmupStore>,
        settings: WarmupSettings,
        persona: Arc<dyn PersonaProvider>,
        messages: Arc<dyn MessageProvider>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            settings.limits.hourly_action_cap,
            settings.limits.scope,
        ));
        Self {
            store,
            limiter,
            settings,
            persona,
            messages,
            executor,
            shutdown: CancellationToken::new(),
            batches: DashMap::new(),
        }
    }

    /// The shared rate limiter.
    #[must_use]
    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> Arc<WarmupStore> {
        Arc::clone(&self.store)
    }

    /// Create a profile with a generated personality.
    pub fn create_profile(
        &self,
        display_name: &str,
        category: Option<&str>,
        activity_level: ActivityLevel,
    ) -> Result<Profile> {
        if display_name.trim().is_empty() {
            return Err(EngineError::Validation("display_name is empty".into()));
        }
        let personality = self.persona.generate_personality();
        let profile = self.store.create_profile(&CreateProfileParams {
            display_name,
            category,
            personality: &personality,
            activity_level,
        })?;
        info!(profile_id = %profile.id, display_name, "profile created");
        Ok(profile)
    }

    /// Create a pending batch after validating its participants.
    ///
    /// Snapshots the current settings into the batch config; later config
    /// edits never affect a created batch.
    pub fn create_batch(
        &self,
        name: &str,
        profile_ids: &[String],
        total_duration_secs: i64,
    ) -> Result<Batch> {
        if profile_ids.is_empty() {
            return Err(EngineError::Validation(
                "batch requires at least one profile".into(),
            ));
        }
        if total_duration_secs <= 0 {
            return Err(EngineError::Validation(format!(
                "total_duration_secs must be positive, got {total_duration_secs}"
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for id in profile_ids {
            if !seen.insert(id) {
                return Err(EngineError::Validation(format!("duplicate profile {id}")));
            }
            let profile = self.store.profile(id)?;
            if !profile.is_active {
                return Err(EngineError::Validation(format!(
                    "profile {id} is inactive"
                )));
            }
        }

        let config = serde_json::to_value(&self.settings)
            .map_err(|e| EngineError::Validation(format!("settings snapshot failed: {e}")))?;
        let batch = self
            .store
            .create_batch(name, total_duration_secs, profile_ids, &config)?;
        info!(batch_id = %batch.id, profiles = profile_ids.len(), "batch created");
        Ok(batch)
    }

    /// Build and apply the schedule, then start the batch's workers.
    ///
    /// Fails fast with no mutation unless the batch is `pending` and no
    /// participant is enrolled in another live batch. A schedule or
    /// persistence failure moves the batch to `failed`.
    pub fn start_batch(self: &Arc<Self>, batch_id: &str) -> Result<()> {
        let batch = self.store.batch(batch_id)?;
        if batch.status != BatchStatus::Pending {
            return Err(EngineError::BatchState {
                batch_id: batch_id.to_string(),
                status: batch.status,
                operation: "start",
            });
        }

        let enrolled = self.store.profiles_in_active_batches()?;
        for id in &batch.profile_ids {
            if enrolled.contains(id) {
                return Err(EngineError::Validation(format!(
                    "profile {id} is already enrolled in a live batch"
                )));
            }
        }

        let profiles = batch
            .profile_ids
            .iter()
            .map(|id| self.store.profile(id))
            .collect::<ember_store::Result<Vec<_>>>()?;

        // Build the plan; a construction failure fails the batch.
        let mut rng = rand::rng();
        let planned = match self.build_plan(&batch, &profiles, &mut rng) {
            Ok(planned) => planned,
            Err(e) => {
                warn!(batch_id, error = %e, "schedule construction failed");
                let _ = self.store.transition_batch(batch_id, BatchStatus::Failed)?;
                return Err(e);
            }
        };
        let (sessions, relationships, conversations) = planned;

        // apply_schedule claims the batch (pending → running) in the same
        // transaction as the inserts; a concurrent start loses that claim
        // and fails here without the batch moving to failed.
        if let Err(e) = self
            .store
            .apply_schedule(batch_id, &sessions, &relationships, &conversations)
        {
            if matches!(e, ember_store::StoreError::IllegalTransition { .. }) {
                return Err(e.into());
            }
            warn!(batch_id, error = %e, "schedule application failed");
            let _ = self.store.transition_batch(batch_id, BatchStatus::Failed)?;
            return Err(e.into());
        }

        // Spawn one worker per session plus the completion supervisor.
        let (control, control_rx) = watch::channel(ControlSignal::Run);
        let clock = Arc::new(BatchClock::new());
        let cooldown = Duration::from_secs(self.settings.limits.rate_denied_cooldown_secs);

        for session in self.store.sessions_for_batch(batch_id)? {
            let worker = SessionWorker::new(
                Arc::clone(&self.store),
                Arc::clone(&self.limiter),
                Arc::clone(&self.executor),
                Arc::clone(&clock),
                control_rx.clone(),
                cooldown,
                session,
            );
            drop(tokio::spawn(worker.run()));
        }

        let _ = self.batches.insert(
            batch_id.to_string(),
            BatchHandle {
                control,
                clock,
            },
        );
        drop(tokio::spawn(Arc::clone(self).supervise(batch_id.to_string())));

        info!(batch_id, "batch running");
        Ok(())
    }

    /// Suspend a running batch at the next action boundaries.
    pub fn pause_batch(&self, batch_id: &str) -> Result<Batch> {
        let batch = self.store.transition_batch(batch_id, BatchStatus::Paused)?;
        if let Some(handle) = self.batches.get(batch_id) {
            handle.clock.pause();
            let _ = handle.control.send(ControlSignal::Pause);
        }
        info!(batch_id, "batch paused");
        Ok(batch)
    }

    /// Resume a paused batch; planned starts shift by the pause length.
    pub fn resume_batch(&self, batch_id: &str) -> Result<Batch> {
        let batch = self
            .store
            .transition_batch(batch_id, BatchStatus::Running)?;
        if let Some(handle) = self.batches.get(batch_id) {
            handle.clock.resume();
            let _ = handle.control.send(ControlSignal::Run);
        }
        info!(batch_id, pause_total_secs = batch.pause_total_secs, "batch resumed");
        Ok(batch)
    }

    /// Cancel a batch; irreversible. In-flight actions complete, every
    /// non-terminal session is marked `cancelled`.
    pub fn cancel_batch(&self, batch_id: &str) -> Result<Batch> {
        let batch = self
            .store
            .transition_batch(batch_id, BatchStatus::Cancelled)?;
        if let Some((_, handle)) = self.batches.remove(batch_id) {
            let _ = handle.control.send(ControlSignal::Cancel);
        }
        for session in self.store.sessions_for_batch(batch_id)? {
            if !session.status.is_terminal() {
                match self
                    .store
                    .set_session_status(&session.id, SessionStatus::Cancelled)
                {
                    Ok(_) | Err(ember_store::StoreError::IllegalTransition { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        info!(batch_id, "batch cancelled");
        Ok(batch)
    }

    /// Progress summary for a batch.
    pub fn batch_status(&self, batch_id: &str) -> Result<BatchProgress> {
        Ok(self.store.batch_progress(batch_id)?)
    }

    /// Stop supervision and release worker control channels.
    ///
    /// Workers observe the dropped channel as a cancel; durable state
    /// stays in the store.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.batches.clear();
        info!("orchestrator shut down");
    }

    /// Build schedule and graph plans for one batch.
    #[allow(clippy::type_complexity)]
    fn build_plan(
        &self,
        batch: &Batch,
        profiles: &[Profile],
        rng: &mut impl rand::Rng,
    ) -> Result<(
        Vec<ember_store::PlannedSession>,
        Vec<ember_store::NewRelationship>,
        Vec<ember_store::PlannedConversation>,
    )> {
        let sessions =
            ScheduleBuilder::build(profiles, batch.total_duration_secs, &self.settings, rng)?;
        let graph =
            RelationshipGraphBuilder::build(profiles, &self.settings, self.messages.as_ref(), rng)?;

        // Relationships and conversations are globally unique per pair;
        // pairs that already exist from an earlier batch are left alone.
        let existing_rels: std::collections::HashSet<(String, String)> = self
            .store
            .relationships()?
            .into_iter()
            .map(|r| (r.profile_a_id, r.profile_b_id))
            .collect();
        let existing_convs: std::collections::HashSet<(String, String)> = self
            .store
            .conversations()?
            .into_iter()
            .map(|c| (c.profile_a_id, c.profile_b_id))
            .collect();

        let relationships: Vec<_> = graph
            .relationships
            .into_iter()
            .filter(|r| {
                !existing_rels.contains(&(r.profile_a_id.clone(), r.profile_b_id.clone()))
            })
            .collect();
        let conversations: Vec<_> = graph
            .conversations
            .into_iter()
            .filter(|c| {
                !existing_convs.contains(&(
                    c.conversation.profile_a_id.clone(),
                    c.conversation.profile_b_id.clone(),
                ))
            })
            .collect();

        Ok((sessions, relationships, conversations))
    }

    /// Poll until every session is terminal, then complete the batch.
    async fn supervise(self: Arc<Self>, batch_id: String) {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = sleep(SUPERVISOR_POLL) => {}
            }

            let Ok(batch) = self.store.batch(&batch_id) else {
                break;
            };
            if batch.status.is_terminal() {
                break;
            }

            let Ok(progress) = self.store.batch_progress(&batch_id) else {
                break;
            };
            let all_done =
                progress.sessions_total > 0 && progress.sessions_terminal == progress.sessions_total;
            if all_done && batch.status == BatchStatus::Running {
                debug!(batch_id, "all sessions terminal, completing batch");
                if let Err(e) = self
                    .store
                    .transition_batch(&batch_id, BatchStatus::Completed)
                {
                    warn!(batch_id, error = %e, "completion transition failed");
                }
                break;
            }
            // Paused with everything terminal: wait for resume or cancel.
        }
        let _ = self.batches.remove(&batch_id);
    }
}
