//! End-to-end batch lifecycle scenarios over an in-memory store with the
//! simulated executor and a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use ember_core::enums::{ActivityLevel, BatchStatus, SessionStatus};
use ember_engine::{Orchestrator, SimulatedExecutor, StubMessageProvider, StubPersonaProvider};
use ember_settings::WarmupSettings;
use ember_store::{StoreError, WarmupStore};

fn engine_with(executor: SimulatedExecutor, settings: WarmupSettings) -> Arc<Orchestrator> {
    let store = Arc::new(WarmupStore::open_in_memory().unwrap());
    Arc::new(Orchestrator::new(
        store,
        settings,
        Arc::new(StubPersonaProvider),
        Arc::new(StubMessageProvider),
        Arc::new(executor),
    ))
}

fn quick_settings() -> WarmupSettings {
    let mut settings = WarmupSettings::default();
    // Tight windows keep the virtual-time runs short.
    settings.schedule.session_duration_min_secs = 60;
    settings.schedule.session_duration_max_secs = 120;
    settings.schedule.stagger_min_secs = 5;
    settings.schedule.stagger_max_secs = 10;
    settings.schedule.action_delay_min_secs = 1;
    settings.schedule.action_delay_max_secs = 2;
    settings
}

fn make_batch(orch: &Arc<Orchestrator>, profiles: usize) -> String {
    let ids: Vec<String> = (0..profiles)
        .map(|i| {
            orch.create_profile(&format!("P{i}"), None, ActivityLevel::Light)
                .unwrap()
                .id
        })
        .collect();
    orch.create_batch("lifecycle", &ids, 3600).unwrap().id
}

async fn wait_for_batch_status(
    orch: &Arc<Orchestrator>,
    batch_id: &str,
    status: BatchStatus,
) {
    for _ in 0..10_000 {
        if orch.batch_status(batch_id).unwrap().status == status {
            return;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    panic!("batch {batch_id} never reached {status}");
}

#[tokio::test(start_paused = true)]
async fn batch_runs_to_completion() {
    let orch = engine_with(SimulatedExecutor::new(), quick_settings());
    let batch_id = make_batch(&orch, 3);

    orch.start_batch(&batch_id).unwrap();
    wait_for_batch_status(&orch, &batch_id, BatchStatus::Completed).await;

    let progress = orch.batch_status(&batch_id).unwrap();
    assert_eq!(progress.sessions_total, 3);
    assert_eq!(progress.sessions_completed, 3);
    assert_eq!(progress.actions_completed, progress.actions_planned);
}

#[tokio::test(start_paused = true)]
async fn pause_suspends_and_resume_finishes() {
    let orch = engine_with(SimulatedExecutor::new(), quick_settings());
    let batch_id = make_batch(&orch, 2);

    orch.start_batch(&batch_id).unwrap();
    let paused = orch.pause_batch(&batch_id).unwrap();
    assert_eq!(paused.status, BatchStatus::Paused);
    assert!(paused.paused_at.is_some());

    // Workers are parked: executed count stays put while paused.
    tokio::time::sleep(Duration::from_secs(300)).await;
    let during = orch.batch_status(&batch_id).unwrap().actions_completed;
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(orch.batch_status(&batch_id).unwrap().actions_completed, during);

    // Double-pause is an illegal transition.
    assert_matches!(
        orch.pause_batch(&batch_id),
        Err(ember_engine::EngineError::Store(
            StoreError::IllegalTransition { .. }
        ))
    );

    let resumed = orch.resume_batch(&batch_id).unwrap();
    assert_eq!(resumed.status, BatchStatus::Running);
    assert!(resumed.paused_at.is_none());

    wait_for_batch_status(&orch, &batch_id, BatchStatus::Completed).await;
}

#[tokio::test(start_paused = true)]
async fn cancel_is_terminal_and_refuses_further_writes() {
    let orch = engine_with(SimulatedExecutor::new(), quick_settings());
    let batch_id = make_batch(&orch, 2);

    orch.start_batch(&batch_id).unwrap();
    let cancelled = orch.cancel_batch(&batch_id).unwrap();
    assert_eq!(cancelled.status, BatchStatus::Cancelled);

    let progress = orch.batch_status(&batch_id).unwrap();
    assert_eq!(progress.sessions_terminal, progress.sessions_total);

    // The store refuses outcome writes against the cancelled batch.
    let unexecuted = orch
        .store()
        .actions_for_batch(&batch_id)
        .unwrap()
        .into_iter()
        .find(|a| a.executed_at.is_none())
        .expect("cancelled batch still has unexecuted actions");
    assert_matches!(
        orch.store()
            .record_action_outcome(&unexecuted.id, true, &serde_json::json!({})),
        Err(StoreError::BatchTerminal(_))
    );

    // Cancel twice: already terminal.
    assert_matches!(
        orch.cancel_batch(&batch_id),
        Err(ember_engine::EngineError::Store(
            StoreError::IllegalTransition { .. }
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn consecutive_failures_escalate_sessions() {
    let orch = engine_with(SimulatedExecutor::failing(), quick_settings());
    let batch_id = make_batch(&orch, 2);

    orch.start_batch(&batch_id).unwrap();
    // Every session fails after three consecutive failed actions; the
    // batch still completes once everything is terminal.
    wait_for_batch_status(&orch, &batch_id, BatchStatus::Completed).await;

    for session in orch.store().sessions_for_batch(&batch_id).unwrap() {
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.actions_completed, 3);
        assert!(session.actual_start_time.is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn completes_under_a_tight_rate_cap() {
    let mut settings = quick_settings();
    settings.limits.hourly_action_cap = 5;
    settings.limits.rate_denied_cooldown_secs = 30;
    // Bound the draw so the worst case (8 actions against a cap of 5)
    // only has to outwait one window slide.
    settings.actions.light = ember_settings::ActionCountRange { min: 3, max: 4 };
    let orch = engine_with(SimulatedExecutor::new(), settings);
    let batch_id = make_batch(&orch, 2);

    orch.start_batch(&batch_id).unwrap();
    wait_for_batch_status(&orch, &batch_id, BatchStatus::Completed).await;

    let progress = orch.batch_status(&batch_id).unwrap();
    assert_eq!(progress.actions_completed, progress.actions_planned);
}

#[tokio::test(start_paused = true)]
async fn profiles_cannot_join_two_live_batches() {
    let orch = engine_with(SimulatedExecutor::new(), quick_settings());
    let profile = orch
        .create_profile("Shared", None, ActivityLevel::Light)
        .unwrap();

    let first = orch
        .create_batch("first", &[profile.id.clone()], 3600)
        .unwrap();
    let second = orch
        .create_batch("second", &[profile.id.clone()], 3600)
        .unwrap();

    orch.start_batch(&first.id).unwrap();
    assert_matches!(
        orch.start_batch(&second.id),
        Err(ember_engine::EngineError::Validation(_))
    );

    // Once the first batch finishes, the second may start.
    wait_for_batch_status(&orch, &first.id, BatchStatus::Completed).await;
    orch.start_batch(&second.id).unwrap();
    wait_for_batch_status(&orch, &second.id, BatchStatus::Completed).await;
}
