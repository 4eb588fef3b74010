//! Pooled store facade owning the multi-row transactions.
//!
//! [`WarmupStore`] wraps the connection pool and exposes typed wrappers
//! around the repositories, plus the two operations that must be atomic
//! across tables: applying a built schedule and recording an action
//! outcome. Everything else delegates straight through on a pooled
//! connection.

use ember_core::enums::{BatchStatus, SessionStatus};
use ember_core::ids::today_iso;
use ember_core::types::{
    ActionRecord, Batch, Conversation, DailyAnalytics, Message, Profile, Relationship, Session,
};
use tracing::{debug, info, warn};

use crate::connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory};
use crate::errors::{Result, StoreError};
use crate::migrations::run_migrations;
use crate::repositories::action::{ActionRepo, NewAction};
use crate::repositories::analytics::AnalyticsRepo;
use crate::repositories::batch::BatchRepo;
use crate::repositories::conversation::{ConversationRepo, NewConversation, NewMessage};
use crate::repositories::profile::{CreateProfileParams, ProfileRepo};
use crate::repositories::relationship::{NewRelationship, RelationshipRepo};
use crate::repositories::session::{NewSession, SessionRepo};

/// One session plus its ordered action plan, ready for insertion.
#[derive(Clone, Debug)]
pub struct PlannedSession {
    /// The session row to insert.
    pub session: NewSession,
    /// The session's actions in plan order.
    pub actions: Vec<NewAction>,
}

/// One conversation plus its message plan, ready for insertion.
#[derive(Clone, Debug)]
pub struct PlannedConversation {
    /// The conversation row to insert.
    pub conversation: NewConversation,
    /// The exchanged messages in send order.
    pub messages: Vec<NewMessage>,
}

/// Progress summary for one batch.
#[derive(Clone, Debug)]
pub struct BatchProgress {
    /// Batch ID.
    pub batch_id: String,
    /// Current batch status.
    pub status: BatchStatus,
    /// Total sessions in the batch.
    pub sessions_total: i64,
    /// Sessions that reached a terminal status.
    pub sessions_terminal: i64,
    /// Sessions that completed successfully.
    pub sessions_completed: i64,
    /// Sum of planned actions across sessions.
    pub actions_planned: i64,
    /// Sum of executed actions across sessions.
    pub actions_completed: i64,
}

/// `SQLite`-backed store; the single source of truth for all entities.
pub struct WarmupStore {
    pool: ConnectionPool,
}

impl WarmupStore {
    /// Open a file-backed store and run pending migrations.
    pub fn open_file(path: &str, config: &ConnectionConfig) -> Result<Self> {
        let pool = new_file(path, config)?;
        let store = Self { pool };
        let conn = store.conn()?;
        let _ = run_migrations(&conn)?;
        info!(path, "warmup store opened");
        Ok(store)
    }

    /// Open an in-memory store (for testing) and run migrations.
    pub fn open_in_memory() -> Result<Self> {
        let pool = new_in_memory(&ConnectionConfig::default())?;
        let store = Self { pool };
        let conn = store.conn()?;
        let _ = run_migrations(&conn)?;
        Ok(store)
    }

    /// Check out a pooled connection.
    pub fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // ── profiles ─────────────────────────────────────────────────────────

    /// Create a profile.
    pub fn create_profile(&self, params: &CreateProfileParams<'_>) -> Result<Profile> {
        let conn = self.conn()?;
        ProfileRepo::create(&conn, params)
    }

    /// Fetch a profile, erroring if missing.
    pub fn profile(&self, id: &str) -> Result<Profile> {
        let conn = self.conn()?;
        ProfileRepo::require(&conn, id)
    }

    /// List all profiles.
    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        let conn = self.conn()?;
        ProfileRepo::list(&conn)
    }

    /// List profiles eligible for new batches.
    pub fn list_active_profiles(&self) -> Result<Vec<Profile>> {
        let conn = self.conn()?;
        ProfileRepo::list_active(&conn)
    }

    /// IDs of profiles enrolled in a non-terminal batch.
    pub fn profiles_in_active_batches(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        ProfileRepo::ids_in_active_batches(&conn)
    }

    // ── batches ──────────────────────────────────────────────────────────

    /// Create a pending batch with a config snapshot.
    pub fn create_batch(
        &self,
        name: &str,
        total_duration_secs: i64,
        profile_ids: &[String],
        config: &serde_json::Value,
    ) -> Result<Batch> {
        let conn = self.conn()?;
        BatchRepo::create(&conn, name, total_duration_secs, profile_ids, config)
    }

    /// Fetch a batch, erroring if missing.
    pub fn batch(&self, id: &str) -> Result<Batch> {
        let conn = self.conn()?;
        BatchRepo::require(&conn, id)
    }

    /// List batches, optionally filtered by status.
    pub fn list_batches(&self, status: Option<BatchStatus>) -> Result<Vec<Batch>> {
        let conn = self.conn()?;
        BatchRepo::list(&conn, status)
    }

    /// Move a batch through the lifecycle state machine.
    pub fn transition_batch(&self, id: &str, next: BatchStatus) -> Result<Batch> {
        let conn = self.conn()?;
        let batch = BatchRepo::transition(&conn, id, next)?;
        debug!(batch_id = id, status = %next, "batch transitioned");
        Ok(batch)
    }

    // ── sessions and actions ─────────────────────────────────────────────

    /// Fetch a session, erroring if missing.
    pub fn session(&self, id: &str) -> Result<Session> {
        let conn = self.conn()?;
        SessionRepo::require(&conn, id)
    }

    /// A batch's sessions ordered by planned start.
    pub fn sessions_for_batch(&self, batch_id: &str) -> Result<Vec<Session>> {
        let conn = self.conn()?;
        SessionRepo::list_for_batch(&conn, batch_id)
    }

    /// Move a session to a new status.
    pub fn set_session_status(&self, id: &str, next: SessionStatus) -> Result<Session> {
        let conn = self.conn()?;
        SessionRepo::set_status(&conn, id, next)
    }

    /// Record the observed session start, first write wins.
    pub fn mark_session_started(&self, id: &str) -> Result<Session> {
        let conn = self.conn()?;
        SessionRepo::mark_started(&conn, id)
    }

    /// Record the observed session duration.
    pub fn set_session_actual_duration(&self, id: &str, secs: i64) -> Result<()> {
        let conn = self.conn()?;
        SessionRepo::set_actual_duration(&conn, id, secs)
    }

    /// A session's actions in plan order.
    pub fn actions_for_session(&self, session_id: &str) -> Result<Vec<ActionRecord>> {
        let conn = self.conn()?;
        ActionRepo::list_for_session(&conn, session_id)
    }

    /// Every action in a batch.
    pub fn actions_for_batch(&self, batch_id: &str) -> Result<Vec<ActionRecord>> {
        let conn = self.conn()?;
        ActionRepo::list_for_batch(&conn, batch_id)
    }

    // ── social graph ─────────────────────────────────────────────────────

    /// All relationships.
    pub fn relationships(&self) -> Result<Vec<Relationship>> {
        let conn = self.conn()?;
        RelationshipRepo::list(&conn)
    }

    /// All conversations.
    pub fn conversations(&self) -> Result<Vec<Conversation>> {
        let conn = self.conn()?;
        ConversationRepo::list(&conn)
    }

    /// A conversation's messages in send order.
    pub fn messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        ConversationRepo::messages(&conn, conversation_id)
    }

    // ── analytics ────────────────────────────────────────────────────────

    /// Daily rollups for a batch.
    pub fn analytics_for_batch(&self, batch_id: &str) -> Result<Vec<DailyAnalytics>> {
        let conn = self.conn()?;
        AnalyticsRepo::for_batch(&conn, batch_id)
    }

    /// Total executed actions for a profile on a day.
    pub fn daily_action_count(&self, profile_id: &str, date: &str) -> Result<i64> {
        let conn = self.conn()?;
        AnalyticsRepo::daily_action_count(&conn, profile_id, date)
    }

    // ── transactions ─────────────────────────────────────────────────────

    /// Apply a built schedule atomically and mark the batch running.
    ///
    /// Claims the batch (`pending → running`) and inserts every session
    /// with its actions, every relationship, and every conversation with
    /// its messages in one immediate transaction, so two racing starts
    /// cannot both insert a plan: the loser finds the batch already
    /// running and gets [`StoreError::IllegalTransition`]. Any failure
    /// rolls the whole schedule back (including the status claim); the
    /// caller then moves the batch to `failed`.
    pub fn apply_schedule(
        &self,
        batch_id: &str,
        sessions: &[PlannedSession],
        relationships: &[NewRelationship],
        conversations: &[PlannedConversation],
    ) -> Result<Vec<Session>> {
        let conn = self.conn()?;
        let tx = rusqlite::Transaction::new_unchecked(
            &conn,
            rusqlite::TransactionBehavior::Immediate,
        )?;

        let _ = BatchRepo::transition(&tx, batch_id, BatchStatus::Running)?;

        let mut inserted = Vec::with_capacity(sessions.len());
        for planned in sessions {
            let session = SessionRepo::insert(&tx, batch_id, &planned.session)?;
            for action in &planned.actions {
                let _ = ActionRepo::insert(&tx, &session.id, &session.profile_id, action)?;
            }
            inserted.push(session);
        }
        for relationship in relationships {
            let _ = RelationshipRepo::insert(&tx, relationship)?;
        }
        for planned in conversations {
            let conversation = ConversationRepo::insert(&tx, &planned.conversation)?;
            for message in &planned.messages {
                let _ = ConversationRepo::insert_message(&tx, &conversation.id, message)?;
            }
        }

        tx.commit()?;
        info!(
            batch_id,
            sessions = inserted.len(),
            relationships = relationships.len(),
            conversations = conversations.len(),
            "schedule applied"
        );
        Ok(inserted)
    }

    /// Record an action outcome atomically.
    ///
    /// Refuses if the owning batch is in a terminal status. Sets the
    /// action's `executed_at`/`success`/`details`, increments the owning
    /// session's `actions_completed`, folds the outcome into the daily
    /// analytics rollup, and stamps the relationship's last interaction
    /// for a successful targeted action.
    pub fn record_action_outcome(
        &self,
        action_id: &str,
        success: bool,
        details: &serde_json::Value,
    ) -> Result<ActionRecord> {
        let conn = self.conn()?;
        let tx = rusqlite::Transaction::new_unchecked(
            &conn,
            rusqlite::TransactionBehavior::Immediate,
        )?;

        let action = ActionRepo::require(&tx, action_id)?;
        let session = SessionRepo::require(&tx, &action.session_id)?;
        let batch = BatchRepo::require(&tx, &session.batch_id)?;
        if batch.status.is_terminal() {
            warn!(
                action_id,
                batch_id = %batch.id,
                status = %batch.status,
                "refusing outcome write against terminal batch"
            );
            return Err(StoreError::BatchTerminal(batch.id));
        }

        let executed = ActionRepo::mark_executed(&tx, action_id, success, details)?;
        let _ = tx.execute(
            "UPDATE sessions SET actions_completed = actions_completed + 1 WHERE id = ?1",
            rusqlite::params![session.id],
        )?;
        AnalyticsRepo::record_action(
            &tx,
            &batch.id,
            &action.profile_id,
            &today_iso(),
            action.action_type,
            success,
        )?;
        if success {
            if let Some(target) = action.target_profile_id.as_deref() {
                // Pairs without a planned relationship are left alone.
                let _ = RelationshipRepo::touch_interaction(&tx, &action.profile_id, target)?;
            }
        }

        tx.commit()?;
        Ok(executed)
    }

    /// Progress summary for a batch.
    pub fn batch_progress(&self, batch_id: &str) -> Result<BatchProgress> {
        let conn = self.conn()?;
        let batch = BatchRepo::require(&conn, batch_id)?;
        let (total, terminal, completed, planned, done) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(status IN ('completed', 'cancelled', 'failed')), 0),
                    COALESCE(SUM(status = 'completed'), 0),
                    COALESCE(SUM(actions_planned), 0),
                    COALESCE(SUM(actions_completed), 0)
             FROM sessions WHERE batch_id = ?1",
            rusqlite::params![batch_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;

        Ok(BatchProgress {
            batch_id: batch.id,
            status: batch.status,
            sessions_total: total,
            sessions_terminal: terminal,
            sessions_completed: completed,
            actions_planned: planned,
            actions_completed: done,
        })
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ember_core::enums::{
        ActionType, ActivityLevel, InteractionFrequency, MessageType, RelationshipType,
        SessionType,
    };

    fn store_with_profiles(n: usize) -> (WarmupStore, Vec<String>) {
        let store = WarmupStore::open_in_memory().unwrap();
        let personality = serde_json::json!({});
        let mut ids: Vec<String> = (0..n)
            .map(|i| {
                store
                    .create_profile(&CreateProfileParams {
                        display_name: &format!("P{i}"),
                        category: None,
                        personality: &personality,
                        activity_level: ActivityLevel::Medium,
                    })
                    .unwrap()
                    .id
            })
            .collect();
        ids.sort();
        (store, ids)
    }

    fn planned_session(profile_id: &str, actions: usize) -> PlannedSession {
        PlannedSession {
            session: NewSession {
                profile_id: profile_id.to_string(),
                session_type: SessionType::Engagement,
                planned_start_offset_secs: 0,
                planned_duration_secs: 1200,
                actions_planned: i64::try_from(actions).unwrap(),
            },
            actions: (0..actions)
                .map(|i| NewAction {
                    action_type: ActionType::Like,
                    target_profile_id: None,
                    plan_order: i64::try_from(i).unwrap(),
                    delay_before_secs: 20,
                })
                .collect(),
        }
    }

    #[test]
    fn apply_schedule_inserts_everything() {
        let (store, ids) = store_with_profiles(2);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();

        let sessions = vec![planned_session(&ids[0], 2), planned_session(&ids[1], 3)];
        let relationships = vec![NewRelationship {
            profile_a_id: ids[0].clone(),
            profile_b_id: ids[1].clone(),
            relationship_type: RelationshipType::MutualInterest,
            interaction_frequency: InteractionFrequency::High,
            a_follows_b: true,
            b_follows_a: true,
        }];
        let conversations = vec![PlannedConversation {
            conversation: NewConversation {
                profile_a_id: ids[0].clone(),
                profile_b_id: ids[1].clone(),
                theme: Some("travel".into()),
            },
            messages: vec![NewMessage {
                from_profile_id: ids[0].clone(),
                to_profile_id: ids[1].clone(),
                content: "hey!".into(),
                message_type: MessageType::Text,
                natural_score: 90,
                send_offset_secs: 60,
            }],
        }];

        let inserted = store
            .apply_schedule(&batch.id, &sessions, &relationships, &conversations)
            .unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(store.batch(&batch.id).unwrap().status, BatchStatus::Running);
        assert_eq!(store.actions_for_batch(&batch.id).unwrap().len(), 5);
        assert_eq!(store.relationships().unwrap().len(), 1);
        let convs = store.conversations().unwrap();
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].message_count, 1);
    }

    #[test]
    fn apply_schedule_rolls_back_on_failure() {
        let (store, ids) = store_with_profiles(2);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();

        let mut bad = planned_session(&ids[0], 2);
        // Duplicate plan_order violates UNIQUE(session_id, plan_order).
        bad.actions[1].plan_order = 0;
        let sessions = vec![planned_session(&ids[1], 2), bad];

        assert!(store.apply_schedule(&batch.id, &sessions, &[], &[]).is_err());
        assert!(store.sessions_for_batch(&batch.id).unwrap().is_empty());
        assert!(store.actions_for_batch(&batch.id).unwrap().is_empty());
        // The rollback also reverts the status claim.
        assert_eq!(store.batch(&batch.id).unwrap().status, BatchStatus::Pending);
    }

    #[test]
    fn apply_schedule_requires_pending_batch() {
        let (store, ids) = store_with_profiles(1);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        let plan = [planned_session(&ids[0], 1)];
        store.apply_schedule(&batch.id, &plan, &[], &[]).unwrap();

        assert_matches!(
            store.apply_schedule(&batch.id, &plan, &[], &[]),
            Err(StoreError::IllegalTransition { .. })
        );
        assert_eq!(store.sessions_for_batch(&batch.id).unwrap().len(), 1);
    }

    #[test]
    fn record_outcome_updates_session_and_analytics() {
        let (store, ids) = store_with_profiles(1);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        store
            .apply_schedule(&batch.id, &[planned_session(&ids[0], 2)], &[], &[])
            .unwrap();

        let actions = store.actions_for_batch(&batch.id).unwrap();
        let executed = store
            .record_action_outcome(&actions[0].id, true, &serde_json::json!({"ok": true}))
            .unwrap();
        assert_eq!(executed.success, Some(true));

        let session = store.session(&executed.session_id).unwrap();
        assert_eq!(session.actions_completed, 1);

        assert_eq!(
            store
                .daily_action_count(&ids[0], &today_iso())
                .unwrap(),
            1
        );
    }

    #[test]
    fn record_outcome_refused_on_terminal_batch() {
        let (store, ids) = store_with_profiles(1);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        store
            .apply_schedule(&batch.id, &[planned_session(&ids[0], 1)], &[], &[])
            .unwrap();
        store
            .transition_batch(&batch.id, BatchStatus::Cancelled)
            .unwrap();

        let actions = store.actions_for_batch(&batch.id).unwrap();
        assert_matches!(
            store.record_action_outcome(&actions[0].id, true, &serde_json::json!({})),
            Err(StoreError::BatchTerminal(_))
        );

        // Nothing was written.
        let session = store.session(&actions[0].session_id).unwrap();
        assert_eq!(session.actions_completed, 0);
        assert!(store.actions_for_batch(&batch.id).unwrap()[0]
            .executed_at
            .is_none());
    }

    #[test]
    fn batch_progress_aggregates_sessions() {
        let (store, ids) = store_with_profiles(2);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        let inserted = store
            .apply_schedule(
                &batch.id,
                &[planned_session(&ids[0], 2), planned_session(&ids[1], 4)],
                &[],
                &[],
            )
            .unwrap();
        store
            .set_session_status(&inserted[0].id, SessionStatus::Completed)
            .unwrap();

        let progress = store.batch_progress(&batch.id).unwrap();
        assert_eq!(progress.sessions_total, 2);
        assert_eq!(progress.sessions_terminal, 1);
        assert_eq!(progress.sessions_completed, 1);
        assert_eq!(progress.actions_planned, 6);
        assert_eq!(progress.actions_completed, 0);
        assert_eq!(progress.status, BatchStatus::Running);
    }

    #[test]
    fn profiles_in_active_batches_tracks_enrollment() {
        let (store, ids) = store_with_profiles(2);
        let batch = store
            .create_batch("b", 3600, &ids[..1], &serde_json::json!({}))
            .unwrap();
        store
            .apply_schedule(&batch.id, &[planned_session(&ids[0], 1)], &[], &[])
            .unwrap();

        let active = store.profiles_in_active_batches().unwrap();
        assert_eq!(active, vec![ids[0].clone()]);

        store
            .transition_batch(&batch.id, BatchStatus::Cancelled)
            .unwrap();
        assert!(store.profiles_in_active_batches().unwrap().is_empty());
    }

    #[test]
    fn record_outcome_touches_target_relationship() {
        let (store, ids) = store_with_profiles(2);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        let mut planned = planned_session(&ids[0], 1);
        planned.actions[0].action_type = ActionType::Follow;
        planned.actions[0].target_profile_id = Some(ids[1].clone());
        let relationships = vec![NewRelationship {
            profile_a_id: ids[0].clone(),
            profile_b_id: ids[1].clone(),
            relationship_type: RelationshipType::FollowBack,
            interaction_frequency: InteractionFrequency::Medium,
            a_follows_b: true,
            b_follows_a: false,
        }];
        store
            .apply_schedule(&batch.id, &[planned], &relationships, &[])
            .unwrap();

        let actions = store.actions_for_batch(&batch.id).unwrap();
        store
            .record_action_outcome(&actions[0].id, true, &serde_json::json!({}))
            .unwrap();

        let rels = store.relationships().unwrap();
        assert!(rels[0].last_interaction.is_some());
    }

    #[test]
    fn concurrent_pauses_admit_exactly_one() {
        let (store, ids) = store_with_profiles(1);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        store
            .apply_schedule(&batch.id, &[planned_session(&ids[0], 1)], &[], &[])
            .unwrap();

        let barrier = std::sync::Barrier::new(2);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        store.transition_batch(&batch.id, BatchStatus::Paused)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.batch(&batch.id).unwrap().status, BatchStatus::Paused);
    }

    #[test]
    fn cancel_racing_completion_keeps_first_terminal_status() {
        let (store, ids) = store_with_profiles(1);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        store
            .apply_schedule(&batch.id, &[planned_session(&ids[0], 1)], &[], &[])
            .unwrap();

        let barrier = std::sync::Barrier::new(2);
        let (cancelled, completed) = std::thread::scope(|s| {
            let cancel = s.spawn(|| {
                barrier.wait();
                store.transition_batch(&batch.id, BatchStatus::Cancelled)
            });
            let complete = s.spawn(|| {
                barrier.wait();
                store.transition_batch(&batch.id, BatchStatus::Completed)
            });
            (cancel.join().unwrap(), complete.join().unwrap())
        });

        // Exactly one terminal write wins; the other cannot overwrite it.
        assert_eq!(
            [cancelled.is_ok(), completed.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );
        let winner = if cancelled.is_ok() {
            BatchStatus::Cancelled
        } else {
            BatchStatus::Completed
        };
        assert_eq!(store.batch(&batch.id).unwrap().status, winner);
    }

    #[test]
    fn concurrent_session_terminal_writes_admit_exactly_one() {
        let (store, ids) = store_with_profiles(1);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        let inserted = store
            .apply_schedule(&batch.id, &[planned_session(&ids[0], 1)], &[], &[])
            .unwrap();
        store
            .set_session_status(&inserted[0].id, SessionStatus::Running)
            .unwrap();

        let barrier = std::sync::Barrier::new(2);
        let (completed, cancelled) = std::thread::scope(|s| {
            let complete = s.spawn(|| {
                barrier.wait();
                store.set_session_status(&inserted[0].id, SessionStatus::Completed)
            });
            let cancel = s.spawn(|| {
                barrier.wait();
                store.set_session_status(&inserted[0].id, SessionStatus::Cancelled)
            });
            (complete.join().unwrap(), cancel.join().unwrap())
        });

        assert_eq!(
            [completed.is_ok(), cancelled.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );
        assert!(store.session(&inserted[0].id).unwrap().status.is_terminal());
    }

    #[test]
    fn racing_schedule_applications_insert_one_plan() {
        let (store, ids) = store_with_profiles(1);
        let batch = store
            .create_batch("b", 3600, &ids, &serde_json::json!({}))
            .unwrap();
        let plan = [planned_session(&ids[0], 2)];

        let barrier = std::sync::Barrier::new(2);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        store.apply_schedule(&batch.id, &plan, &[], &[])
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.sessions_for_batch(&batch.id).unwrap().len(), 1);
        assert_eq!(store.batch(&batch.id).unwrap().status, BatchStatus::Running);
    }
}
