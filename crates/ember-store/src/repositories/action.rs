//! Action repository — the atomic steps inside sessions.
//!
//! Rows start unexecuted (`executed_at` NULL) and become immutable once an
//! outcome is recorded. Retries are new rows planned by the caller, never
//! in-place updates.

use ember_core::enums::ActionType;
use ember_core::ids::{generate_id, now_iso};
use ember_core::types::ActionRecord;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{bad_enum, json_or_empty};
use crate::errors::{Result, StoreError};

/// Parameters for inserting a planned action.
#[derive(Clone, Debug)]
pub struct NewAction {
    /// What the action does.
    pub action_type: ActionType,
    /// Target profile for directed actions.
    pub target_profile_id: Option<String>,
    /// Strict execution order within the session.
    pub plan_order: i64,
    /// Humanized wait preceding execution, in seconds.
    pub delay_before_secs: i64,
}

/// Action repository — stateless, every method takes `&Connection`.
pub struct ActionRepo;

impl ActionRepo {
    /// Insert a planned (unexecuted) action.
    pub fn insert(
        conn: &Connection,
        session_id: &str,
        profile_id: &str,
        new: &NewAction,
    ) -> Result<ActionRecord> {
        let id = generate_id("act");
        let _ = conn.execute(
            "INSERT INTO actions (id, session_id, profile_id, action_type, target_profile_id,
                                  plan_order, delay_before_secs, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '{}')",
            params![
                id,
                session_id,
                profile_id,
                new.action_type.as_sql(),
                new.target_profile_id,
                new.plan_order,
                new.delay_before_secs,
            ],
        )?;

        Ok(ActionRecord {
            id,
            session_id: session_id.to_string(),
            profile_id: profile_id.to_string(),
            action_type: new.action_type,
            target_profile_id: new.target_profile_id.clone(),
            plan_order: new.plan_order,
            delay_before_secs: new.delay_before_secs,
            executed_at: None,
            success: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        })
    }

    /// Fetch an action by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<ActionRecord>> {
        conn.query_row(
            "SELECT id, session_id, profile_id, action_type, target_profile_id, plan_order,
                    delay_before_secs, executed_at, success, details
             FROM actions WHERE id = ?1",
            params![id],
            map_action,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Fetch an action by ID, erroring if missing.
    pub fn require(conn: &Connection, id: &str) -> Result<ActionRecord> {
        Self::get(conn, id)?.ok_or_else(|| StoreError::ActionNotFound(id.to_string()))
    }

    /// List a session's actions in plan order.
    pub fn list_for_session(conn: &Connection, session_id: &str) -> Result<Vec<ActionRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, profile_id, action_type, target_profile_id, plan_order,
                    delay_before_secs, executed_at, success, details
             FROM actions WHERE session_id = ?1 ORDER BY plan_order ASC",
        )?;
        let rows = stmt.query_map(params![session_id], map_action)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// List every action in a batch, grouped by session then plan order.
    pub fn list_for_batch(conn: &Connection, batch_id: &str) -> Result<Vec<ActionRecord>> {
        let mut stmt = conn.prepare(
            "SELECT a.id, a.session_id, a.profile_id, a.action_type, a.target_profile_id,
                    a.plan_order, a.delay_before_secs, a.executed_at, a.success, a.details
             FROM actions a
             JOIN sessions s ON s.id = a.session_id
             WHERE s.batch_id = ?1
             ORDER BY s.planned_start_offset_secs ASC, a.session_id ASC, a.plan_order ASC",
        )?;
        let rows = stmt.query_map(params![batch_id], map_action)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Record an execution outcome; first write wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if the action already has an
    /// outcome, [`StoreError::ActionNotFound`] if it doesn't exist.
    pub fn mark_executed(
        conn: &Connection,
        id: &str,
        success: bool,
        details: &serde_json::Value,
    ) -> Result<ActionRecord> {
        let changed = conn.execute(
            "UPDATE actions SET executed_at = ?2, success = ?3, details = ?4
             WHERE id = ?1 AND executed_at IS NULL",
            params![id, now_iso(), success, serde_json::to_string(details)?],
        )?;
        if changed == 0 {
            let existing = Self::require(conn, id)?;
            return Err(StoreError::InvalidOperation(format!(
                "action {} already executed at {}",
                existing.id,
                existing.executed_at.unwrap_or_default()
            )));
        }
        Self::require(conn, id)
    }
}

fn map_action(row: &Row<'_>) -> rusqlite::Result<ActionRecord> {
    let type_raw: String = row.get(3)?;
    let details_raw: String = row.get(9)?;
    Ok(ActionRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        profile_id: row.get(2)?,
        action_type: ActionType::from_sql(&type_raw).ok_or_else(|| bad_enum(3, &type_raw))?,
        target_profile_id: row.get(4)?,
        plan_order: row.get(5)?,
        delay_before_secs: row.get(6)?,
        executed_at: row.get(7)?,
        success: row.get(8)?,
        details: json_or_empty(&details_raw),
    })
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::repositories::batch::BatchRepo;
    use crate::repositories::profile::{CreateProfileParams, ProfileRepo};
    use crate::repositories::session::{NewSession, SessionRepo};
    use assert_matches::assert_matches;
    use ember_core::enums::{ActivityLevel, SessionType};
    use rusqlite::Connection;

    fn setup() -> (Connection, String, String) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();

        let personality = serde_json::json!({});
        let profile = ProfileRepo::create(
            &conn,
            &CreateProfileParams {
                display_name: "Ada",
                category: None,
                personality: &personality,
                activity_level: ActivityLevel::Medium,
            },
        )
        .unwrap();
        let batch = BatchRepo::create(
            &conn,
            "b",
            3600,
            &[profile.id.clone()],
            &serde_json::json!({}),
        )
        .unwrap();
        let session = SessionRepo::insert(
            &conn,
            &batch.id,
            &NewSession {
                profile_id: profile.id.clone(),
                session_type: SessionType::Engagement,
                planned_start_offset_secs: 0,
                planned_duration_secs: 1200,
                actions_planned: 3,
            },
        )
        .unwrap();
        let (session_id, profile_id) = (session.id, profile.id);
        (conn, session_id, profile_id)
    }

    fn like(order: i64) -> NewAction {
        NewAction {
            action_type: ActionType::Like,
            target_profile_id: Some("prof-target".into()),
            plan_order: order,
            delay_before_secs: 20,
        }
    }

    #[test]
    fn insert_and_list_in_plan_order() {
        let (conn, session_id, profile_id) = setup();
        ActionRepo::insert(&conn, &session_id, &profile_id, &like(2)).unwrap();
        ActionRepo::insert(&conn, &session_id, &profile_id, &like(0)).unwrap();
        ActionRepo::insert(&conn, &session_id, &profile_id, &like(1)).unwrap();

        let actions = ActionRepo::list_for_session(&conn, &session_id).unwrap();
        let orders: Vec<i64> = actions.iter().map(|a| a.plan_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(actions.iter().all(|a| a.executed_at.is_none()));
    }

    #[test]
    fn duplicate_plan_order_rejected() {
        let (conn, session_id, profile_id) = setup();
        ActionRepo::insert(&conn, &session_id, &profile_id, &like(0)).unwrap();
        assert!(ActionRepo::insert(&conn, &session_id, &profile_id, &like(0)).is_err());
    }

    #[test]
    fn mark_executed_is_write_once() {
        let (conn, session_id, profile_id) = setup();
        let action = ActionRepo::insert(&conn, &session_id, &profile_id, &like(0)).unwrap();

        let executed = ActionRepo::mark_executed(
            &conn,
            &action.id,
            true,
            &serde_json::json!({"latencyMs": 340}),
        )
        .unwrap();
        assert!(executed.executed_at.is_some());
        assert_eq!(executed.success, Some(true));
        assert_eq!(executed.details["latencyMs"], 340);

        assert_matches!(
            ActionRepo::mark_executed(&conn, &action.id, false, &serde_json::json!({})),
            Err(StoreError::InvalidOperation(_))
        );
    }

    #[test]
    fn mark_executed_missing_action() {
        let (conn, _, _) = setup();
        assert_matches!(
            ActionRepo::mark_executed(&conn, "act-nope", true, &serde_json::json!({})),
            Err(StoreError::ActionNotFound(_))
        );
    }
}
