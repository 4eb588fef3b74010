//! Session repository — per-profile participation rows.
//!
//! Sessions are written in bulk when a schedule is applied and then driven
//! through their lifecycle by workers. `actual_start_time` is set at most
//! once; `actions_completed` is only incremented through the outcome
//! transaction in the store facade.

use ember_core::enums::{SessionStatus, SessionType};
use ember_core::ids::{generate_id, now_iso};
use ember_core::types::Session;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::bad_enum;
use crate::errors::{Result, StoreError};

/// Parameters for inserting a planned session.
#[derive(Clone, Debug)]
pub struct NewSession {
    /// Acting profile.
    pub profile_id: String,
    /// What the session spends its time doing.
    pub session_type: SessionType,
    /// Planned start, seconds after the batch start.
    pub planned_start_offset_secs: i64,
    /// Planned window length in seconds.
    pub planned_duration_secs: i64,
    /// Number of planned actions.
    pub actions_planned: i64,
}

/// Session repository — stateless, every method takes `&Connection`.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a planned session in `pending` status.
    pub fn insert(conn: &Connection, batch_id: &str, new: &NewSession) -> Result<Session> {
        let id = generate_id("sess");
        let _ = conn.execute(
            "INSERT INTO sessions (id, batch_id, profile_id, session_type,
                                   planned_start_offset_secs, planned_duration_secs,
                                   status, actions_planned, actions_completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, 0)",
            params![
                id,
                batch_id,
                new.profile_id,
                new.session_type.as_sql(),
                new.planned_start_offset_secs,
                new.planned_duration_secs,
                new.actions_planned,
            ],
        )?;

        Ok(Session {
            id,
            batch_id: batch_id.to_string(),
            profile_id: new.profile_id.clone(),
            session_type: new.session_type,
            planned_start_offset_secs: new.planned_start_offset_secs,
            planned_duration_secs: new.planned_duration_secs,
            actual_start_time: None,
            actual_duration_secs: None,
            status: SessionStatus::Pending,
            actions_planned: new.actions_planned,
            actions_completed: 0,
        })
    }

    /// Fetch a session by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<Session>> {
        conn.query_row(
            "SELECT id, batch_id, profile_id, session_type, planned_start_offset_secs,
                    planned_duration_secs, actual_start_time, actual_duration_secs, status,
                    actions_planned, actions_completed
             FROM sessions WHERE id = ?1",
            params![id],
            map_session,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Fetch a session by ID, erroring if missing.
    pub fn require(conn: &Connection, id: &str) -> Result<Session> {
        Self::get(conn, id)?.ok_or_else(|| StoreError::SessionNotFound(id.to_string()))
    }

    /// List a batch's sessions ordered by planned start.
    pub fn list_for_batch(conn: &Connection, batch_id: &str) -> Result<Vec<Session>> {
        let mut stmt = conn.prepare(
            "SELECT id, batch_id, profile_id, session_type, planned_start_offset_secs,
                    planned_duration_secs, actual_start_time, actual_duration_secs, status,
                    actions_planned, actions_completed
             FROM sessions WHERE batch_id = ?1
             ORDER BY planned_start_offset_secs ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![batch_id], map_session)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Move a session to `next`.
    ///
    /// Terminal statuses are final; any transition out of one is rejected.
    /// Self-transitions are rejected too, which keeps worker retry loops
    /// from silently re-marking a status. Both guards live in the
    /// `UPDATE` itself, so a writer racing another transition changes
    /// zero rows instead of overwriting a terminal status.
    pub fn set_status(conn: &Connection, id: &str, next: SessionStatus) -> Result<Session> {
        let changed = conn.execute(
            "UPDATE sessions SET status = ?2
             WHERE id = ?1 AND status <> ?2
               AND status NOT IN ('completed', 'cancelled', 'failed')",
            params![id, next.as_sql()],
        )?;
        if changed == 0 {
            let session = Self::require(conn, id)?;
            return Err(StoreError::IllegalTransition {
                entity: "session",
                id: id.to_string(),
                from: session.status.as_sql().to_string(),
                to: next.as_sql().to_string(),
            });
        }
        Self::require(conn, id)
    }

    /// Record the observed start time, first write wins.
    ///
    /// Returns the session either way; a second call is a no-op rather than
    /// an error because a resumed worker legitimately passes through here.
    pub fn mark_started(conn: &Connection, id: &str) -> Result<Session> {
        let _ = conn.execute(
            "UPDATE sessions SET actual_start_time = ?2
             WHERE id = ?1 AND actual_start_time IS NULL",
            params![id, now_iso()],
        )?;
        Self::require(conn, id)
    }

    /// Record the observed duration when a session ends.
    pub fn set_actual_duration(conn: &Connection, id: &str, secs: i64) -> Result<()> {
        let changed = conn.execute(
            "UPDATE sessions SET actual_duration_secs = ?2 WHERE id = ?1",
            params![id, secs],
        )?;
        if changed == 0 {
            return Err(StoreError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Count a batch's sessions that have reached a terminal status.
    pub fn terminal_count_for_batch(conn: &Connection, batch_id: &str) -> Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM sessions
             WHERE batch_id = ?1 AND status IN ('completed', 'cancelled', 'failed')",
            params![batch_id],
            |row| row.get(0),
        )
        .map_err(StoreError::from)
    }
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let type_raw: String = row.get(3)?;
    let status_raw: String = row.get(8)?;
    Ok(Session {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        profile_id: row.get(2)?,
        session_type: SessionType::from_sql(&type_raw).ok_or_else(|| bad_enum(3, &type_raw))?,
        planned_start_offset_secs: row.get(4)?,
        planned_duration_secs: row.get(5)?,
        actual_start_time: row.get(6)?,
        actual_duration_secs: row.get(7)?,
        status: SessionStatus::from_sql(&status_raw).ok_or_else(|| bad_enum(8, &status_raw))?,
        actions_planned: row.get(9)?,
        actions_completed: row.get(10)?,
    })
}
