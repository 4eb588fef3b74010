//! Batch repository — warmup run rows and the batch status state machine.
//!
//! All status changes go through [`BatchRepo::transition`], which enforces
//! the legal edges and maintains the lifecycle timestamps, including the
//! accumulated pause time used to shift planned session starts on resume.

use chrono::DateTime;
use ember_core::enums::BatchStatus;
use ember_core::ids::{generate_id, now_iso};
use ember_core::types::Batch;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{bad_enum, json_or_empty};
use crate::errors::{Result, StoreError};

/// Batch repository — stateless, every method takes `&Connection`.
pub struct BatchRepo;

impl BatchRepo {
    /// Insert a new batch in `pending` status.
    pub fn create(
        conn: &Connection,
        name: &str,
        total_duration_secs: i64,
        profile_ids: &[String],
        config: &serde_json::Value,
    ) -> Result<Batch> {
        let id = generate_id("batch");
        let now = now_iso();
        let ids_json = serde_json::to_string(profile_ids)?;
        let config_json = serde_json::to_string(config)?;
        let count = i64::try_from(profile_ids.len()).unwrap_or(i64::MAX);

        let _ = conn.execute(
            "INSERT INTO batches (id, name, total_duration_secs, profile_ids, profiles_count,
                                  status, config, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)",
            params![id, name, total_duration_secs, ids_json, count, config_json, now],
        )?;

        Ok(Batch {
            id,
            name: name.to_string(),
            total_duration_secs,
            profile_ids: profile_ids.to_vec(),
            profiles_count: count,
            status: BatchStatus::Pending,
            config: config.clone(),
            created_at: now,
            started_at: None,
            paused_at: None,
            pause_total_secs: 0,
            completed_at: None,
        })
    }

    /// Fetch a batch by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<Batch>> {
        conn.query_row(
            "SELECT id, name, total_duration_secs, profile_ids, profiles_count, status,
                    config, created_at, started_at, paused_at, pause_total_secs, completed_at
             FROM batches WHERE id = ?1",
            params![id],
            map_batch,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Fetch a batch by ID, erroring if missing.
    pub fn require(conn: &Connection, id: &str) -> Result<Batch> {
        Self::get(conn, id)?.ok_or_else(|| StoreError::BatchNotFound(id.to_string()))
    }

    /// List batches, optionally filtered by status, newest first.
    pub fn list(conn: &Connection, status: Option<BatchStatus>) -> Result<Vec<Batch>> {
        let base = "SELECT id, name, total_duration_secs, profile_ids, profiles_count, status,
                           config, created_at, started_at, paused_at, pause_total_secs,
                           completed_at
                    FROM batches";
        let rows = if let Some(status) = status {
            let mut stmt = conn.prepare(&format!(
                "{base} WHERE status = ?1 ORDER BY created_at DESC, id DESC"
            ))?;
            let mapped = stmt.query_map(params![status.as_sql()], map_batch)?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = conn.prepare(&format!("{base} ORDER BY created_at DESC, id DESC"))?;
            let mapped = stmt.query_map([], map_batch)?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
    }

    /// Move a batch to `next`, enforcing the state machine.
    ///
    /// Side effects per edge:
    /// - `pending → running` stamps `started_at`
    /// - `running → paused` stamps `paused_at`
    /// - `paused → running` clears `paused_at` and folds the pause length
    ///   into `pause_total_secs`
    /// - any edge into a terminal status stamps `completed_at` (and folds
    ///   an open pause first, so the accounting stays consistent)
    ///
    /// Every `UPDATE` re-checks the expected current status in its
    /// `WHERE` clause, so two writers racing from the same observed
    /// status admit exactly one: the loser changes zero rows and gets
    /// the error. Terminal statuses stay final under concurrency.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IllegalTransition`] for edges the state
    /// machine forbids, including self-transitions, and for writers
    /// that lost a race against another transition.
    pub fn transition(conn: &Connection, id: &str, next: BatchStatus) -> Result<Batch> {
        let batch = Self::require(conn, id)?;
        if !batch.status.can_transition_to(next) {
            return Err(StoreError::IllegalTransition {
                entity: "batch",
                id: id.to_string(),
                from: batch.status.as_sql().to_string(),
                to: next.as_sql().to_string(),
            });
        }

        let now = now_iso();
        let open_pause = batch
            .paused_at
            .as_deref()
            .map_or(0, |paused_at| elapsed_secs(paused_at, &now));
        let pause_total = batch.pause_total_secs + open_pause;

        let changed = match (batch.status, next) {
            (BatchStatus::Pending, BatchStatus::Running) => conn.execute(
                "UPDATE batches SET status = 'running', started_at = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![id, now],
            )?,
            (BatchStatus::Running, BatchStatus::Paused) => conn.execute(
                "UPDATE batches SET status = 'paused', paused_at = ?2
                 WHERE id = ?1 AND status = 'running'",
                params![id, now],
            )?,
            (BatchStatus::Paused, BatchStatus::Running) => conn.execute(
                "UPDATE batches SET status = 'running', paused_at = NULL,
                                    pause_total_secs = ?2
                 WHERE id = ?1 AND status = 'paused'",
                params![id, pause_total],
            )?,
            (from, terminal) if terminal.is_terminal() => conn.execute(
                "UPDATE batches SET status = ?2, paused_at = NULL,
                                    pause_total_secs = ?3, completed_at = ?4
                 WHERE id = ?1 AND status = ?5",
                params![id, terminal.as_sql(), pause_total, now, from.as_sql()],
            )?,
            // can_transition_to admits no other edges
            _ => unreachable!("unguarded batch transition"),
        };
        if changed == 0 {
            // Lost a race; report against the status that won.
            let current = Self::require(conn, id)?;
            return Err(StoreError::IllegalTransition {
                entity: "batch",
                id: id.to_string(),
                from: current.status.as_sql().to_string(),
                to: next.as_sql().to_string(),
            });
        }

        Self::require(conn, id)
    }
}

/// Whole seconds between two ISO 8601 timestamps, clamped at zero.
fn elapsed_secs(from: &str, to: &str) -> i64 {
    match (
        DateTime::parse_from_rfc3339(from),
        DateTime::parse_from_rfc3339(to),
    ) {
        (Ok(a), Ok(b)) => (b - a).num_seconds().max(0),
        _ => 0,
    }
}

fn map_batch(row: &Row<'_>) -> rusqlite::Result<Batch> {
    let ids_raw: String = row.get(3)?;
    let status_raw: String = row.get(5)?;
    let config_raw: String = row.get(6)?;
    Ok(Batch {
        id: row.get(0)?,
        name: row.get(1)?,
        total_duration_secs: row.get(2)?,
        profile_ids: serde_json::from_str(&ids_raw).unwrap_or_default(),
        profiles_count: row.get(4)?,
        status: BatchStatus::from_sql(&status_raw).ok_or_else(|| bad_enum(5, &status_raw))?,
        config: json_or_empty(&config_raw),
        created_at: row.get(7)?,
        started_at: row.get(8)?,
        paused_at: row.get(9)?,
        pause_total_secs: row.get(10)?,
        completed_at: row.get(11)?,
    })
}
