//! Daily analytics repository — per-profile, per-day action rollups.
//!
//! Rows are upserted from the action outcome transaction; consumers only
//! ever read them.

use ember_core::enums::ActionType;
use ember_core::types::DailyAnalytics;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::{Result, StoreError};

/// Analytics repository — stateless, every method takes `&Connection`.
pub struct AnalyticsRepo;

impl AnalyticsRepo {
    /// Fold one executed action into the day's rollup, creating the row if
    /// it doesn't exist yet.
    pub fn record_action(
        conn: &Connection,
        batch_id: &str,
        profile_id: &str,
        date: &str,
        action_type: ActionType,
        success: bool,
    ) -> Result<()> {
        let like = i64::from(action_type == ActionType::Like);
        let follow = i64::from(action_type == ActionType::Follow);
        let dm = i64::from(action_type == ActionType::Dm);
        let ok = i64::from(success);

        let _ = conn.execute(
            "INSERT INTO analytics_daily (batch_id, profile_id, date, actions_count,
                                          likes_given, follows_given, messages_sent,
                                          success_count)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7)
             ON CONFLICT (batch_id, profile_id, date) DO UPDATE SET
                 actions_count = actions_count + 1,
                 likes_given   = likes_given + excluded.likes_given,
                 follows_given = follows_given + excluded.follows_given,
                 messages_sent = messages_sent + excluded.messages_sent,
                 success_count = success_count + excluded.success_count",
            params![batch_id, profile_id, date, like, follow, dm, ok],
        )?;
        Ok(())
    }

    /// Fetch one rollup row.
    pub fn get(
        conn: &Connection,
        batch_id: &str,
        profile_id: &str,
        date: &str,
    ) -> Result<Option<DailyAnalytics>> {
        conn.query_row(
            "SELECT batch_id, profile_id, date, actions_count, likes_given, follows_given,
                    messages_sent, success_count
             FROM analytics_daily
             WHERE batch_id = ?1 AND profile_id = ?2 AND date = ?3",
            params![batch_id, profile_id, date],
            map_analytics,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// All rollup rows for a batch, ordered by date then profile.
    pub fn for_batch(conn: &Connection, batch_id: &str) -> Result<Vec<DailyAnalytics>> {
        let mut stmt = conn.prepare(
            "SELECT batch_id, profile_id, date, actions_count, likes_given, follows_given,
                    messages_sent, success_count
             FROM analytics_daily WHERE batch_id = ?1
             ORDER BY date ASC, profile_id ASC",
        )?;
        let rows = stmt.query_map(params![batch_id], map_analytics)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Total executed actions for a profile on a day, across batches.
    pub fn daily_action_count(conn: &Connection, profile_id: &str, date: &str) -> Result<i64> {
        conn.query_row(
            "SELECT COALESCE(SUM(actions_count), 0) FROM analytics_daily
             WHERE profile_id = ?1 AND date = ?2",
            params![profile_id, date],
            |row| row.get(0),
        )
        .map_err(StoreError::from)
    }
}

fn map_analytics(row: &Row<'_>) -> rusqlite::Result<DailyAnalytics> {
    Ok(DailyAnalytics {
        batch_id: row.get(0)?,
        profile_id: row.get(1)?,
        date: row.get(2)?,
        actions_count: row.get(3)?,
        likes_given: row.get(4)?,
        follows_given: row.get(5)?,
        messages_sent: row.get(6)?,
        success_count: row.get(7)?,
    })
}
