//! Profile repository — identity rows the rest of the system references.

use ember_core::enums::ActivityLevel;
use ember_core::ids::{generate_id, now_iso};
use ember_core::types::Profile;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{bad_enum, json_or_empty};
use crate::errors::{Result, StoreError};

/// Parameters for creating a new profile.
pub struct CreateProfileParams<'a> {
    /// Display name.
    pub display_name: &'a str,
    /// Optional category label.
    pub category: Option<&'a str>,
    /// Personality blob from the persona collaborator.
    pub personality: &'a serde_json::Value,
    /// Activity level driving per-session action counts.
    pub activity_level: ActivityLevel,
}

/// Profile repository — stateless, every method takes `&Connection`.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Insert a new profile and return it.
    pub fn create(conn: &Connection, params: &CreateProfileParams<'_>) -> Result<Profile> {
        let id = generate_id("prof");
        let now = now_iso();
        let personality = serde_json::to_string(params.personality)?;

        let _ = conn.execute(
            "INSERT INTO profiles (id, display_name, category, personality, activity_level,
                                   is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                id,
                params.display_name,
                params.category,
                personality,
                params.activity_level.as_sql(),
                now,
            ],
        )?;

        Ok(Profile {
            id,
            display_name: params.display_name.to_string(),
            category: params.category.map(String::from),
            personality: params.personality.clone(),
            activity_level: params.activity_level,
            is_active: true,
            created_at: now,
        })
    }

    /// Fetch a profile by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<Profile>> {
        conn.query_row(
            "SELECT id, display_name, category, personality, activity_level, is_active,
                    created_at
             FROM profiles WHERE id = ?1",
            params![id],
            map_profile,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Fetch a profile by ID, erroring if missing.
    pub fn require(conn: &Connection, id: &str) -> Result<Profile> {
        Self::get(conn, id)?.ok_or_else(|| StoreError::ProfileNotFound(id.to_string()))
    }

    /// List all profiles, newest first.
    pub fn list(conn: &Connection) -> Result<Vec<Profile>> {
        let mut stmt = conn.prepare(
            "SELECT id, display_name, category, personality, activity_level, is_active,
                    created_at
             FROM profiles ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], map_profile)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// List profiles eligible for new batches.
    pub fn list_active(conn: &Connection) -> Result<Vec<Profile>> {
        let mut stmt = conn.prepare(
            "SELECT id, display_name, category, personality, activity_level, is_active,
                    created_at
             FROM profiles WHERE is_active = 1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], map_profile)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Set the active flag.
    pub fn set_active(conn: &Connection, id: &str, active: bool) -> Result<()> {
        let changed = conn.execute(
            "UPDATE profiles SET is_active = ?2 WHERE id = ?1",
            params![id, active],
        )?;
        if changed == 0 {
            return Err(StoreError::ProfileNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Replace the personality blob.
    pub fn update_personality(
        conn: &Connection,
        id: &str,
        personality: &serde_json::Value,
    ) -> Result<()> {
        let changed = conn.execute(
            "UPDATE profiles SET personality = ?2 WHERE id = ?1",
            params![id, serde_json::to_string(personality)?],
        )?;
        if changed == 0 {
            return Err(StoreError::ProfileNotFound(id.to_string()));
        }
        Ok(())
    }

    /// IDs of profiles enrolled in a non-terminal batch.
    ///
    /// A profile may participate in at most one live batch at a time;
    /// batch creation rejects any profile this query returns.
    pub fn ids_in_active_batches(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT s.profile_id
             FROM sessions s
             JOIN batches b ON b.id = s.batch_id
             WHERE b.status IN ('pending', 'running', 'paused')
             ORDER BY s.profile_id",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }
}

fn map_profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    let activity_raw: String = row.get(4)?;
    let personality_raw: String = row.get(3)?;
    Ok(Profile {
        id: row.get(0)?,
        display_name: row.get(1)?,
        category: row.get(2)?,
        personality: json_or_empty(&personality_raw),
        activity_level: ActivityLevel::from_sql(&activity_raw)
            .ok_or_else(|| bad_enum(4, &activity_raw))?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn params<'a>(name: &'a str, personality: &'a serde_json::Value) -> CreateProfileParams<'a> {
        CreateProfileParams {
            display_name: name,
            category: Some("fitness"),
            personality,
            activity_level: ActivityLevel::Medium,
        }
    }

    #[test]
    fn create_and_get_roundtrip() {
        let conn = setup();
        let personality = serde_json::json!({"interests": ["running"]});
        let created = ProfileRepo::create(&conn, &params("Ada", &personality)).unwrap();

        let fetched = ProfileRepo::get(&conn, &created.id).unwrap().unwrap();
        assert_eq!(fetched.display_name, "Ada");
        assert_eq!(fetched.category.as_deref(), Some("fitness"));
        assert_eq!(fetched.activity_level, ActivityLevel::Medium);
        assert!(fetched.is_active);
        assert_eq!(fetched.personality["interests"][0], "running");
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = setup();
        assert!(ProfileRepo::get(&conn, "prof-nope").unwrap().is_none());
        assert!(matches!(
            ProfileRepo::require(&conn, "prof-nope"),
            Err(StoreError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn set_active_filters_listing() {
        let conn = setup();
        let personality = serde_json::json!({});
        let a = ProfileRepo::create(&conn, &params("A", &personality)).unwrap();
        let _b = ProfileRepo::create(&conn, &params("B", &personality)).unwrap();

        ProfileRepo::set_active(&conn, &a.id, false).unwrap();
        let active = ProfileRepo::list_active(&conn).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].display_name, "B");
        assert_eq!(ProfileRepo::list(&conn).unwrap().len(), 2);
    }

    #[test]
    fn update_personality_replaces_blob() {
        let conn = setup();
        let personality = serde_json::json!({"tone": "dry"});
        let p = ProfileRepo::create(&conn, &params("A", &personality)).unwrap();

        ProfileRepo::update_personality(&conn, &p.id, &serde_json::json!({"tone": "warm"}))
            .unwrap();
        let fetched = ProfileRepo::get(&conn, &p.id).unwrap().unwrap();
        assert_eq!(fetched.personality["tone"], "warm");
    }

    #[test]
    fn no_profiles_active_when_no_batches() {
        let conn = setup();
        let personality = serde_json::json!({});
        ProfileRepo::create(&conn, &params("A", &personality)).unwrap();
        assert!(ProfileRepo::ids_in_active_batches(&conn).unwrap().is_empty());
    }
}
