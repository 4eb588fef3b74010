//! Relationship repository — the simulated social graph.
//!
//! Every unordered profile pair appears at most once, stored canonically
//! with `profile_a_id < profile_b_id`. Insertion normalizes the pair (and
//! swaps the follow flags to match) so callers never need to care about
//! ordering.

use ember_core::enums::{InteractionFrequency, RelationshipType};
use ember_core::ids::{generate_id, now_iso};
use ember_core::types::Relationship;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::bad_enum;
use crate::errors::{Result, StoreError};

/// Parameters for inserting a relationship.
#[derive(Clone, Debug)]
pub struct NewRelationship {
    /// One profile of the pair; order is normalized on insert.
    pub profile_a_id: String,
    /// The other profile of the pair.
    pub profile_b_id: String,
    /// Kind of link.
    pub relationship_type: RelationshipType,
    /// How often the pair interacts.
    pub interaction_frequency: InteractionFrequency,
    /// Whether `profile_a_id` follows `profile_b_id` (pre-normalization).
    pub a_follows_b: bool,
    /// Whether `profile_b_id` follows `profile_a_id` (pre-normalization).
    pub b_follows_a: bool,
}

/// Relationship repository — stateless, every method takes `&Connection`.
pub struct RelationshipRepo;

impl RelationshipRepo {
    /// Insert a relationship, normalizing the pair to canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] for a self-pair; a duplicate
    /// pair surfaces as a constraint violation from `SQLite`.
    pub fn insert(conn: &Connection, new: &NewRelationship) -> Result<Relationship> {
        if new.profile_a_id == new.profile_b_id {
            return Err(StoreError::InvalidOperation(format!(
                "relationship requires two distinct profiles, got {} twice",
                new.profile_a_id
            )));
        }

        let (a, b, a_follows_b, b_follows_a) = if new.profile_a_id < new.profile_b_id {
            (
                new.profile_a_id.as_str(),
                new.profile_b_id.as_str(),
                new.a_follows_b,
                new.b_follows_a,
            )
        } else {
            (
                new.profile_b_id.as_str(),
                new.profile_a_id.as_str(),
                new.b_follows_a,
                new.a_follows_b,
            )
        };

        let id = generate_id("rel");
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO relationships (id, profile_a_id, profile_b_id, relationship_type,
                                        interaction_frequency, a_follows_b, b_follows_a,
                                        created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                a,
                b,
                new.relationship_type.as_sql(),
                new.interaction_frequency.as_sql(),
                a_follows_b,
                b_follows_a,
                now,
            ],
        )?;

        Ok(Relationship {
            id,
            profile_a_id: a.to_string(),
            profile_b_id: b.to_string(),
            relationship_type: new.relationship_type,
            interaction_frequency: new.interaction_frequency,
            a_follows_b,
            b_follows_a,
            last_interaction: None,
            created_at: now,
        })
    }

    /// Fetch the relationship for an unordered pair, if any.
    pub fn get_pair(conn: &Connection, x: &str, y: &str) -> Result<Option<Relationship>> {
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        conn.query_row(
            "SELECT id, profile_a_id, profile_b_id, relationship_type, interaction_frequency,
                    a_follows_b, b_follows_a, last_interaction, created_at
             FROM relationships WHERE profile_a_id = ?1 AND profile_b_id = ?2",
            params![a, b],
            map_relationship,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// List all relationships.
    pub fn list(conn: &Connection) -> Result<Vec<Relationship>> {
        let mut stmt = conn.prepare(
            "SELECT id, profile_a_id, profile_b_id, relationship_type, interaction_frequency,
                    a_follows_b, b_follows_a, last_interaction, created_at
             FROM relationships ORDER BY profile_a_id ASC, profile_b_id ASC",
        )?;
        let rows = stmt.query_map([], map_relationship)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// List relationships touching the given profile, either side.
    pub fn list_for_profile(conn: &Connection, profile_id: &str) -> Result<Vec<Relationship>> {
        let mut stmt = conn.prepare(
            "SELECT id, profile_a_id, profile_b_id, relationship_type, interaction_frequency,
                    a_follows_b, b_follows_a, last_interaction, created_at
             FROM relationships WHERE profile_a_id = ?1 OR profile_b_id = ?1
             ORDER BY profile_a_id ASC, profile_b_id ASC",
        )?;
        let rows = stmt.query_map(params![profile_id], map_relationship)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Stamp the last observed interaction for an unordered pair.
    ///
    /// Returns whether a relationship row was touched; pairs without one
    /// are a no-op, since not every targeted action crosses a planned
    /// edge of the graph.
    pub fn touch_interaction(conn: &Connection, x: &str, y: &str) -> Result<bool> {
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        let changed = conn.execute(
            "UPDATE relationships SET last_interaction = ?3
             WHERE profile_a_id = ?1 AND profile_b_id = ?2",
            params![a, b, now_iso()],
        )?;
        Ok(changed > 0)
    }
}

fn map_relationship(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    let type_raw: String = row.get(3)?;
    let freq_raw: String = row.get(4)?;
    Ok(Relationship {
        id: row.get(0)?,
        profile_a_id: row.get(1)?,
        profile_b_id: row.get(2)?,
        relationship_type: RelationshipType::from_sql(&type_raw)
            .ok_or_else(|| bad_enum(3, &type_raw))?,
        interaction_frequency: InteractionFrequency::from_sql(&freq_raw)
            .ok_or_else(|| bad_enum(4, &freq_raw))?,
        a_follows_b: row.get(5)?,
        b_follows_a: row.get(6)?,
        last_interaction: row.get(7)?,
        created_at: row.get(8)?,
    })
}
