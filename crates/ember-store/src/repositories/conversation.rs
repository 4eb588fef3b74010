//! Conversation and message repository — the simulated DM layer.
//!
//! Conversations use the same canonical-pair storage as relationships.
//! Message inserts keep the denormalized `message_count` and
//! `last_message_at` columns on the conversation row current.

use ember_core::enums::MessageType;
use ember_core::ids::{generate_id, now_iso};
use ember_core::types::{Conversation, Message};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::bad_enum;
use crate::errors::{Result, StoreError};

/// Parameters for inserting a conversation.
#[derive(Clone, Debug)]
pub struct NewConversation {
    /// One profile of the pair; order is normalized on insert.
    pub profile_a_id: String,
    /// The other profile of the pair.
    pub profile_b_id: String,
    /// Topic the exchange orbits around.
    pub theme: Option<String>,
}

/// Parameters for inserting a message.
#[derive(Clone, Debug)]
pub struct NewMessage {
    /// Sender profile.
    pub from_profile_id: String,
    /// Recipient profile.
    pub to_profile_id: String,
    /// Generated text.
    pub content: String,
    /// Content kind.
    pub message_type: MessageType,
    /// Naturalness score, 0-100.
    pub natural_score: i64,
    /// Randomized response delay, seconds after the previous message.
    pub send_offset_secs: i64,
}

/// Conversation repository — stateless, every method takes `&Connection`.
pub struct ConversationRepo;

impl ConversationRepo {
    /// Insert a conversation, normalizing the pair to canonical order.
    pub fn insert(conn: &Connection, new: &NewConversation) -> Result<Conversation> {
        if new.profile_a_id == new.profile_b_id {
            return Err(StoreError::InvalidOperation(format!(
                "conversation requires two distinct profiles, got {} twice",
                new.profile_a_id
            )));
        }
        let (a, b) = if new.profile_a_id < new.profile_b_id {
            (new.profile_a_id.as_str(), new.profile_b_id.as_str())
        } else {
            (new.profile_b_id.as_str(), new.profile_a_id.as_str())
        };

        let id = generate_id("conv");
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO conversations (id, profile_a_id, profile_b_id, theme, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, a, b, new.theme, now],
        )?;

        Ok(Conversation {
            id,
            profile_a_id: a.to_string(),
            profile_b_id: b.to_string(),
            theme: new.theme.clone(),
            message_count: 0,
            last_message_at: None,
            created_at: now,
        })
    }

    /// Fetch a conversation by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<Conversation>> {
        conn.query_row(
            "SELECT id, profile_a_id, profile_b_id, theme, message_count, last_message_at,
                    created_at
             FROM conversations WHERE id = ?1",
            params![id],
            map_conversation,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// List all conversations.
    pub fn list(conn: &Connection) -> Result<Vec<Conversation>> {
        let mut stmt = conn.prepare(
            "SELECT id, profile_a_id, profile_b_id, theme, message_count, last_message_at,
                    created_at
             FROM conversations ORDER BY profile_a_id ASC, profile_b_id ASC",
        )?;
        let rows = stmt.query_map([], map_conversation)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Append a message and refresh the conversation's counters.
    pub fn insert_message(
        conn: &Connection,
        conversation_id: &str,
        new: &NewMessage,
    ) -> Result<Message> {
        let id = generate_id("msg");
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO messages (id, conversation_id, from_profile_id, to_profile_id,
                                   content, message_type, natural_score, send_offset_secs,
                                   created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                conversation_id,
                new.from_profile_id,
                new.to_profile_id,
                new.content,
                new.message_type.as_sql(),
                new.natural_score,
                new.send_offset_secs,
                now,
            ],
        )?;
        let changed = conn.execute(
            "UPDATE conversations
             SET message_count = message_count + 1, last_message_at = ?2
             WHERE id = ?1",
            params![conversation_id, now],
        )?;
        if changed == 0 {
            return Err(StoreError::InvalidOperation(format!(
                "conversation not found: {conversation_id}"
            )));
        }

        Ok(Message {
            id,
            conversation_id: conversation_id.to_string(),
            from_profile_id: new.from_profile_id.clone(),
            to_profile_id: new.to_profile_id.clone(),
            content: new.content.clone(),
            message_type: new.message_type,
            natural_score: new.natural_score,
            send_offset_secs: new.send_offset_secs,
            created_at: now,
        })
    }

    /// List a conversation's messages in insertion order.
    pub fn messages(conn: &Connection, conversation_id: &str) -> Result<Vec<Message>> {
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, from_profile_id, to_profile_id, content,
                    message_type, natural_score, send_offset_secs, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id], map_message)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }
}

fn map_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        profile_a_id: row.get(1)?,
        profile_b_id: row.get(2)?,
        theme: row.get(3)?,
        message_count: row.get(4)?,
        last_message_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let type_raw: String = row.get(5)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        from_profile_id: row.get(2)?,
        to_profile_id: row.get(3)?,
        content: row.get(4)?,
        message_type: MessageType::from_sql(&type_raw).ok_or_else(|| bad_enum(5, &type_raw))?,
        natural_score: row.get(6)?,
        send_offset_secs: row.get(7)?,
        created_at: row.get(8)?,
    })
}
