//! Entity structs mirroring the persisted row shape.
//!
//! These are the public API types returned by the store. Timestamps are
//! ISO 8601 strings (UTC); durations and offsets are whole seconds.

use serde::{Deserialize, Serialize};

use crate::enums::{
    ActionType, ActivityLevel, BatchStatus, InteractionFrequency, MessageType, RelationshipType,
    SessionStatus, SessionType,
};

/// An identity the system acts on behalf of.
///
/// Immutable once created except personality regeneration. Referenced,
/// never owned, by batches, sessions, and relationships.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    /// Profile ID (`prof-` prefix).
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Free-form category label.
    pub category: Option<String>,
    /// Opaque personality blob owned by the persona collaborator.
    pub personality: serde_json::Value,
    /// Activity level driving per-session action counts.
    pub activity_level: ActivityLevel,
    /// Whether the profile participates in new batches.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: String,
}

/// One warmup run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Batch {
    /// Batch ID (`batch-` prefix).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Total batch window in seconds.
    pub total_duration_secs: i64,
    /// Participant profile IDs.
    pub profile_ids: Vec<String>,
    /// Participant count; always equals `profile_ids.len()`.
    pub profiles_count: i64,
    /// Lifecycle status.
    pub status: BatchStatus,
    /// Serialized configuration snapshot taken at creation. A running
    /// batch is unaffected by later config edits.
    pub config: serde_json::Value,
    /// Creation timestamp.
    pub created_at: String,
    /// Set when the batch enters `running`.
    pub started_at: Option<String>,
    /// Set while the batch is `paused`, cleared on resume.
    pub paused_at: Option<String>,
    /// Accumulated pause time in seconds; shifts planned session starts.
    pub pause_total_secs: i64,
    /// Set when the batch reaches a terminal status.
    pub completed_at: Option<String>,
}

/// One profile's participation in a batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (`sess-` prefix).
    pub id: String,
    /// Owning batch.
    pub batch_id: String,
    /// Acting profile.
    pub profile_id: String,
    /// What the session spends its time doing.
    pub session_type: SessionType,
    /// Planned start, seconds after the batch start.
    pub planned_start_offset_secs: i64,
    /// Planned window length in seconds.
    pub planned_duration_secs: i64,
    /// Observed start; set at most once, on first execution.
    pub actual_start_time: Option<String>,
    /// Observed duration in seconds.
    pub actual_duration_secs: Option<i64>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Number of planned actions.
    pub actions_planned: i64,
    /// Number of executed actions; never exceeds `actions_planned`.
    pub actions_completed: i64,
}

/// One atomic step inside a session.
///
/// Immutable once `executed_at` is set; a retry is a new row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Action ID (`act-` prefix).
    pub id: String,
    /// Owning session.
    pub session_id: String,
    /// Acting profile.
    pub profile_id: String,
    /// What the action does.
    pub action_type: ActionType,
    /// Target profile for directed actions.
    pub target_profile_id: Option<String>,
    /// Strict execution order within the session.
    pub plan_order: i64,
    /// Humanized wait preceding execution, in seconds.
    pub delay_before_secs: i64,
    /// Execution timestamp; null until executed.
    pub executed_at: Option<String>,
    /// Outcome flag; null until executed.
    pub success: Option<bool>,
    /// Opaque executor result details. The engine never inspects these.
    pub details: serde_json::Value,
}

/// A directed-pair-aware link between two profiles.
///
/// The pair is stored canonically with `profile_a_id < profile_b_id`
/// so an unordered pair appears at most once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship ID (`rel-` prefix).
    pub id: String,
    /// Lexicographically smaller profile of the pair.
    pub profile_a_id: String,
    /// Lexicographically larger profile of the pair.
    pub profile_b_id: String,
    /// Kind of link.
    pub relationship_type: RelationshipType,
    /// How often the pair interacts.
    pub interaction_frequency: InteractionFrequency,
    /// Whether A follows B.
    pub a_follows_b: bool,
    /// Whether B follows A.
    pub b_follows_a: bool,
    /// Last observed interaction.
    pub last_interaction: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// A simulated DM thread between two profiles.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation ID (`conv-` prefix).
    pub id: String,
    /// Lexicographically smaller profile of the pair.
    pub profile_a_id: String,
    /// Lexicographically larger profile of the pair.
    pub profile_b_id: String,
    /// Topic the exchange orbits around.
    pub theme: Option<String>,
    /// Denormalized message count.
    pub message_count: i64,
    /// Timestamp of the newest message.
    pub last_message_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// One message inside a conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message ID (`msg-` prefix).
    pub id: String,
    /// Owning conversation.
    pub conversation_id: String,
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
    /// Creation timestamp.
    pub created_at: String,
}

/// Per-profile, per-day rollup of executed actions.
///
/// Write-mostly; read by the external reporting consumer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DailyAnalytics {
    /// Owning batch.
    pub batch_id: String,
    /// Acting profile.
    pub profile_id: String,
    /// Rollup day, `YYYY-MM-DD`.
    pub date: String,
    /// Total executed actions.
    pub actions_count: i64,
    /// Executed likes.
    pub likes_given: i64,
    /// Executed follows.
    pub follows_given: i64,
    /// Executed DMs.
    pub messages_sent: i64,
    /// Executed actions with `success = true`.
    pub success_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_serde_roundtrip() {
        let batch = Batch {
            id: "batch-1".into(),
            name: "Evening warmup".into(),
            total_duration_secs: 3600,
            profile_ids: vec!["prof-a".into(), "prof-b".into()],
            profiles_count: 2,
            status: BatchStatus::Pending,
            config: serde_json::json!({"hourly_action_cap": 200}),
            created_at: "2025-01-01T00:00:00Z".into(),
            started_at: None,
            paused_at: None,
            pause_total_secs: 0,
            completed_at: None,
        };
        let json = serde_json::to_string(&batch).unwrap();
        let back: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(back.profile_ids.len(), 2);
        assert_eq!(back.status, BatchStatus::Pending);
    }

    #[test]
    fn action_details_default_to_object() {
        let action = ActionRecord {
            id: "act-1".into(),
            session_id: "sess-1".into(),
            profile_id: "prof-a".into(),
            action_type: ActionType::Like,
            target_profile_id: Some("prof-b".into()),
            plan_order: 0,
            delay_before_secs: 20,
            executed_at: None,
            success: None,
            details: serde_json::json!({}),
        };
        assert!(action.executed_at.is_none());
        assert!(action.success.is_none());
    }
}
