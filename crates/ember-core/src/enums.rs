//! Status and type enums shared across the store and the engine.
//!
//! Each enum round-trips through its SQL string form via `as_sql` /
//! `from_sql`; the strings match the `SQLite` CHECK constraint values.

use serde::{Deserialize, Serialize};

/// Batch lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Created, schedule not yet applied.
    Pending,
    /// Workers executing.
    Running,
    /// Suspended; resumable.
    Paused,
    /// Every session reached a terminal status.
    Completed,
    /// Cancelled by the caller; irreversible.
    Cancelled,
    /// Schedule construction aborted.
    Failed,
}

impl BatchStatus {
    /// Whether this status is final. No session activity may be persisted
    /// against a batch in a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether `next` is a legal transition from this status.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running | Self::Failed)
            | (Self::Running, Self::Paused | Self::Completed | Self::Cancelled | Self::Failed)
            | (Self::Paused, Self::Running | Self::Cancelled) => true,
            _ => false,
        }
    }

    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Parse the SQL string form.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Session lifecycle status, symmetric with [`BatchStatus`] but scoped
/// to one profile's participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Planned, worker not yet started.
    Pending,
    /// Worker executing actions.
    Running,
    /// Suspended at an action boundary.
    Paused,
    /// All planned actions executed.
    Completed,
    /// Stopped by batch cancellation.
    Cancelled,
    /// Escalated after consecutive action failures or a persistence failure.
    Failed,
}

impl SessionStatus {
    /// Whether this status is final.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Parse the SQL string form.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// How much a profile does per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Few actions per session.
    Light,
    /// Default.
    Medium,
    /// Many actions per session.
    High,
}

impl ActivityLevel {
    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse the SQL string form.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Self::Light),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// What a session spends its time doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Interact with existing connections.
    Engagement,
    /// Browse hashtag feeds.
    HashtagExploration,
    /// Browse the explore feed.
    ExploreFeed,
}

impl SessionType {
    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Engagement => "engagement",
            Self::HashtagExploration => "hashtag_exploration",
            Self::ExploreFeed => "explore_feed",
        }
    }

    /// Parse the SQL string form.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "engagement" => Some(Self::Engagement),
            "hashtag_exploration" => Some(Self::HashtagExploration),
            "explore_feed" => Some(Self::ExploreFeed),
            _ => None,
        }
    }
}

/// One atomic step inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Like a post.
    Like,
    /// Follow a profile.
    Follow,
    /// Unfollow a profile.
    Unfollow,
    /// Save a post.
    Save,
    /// Send a direct message.
    Dm,
    /// Scroll a feed.
    Scroll,
    /// Visit a profile page.
    Visit,
}

impl ActionType {
    /// Whether this action is directed at another profile.
    #[must_use]
    pub fn is_targeted(self) -> bool {
        matches!(self, Self::Like | Self::Follow | Self::Unfollow | Self::Dm | Self::Visit)
    }

    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Follow => "follow",
            Self::Unfollow => "unfollow",
            Self::Save => "save",
            Self::Dm => "dm",
            Self::Scroll => "scroll",
            Self::Visit => "visit",
        }
    }

    /// Parse the SQL string form.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "follow" => Some(Self::Follow),
            "unfollow" => Some(Self::Unfollow),
            "save" => Some(Self::Save),
            "dm" => Some(Self::Dm),
            "scroll" => Some(Self::Scroll),
            "visit" => Some(Self::Visit),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Kind of link between two profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Shared interests; biases toward mutual follows and conversation.
    MutualInterest,
    /// One side followed, the other followed back.
    FollowBack,
    /// Edge exists but rarely interacts.
    Passive,
}

impl RelationshipType {
    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::MutualInterest => "mutual_interest",
            Self::FollowBack => "follow_back",
            Self::Passive => "passive",
        }
    }

    /// Parse the SQL string form.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "mutual_interest" => Some(Self::MutualInterest),
            "follow_back" => Some(Self::FollowBack),
            "passive" => Some(Self::Passive),
            _ => None,
        }
    }
}

/// How often a relationship pair interacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionFrequency {
    /// Rare interaction.
    Low,
    /// Default.
    Medium,
    /// Frequent interaction.
    High,
}

impl InteractionFrequency {
    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse the SQL string form.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Kind of simulated DM content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Plain text.
    Text,
    /// Emoji-only reaction.
    Reaction,
    /// Question prompting a reply.
    Question,
}

impl MessageType {
    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Reaction => "reaction",
            Self::Question => "question",
        }
    }

    /// Parse the SQL string form.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "reaction" => Some(Self::Reaction),
            "question" => Some(Self::Question),
            _ => None,
        }
    }
}

/// What prompted a simulated message exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTrigger {
    /// A follow event.
    Follow,
    /// A liked post.
    LikePost,
    /// Unprompted DM.
    RandomDm,
    /// Reply within an ongoing exchange.
    Response,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_status_sql_roundtrip() {
        for status in [
            BatchStatus::Pending,
            BatchStatus::Running,
            BatchStatus::Paused,
            BatchStatus::Completed,
            BatchStatus::Cancelled,
            BatchStatus::Failed,
        ] {
            assert_eq!(BatchStatus::from_sql(status.as_sql()), Some(status));
        }
        assert_eq!(BatchStatus::from_sql("bogus"), None);
    }

    #[test]
    fn batch_terminal_states() {
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());
        assert!(BatchStatus::Failed.is_terminal());
        assert!(!BatchStatus::Running.is_terminal());
        assert!(!BatchStatus::Paused.is_terminal());
    }

    #[test]
    fn batch_transitions() {
        assert!(BatchStatus::Pending.can_transition_to(BatchStatus::Running));
        assert!(BatchStatus::Running.can_transition_to(BatchStatus::Paused));
        assert!(BatchStatus::Paused.can_transition_to(BatchStatus::Running));
        assert!(BatchStatus::Paused.can_transition_to(BatchStatus::Cancelled));
        // No running two ways out of terminal, no pause of pending
        assert!(!BatchStatus::Pending.can_transition_to(BatchStatus::Paused));
        assert!(!BatchStatus::Cancelled.can_transition_to(BatchStatus::Running));
        assert!(!BatchStatus::Completed.can_transition_to(BatchStatus::Cancelled));
        // Idempotent "transitions" are not transitions
        assert!(!BatchStatus::Paused.can_transition_to(BatchStatus::Paused));
    }

    #[test]
    fn session_status_sql_roundtrip() {
        for status in [
            SessionStatus::Pending,
            SessionStatus::Running,
            SessionStatus::Paused,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
            SessionStatus::Failed,
        ] {
            assert_eq!(SessionStatus::from_sql(status.as_sql()), Some(status));
        }
    }

    #[test]
    fn action_type_targeting() {
        assert!(ActionType::Follow.is_targeted());
        assert!(ActionType::Dm.is_targeted());
        assert!(!ActionType::Scroll.is_targeted());
        assert!(!ActionType::Save.is_targeted());
    }

    #[test]
    fn action_type_sql_roundtrip() {
        for ty in [
            ActionType::Like,
            ActionType::Follow,
            ActionType::Unfollow,
            ActionType::Save,
            ActionType::Dm,
            ActionType::Scroll,
            ActionType::Visit,
        ] {
            assert_eq!(ActionType::from_sql(ty.as_sql()), Some(ty));
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&SessionType::HashtagExploration).unwrap();
        assert_eq!(json, "\"hashtag_exploration\"");
        let back: SessionType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SessionType::HashtagExploration);
    }
}
