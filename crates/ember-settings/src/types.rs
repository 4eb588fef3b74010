//! Settings type definitions.
//!
//! All field names are camelCase on the wire. Each type implements
//! [`Default`] with production default values, and `#[serde(default)]`
//! allows partial JSON — missing fields fall back to defaults during
//! deserialization.

use ember_core::{ActionType, ActivityLevel, InteractionFrequency, RelationshipType, SessionType};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type, snapshotted into every batch at creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WarmupSettings {
    /// Settings schema version.
    pub version: String,
    /// Session timing and stagger bounds.
    pub schedule: ScheduleSettings,
    /// Per-activity-level action counts and type distribution.
    pub actions: ActionSettings,
    /// Relationship graph and conversation generation.
    pub relationships: RelationshipSettings,
    /// Rate limiting.
    pub limits: LimitSettings,
}

impl Default for WarmupSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            schedule: ScheduleSettings::default(),
            actions: ActionSettings::default(),
            relationships: RelationshipSettings::default(),
            limits: LimitSettings::default(),
        }
    }
}

impl WarmupSettings {
    /// Validate cross-field constraints.
    ///
    /// Called once after loading; the engine assumes validated settings.
    pub fn validate(&self) -> Result<()> {
        let s = &self.schedule;
        if s.session_duration_min_secs == 0 || s.session_duration_min_secs > s.session_duration_max_secs {
            return Err(SettingsError::InvalidValue(format!(
                "session duration bounds invalid: [{}, {}]",
                s.session_duration_min_secs, s.session_duration_max_secs
            )));
        }
        if s.stagger_min_secs > s.stagger_max_secs {
            return Err(SettingsError::InvalidValue(format!(
                "stagger bounds invalid: [{}, {}]",
                s.stagger_min_secs, s.stagger_max_secs
            )));
        }
        if s.action_delay_min_secs > s.action_delay_max_secs {
            return Err(SettingsError::InvalidValue(format!(
                "action delay bounds invalid: [{}, {}]",
                s.action_delay_min_secs, s.action_delay_max_secs
            )));
        }
        for (level, range) in self.actions.ranges() {
            if range.min > range.max {
                return Err(SettingsError::InvalidValue(format!(
                    "action count range for {} inverted: [{}, {}]",
                    level.as_sql(),
                    range.min,
                    range.max
                )));
            }
        }
        let r = &self.relationships;
        if !(0.0..=1.0).contains(&r.connectivity_ratio)
            || r.ratio_min > r.ratio_max
            || !(0.0..=1.0).contains(&r.ratio_min)
            || !(0.0..=1.0).contains(&r.ratio_max)
        {
            return Err(SettingsError::InvalidValue(
                "connectivity ratio out of range".to_string(),
            ));
        }
        if r.dm_response_delay_min_secs > r.dm_response_delay_max_secs {
            return Err(SettingsError::InvalidValue(
                "DM response delay bounds inverted".to_string(),
            ));
        }
        if r.messages_per_conversation_min == 0
            || r.messages_per_conversation_min > r.messages_per_conversation_max
        {
            return Err(SettingsError::InvalidValue(
                "messages per conversation bounds invalid".to_string(),
            ));
        }
        if self.limits.hourly_action_cap == 0 {
            return Err(SettingsError::InvalidValue(
                "hourly action cap must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Connectivity ratio clamped into the configured `[min, max]` bounds.
    #[must_use]
    pub fn effective_connectivity_ratio(&self) -> f64 {
        self.relationships
            .connectivity_ratio
            .clamp(self.relationships.ratio_min, self.relationships.ratio_max)
    }
}

/// Session timing and stagger bounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSettings {
    /// Minimum planned session duration, seconds.
    pub session_duration_min_secs: u64,
    /// Maximum planned session duration, seconds.
    pub session_duration_max_secs: u64,
    /// Minimum gap between consecutive profile start times, seconds.
    pub stagger_min_secs: u64,
    /// Maximum gap between consecutive profile start times, seconds.
    pub stagger_max_secs: u64,
    /// Minimum humanized pre-action delay, seconds.
    pub action_delay_min_secs: u64,
    /// Maximum humanized pre-action delay, seconds.
    pub action_delay_max_secs: u64,
    /// Relative weight for `engagement` sessions.
    pub weight_engagement: u32,
    /// Relative weight for `hashtag_exploration` sessions.
    pub weight_hashtag_exploration: u32,
    /// Relative weight for `explore_feed` sessions.
    pub weight_explore_feed: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            session_duration_min_secs: 20 * 60,
            session_duration_max_secs: 50 * 60,
            stagger_min_secs: 2 * 60,
            stagger_max_secs: 10 * 60,
            action_delay_min_secs: 15,
            action_delay_max_secs: 45,
            weight_engagement: 50,
            weight_hashtag_exploration: 25,
            weight_explore_feed: 25,
        }
    }
}

impl ScheduleSettings {
    /// Session type weight table for weighted random choice.
    #[must_use]
    pub fn session_type_weights(&self) -> [(SessionType, u32); 3] {
        [
            (SessionType::Engagement, self.weight_engagement),
            (SessionType::HashtagExploration, self.weight_hashtag_exploration),
            (SessionType::ExploreFeed, self.weight_explore_feed),
        ]
    }
}

/// Inclusive bounds on planned actions per session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCountRange {
    /// Minimum planned actions.
    pub min: u32,
    /// Maximum planned actions.
    pub max: u32,
}

/// Per-activity-level action counts and the action-type distribution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionSettings {
    /// Action count range for light-activity profiles.
    pub light: ActionCountRange,
    /// Action count range for medium-activity profiles.
    pub medium: ActionCountRange,
    /// Action count range for high-activity profiles.
    pub high: ActionCountRange,
    /// Relative weight for `like` actions.
    pub weight_like: u32,
    /// Relative weight for `follow` actions.
    pub weight_follow: u32,
    /// Relative weight for `unfollow` actions.
    pub weight_unfollow: u32,
    /// Relative weight for `save` actions.
    pub weight_save: u32,
    /// Relative weight for `dm` actions.
    pub weight_dm: u32,
    /// Relative weight for `scroll` actions.
    pub weight_scroll: u32,
    /// Relative weight for `visit` actions.
    pub weight_visit: u32,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            light: ActionCountRange { min: 5, max: 12 },
            medium: ActionCountRange { min: 12, max: 26 },
            high: ActionCountRange { min: 22, max: 42 },
            weight_like: 40,
            weight_follow: 14,
            weight_unfollow: 2,
            weight_save: 8,
            weight_dm: 4,
            weight_scroll: 22,
            weight_visit: 10,
        }
    }
}

impl ActionSettings {
    /// Action count range for an activity level.
    #[must_use]
    pub fn range_for(&self, level: ActivityLevel) -> ActionCountRange {
        match level {
            ActivityLevel::Light => self.light,
            ActivityLevel::Medium => self.medium,
            ActivityLevel::High => self.high,
        }
    }

    /// All (level, range) pairs, for validation.
    #[must_use]
    pub fn ranges(&self) -> [(ActivityLevel, ActionCountRange); 3] {
        [
            (ActivityLevel::Light, self.light),
            (ActivityLevel::Medium, self.medium),
            (ActivityLevel::High, self.high),
        ]
    }

    /// Action type weight table for weighted random choice.
    #[must_use]
    pub fn action_type_weights(&self) -> [(ActionType, u32); 7] {
        [
            (ActionType::Like, self.weight_like),
            (ActionType::Follow, self.weight_follow),
            (ActionType::Unfollow, self.weight_unfollow),
            (ActionType::Save, self.weight_save),
            (ActionType::Dm, self.weight_dm),
            (ActionType::Scroll, self.weight_scroll),
            (ActionType::Visit, self.weight_visit),
        ]
    }
}

/// Relationship graph construction and simulated conversations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipSettings {
    /// Target fraction of unordered profile pairs that get an edge.
    pub connectivity_ratio: f64,
    /// Lower clamp bound for the connectivity ratio.
    pub ratio_min: f64,
    /// Upper clamp bound for the connectivity ratio.
    pub ratio_max: f64,
    /// Relative weight for `mutual_interest` edges.
    pub weight_mutual_interest: u32,
    /// Relative weight for `follow_back` edges.
    pub weight_follow_back: u32,
    /// Relative weight for `passive` edges.
    pub weight_passive: u32,
    /// Relative weight for low interaction frequency.
    pub weight_freq_low: u32,
    /// Relative weight for medium interaction frequency.
    pub weight_freq_medium: u32,
    /// Relative weight for high interaction frequency.
    pub weight_freq_high: u32,
    /// Probability that A follows B on a `mutual_interest` edge.
    pub follow_prob_mutual_interest: f64,
    /// Probability that A follows B on a `follow_back` edge.
    pub follow_prob_follow_back: f64,
    /// Probability that A follows B on a `passive` edge.
    pub follow_prob_passive: f64,
    /// Probability of the reciprocal follow, given the forward follow landed.
    pub reciprocal_follow_prob: f64,
    /// Whether `mutual_interest` edges get a conversation.
    pub converse_mutual_interest: bool,
    /// Whether `follow_back` edges get a conversation.
    pub converse_follow_back: bool,
    /// Whether `passive` edges get a conversation.
    pub converse_passive: bool,
    /// Minimum randomized DM response delay, seconds.
    pub dm_response_delay_min_secs: u64,
    /// Maximum randomized DM response delay, seconds.
    pub dm_response_delay_max_secs: u64,
    /// Minimum messages per generated conversation.
    pub messages_per_conversation_min: u32,
    /// Maximum messages per generated conversation.
    pub messages_per_conversation_max: u32,
}

impl Default for RelationshipSettings {
    fn default() -> Self {
        Self {
            connectivity_ratio: 0.5,
            ratio_min: 0.30,
            ratio_max: 0.70,
            weight_mutual_interest: 40,
            weight_follow_back: 35,
            weight_passive: 25,
            weight_freq_low: 30,
            weight_freq_medium: 50,
            weight_freq_high: 20,
            follow_prob_mutual_interest: 0.85,
            follow_prob_follow_back: 0.95,
            follow_prob_passive: 0.35,
            reciprocal_follow_prob: 0.7,
            converse_mutual_interest: true,
            converse_follow_back: true,
            converse_passive: false,
            dm_response_delay_min_secs: 30,
            dm_response_delay_max_secs: 600,
            messages_per_conversation_min: 2,
            messages_per_conversation_max: 6,
        }
    }
}

impl RelationshipSettings {
    /// Relationship type weight table for weighted random choice.
    #[must_use]
    pub fn type_weights(&self) -> [(RelationshipType, u32); 3] {
        [
            (RelationshipType::MutualInterest, self.weight_mutual_interest),
            (RelationshipType::FollowBack, self.weight_follow_back),
            (RelationshipType::Passive, self.weight_passive),
        ]
    }

    /// Interaction frequency weight table.
    #[must_use]
    pub fn frequency_weights(&self) -> [(InteractionFrequency, u32); 3] {
        [
            (InteractionFrequency::Low, self.weight_freq_low),
            (InteractionFrequency::Medium, self.weight_freq_medium),
            (InteractionFrequency::High, self.weight_freq_high),
        ]
    }

    /// Forward follow probability conditioned on the edge type.
    #[must_use]
    pub fn follow_prob(&self, ty: RelationshipType) -> f64 {
        match ty {
            RelationshipType::MutualInterest => self.follow_prob_mutual_interest,
            RelationshipType::FollowBack => self.follow_prob_follow_back,
            RelationshipType::Passive => self.follow_prob_passive,
        }
    }

    /// Whether an edge of this type warrants a simulated conversation.
    #[must_use]
    pub fn warrants_conversation(&self, ty: RelationshipType) -> bool {
        match ty {
            RelationshipType::MutualInterest => self.converse_mutual_interest,
            RelationshipType::FollowBack => self.converse_follow_back,
            RelationshipType::Passive => self.converse_passive,
        }
    }
}

/// Which windows the rate cap counts against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    /// One shared window across all profiles in the process.
    Global,
    /// One window per acting profile.
    PerProfile,
}

/// Rate limiting configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitSettings {
    /// Maximum admitted actions per rolling 60-minute window.
    pub hourly_action_cap: u32,
    /// Whether the cap is global or per-profile. The source system's cap
    /// wording was ambiguous, so both interpretations are supported.
    pub scope: RateLimitScope,
    /// Worker back-off after a denied admission, seconds.
    pub rate_denied_cooldown_secs: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            hourly_action_cap: 200,
            scope: RateLimitScope::Global,
            rate_denied_cooldown_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        WarmupSettings::default().validate().unwrap();
    }

    #[test]
    fn inverted_session_duration_rejected() {
        let mut settings = WarmupSettings::default();
        settings.schedule.session_duration_min_secs = 100;
        settings.schedule.session_duration_max_secs = 10;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_cap_rejected() {
        let mut settings = WarmupSettings::default();
        settings.limits.hourly_action_cap = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn ratio_clamped_to_bounds() {
        let mut settings = WarmupSettings::default();
        settings.relationships.connectivity_ratio = 0.95;
        assert!((settings.effective_connectivity_ratio() - 0.70).abs() < f64::EPSILON);
        settings.relationships.connectivity_ratio = 0.05;
        assert!((settings.effective_connectivity_ratio() - 0.30).abs() < f64::EPSILON);
        settings.relationships.connectivity_ratio = 0.5;
        assert!((settings.effective_connectivity_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_json_gets_defaults() {
        let settings: WarmupSettings =
            serde_json::from_str(r#"{"limits": {"hourlyActionCap": 50}}"#).unwrap();
        assert_eq!(settings.limits.hourly_action_cap, 50);
        assert_eq!(settings.limits.scope, RateLimitScope::Global);
        assert_eq!(settings.schedule.session_duration_min_secs, 1200);
    }

    #[test]
    fn range_for_level() {
        let actions = ActionSettings::default();
        assert!(actions.range_for(ActivityLevel::Light).max <= actions.range_for(ActivityLevel::High).max);
    }

    #[test]
    fn conversation_predicate_defaults() {
        let rel = RelationshipSettings::default();
        assert!(rel.warrants_conversation(RelationshipType::MutualInterest));
        assert!(rel.warrants_conversation(RelationshipType::FollowBack));
        assert!(!rel.warrants_conversation(RelationshipType::Passive));
    }
}
