//! Collaborator traits the engine depends on but does not implement.
//!
//! Personality blobs, message text, and action execution are all external
//! concerns; the engine treats their outputs as opaque. The stub and
//! simulated implementations here are deterministic enough for tests and
//! demo wiring.

use async_trait::async_trait;
use ember_core::enums::{ActionType, MessageTrigger};
use ember_core::types::{ActionRecord, Profile};

/// Context for a single generated message.
#[derive(Clone, Debug)]
pub struct MessageContext {
    /// What prompted the message.
    pub trigger: MessageTrigger,
    /// Interests of the recipient, for topical relevance.
    pub target_interests: Vec<String>,
    /// Optional sentiment hint.
    pub sentiment: Option<String>,
}

/// Result of executing one action.
#[derive(Clone, Debug)]
pub struct ActionOutcome {
    /// Whether the action succeeded.
    pub success: bool,
    /// Opaque details recorded verbatim on the action row.
    pub details: serde_json::Value,
}

/// Produces personality blobs for new profiles.
pub trait PersonaProvider: Send + Sync {
    /// Generate a personality blob. The engine stores it verbatim.
    fn generate_personality(&self) -> serde_json::Value;
}

/// Produces message text for conversation plans.
pub trait MessageProvider: Send + Sync {
    /// Generate one message from `from` to `to`.
    fn generate_message(&self, from: &Profile, to: &Profile, ctx: &MessageContext) -> String;
}

/// Executes a single planned action against the outside world.
///
/// An `Err` is folded into a failed outcome by the worker; it is data,
/// not a fatal condition.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute the given action.
    async fn execute(
        &self,
        action: &ActionRecord,
    ) -> std::result::Result<ActionOutcome, Box<dyn std::error::Error + Send + Sync>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Shipped implementations
// ─────────────────────────────────────────────────────────────────────────────

/// Failure behavior for [`SimulatedExecutor`].
#[derive(Clone, Debug, Default)]
enum SimMode {
    /// Every action succeeds.
    #[default]
    Succeed,
    /// Every action fails.
    Fail,
    /// Actions of the listed types fail; everything else succeeds.
    FailTypes(Vec<ActionType>),
}

/// Executor that fabricates outcomes without touching any platform.
///
/// The default succeeds everything; the failing constructors exist for
/// escalation tests.
#[derive(Clone, Debug, Default)]
pub struct SimulatedExecutor {
    mode: SimMode,
}

impl SimulatedExecutor {
    /// Executor that succeeds every action.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that fails every action.
    #[must_use]
    pub fn failing() -> Self {
        Self { mode: SimMode::Fail }
    }

    /// Executor that fails only actions of the given types.
    #[must_use]
    pub fn failing_types(types: Vec<ActionType>) -> Self {
        Self {
            mode: SimMode::FailTypes(types),
        }
    }
}

#[async_trait]
impl ActionExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        action: &ActionRecord,
    ) -> std::result::Result<ActionOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let success = match &self.mode {
            SimMode::Succeed => true,
            SimMode::Fail => false,
            SimMode::FailTypes(types) => !types.contains(&action.action_type),
        };
        Ok(ActionOutcome {
            success,
            details: serde_json::json!({
                "simulated": true,
                "actionType": action.action_type.as_sql(),
                "target": action.target_profile_id,
            }),
        })
    }
}

/// Deterministic persona provider for tests and demo wiring.
#[derive(Clone, Debug, Default)]
pub struct StubPersonaProvider;

impl PersonaProvider for StubPersonaProvider {
    fn generate_personality(&self) -> serde_json::Value {
        serde_json::json!({
            "interests": ["travel", "fitness", "coffee"],
            "tone": "casual",
            "emojiRate": 0.2,
        })
    }
}

/// Deterministic message provider keyed off the trigger and interests.
#[derive(Clone, Debug, Default)]
pub struct StubMessageProvider;

impl MessageProvider for StubMessageProvider {
    fn generate_message(&self, _from: &Profile, to: &Profile, ctx: &MessageContext) -> String {
        let topic = ctx
            .target_interests
            .first()
            .map_or("that", String::as_str);
        match ctx.trigger {
            MessageTrigger::Follow => format!("hey {}! saw your profile, love it", to.display_name),
            MessageTrigger::LikePost => format!("that {topic} post was great"),
            MessageTrigger::RandomDm => format!("hey! been really into {topic} lately, you too?"),
            MessageTrigger::Response => format!("totally agree about {topic}"),
        }
    }
}
