//! # ember-engine
//!
//! The orchestration layer of the warmup system:
//!
//! - [`schedule`] — pure schedule construction (staggered session windows
//!   plus per-session action plans)
//! - [`graph`] — pure relationship graph and conversation plan generation
//! - [`rate`] — rolling-hour action rate limiter
//! - [`providers`] — collaborator traits for persona, message text, and
//!   action execution
//! - [`control`] — batch control signals and the pause-aware batch clock
//! - [`worker`] — one task per session driving its action plan
//! - [`orchestrator`] — batch lifecycle front door
//!
//! The engine holds no entity state of its own; everything durable lives
//! in [`ember_store::WarmupStore`].

#![deny(unsafe_code)]

pub mod control;
pub mod errors;
pub mod graph;
pub mod orchestrator;
pub mod providers;
pub mod rate;
pub mod schedule;
pub mod worker;

pub use control::{BatchClock, ControlSignal};
pub use errors::{EngineError, Result};
pub use graph::{GraphPlan, RelationshipGraphBuilder};
pub use orchestrator::Orchestrator;
pub use providers::{
    ActionExecutor, ActionOutcome, MessageContext, MessageProvider, PersonaProvider,
    SimulatedExecutor, StubMessageProvider, StubPersonaProvider,
};
pub use rate::RateLimiter;
pub use schedule::ScheduleBuilder;
pub use worker::SessionWorker;
