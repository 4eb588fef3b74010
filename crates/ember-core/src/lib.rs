//! # ember-core
//!
//! Shared vocabulary for the Ember warmup engine.
//!
//! - **Entities**: `Profile`, `Batch`, `Session`, `ActionRecord`,
//!   `Relationship`, `Conversation`, `Message`, `DailyAnalytics`
//! - **Enums**: status and type enums with SQL string conversions
//! - **IDs**: prefixed UUID v7 generation and timestamp helpers

#![deny(unsafe_code)]

pub mod enums;
pub mod ids;
pub mod types;

pub use enums::{
    ActionType, ActivityLevel, BatchStatus, InteractionFrequency, MessageTrigger, MessageType,
    RelationshipType, SessionStatus, SessionType,
};
pub use ids::{generate_id, now_iso, today_iso};
pub use types::{
    ActionRecord, Batch, Conversation, DailyAnalytics, Message, Profile, Relationship, Session,
};
