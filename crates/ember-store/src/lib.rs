//! # ember-store
//!
//! `SQLite` persistence for the Ember warmup engine.
//!
//! Layered the usual way:
//!
//! - [`connection`] — r2d2 pool with WAL mode and foreign keys enforced
//! - [`migrations`] — embedded, versioned schema migrations
//! - [`repositories`] — stateless SQL per entity, every method takes
//!   `&Connection`
//! - [`WarmupStore`] — pooled facade owning the multi-row transactions
//!   (schedule application, action outcome recording)
//!
//! The store is the single source of truth: no component caches entity
//! state beyond a single operation.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod store;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use repositories::{
    AnalyticsRepo, BatchRepo, ConversationRepo, CreateProfileParams, NewAction, NewConversation,
    NewMessage, NewRelationship, NewSession, ProfileRepo, RelationshipRepo, SessionRepo,
};
pub use repositories::action::ActionRepo;
pub use store::{BatchProgress, PlannedConversation, PlannedSession, WarmupStore};
