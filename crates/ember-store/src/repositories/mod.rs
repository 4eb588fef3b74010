//! Repository implementations for `SQLite` database operations.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`
//! parameter. This makes every operation a pure function from
//! (connection, input) → output, and lets the store facade compose
//! repositories inside a single transaction.

pub mod action;
pub mod analytics;
pub mod batch;
pub mod conversation;
pub mod profile;
pub mod relationship;
pub mod session;

pub use analytics::AnalyticsRepo;
pub use batch::BatchRepo;
pub use conversation::{ConversationRepo, NewConversation, NewMessage};
pub use profile::{CreateProfileParams, ProfileRepo};
pub use relationship::{NewRelationship, RelationshipRepo};
pub use session::{NewSession, SessionRepo};

pub use action::NewAction;

/// Build a rusqlite conversion error for a TEXT column holding a value
/// outside its CHECK-constrained enum set.
pub(crate) fn bad_enum(column: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        format!("unrecognized enum value: {value}").into(),
    )
}

/// Parse a JSON TEXT column, falling back to an empty object on garbage.
pub(crate) fn json_or_empty(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
}
