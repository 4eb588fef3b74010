//! # ember-settings
//!
//! Configuration for the Ember warmup engine.
//!
//! Settings are loaded once and passed to the orchestrator as an
//! immutable snapshot at batch-start time; a running batch is never
//! re-read from disk. Loading flow: compiled defaults, deep-merged
//! with `~/.ember/settings.json` when present, then `EMBER_*`
//! environment overrides.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{
    ActionCountRange, ActionSettings, LimitSettings, RateLimitScope, RelationshipSettings,
    ScheduleSettings, WarmupSettings,
};
