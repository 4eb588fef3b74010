//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`WarmupSettings::default()`]
//! 2. If `~/.ember/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate cross-field constraints
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{RateLimitScope, WarmupSettings};

/// Resolve the path to the settings file (`~/.ember/settings.json`).
#[must_use]
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ember").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WarmupSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the merged result fails validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<WarmupSettings> {
    let defaults = serde_json::to_value(WarmupSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: WarmupSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Each env var has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Floats must parse and lie within `[0, 1]` where applicable
/// - Invalid values are silently ignored (fall back to file/default)
pub fn apply_env_overrides(settings: &mut WarmupSettings) {
    // ── Rate limiting ───────────────────────────────────────────────
    if let Some(v) = read_env_u32("EMBER_HOURLY_ACTION_CAP", 1, 100_000) {
        settings.limits.hourly_action_cap = v;
    }
    if let Some(v) = read_env_string("EMBER_RATE_LIMIT_SCOPE") {
        match v.as_str() {
            "global" => settings.limits.scope = RateLimitScope::Global,
            "per_profile" => settings.limits.scope = RateLimitScope::PerProfile,
            other => {
                tracing::warn!(value = other, "invalid EMBER_RATE_LIMIT_SCOPE, ignoring");
            }
        }
    }
    if let Some(v) = read_env_u64("EMBER_RATE_COOLDOWN_SECS", 1, 3600) {
        settings.limits.rate_denied_cooldown_secs = v;
    }

    // ── Schedule bounds ─────────────────────────────────────────────
    if let Some(v) = read_env_u64("EMBER_SESSION_DURATION_MIN_SECS", 60, 86_400) {
        settings.schedule.session_duration_min_secs = v;
    }
    if let Some(v) = read_env_u64("EMBER_SESSION_DURATION_MAX_SECS", 60, 86_400) {
        settings.schedule.session_duration_max_secs = v;
    }
    if let Some(v) = read_env_u64("EMBER_STAGGER_MIN_SECS", 0, 86_400) {
        settings.schedule.stagger_min_secs = v;
    }
    if let Some(v) = read_env_u64("EMBER_STAGGER_MAX_SECS", 0, 86_400) {
        settings.schedule.stagger_max_secs = v;
    }

    // ── Relationship graph ──────────────────────────────────────────
    if let Some(v) = read_env_ratio("EMBER_CONNECTIVITY_RATIO") {
        settings.relationships.connectivity_ratio = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u32` within a range.
#[must_use]
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
#[must_use]
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a ratio in `[0, 1]`.
#[must_use]
pub fn parse_ratio(val: &str) -> Option<f64> {
    let n: f64 = val.parse().ok()?;
    (0.0..=1.0).contains(&n).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_ratio(name: &str) -> Option<f64> {
    let val = std::env::var(name).ok()?;
    let result = parse_ratio(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid ratio env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
