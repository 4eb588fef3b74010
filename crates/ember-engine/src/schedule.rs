//! Pure schedule construction.
//!
//! Given the participant profiles, the batch window, and the settings
//! snapshot, build one planned session per profile: a staggered start
//! offset, a bounded duration clamped inside the batch window, and an
//! ordered action plan sized by the profile's activity level. The builder
//! owns no state and takes the RNG by parameter, so one seed plus the same
//! inputs always produces the same schedule.

use ember_core::enums::ActionType;
use ember_core::types::Profile;
use ember_settings::WarmupSettings;
use ember_store::{NewAction, NewSession, PlannedSession};
use rand::Rng;

use crate::errors::{EngineError, Result};

/// Builds a batch schedule; stateless.
pub struct ScheduleBuilder;

impl ScheduleBuilder {
    /// Build one planned session per profile.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an empty profile list or a
    /// non-positive batch window. No mutation has happened by then.
    pub fn build(
        profiles: &[Profile],
        total_duration_secs: i64,
        settings: &WarmupSettings,
        rng: &mut impl Rng,
    ) -> Result<Vec<PlannedSession>> {
        if profiles.is_empty() {
            return Err(EngineError::Validation(
                "schedule requires at least one profile".into(),
            ));
        }
        let Ok(total) = u64::try_from(total_duration_secs) else {
            return Err(EngineError::Validation(format!(
                "total_duration_secs must be positive, got {total_duration_secs}"
            )));
        };
        if total == 0 {
            return Err(EngineError::Validation(
                "total_duration_secs must be positive, got 0".into(),
            ));
        }

        let offsets = stagger_offsets(profiles.len(), total, settings, rng);

        let mut sessions = Vec::with_capacity(profiles.len());
        for (idx, profile) in profiles.iter().enumerate() {
            let offset = offsets[idx];
            let duration = session_duration(offset, total, settings, rng);
            let actions = build_actions(idx, profiles, settings, rng);

            sessions.push(PlannedSession {
                session: NewSession {
                    profile_id: profile.id.clone(),
                    session_type: weighted_pick(&settings.schedule.session_type_weights(), rng),
                    planned_start_offset_secs: to_i64(offset),
                    planned_duration_secs: to_i64(duration),
                    actions_planned: i64::try_from(actions.len()).unwrap_or(i64::MAX),
                },
                actions,
            });
        }
        Ok(sessions)
    }
}

/// Cumulative stagger offsets, compressed proportionally when the raw
/// staggering would push the last start past the batch window.
fn stagger_offsets(
    count: usize,
    total: u64,
    settings: &WarmupSettings,
    rng: &mut impl Rng,
) -> Vec<u64> {
    let sched = &settings.schedule;
    let mut offsets = Vec::with_capacity(count);
    let mut cursor = 0_u64;
    for idx in 0..count {
        if idx > 0 {
            cursor += rng.random_range(sched.stagger_min_secs..=sched.stagger_max_secs);
        }
        offsets.push(cursor);
    }

    // Every session must be able to start early enough to fit at least
    // the minimum duration inside the window.
    let max_start = total.saturating_sub(sched.session_duration_min_secs);
    if let Some(&last) = offsets.last() {
        if last > max_start {
            for offset in &mut offsets {
                *offset = *offset * max_start / last;
            }
        }
    }
    offsets
}

/// One session's duration: drawn from the configured bounds, clamped to
/// what remains of the batch window, and never below one second.
fn session_duration(offset: u64, total: u64, settings: &WarmupSettings, rng: &mut impl Rng) -> u64 {
    let sched = &settings.schedule;
    let drawn =
        rng.random_range(sched.session_duration_min_secs..=sched.session_duration_max_secs);
    drawn.min(total.saturating_sub(offset)).max(1)
}

/// One profile's ordered action plan.
fn build_actions(
    actor_idx: usize,
    profiles: &[Profile],
    settings: &WarmupSettings,
    rng: &mut impl Rng,
) -> Vec<NewAction> {
    let range = settings.actions.range_for(profiles[actor_idx].activity_level);
    let count = rng.random_range(range.min..=range.max);
    let delay = &settings.schedule;
    let type_weights = settings.actions.action_type_weights();

    (0..count)
        .map(|order| {
            let mut action_type = weighted_pick(&type_weights, rng);
            let target_profile_id = if action_type.is_targeted() {
                match pick_other(actor_idx, profiles, rng) {
                    Some(target) => Some(target),
                    // Single-profile batch: nothing to target, browse instead.
                    None => {
                        action_type = ActionType::Scroll;
                        None
                    }
                }
            } else {
                None
            };

            NewAction {
                action_type,
                target_profile_id,
                plan_order: i64::from(order),
                delay_before_secs: to_i64(
                    rng.random_range(delay.action_delay_min_secs..=delay.action_delay_max_secs),
                ),
            }
        })
        .collect()
}

/// A uniformly chosen profile id distinct from the actor.
fn pick_other(actor_idx: usize, profiles: &[Profile], rng: &mut impl Rng) -> Option<String> {
    if profiles.len() < 2 {
        return None;
    }
    let mut pick = rng.random_range(0..profiles.len() - 1);
    if pick >= actor_idx {
        pick += 1;
    }
    Some(profiles[pick].id.clone())
}

/// Weighted pick over a fixed table; the last entry wins a zero-weight
/// table.
pub(crate) fn weighted_pick<T: Copy, const N: usize>(
    weights: &[(T, u32); N],
    rng: &mut impl Rng,
) -> T {
    let total: u32 = weights.iter().map(|(_, weight)| weight).sum();
    if total == 0 {
        return weights[N - 1].0;
    }
    let mut roll = rng.random_range(0..total);
    for (item, weight) in weights {
        if roll < *weight {
            return *item;
        }
        roll -= weight;
    }
    weights[N - 1].0
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
