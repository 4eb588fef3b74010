//! Pure relationship graph and conversation plan generation.
//!
//! Samples unordered profile pairs without replacement up to the
//! connectivity target, rolls a type, frequency, and follow flags per
//! edge, and builds an alternating-sender message plan for edges whose
//! type warrants a conversation. Like the schedule builder this is a pure
//! function over its RNG.

use ember_core::enums::MessageTrigger;
use ember_core::types::Profile;
use ember_settings::WarmupSettings;
use ember_store::{NewConversation, NewMessage, NewRelationship, PlannedConversation};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::errors::Result;
use crate::providers::{MessageContext, MessageProvider};
use crate::schedule::weighted_pick;

/// The generated graph: relationship rows plus conversation plans.
#[derive(Clone, Debug, Default)]
pub struct GraphPlan {
    /// Sampled edges, canonical pair order.
    pub relationships: Vec<NewRelationship>,
    /// Conversations for the edges that warrant one.
    pub conversations: Vec<PlannedConversation>,
}

/// Builds the simulated social graph for a batch; stateless.
pub struct RelationshipGraphBuilder;

impl RelationshipGraphBuilder {
    /// Build the graph plan for the given profiles.
    ///
    /// Fewer than two profiles yields an empty plan. The realized edge
    /// count equals `round(ratio * C(n, 2))` with the ratio clamped to
    /// the configured bounds.
    pub fn build(
        profiles: &[Profile],
        settings: &WarmupSettings,
        messages: &dyn MessageProvider,
        rng: &mut impl Rng,
    ) -> Result<GraphPlan> {
        if profiles.len() < 2 {
            return Ok(GraphPlan::default());
        }

        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for i in 0..profiles.len() {
            for j in (i + 1)..profiles.len() {
                pairs.push((i, j));
            }
        }
        let target = edge_target(pairs.len(), settings);
        pairs.shuffle(rng);
        pairs.truncate(target);

        let rel = &settings.relationships;
        let type_weights = rel.type_weights();
        let freq_weights = rel.frequency_weights();

        let mut plan = GraphPlan::default();
        for (i, j) in pairs {
            // Canonical pair order: the lexicographically smaller id is side A.
            let (i, j) = if profiles[i].id <= profiles[j].id {
                (i, j)
            } else {
                (j, i)
            };
            let relationship_type = weighted_pick(&type_weights, rng);
            let follow_p = rel.follow_prob(relationship_type);
            let a_follows_b = rng.random_bool(follow_p);
            // A standing follow strongly invites the follow-back.
            let b_follows_a = if a_follows_b {
                rng.random_bool(rel.reciprocal_follow_prob)
            } else {
                rng.random_bool(follow_p)
            };

            plan.relationships.push(NewRelationship {
                profile_a_id: profiles[i].id.clone(),
                profile_b_id: profiles[j].id.clone(),
                relationship_type,
                interaction_frequency: weighted_pick(&freq_weights, rng),
                a_follows_b,
                b_follows_a,
            });

            if rel.warrants_conversation(relationship_type) {
                plan.conversations
                    .push(build_conversation(&profiles[i], &profiles[j], settings, messages, rng));
            }
        }
        Ok(plan)
    }
}

/// `round(ratio * pair_count)`, ratio pre-clamped by the settings.
fn edge_target(pair_count: usize, settings: &WarmupSettings) -> usize {
    let ratio = settings.effective_connectivity_ratio();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let target = (ratio * pair_count as f64).round() as usize;
    target.min(pair_count)
}

/// An alternating-sender conversation between two profiles.
fn build_conversation(
    a: &Profile,
    b: &Profile,
    settings: &WarmupSettings,
    messages: &dyn MessageProvider,
    rng: &mut impl Rng,
) -> PlannedConversation {
    let rel = &settings.relationships;
    let count = rng.random_range(rel.messages_per_conversation_min..=rel.messages_per_conversation_max);
    let a_opens = rng.random_bool(0.5);

    let mut planned = Vec::with_capacity(count as usize);
    for idx in 0..count {
        let a_sends = (idx % 2 == 0) == a_opens;
        let (from, to) = if a_sends { (a, b) } else { (b, a) };
        let ctx = MessageContext {
            trigger: if idx == 0 {
                MessageTrigger::RandomDm
            } else {
                MessageTrigger::Response
            },
            target_interests: interests_of(to),
            sentiment: None,
        };
        planned.push(NewMessage {
            from_profile_id: from.id.clone(),
            to_profile_id: to.id.clone(),
            content: messages.generate_message(from, to, &ctx),
            message_type: ember_core::enums::MessageType::Text,
            natural_score: i64::from(rng.random_range(70_u32..=95)),
            send_offset_secs: to_i64(
                rng.random_range(rel.dm_response_delay_min_secs..=rel.dm_response_delay_max_secs),
            ),
        });
    }

    let theme = interests_of(b).into_iter().next();
    PlannedConversation {
        conversation: NewConversation {
            profile_a_id: a.id.clone(),
            profile_b_id: b.id.clone(),
            theme,
        },
        messages: planned,
    }
}

/// Interest strings from a personality blob; empty when absent.
fn interests_of(profile: &Profile) -> Vec<String> {
    profile.personality["interests"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
