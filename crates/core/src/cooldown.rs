use chrono::{DateTime, Duration, Utc};

use crate::domain::memory::{ConversationMemory, MemoryPatch};
use crate::intent::Intent;

/// Reply path chosen for one inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyAction {
    FullGreeting,
    ShortGreeting,
    SendFormLink,
    FormReminder,
    SendSchedulingLink,
    TriggerEscalation,
    ConsultKnowledgeBase,
}

/// Outcome of the cooldown policy: which reply to produce and which memory
/// fields the turn touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub action: ReplyAction,
    pub patch: MemoryPatch,
}

fn gate_open(until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match until {
        Some(until) => until < now,
        None => true,
    }
}

/// Decides the reply action for `intent` against the conversation's cooldown
/// state at `now`.
///
/// Cooldowns suppress a repeated scripted reply inside the window but never
/// suppress the turn entirely: a gated intent degrades to a shorter
/// acknowledgment instead of silence. Every expiry written here is strictly
/// later than `now`, so cooldown fields only ever move forward.
pub fn decide(memory: &ConversationMemory, intent: Intent, now: DateTime<Utc>) -> Decision {
    match intent {
        Intent::Greeting => {
            if gate_open(memory.greeted_until, now) {
                Decision {
                    action: ReplyAction::FullGreeting,
                    patch: MemoryPatch {
                        greeted_until: Some(now + Duration::hours(12)),
                        ..MemoryPatch::default()
                    },
                }
            } else {
                Decision { action: ReplyAction::ShortGreeting, patch: MemoryPatch::default() }
            }
        }
        Intent::Form => {
            if gate_open(memory.form_cooldown_until, now) {
                Decision {
                    action: ReplyAction::SendFormLink,
                    patch: MemoryPatch {
                        form_cooldown_until: Some(now + Duration::hours(1)),
                        ..MemoryPatch::default()
                    },
                }
            } else {
                Decision { action: ReplyAction::FormReminder, patch: MemoryPatch::default() }
            }
        }
        Intent::Meeting => {
            Decision { action: ReplyAction::SendSchedulingLink, patch: MemoryPatch::default() }
        }
        Intent::Escalate => Decision {
            action: ReplyAction::TriggerEscalation,
            patch: MemoryPatch {
                escalation_until: Some(now + Duration::minutes(10)),
                ..MemoryPatch::default()
            },
        },
        Intent::Support => {
            Decision { action: ReplyAction::ConsultKnowledgeBase, patch: MemoryPatch::default() }
        }
    }
}
