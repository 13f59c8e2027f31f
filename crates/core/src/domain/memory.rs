use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-conversation memory record, one per conversation id.
///
/// Cooldown fields are forward-only timestamp gates: once past, they are never
/// read as active, and every update writes an expiry strictly later than the
/// decision-time `now`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMemory {
    pub conversation_id: String,
    pub contact_email: Option<String>,
    pub greeted_until: Option<DateTime<Utc>>,
    pub escalation_until: Option<DateTime<Utc>>,
    pub form_cooldown_until: Option<DateTime<Utc>>,
    pub last_seen_at: DateTime<Utc>,
}

impl ConversationMemory {
    /// Explicit factory for the default record used when a conversation has
    /// never been seen. All cooldown fields start unset.
    pub fn fresh(conversation_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            contact_email: None,
            greeted_until: None,
            escalation_until: None,
            form_cooldown_until: None,
            last_seen_at: now,
        }
    }

    /// Merges a patch into the record. Fields absent from the patch keep
    /// their previous values; `last_seen_at` always advances to `now`.
    pub fn apply(&mut self, patch: MemoryPatch, now: DateTime<Utc>) {
        if let Some(contact_email) = patch.contact_email {
            self.contact_email = Some(contact_email);
        }
        if let Some(greeted_until) = patch.greeted_until {
            self.greeted_until = Some(greeted_until);
        }
        if let Some(escalation_until) = patch.escalation_until {
            self.escalation_until = Some(escalation_until);
        }
        if let Some(form_cooldown_until) = patch.form_cooldown_until {
            self.form_cooldown_until = Some(form_cooldown_until);
        }
        self.last_seen_at = now;
    }
}

/// Partial update produced by one processed turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryPatch {
    pub contact_email: Option<String>,
    pub greeted_until: Option<DateTime<Utc>>,
    pub escalation_until: Option<DateTime<Utc>>,
    pub form_cooldown_until: Option<DateTime<Utc>>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self.contact_email.is_none()
            && self.greeted_until.is_none()
            && self.escalation_until.is_none()
            && self.form_cooldown_until.is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{ConversationMemory, MemoryPatch};

    #[test]
    fn fresh_record_has_no_cooldowns() {
        let now = Utc::now();
        let memory = ConversationMemory::fresh("B-1", now);

        assert_eq!(memory.conversation_id, "B-1");
        assert_eq!(memory.contact_email, None);
        assert_eq!(memory.greeted_until, None);
        assert_eq!(memory.escalation_until, None);
        assert_eq!(memory.form_cooldown_until, None);
        assert_eq!(memory.last_seen_at, now);
    }

    #[test]
    fn apply_merges_only_patched_fields() {
        let start = Utc::now();
        let mut memory = ConversationMemory::fresh("B-1", start);
        memory.greeted_until = Some(start + Duration::hours(12));
        memory.contact_email = Some("ada@example.com".to_string());

        let later = start + Duration::minutes(5);
        memory.apply(
            MemoryPatch {
                form_cooldown_until: Some(later + Duration::hours(1)),
                ..MemoryPatch::default()
            },
            later,
        );

        assert_eq!(memory.greeted_until, Some(start + Duration::hours(12)));
        assert_eq!(memory.contact_email, Some("ada@example.com".to_string()));
        assert_eq!(memory.form_cooldown_until, Some(later + Duration::hours(1)));
        assert_eq!(memory.last_seen_at, later);
    }

    #[test]
    fn empty_patch_still_advances_last_seen_at() {
        let start = Utc::now();
        let mut memory = ConversationMemory::fresh("B-1", start);

        let later = start + Duration::minutes(3);
        memory.apply(MemoryPatch::default(), later);

        assert_eq!(memory.last_seen_at, later);
    }

    #[test]
    fn patch_emptiness_ignores_nothing() {
        assert!(MemoryPatch::default().is_empty());
        assert!(!MemoryPatch {
            contact_email: Some("ada@example.com".to_string()),
            ..MemoryPatch::default()
        }
        .is_empty());
    }
}
