use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use moxbot_core::cooldown::{decide, ReplyAction};
use moxbot_core::domain::memory::ConversationMemory;
use moxbot_core::errors::{ProcessError, SkipReason};
use moxbot_core::intent::{classify, Intent};
use moxbot_core::replies::ReplyCatalog;
use moxbot_db::repositories::MemoryRepository;
use moxbot_knowledge::Answerer;
use moxbot_moxo::{ConversationApi, MoxoError};

/// Fields extracted from one webhook delivery. Everything is optional here;
/// the router decides what counts as processable.
#[derive(Clone, Debug, Default)]
pub struct InboundEvent {
    pub conversation_id: Option<String>,
    pub message_text: Option<String>,
    pub sender_email: Option<String>,
}

/// Terminal state of one processed delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Replied { intent: Intent },
}

/// Per-conversation serialization for the memory read-modify-write cycle.
/// Deliveries for different conversations proceed in parallel; two rapid
/// messages in the same conversation queue behind one another instead of
/// racing on load/merge/persist.
#[derive(Clone, Default)]
struct ConversationLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ConversationLocks {
    async fn acquire(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Orchestrator for one inbound event: classify, consult the cooldown policy,
/// dispatch to the matching handler, send the reply, persist merged memory.
pub struct ConversationRouter {
    memories: Arc<dyn MemoryRepository>,
    platform: Arc<dyn ConversationApi>,
    answerer: Arc<dyn Answerer>,
    replies: ReplyCatalog,
    blocked_domain: Option<String>,
    locks: ConversationLocks,
}

impl ConversationRouter {
    pub fn new(
        memories: Arc<dyn MemoryRepository>,
        platform: Arc<dyn ConversationApi>,
        answerer: Arc<dyn Answerer>,
        replies: ReplyCatalog,
        blocked_domain: Option<String>,
    ) -> Self {
        Self {
            memories,
            platform,
            answerer,
            replies,
            blocked_domain,
            locks: ConversationLocks::default(),
        }
    }

    pub async fn process(&self, event: InboundEvent) -> Result<Outcome, ProcessError> {
        self.process_at(event, Utc::now()).await
    }

    pub async fn process_at(
        &self,
        event: InboundEvent,
        now: DateTime<Utc>,
    ) -> Result<Outcome, ProcessError> {
        let Some(text) = event.message_text.as_deref().filter(|text| !text.is_empty()) else {
            return Ok(Outcome::Skipped(SkipReason::MissingMessage));
        };
        let Some(conversation_id) =
            event.conversation_id.as_deref().filter(|id| !id.is_empty())
        else {
            return Ok(Outcome::Skipped(SkipReason::MissingConversationId));
        };

        if let (Some(email), Some(blocked)) = (&event.sender_email, &self.blocked_domain) {
            if email.to_lowercase().contains(&blocked.to_lowercase()) {
                return Ok(Outcome::Skipped(SkipReason::BlockedSender));
            }
        }

        let _turn = self.locks.acquire(conversation_id).await;

        let mut memory = self
            .memories
            .find(conversation_id)
            .await
            .map_err(|error| ProcessError::Persistence(error.to_string()))?
            .unwrap_or_else(|| ConversationMemory::fresh(conversation_id, now));

        let intent = classify(text);
        let mut decision = decide(&memory, intent, now);
        info!(
            event_name = "router.decided",
            conversation_id = %conversation_id,
            intent = %intent,
            action = ?decision.action,
            "reply path chosen"
        );

        let reply = match decision.action {
            ReplyAction::ConsultKnowledgeBase => Some(self.answerer.answer(text).await),
            action => self.replies.render(action),
        };

        if decision.action == ReplyAction::TriggerEscalation {
            // Fire-and-forget: a failed handoff must not block the reply.
            if let Err(error) = self.platform.open_human_routing(conversation_id).await {
                warn!(
                    event_name = "router.escalation_failed",
                    conversation_id = %conversation_id,
                    error = %error,
                    "human routing handoff failed; continuing with the reply"
                );
            }
        }

        let mut send_failure = None;
        if let Some(reply_text) = reply.as_deref().filter(|text| !text.is_empty()) {
            if let Err(error) = self.platform.send_message(conversation_id, reply_text).await {
                send_failure = Some(classify_send_failure(error));
            }
        }

        if let Some(email) = event.sender_email.filter(|email| !email.is_empty()) {
            decision.patch.contact_email = Some(email);
        }
        memory.apply(decision.patch, now);
        self.memories
            .save(memory)
            .await
            .map_err(|error| ProcessError::Persistence(error.to_string()))?;

        // A failed send is reported after persistence so the cooldown state
        // reflects the turn even when delivery broke.
        if let Some(failure) = send_failure {
            return Err(failure);
        }

        Ok(Outcome::Replied { intent })
    }
}

fn classify_send_failure(error: MoxoError) -> ProcessError {
    match error {
        MoxoError::TokenSigning(_) | MoxoError::TokenIssuance(_) => {
            ProcessError::Auth(error.to_string())
        }
        other => ProcessError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tokio::sync::Mutex;

    use moxbot_core::errors::{ProcessError, SkipReason};
    use moxbot_core::intent::Intent;
    use moxbot_core::replies::ReplyCatalog;
    use moxbot_db::repositories::{InMemoryMemoryRepository, MemoryRepository};
    use moxbot_knowledge::Answerer;
    use moxbot_moxo::{ConversationApi, MoxoError};

    use super::{ConversationRouter, InboundEvent, Outcome};

    #[derive(Default)]
    struct RecordingPlatform {
        sent: Mutex<Vec<(String, String)>>,
        escalated: Mutex<Vec<String>>,
        fail_sends: bool,
        fail_escalations: bool,
    }

    #[async_trait]
    impl ConversationApi for RecordingPlatform {
        async fn send_message(
            &self,
            conversation_id: &str,
            text: &str,
        ) -> Result<(), MoxoError> {
            if self.fail_sends {
                return Err(MoxoError::Send("connection reset".to_string()));
            }
            self.sent.lock().await.push((conversation_id.to_string(), text.to_string()));
            Ok(())
        }

        async fn open_human_routing(&self, conversation_id: &str) -> Result<(), MoxoError> {
            if self.fail_escalations {
                return Err(MoxoError::Escalation("routing endpoint down".to_string()));
            }
            self.escalated.lock().await.push(conversation_id.to_string());
            Ok(())
        }
    }

    struct CannedAnswerer(&'static str);

    #[async_trait]
    impl Answerer for CannedAnswerer {
        async fn answer(&self, _question: &str) -> String {
            self.0.to_string()
        }
    }

    struct Harness {
        router: ConversationRouter,
        memories: Arc<InMemoryMemoryRepository>,
        platform: Arc<RecordingPlatform>,
    }

    fn harness_with(platform: RecordingPlatform, blocked_domain: Option<&str>) -> Harness {
        let memories = Arc::new(InMemoryMemoryRepository::default());
        let platform = Arc::new(platform);
        let router = ConversationRouter::new(
            memories.clone(),
            platform.clone(),
            Arc::new(CannedAnswerer("Plans start at $10/month.")),
            ReplyCatalog::new(
                Some("https://cal.example.com/intro".to_string()),
                Some("https://example.com/apply".to_string()),
            ),
            blocked_domain.map(str::to_string),
        );
        Harness { router, memories, platform }
    }

    fn harness() -> Harness {
        harness_with(RecordingPlatform::default(), Some("ourcompany.com"))
    }

    fn event(conversation_id: &str, text: &str) -> InboundEvent {
        InboundEvent {
            conversation_id: Some(conversation_id.to_string()),
            message_text: Some(text.to_string()),
            sender_email: Some("customer@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn first_greeting_sends_full_reply_and_creates_memory() {
        let h = harness();
        let now = Utc::now();

        let outcome = h.router.process_at(event("C1", "Hi"), now).await.expect("process");

        assert_eq!(outcome, Outcome::Replied { intent: Intent::Greeting });
        let sent = h.platform.sent.lock().await.clone();
        assert_eq!(
            sent,
            vec![(
                "C1".to_string(),
                "👋 Hello! I'm your AI assistant. How can I help you today?".to_string()
            )]
        );

        let memory = h.memories.find("C1").await.expect("find").expect("memory created");
        assert_eq!(memory.greeted_until, Some(now + Duration::hours(12)));
        assert_eq!(memory.contact_email, Some("customer@example.com".to_string()));
        assert_eq!(memory.last_seen_at, now);
    }

    #[tokio::test]
    async fn repeat_greeting_inside_the_window_sends_short_reply_and_keeps_the_gate() {
        let h = harness();
        let start = Utc::now();
        h.router.process_at(event("C1", "Hi"), start).await.expect("first turn");

        let five_minutes_on = start + Duration::minutes(5);
        let outcome = h
            .router
            .process_at(event("C1", "hello again"), five_minutes_on)
            .await
            .expect("second turn");

        assert_eq!(outcome, Outcome::Replied { intent: Intent::Greeting });
        let sent = h.platform.sent.lock().await.clone();
        assert_eq!(sent[1].1, "Hello again! What can I help you with?");

        let memory = h.memories.find("C1").await.expect("find").expect("memory exists");
        assert_eq!(memory.greeted_until, Some(start + Duration::hours(12)));
        assert_eq!(memory.last_seen_at, five_minutes_on);
    }

    #[tokio::test]
    async fn form_request_sends_link_then_reminder_inside_the_hour() {
        let h = harness();
        let start = Utc::now();

        h.router.process_at(event("C2", "I need the form"), start).await.expect("first turn");
        let sent = h.platform.sent.lock().await.clone();
        assert!(sent[0].1.contains("https://example.com/apply"));

        let memory = h.memories.find("C2").await.expect("find").expect("memory exists");
        assert_eq!(memory.form_cooldown_until, Some(start + Duration::hours(1)));

        let twenty_minutes_on = start + Duration::minutes(20);
        h.router.process_at(event("C2", "apply form"), twenty_minutes_on).await.expect("second");
        let sent = h.platform.sent.lock().await.clone();
        assert_eq!(sent[1].1, "I already sent you the form above! ☝️");

        let memory = h.memories.find("C2").await.expect("find").expect("memory exists");
        assert_eq!(memory.form_cooldown_until, Some(start + Duration::hours(1)));
    }

    #[tokio::test]
    async fn meeting_request_sends_the_scheduling_link_statelessly() {
        let h = harness();
        let now = Utc::now();

        let outcome =
            h.router.process_at(event("C3", "can we book a meeting"), now).await.expect("process");

        assert_eq!(outcome, Outcome::Replied { intent: Intent::Meeting });
        let sent = h.platform.sent.lock().await.clone();
        assert!(sent[0].1.contains("https://cal.example.com/intro"));

        let memory = h.memories.find("C3").await.expect("find").expect("memory exists");
        assert_eq!(memory.greeted_until, None);
        assert_eq!(memory.form_cooldown_until, None);
    }

    #[tokio::test]
    async fn escalation_opens_human_routing_and_records_the_marker() {
        let h = harness();
        let now = Utc::now();

        let outcome = h
            .router
            .process_at(event("C4", "I want to talk to a human"), now)
            .await
            .expect("process");

        assert_eq!(outcome, Outcome::Replied { intent: Intent::Escalate });
        assert_eq!(h.platform.escalated.lock().await.clone(), vec!["C4".to_string()]);

        let memory = h.memories.find("C4").await.expect("find").expect("memory exists");
        assert_eq!(memory.escalation_until, Some(now + Duration::minutes(10)));
    }

    #[tokio::test]
    async fn failed_escalation_handoff_still_sends_the_reply() {
        let h = harness_with(
            RecordingPlatform { fail_escalations: true, ..RecordingPlatform::default() },
            None,
        );
        let now = Utc::now();

        let outcome =
            h.router.process_at(event("C4", "agent please"), now).await.expect("process");

        assert_eq!(outcome, Outcome::Replied { intent: Intent::Escalate });
        assert_eq!(h.platform.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn support_questions_are_answered_from_the_knowledge_base() {
        let h = harness();
        let now = Utc::now();

        let outcome = h
            .router
            .process_at(event("C5", "what does the pro plan cost?"), now)
            .await
            .expect("process");

        assert_eq!(outcome, Outcome::Replied { intent: Intent::Support });
        let sent = h.platform.sent.lock().await.clone();
        assert_eq!(sent[0].1, "Plans start at $10/month.");
    }

    #[tokio::test]
    async fn blocked_sender_produces_no_reply_and_no_memory_write() {
        let h = harness();
        let now = Utc::now();
        let event = InboundEvent {
            conversation_id: Some("C6".to_string()),
            message_text: Some("hello, I need the form".to_string()),
            sender_email: Some("staff@ourcompany.com".to_string()),
        };

        let outcome = h.router.process_at(event, now).await.expect("process");

        assert_eq!(outcome, Outcome::Skipped(SkipReason::BlockedSender));
        assert!(h.platform.sent.lock().await.is_empty());
        assert_eq!(h.memories.find("C6").await.expect("find"), None);
    }

    #[tokio::test]
    async fn missing_fields_are_acknowledged_skips() {
        let h = harness();
        let now = Utc::now();

        let no_text = InboundEvent {
            conversation_id: Some("C7".to_string()),
            ..InboundEvent::default()
        };
        let no_id = InboundEvent {
            message_text: Some("hello".to_string()),
            ..InboundEvent::default()
        };

        assert_eq!(
            h.router.process_at(no_text, now).await.expect("process"),
            Outcome::Skipped(SkipReason::MissingMessage)
        );
        assert_eq!(
            h.router.process_at(no_id, now).await.expect("process"),
            Outcome::Skipped(SkipReason::MissingConversationId)
        );
        assert!(h.platform.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_send_surfaces_transport_error_but_persists_memory() {
        let h = harness_with(
            RecordingPlatform { fail_sends: true, ..RecordingPlatform::default() },
            None,
        );
        let now = Utc::now();

        let result = h.router.process_at(event("C8", "Hi"), now).await;

        assert!(matches!(result, Err(ProcessError::Transport(_))));
        let memory = h.memories.find("C8").await.expect("find").expect("memory persisted");
        assert_eq!(memory.greeted_until, Some(now + Duration::hours(12)));
    }
}
