use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::any;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::router::{ConversationRouter, InboundEvent, Outcome};
use moxbot_core::intent::Intent;

#[derive(Clone)]
pub struct WebhookState {
    pub router: Arc<ConversationRouter>,
}

/// Shape of a Moxo comment webhook delivery. Everything the router needs is
/// optional here so malformed deliveries can be acknowledged instead of
/// rejected.
#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    comment: Option<CommentPayload>,
    binder_id: Option<String>,
    user: Option<UserPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct CommentPayload {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UserPayload {
    email: Option<String>,
}

/// Acknowledgment sent back to the platform. Always HTTP 200: the platform
/// retries non-200 deliveries, and a retry would mean a duplicate reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ack {
    Plain(&'static str),
    Success { intent: Intent },
    Error { message: String },
}

impl IntoResponse for Ack {
    fn into_response(self) -> Response {
        match self {
            Self::Plain(text) => text.into_response(),
            Self::Success { intent } => {
                Json(json!({ "success": true, "intent": intent })).into_response()
            }
            Self::Error { message } => Json(json!({ "error": message })).into_response(),
        }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/webhook", any(receive)).with_state(state)
}

async fn receive(State(state): State<WebhookState>, method: Method, body: Bytes) -> Ack {
    handle(&state, &method, &body).await
}

async fn handle(state: &WebhookState, method: &Method, body: &[u8]) -> Ack {
    if *method != Method::POST {
        return Ack::Plain("OK");
    }

    let correlation_id = Uuid::new_v4().to_string();
    let payload = match serde_json::from_slice::<WebhookPayload>(body) {
        Ok(payload) => payload,
        Err(parse_error) => {
            debug!(
                event_name = "webhook.unparseable_body",
                correlation_id = %correlation_id,
                error = %parse_error,
                "acknowledging unparseable delivery"
            );
            return Ack::Plain("ignored");
        }
    };

    let event = InboundEvent {
        conversation_id: payload.binder_id,
        message_text: payload.comment.and_then(|comment| comment.content),
        sender_email: payload.user.and_then(|user| user.email),
    };

    match state.router.process(event).await {
        Ok(Outcome::Replied { intent }) => {
            info!(
                event_name = "webhook.processed",
                correlation_id = %correlation_id,
                intent = %intent,
                "delivery processed"
            );
            Ack::Success { intent }
        }
        Ok(Outcome::Skipped(reason)) => {
            info!(
                event_name = "webhook.skipped",
                correlation_id = %correlation_id,
                reason = reason.as_str(),
                "delivery acknowledged without processing"
            );
            Ack::Plain("ignored")
        }
        Err(process_error) => {
            // Absorbed by contract: the platform must still see success.
            error!(
                event_name = "webhook.process_failed",
                correlation_id = %correlation_id,
                error = %process_error,
                "delivery failed internally; acknowledging anyway"
            );
            Ack::Error { message: process_error.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::Method;

    use moxbot_core::intent::Intent;
    use moxbot_core::replies::ReplyCatalog;
    use moxbot_db::repositories::InMemoryMemoryRepository;
    use moxbot_knowledge::Answerer;
    use moxbot_moxo::{ConversationApi, MoxoError};

    use crate::router::ConversationRouter;

    use super::{handle, Ack, WebhookState};

    struct NoopPlatform {
        fail_sends: bool,
    }

    #[async_trait]
    impl ConversationApi for NoopPlatform {
        async fn send_message(&self, _conversation_id: &str, _text: &str) -> Result<(), MoxoError> {
            if self.fail_sends {
                return Err(MoxoError::Send("connection reset".to_string()));
            }
            Ok(())
        }

        async fn open_human_routing(&self, _conversation_id: &str) -> Result<(), MoxoError> {
            Ok(())
        }
    }

    struct SilentAnswerer;

    #[async_trait]
    impl Answerer for SilentAnswerer {
        async fn answer(&self, _question: &str) -> String {
            "answered".to_string()
        }
    }

    fn state(fail_sends: bool) -> WebhookState {
        WebhookState {
            router: Arc::new(ConversationRouter::new(
                Arc::new(InMemoryMemoryRepository::default()),
                Arc::new(NoopPlatform { fail_sends }),
                Arc::new(SilentAnswerer),
                ReplyCatalog::default(),
                Some("ourcompany.com".to_string()),
            )),
        }
    }

    fn delivery(text: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "comment": { "content": text },
            "binder_id": "B-1",
            "user": { "email": "customer@example.com" },
        }))
        .expect("serialize test delivery")
    }

    #[tokio::test]
    async fn non_post_deliveries_are_acknowledged_without_processing() {
        let ack = handle(&state(false), &Method::GET, b"").await;

        assert_eq!(ack, Ack::Plain("OK"));
    }

    #[tokio::test]
    async fn processed_delivery_acknowledges_with_the_resolved_intent() {
        let ack = handle(&state(false), &Method::POST, &delivery("Hi")).await;

        assert_eq!(ack, Ack::Success { intent: Intent::Greeting });
    }

    #[tokio::test]
    async fn unparseable_body_is_acknowledged_as_ignored() {
        let ack = handle(&state(false), &Method::POST, b"not json at all").await;

        assert_eq!(ack, Ack::Plain("ignored"));
    }

    #[tokio::test]
    async fn missing_message_is_acknowledged_as_ignored() {
        let body = serde_json::to_vec(&serde_json::json!({ "binder_id": "B-1" }))
            .expect("serialize test delivery");

        let ack = handle(&state(false), &Method::POST, &body).await;

        assert_eq!(ack, Ack::Plain("ignored"));
    }

    #[tokio::test]
    async fn internal_failure_is_acknowledged_with_an_error_body() {
        let ack = handle(&state(true), &Method::POST, &delivery("Hi")).await;

        match ack {
            Ack::Error { message } => assert!(message.contains("reply delivery failed")),
            other => panic!("expected error ack, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blocked_sender_is_acknowledged_as_ignored() {
        let body = serde_json::to_vec(&serde_json::json!({
            "comment": { "content": "hello" },
            "binder_id": "B-1",
            "user": { "email": "insider@ourcompany.com" },
        }))
        .expect("serialize test delivery");

        let ack = handle(&state(false), &Method::POST, &body).await;

        assert_eq!(ack, Ack::Plain("ignored"));
    }
}
