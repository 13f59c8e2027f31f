use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use moxbot_core::config::MoxoConfig;

use crate::auth::TokenIssuer;
use crate::MoxoError;

/// Platform calls the conversation router depends on. One implementation
/// talks to Moxo; tests substitute their own.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Posts a chat message into the conversation.
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), MoxoError>;

    /// Closes bot routing for the conversation so a human picks it up.
    async fn open_human_routing(&self, conversation_id: &str) -> Result<(), MoxoError>;
}

pub struct MoxoClient {
    http: reqwest::Client,
    domain: String,
    issuer: TokenIssuer,
}

impl MoxoClient {
    pub fn new(http: reqwest::Client, config: &MoxoConfig) -> Self {
        let issuer = TokenIssuer::new(http.clone(), config);
        Self { http, domain: config.domain.clone(), issuer }
    }
}

#[async_trait]
impl ConversationApi for MoxoClient {
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), MoxoError> {
        let token = self.issuer.issue().await?;

        let url = format!("https://{}/v1/{}/messages", self.domain, conversation_id);
        let payload = json!({
            "message": {
                "text": text,
                "action": "chat",
            }
        });

        self.http
            .post(&url)
            .query(&[("access_token", token.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|error| MoxoError::Send(error.to_string()))?
            .error_for_status()
            .map_err(|error| MoxoError::Send(error.to_string()))?;

        info!(
            event_name = "moxo.message.sent",
            conversation_id = %conversation_id,
            chars = text.chars().count(),
            "chat message delivered"
        );
        Ok(())
    }

    async fn open_human_routing(&self, conversation_id: &str) -> Result<(), MoxoError> {
        let token = self.issuer.issue().await?;

        let url = format!("https://{}/v1/acd/{}/bots", self.domain, conversation_id);
        self.http
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| MoxoError::Escalation(error.to_string()))?
            .error_for_status()
            .map_err(|error| MoxoError::Escalation(error.to_string()))?;

        info!(
            event_name = "moxo.escalation.opened",
            conversation_id = %conversation_id,
            "bot routing closed, human routing opened"
        );
        Ok(())
    }
}
