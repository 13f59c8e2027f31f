use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use moxbot_core::config::KnowledgeConfig;

use crate::KnowledgeError;

/// Grounded chat completion: a system message carrying retrieved context and
/// a user message carrying the original question.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, KnowledgeError>;
}

/// OpenAI-compatible `POST {base_url}/chat/completions` client.
pub struct HttpCompletionProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

impl HttpCompletionProvider {
    pub fn new(http: reqwest::Client, config: &KnowledgeConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.generation_model.clone(),
        }
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, system: &str, user: &str) -> Result<String, KnowledgeError> {
        let api_key =
            self.api_key.as_ref().ok_or(KnowledgeError::NotConfigured("knowledge.api_key"))?;

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user },
                ],
            }))
            .send()
            .await
            .map_err(|error| KnowledgeError::Request(error.to_string()))?
            .error_for_status()
            .map_err(|error| KnowledgeError::Request(error.to_string()))?;

        let payload: CompletionResponse = response
            .json()
            .await
            .map_err(|error| KnowledgeError::MalformedResponse(error.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                KnowledgeError::MalformedResponse("completion response had no choices".to_string())
            })
    }
}
