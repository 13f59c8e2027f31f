use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use moxbot_core::config::KnowledgeConfig;

use crate::KnowledgeError;

/// Turns question text into a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError>;
}

/// OpenAI-compatible `POST {base_url}/embeddings` client.
pub struct HttpEmbeddingProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(http: reqwest::Client, config: &KnowledgeConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.embedding_model.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        let api_key =
            self.api_key.as_ref().ok_or(KnowledgeError::NotConfigured("knowledge.api_key"))?;

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&json!({ "model": self.model, "input": text }))
            .send()
            .await
            .map_err(|error| KnowledgeError::Request(error.to_string()))?
            .error_for_status()
            .map_err(|error| KnowledgeError::Request(error.to_string()))?;

        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|error| KnowledgeError::MalformedResponse(error.to_string()))?;

        payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                KnowledgeError::MalformedResponse("embedding response had no data".to_string())
            })
    }
}
