use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use moxbot_core::config::KnowledgeConfig;

use crate::KnowledgeError;

/// One matched document from the store, ranked by similarity.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ScoredDocument {
    pub content: String,
    pub similarity: f32,
}

/// Vector-similarity search over the document store.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    async fn similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: u32,
    ) -> Result<Vec<ScoredDocument>, KnowledgeError>;
}

/// `match_documents`-style RPC: POST the query vector with a threshold and
/// row limit, get ranked rows back.
pub struct HttpDocumentSearch {
    http: reqwest::Client,
    search_url: Option<String>,
    api_key: Option<SecretString>,
}

impl HttpDocumentSearch {
    pub fn new(http: reqwest::Client, config: &KnowledgeConfig) -> Self {
        Self { http, search_url: config.search_url.clone(), api_key: config.api_key.clone() }
    }
}

#[async_trait]
impl DocumentSearch for HttpDocumentSearch {
    async fn similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: u32,
    ) -> Result<Vec<ScoredDocument>, KnowledgeError> {
        let search_url = self
            .search_url
            .as_ref()
            .ok_or(KnowledgeError::NotConfigured("knowledge.search_url"))?;
        let api_key =
            self.api_key.as_ref().ok_or(KnowledgeError::NotConfigured("knowledge.api_key"))?;

        let response = self
            .http
            .post(search_url)
            .bearer_auth(api_key.expose_secret())
            .json(&json!({
                "query_embedding": embedding,
                "match_threshold": threshold,
                "match_count": limit,
            }))
            .send()
            .await
            .map_err(|error| KnowledgeError::Request(error.to_string()))?
            .error_for_status()
            .map_err(|error| KnowledgeError::Request(error.to_string()))?;

        response
            .json::<Vec<ScoredDocument>>()
            .await
            .map_err(|error| KnowledgeError::MalformedResponse(error.to_string()))
    }
}
