use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::generation::CompletionProvider;
use crate::search::DocumentSearch;

/// Canned reply when a collaborator is unreachable or misbehaving.
const HUMAN_CONNECT_FALLBACK: &str =
    "I'm having trouble reaching my knowledge base right now. Would you like me to connect you with a human?";

/// Canned reply when the store has nothing relevant enough.
const NO_MATCH_FALLBACK: &str =
    "I don't know the answer to that one. Would you like me to connect you with a human?";

const GROUNDING_INSTRUCTION: &str =
    "Answer the user's question using only the context below. If the context does not contain the answer, say \"I don't know\".";

/// Seam the router depends on; `KnowledgeAnswerer` is the real implementation.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> String;
}

pub struct KnowledgeAnswerer {
    embedding: Arc<dyn EmbeddingProvider>,
    search: Arc<dyn DocumentSearch>,
    completion: Arc<dyn CompletionProvider>,
    similarity_threshold: f32,
    top_k: u32,
}

impl KnowledgeAnswerer {
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        search: Arc<dyn DocumentSearch>,
        completion: Arc<dyn CompletionProvider>,
        similarity_threshold: f32,
        top_k: u32,
    ) -> Self {
        Self { embedding, search, completion, similarity_threshold, top_k }
    }
}

#[async_trait]
impl Answerer for KnowledgeAnswerer {
    /// Embed → search → grounded completion, degrading to a canned string at
    /// the first collaborator failure. Never returns an error to the caller.
    async fn answer(&self, question: &str) -> String {
        let embedding = match self.embedding.embed(question).await {
            Ok(embedding) => embedding,
            Err(error) => {
                warn!(
                    event_name = "knowledge.embedding_failed",
                    error = %error,
                    "falling back to human-connect reply"
                );
                return HUMAN_CONNECT_FALLBACK.to_string();
            }
        };

        let documents =
            match self.search.similar(&embedding, self.similarity_threshold, self.top_k).await {
                Ok(documents) => documents,
                Err(error) => {
                    warn!(
                        event_name = "knowledge.search_failed",
                        error = %error,
                        "falling back to human-connect reply"
                    );
                    return HUMAN_CONNECT_FALLBACK.to_string();
                }
            };

        if documents.is_empty() {
            debug!(event_name = "knowledge.no_match", "no document cleared the threshold");
            return NO_MATCH_FALLBACK.to_string();
        }

        let context = documents
            .iter()
            .map(|document| document.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let system = format!("{GROUNDING_INSTRUCTION}\n\nContext:\n{context}");

        match self.completion.complete(&system, question).await {
            Ok(completion) => completion,
            Err(error) => {
                warn!(
                    event_name = "knowledge.generation_failed",
                    error = %error,
                    "falling back to human-connect reply"
                );
                HUMAN_CONNECT_FALLBACK.to_string()
            }
        }
    }
}
