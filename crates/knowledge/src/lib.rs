//! Knowledge-base answering for free-form support questions.
//!
//! The pipeline is embed → similarity search → grounded completion, with each
//! stage behind a trait (`EmbeddingProvider`, `DocumentSearch`,
//! `CompletionProvider`) and HTTP implementations for OpenAI-compatible
//! endpoints plus a `match_documents`-style search RPC.
//!
//! The composition rule is soft failure: `KnowledgeAnswerer::answer` never
//! returns an error. A collaborator failure or an empty result set degrades to
//! a canned connect-to-a-human reply, because the router has already committed
//! to answering something.

pub mod answerer;
pub mod embedding;
pub mod generation;
pub mod search;

use thiserror::Error;

pub use answerer::{Answerer, KnowledgeAnswerer};
pub use embedding::{EmbeddingProvider, HttpEmbeddingProvider};
pub use generation::{CompletionProvider, HttpCompletionProvider};
pub use search::{DocumentSearch, HttpDocumentSearch, ScoredDocument};

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned an unusable response: {0}")]
    MalformedResponse(String),
    #[error("provider is not configured: {0}")]
    NotConfigured(&'static str),
}
