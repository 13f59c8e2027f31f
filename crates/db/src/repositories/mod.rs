use async_trait::async_trait;
use thiserror::Error;

use moxbot_core::domain::memory::ConversationMemory;

pub mod conversation;
pub mod memory;

pub use conversation::SqlMemoryRepository;
pub use memory::InMemoryMemoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Get/put access to the per-conversation memory record. Absence of a record
/// is reported as `None`; callers construct the default record themselves.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    async fn find(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationMemory>, RepositoryError>;

    async fn save(&self, memory: ConversationMemory) -> Result<(), RepositoryError>;
}
