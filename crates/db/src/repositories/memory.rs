use std::collections::HashMap;

use tokio::sync::RwLock;

use moxbot_core::domain::memory::ConversationMemory;

use super::{MemoryRepository, RepositoryError};

/// In-process store used by router and handler tests.
#[derive(Default)]
pub struct InMemoryMemoryRepository {
    records: RwLock<HashMap<String, ConversationMemory>>,
}

#[async_trait::async_trait]
impl MemoryRepository for InMemoryMemoryRepository {
    async fn find(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationMemory>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(conversation_id).cloned())
    }

    async fn save(&self, memory: ConversationMemory) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(memory.conversation_id.clone(), memory);
        Ok(())
    }
}
