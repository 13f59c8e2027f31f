use chrono::{DateTime, Utc};
use sqlx::Row;

use moxbot_core::domain::memory::ConversationMemory;

use super::{MemoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMemoryRepository {
    pool: DbPool,
}

impl SqlMemoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MemoryRepository for SqlMemoryRepository {
    async fn find(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationMemory>, RepositoryError> {
        let row = sqlx::query(
            "SELECT conversation_id, contact_email, greeted_until, escalation_until, \
                    form_cooldown_until, last_seen_at \
             FROM conversation_memory \
             WHERE conversation_id = ?1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ConversationMemory {
            conversation_id: row.try_get("conversation_id").map_err(decode)?,
            contact_email: row.try_get("contact_email").map_err(decode)?,
            greeted_until: row
                .try_get::<Option<DateTime<Utc>>, _>("greeted_until")
                .map_err(decode)?,
            escalation_until: row
                .try_get::<Option<DateTime<Utc>>, _>("escalation_until")
                .map_err(decode)?,
            form_cooldown_until: row
                .try_get::<Option<DateTime<Utc>>, _>("form_cooldown_until")
                .map_err(decode)?,
            last_seen_at: row.try_get::<DateTime<Utc>, _>("last_seen_at").map_err(decode)?,
        }))
    }

    async fn save(&self, memory: ConversationMemory) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversation_memory \
                 (conversation_id, contact_email, greeted_until, escalation_until, \
                  form_cooldown_until, last_seen_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(conversation_id) DO UPDATE SET \
                 contact_email = excluded.contact_email, \
                 greeted_until = excluded.greeted_until, \
                 escalation_until = excluded.escalation_until, \
                 form_cooldown_until = excluded.form_cooldown_until, \
                 last_seen_at = excluded.last_seen_at",
        )
        .bind(&memory.conversation_id)
        .bind(&memory.contact_email)
        .bind(memory.greeted_until)
        .bind(memory.escalation_until)
        .bind(memory.form_cooldown_until)
        .bind(memory.last_seen_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn decode(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use moxbot_core::domain::memory::{ConversationMemory, MemoryPatch};

    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::{MemoryRepository, SqlMemoryRepository};

    async fn repository() -> SqlMemoryRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        SqlMemoryRepository::new(pool)
    }

    #[tokio::test]
    async fn missing_conversation_loads_as_none() {
        let repo = repository().await;

        let found = repo.find("B-unknown").await.expect("find");

        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn save_then_find_round_trips_all_fields() {
        let repo = repository().await;
        let now = Utc::now();
        let mut memory = ConversationMemory::fresh("B-1", now);
        memory.contact_email = Some("ada@example.com".to_string());
        memory.greeted_until = Some(now + Duration::hours(12));
        memory.form_cooldown_until = Some(now + Duration::hours(1));

        repo.save(memory.clone()).await.expect("save");
        let found = repo.find("B-1").await.expect("find");

        assert_eq!(found, Some(memory));
    }

    #[tokio::test]
    async fn second_save_upserts_the_same_row() {
        let repo = repository().await;
        let start = Utc::now();
        let mut memory = ConversationMemory::fresh("B-1", start);
        repo.save(memory.clone()).await.expect("first save");

        let later = start + Duration::minutes(5);
        memory.apply(
            MemoryPatch {
                greeted_until: Some(later + Duration::hours(12)),
                ..MemoryPatch::default()
            },
            later,
        );
        repo.save(memory.clone()).await.expect("second save");

        let found = repo.find("B-1").await.expect("find").expect("record exists");
        assert_eq!(found.greeted_until, Some(later + Duration::hours(12)));
        assert_eq!(found.last_seen_at, later);
    }
}
