use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use moxbot_core::config::{AppConfig, ConfigError, LoadOptions};
use moxbot_core::replies::ReplyCatalog;
use moxbot_db::repositories::SqlMemoryRepository;
use moxbot_db::{connect, migrations, DbPool};
use moxbot_knowledge::{
    HttpCompletionProvider, HttpDocumentSearch, HttpEmbeddingProvider, KnowledgeAnswerer,
};
use moxbot_moxo::MoxoClient;

use crate::router::ConversationRouter;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub router: Arc<ConversationRouter>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    // Every outbound call is bounded by these client-level timeouts.
    let moxo_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.moxo.timeout_secs))
        .build()
        .map_err(BootstrapError::HttpClient)?;
    let knowledge_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.knowledge.timeout_secs))
        .build()
        .map_err(BootstrapError::HttpClient)?;

    let platform = Arc::new(MoxoClient::new(moxo_http, &config.moxo));
    let answerer = Arc::new(KnowledgeAnswerer::new(
        Arc::new(HttpEmbeddingProvider::new(knowledge_http.clone(), &config.knowledge)),
        Arc::new(HttpDocumentSearch::new(knowledge_http.clone(), &config.knowledge)),
        Arc::new(HttpCompletionProvider::new(knowledge_http, &config.knowledge)),
        config.knowledge.similarity_threshold,
        config.knowledge.top_k,
    ));
    let replies =
        ReplyCatalog::new(config.bot.calendar_link.clone(), config.bot.form_url.clone());

    let router = Arc::new(ConversationRouter::new(
        Arc::new(SqlMemoryRepository::new(db_pool.clone())),
        platform,
        answerer,
        replies,
        config.moxo.blocked_domain.clone(),
    ));

    Ok(Application { config, db_pool, router })
}
