use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub moxo: MoxoConfig,
    pub knowledge: KnowledgeConfig,
    pub bot: BotConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MoxoConfig {
    pub domain: String,
    pub org_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub blocked_domain: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub search_url: Option<String>,
    pub embedding_model: String,
    pub generation_model: String,
    pub similarity_threshold: f32,
    pub top_k: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub calendar_link: Option<String>,
    pub form_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub moxo_domain: Option<String>,
    pub moxo_org_id: Option<String>,
    pub moxo_client_id: Option<String>,
    pub moxo_client_secret: Option<String>,
    pub blocked_domain: Option<String>,
    pub calendar_link: Option<String>,
    pub form_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://moxbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            moxo: MoxoConfig {
                domain: String::new(),
                org_id: String::new(),
                client_id: String::new(),
                client_secret: String::new().into(),
                blocked_domain: None,
                timeout_secs: 30,
            },
            knowledge: KnowledgeConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                search_url: None,
                embedding_model: "text-embedding-3-small".to_string(),
                generation_model: "gpt-4o-mini".to_string(),
                similarity_threshold: 0.7,
                top_k: 3,
                timeout_secs: 30,
            },
            bot: BotConfig { calendar_link: None, form_url: None },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("moxbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(moxo) = patch.moxo {
            if let Some(domain) = moxo.domain {
                self.moxo.domain = domain;
            }
            if let Some(org_id) = moxo.org_id {
                self.moxo.org_id = org_id;
            }
            if let Some(client_id) = moxo.client_id {
                self.moxo.client_id = client_id;
            }
            if let Some(client_secret_value) = moxo.client_secret {
                self.moxo.client_secret = secret_value(client_secret_value);
            }
            if let Some(blocked_domain) = moxo.blocked_domain {
                self.moxo.blocked_domain = Some(blocked_domain);
            }
            if let Some(timeout_secs) = moxo.timeout_secs {
                self.moxo.timeout_secs = timeout_secs;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(api_key_value) = knowledge.api_key {
                self.knowledge.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = knowledge.base_url {
                self.knowledge.base_url = base_url;
            }
            if let Some(search_url) = knowledge.search_url {
                self.knowledge.search_url = Some(search_url);
            }
            if let Some(embedding_model) = knowledge.embedding_model {
                self.knowledge.embedding_model = embedding_model;
            }
            if let Some(generation_model) = knowledge.generation_model {
                self.knowledge.generation_model = generation_model;
            }
            if let Some(similarity_threshold) = knowledge.similarity_threshold {
                self.knowledge.similarity_threshold = similarity_threshold;
            }
            if let Some(top_k) = knowledge.top_k {
                self.knowledge.top_k = top_k;
            }
            if let Some(timeout_secs) = knowledge.timeout_secs {
                self.knowledge.timeout_secs = timeout_secs;
            }
        }

        if let Some(bot) = patch.bot {
            if let Some(calendar_link) = bot.calendar_link {
                self.bot.calendar_link = Some(calendar_link);
            }
            if let Some(form_url) = bot.form_url {
                self.bot.form_url = Some(form_url);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MOXBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("MOXBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("MOXBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MOXBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("MOXBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MOXBOT_MOXO_DOMAIN") {
            self.moxo.domain = value;
        }
        if let Some(value) = read_env("MOXBOT_MOXO_ORG_ID") {
            self.moxo.org_id = value;
        }
        if let Some(value) = read_env("MOXBOT_MOXO_CLIENT_ID") {
            self.moxo.client_id = value;
        }
        if let Some(value) = read_env("MOXBOT_MOXO_CLIENT_SECRET") {
            self.moxo.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("MOXBOT_MOXO_BLOCKED_DOMAIN") {
            self.moxo.blocked_domain = Some(value);
        }
        if let Some(value) = read_env("MOXBOT_MOXO_TIMEOUT_SECS") {
            self.moxo.timeout_secs = parse_u64("MOXBOT_MOXO_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MOXBOT_KNOWLEDGE_API_KEY") {
            self.knowledge.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("MOXBOT_KNOWLEDGE_BASE_URL") {
            self.knowledge.base_url = value;
        }
        if let Some(value) = read_env("MOXBOT_KNOWLEDGE_SEARCH_URL") {
            self.knowledge.search_url = Some(value);
        }
        if let Some(value) = read_env("MOXBOT_KNOWLEDGE_EMBEDDING_MODEL") {
            self.knowledge.embedding_model = value;
        }
        if let Some(value) = read_env("MOXBOT_KNOWLEDGE_GENERATION_MODEL") {
            self.knowledge.generation_model = value;
        }
        if let Some(value) = read_env("MOXBOT_KNOWLEDGE_SIMILARITY_THRESHOLD") {
            self.knowledge.similarity_threshold =
                parse_f32("MOXBOT_KNOWLEDGE_SIMILARITY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("MOXBOT_KNOWLEDGE_TOP_K") {
            self.knowledge.top_k = parse_u32("MOXBOT_KNOWLEDGE_TOP_K", &value)?;
        }
        if let Some(value) = read_env("MOXBOT_KNOWLEDGE_TIMEOUT_SECS") {
            self.knowledge.timeout_secs = parse_u64("MOXBOT_KNOWLEDGE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MOXBOT_BOT_CALENDAR_LINK") {
            self.bot.calendar_link = Some(value);
        }
        if let Some(value) = read_env("MOXBOT_BOT_FORM_URL") {
            self.bot.form_url = Some(value);
        }

        if let Some(value) = read_env("MOXBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("MOXBOT_SERVER_PORT") {
            self.server.port = parse_u16("MOXBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("MOXBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("MOXBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("MOXBOT_LOGGING_LEVEL").or_else(|| read_env("MOXBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MOXBOT_LOGGING_FORMAT").or_else(|| read_env("MOXBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(moxo_domain) = overrides.moxo_domain {
            self.moxo.domain = moxo_domain;
        }
        if let Some(moxo_org_id) = overrides.moxo_org_id {
            self.moxo.org_id = moxo_org_id;
        }
        if let Some(moxo_client_id) = overrides.moxo_client_id {
            self.moxo.client_id = moxo_client_id;
        }
        if let Some(moxo_client_secret) = overrides.moxo_client_secret {
            self.moxo.client_secret = secret_value(moxo_client_secret);
        }
        if let Some(blocked_domain) = overrides.blocked_domain {
            self.moxo.blocked_domain = Some(blocked_domain);
        }
        if let Some(calendar_link) = overrides.calendar_link {
            self.bot.calendar_link = Some(calendar_link);
        }
        if let Some(form_url) = overrides.form_url {
            self.bot.form_url = Some(form_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_moxo(&self.moxo)?;
        validate_knowledge(&self.knowledge)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("moxbot.toml"), PathBuf::from("config/moxbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_moxo(moxo: &MoxoConfig) -> Result<(), ConfigError> {
    if moxo.domain.trim().is_empty() {
        return Err(ConfigError::Validation(
            "moxo.domain is required (e.g. `acme.moxo.com`)".to_string(),
        ));
    }
    if moxo.domain.contains("://") {
        return Err(ConfigError::Validation(
            "moxo.domain must be a bare host name, without a scheme".to_string(),
        ));
    }
    if moxo.org_id.trim().is_empty() {
        return Err(ConfigError::Validation("moxo.org_id is required".to_string()));
    }
    if moxo.client_id.trim().is_empty() {
        return Err(ConfigError::Validation("moxo.client_id is required".to_string()));
    }
    if moxo.client_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "moxo.client_secret is required. Get it from your Moxo org's app registration"
                .to_string(),
        ));
    }
    if moxo.timeout_secs == 0 || moxo.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "moxo.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_knowledge(knowledge: &KnowledgeConfig) -> Result<(), ConfigError> {
    if knowledge.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("knowledge.base_url must not be empty".to_string()));
    }
    if !(0.0..=1.0).contains(&knowledge.similarity_threshold) {
        return Err(ConfigError::Validation(
            "knowledge.similarity_threshold must be in range 0.0..=1.0".to_string(),
        ));
    }
    if knowledge.top_k == 0 || knowledge.top_k > 20 {
        return Err(ConfigError::Validation(
            "knowledge.top_k must be in range 1..=20".to_string(),
        ));
    }
    if knowledge.timeout_secs == 0 || knowledge.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "knowledge.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    moxo: Option<MoxoPatch>,
    knowledge: Option<KnowledgePatch>,
    bot: Option<BotPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MoxoPatch {
    domain: Option<String>,
    org_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    blocked_domain: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    api_key: Option<String>,
    base_url: Option<String>,
    search_url: Option<String>,
    embedding_model: Option<String>,
    generation_model: Option<String>,
    similarity_threshold: Option<f32>,
    top_k: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BotPatch {
    calendar_link: Option<String>,
    form_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
