use secrecy::ExposeSecret;

use moxbot_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines = vec!["effective config (precedence: overrides > env > file > default):".to_string()];

    lines.push(render("database.url", &config.database.url));
    lines.push(render("database.max_connections", &config.database.max_connections.to_string()));
    lines.push(render("database.timeout_secs", &config.database.timeout_secs.to_string()));

    lines.push(render("moxo.domain", &config.moxo.domain));
    lines.push(render("moxo.org_id", &config.moxo.org_id));
    lines.push(render("moxo.client_id", &config.moxo.client_id));
    lines.push(render(
        "moxo.client_secret",
        &redact(config.moxo.client_secret.expose_secret()),
    ));
    lines.push(render_opt("moxo.blocked_domain", config.moxo.blocked_domain.as_deref()));
    lines.push(render("moxo.timeout_secs", &config.moxo.timeout_secs.to_string()));

    let api_key = config.knowledge.api_key.as_ref().map(|key| redact(key.expose_secret()));
    lines.push(render_opt("knowledge.api_key", api_key.as_deref()));
    lines.push(render("knowledge.base_url", &config.knowledge.base_url));
    lines.push(render_opt("knowledge.search_url", config.knowledge.search_url.as_deref()));
    lines.push(render("knowledge.embedding_model", &config.knowledge.embedding_model));
    lines.push(render("knowledge.generation_model", &config.knowledge.generation_model));
    lines.push(render(
        "knowledge.similarity_threshold",
        &config.knowledge.similarity_threshold.to_string(),
    ));
    lines.push(render("knowledge.top_k", &config.knowledge.top_k.to_string()));

    lines.push(render_opt("bot.calendar_link", config.bot.calendar_link.as_deref()));
    lines.push(render_opt("bot.form_url", config.bot.form_url.as_deref()));

    lines.push(render("server.bind_address", &config.server.bind_address));
    lines.push(render("server.port", &config.server.port.to_string()));

    lines.push(render("logging.level", &config.logging.level));
    lines.push(render("logging.format", &format!("{:?}", config.logging.format).to_lowercase()));

    lines.join("\n")
}

fn render(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}

fn render_opt(key: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => render(key, value),
        None => render(key, "(unset)"),
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        "(unset)".to_string()
    } else {
        format!("***{} chars***", secret.len())
    }
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn redaction_never_echoes_secret_material() {
        let rendered = redact("super-secret-value");

        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("18"));
    }

    #[test]
    fn empty_secrets_render_as_unset() {
        assert_eq!(redact(""), "(unset)");
    }
}
