use std::env;
use std::fs;
use std::path::Path;

use replybot_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let bot_token = redact_token(config.telegram.bot_token.expose_secret());
    lines.push(render_line(
        "telegram.bot_token",
        &bot_token,
        source("telegram.bot_token", &["REPLYBOT_TELEGRAM_BOT_TOKEN", "TELEGRAM_TOKEN"]),
    ));
    lines.push(render_line(
        "telegram.api_base_url",
        &config.telegram.api_base_url,
        source("telegram.api_base_url", &["REPLYBOT_TELEGRAM_API_BASE_URL"]),
    ));
    lines.push(render_line(
        "telegram.poll_timeout_secs",
        &config.telegram.poll_timeout_secs.to_string(),
        source("telegram.poll_timeout_secs", &["REPLYBOT_TELEGRAM_POLL_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "telegram.max_retries",
        &config.telegram.max_retries.to_string(),
        source("telegram.max_retries", &["REPLYBOT_TELEGRAM_MAX_RETRIES"]),
    ));
    lines.push(render_line(
        "telegram.base_delay_ms",
        &config.telegram.base_delay_ms.to_string(),
        source("telegram.base_delay_ms", &["REPLYBOT_TELEGRAM_BASE_DELAY_MS"]),
    ));
    lines.push(render_line(
        "telegram.max_delay_ms",
        &config.telegram.max_delay_ms.to_string(),
        source("telegram.max_delay_ms", &["REPLYBOT_TELEGRAM_MAX_DELAY_MS"]),
    ));

    lines.push(render_line(
        "company.name",
        &config.company.name,
        source("company.name", &["REPLYBOT_COMPANY_NAME"]),
    ));
    lines.push(render_line(
        "company.email",
        &config.company.email,
        source("company.email", &["REPLYBOT_COMPANY_EMAIL"]),
    ));
    lines.push(render_line(
        "company.phone_primary",
        &config.company.phone_primary,
        source("company.phone_primary", &["REPLYBOT_COMPANY_PHONE_PRIMARY"]),
    ));
    lines.push(render_line(
        "company.phone_secondary",
        &config.company.phone_secondary,
        source("company.phone_secondary", &["REPLYBOT_COMPANY_PHONE_SECONDARY"]),
    ));
    lines.push(render_line(
        "company.website",
        &config.company.website,
        source("company.website", &["REPLYBOT_COMPANY_WEBSITE"]),
    ));
    lines.push(render_line(
        "company.services",
        &config.company.services.join(", "),
        source("company.services", &["REPLYBOT_COMPANY_SERVICES"]),
    ));

    for (intent, keywords) in &config.keywords {
        let key_path = format!("keywords.{intent}");
        lines.push(render_line(&key_path, &keywords.join(", "), source(&key_path, &[])));
    }
    for (intent, variants) in &config.responses {
        let key_path = format!("responses.{intent}");
        let summary = format!("{} variant(s)", variants.len());
        lines.push(render_line(&key_path, &summary, source(&key_path, &[])));
    }

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["REPLYBOT_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", &["REPLYBOT_SERVER_HEALTH_CHECK_PORT"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["REPLYBOT_LOGGING_LEVEL", "REPLYBOT_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["REPLYBOT_LOGGING_FORMAT", "REPLYBOT_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the public bot id, hides the secret half.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}
