use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CompanyProfile, QuickActionMenu};
use crate::intent::{Intent, KeywordTable};

pub const DEFAULT_CONFIG_FILE: &str = "replybot.toml";
pub const NESTED_CONFIG_FILE: &str = "config/replybot.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub company: CompanyProfile,
    pub keywords: BTreeMap<Intent, Vec<String>>,
    pub responses: BTreeMap<Intent, Vec<String>>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
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
    pub bot_token: Option<String>,
    pub api_base_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub health_check_port: Option<u16>,
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
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                api_base_url: "https://api.telegram.org".to_string(),
                poll_timeout_secs: 30,
                max_retries: 5,
                base_delay_ms: 500,
                max_delay_ms: 30_000,
            },
            company: CompanyProfile::default(),
            keywords: BTreeMap::new(),
            responses: BTreeMap::new(),
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), health_check_port: 8080 },
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token_value);
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(poll_timeout_secs) = telegram.poll_timeout_secs {
                self.telegram.poll_timeout_secs = poll_timeout_secs;
            }
            if let Some(max_retries) = telegram.max_retries {
                self.telegram.max_retries = max_retries;
            }
            if let Some(base_delay_ms) = telegram.base_delay_ms {
                self.telegram.base_delay_ms = base_delay_ms;
            }
            if let Some(max_delay_ms) = telegram.max_delay_ms {
                self.telegram.max_delay_ms = max_delay_ms;
            }
        }

        if let Some(company) = patch.company {
            if let Some(name) = company.name {
                self.company.name = name;
            }
            if let Some(email) = company.email {
                self.company.email = email;
            }
            if let Some(phone_primary) = company.phone_primary {
                self.company.phone_primary = phone_primary;
            }
            if let Some(phone_secondary) = company.phone_secondary {
                self.company.phone_secondary = phone_secondary;
            }
            if let Some(website) = company.website {
                self.company.website = website;
            }
            if let Some(services) = company.services {
                self.company.services = services;
            }
        }

        if let Some(keywords) = patch.keywords {
            self.keywords.extend(keywords);
        }

        if let Some(responses) = patch.responses {
            self.responses.extend(responses);
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
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
        let bot_token =
            read_env("REPLYBOT_TELEGRAM_BOT_TOKEN").or_else(|| read_env("TELEGRAM_TOKEN"));
        if let Some(value) = bot_token {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("REPLYBOT_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("REPLYBOT_TELEGRAM_POLL_TIMEOUT_SECS") {
            self.telegram.poll_timeout_secs =
                parse_u64("REPLYBOT_TELEGRAM_POLL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("REPLYBOT_TELEGRAM_MAX_RETRIES") {
            self.telegram.max_retries = parse_u32("REPLYBOT_TELEGRAM_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("REPLYBOT_TELEGRAM_BASE_DELAY_MS") {
            self.telegram.base_delay_ms = parse_u64("REPLYBOT_TELEGRAM_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("REPLYBOT_TELEGRAM_MAX_DELAY_MS") {
            self.telegram.max_delay_ms = parse_u64("REPLYBOT_TELEGRAM_MAX_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("REPLYBOT_COMPANY_NAME") {
            self.company.name = value;
        }
        if let Some(value) = read_env("REPLYBOT_COMPANY_EMAIL") {
            self.company.email = value;
        }
        if let Some(value) = read_env("REPLYBOT_COMPANY_PHONE_PRIMARY") {
            self.company.phone_primary = value;
        }
        if let Some(value) = read_env("REPLYBOT_COMPANY_PHONE_SECONDARY") {
            self.company.phone_secondary = value;
        }
        if let Some(value) = read_env("REPLYBOT_COMPANY_WEBSITE") {
            self.company.website = value;
        }
        if let Some(value) = read_env("REPLYBOT_COMPANY_SERVICES") {
            self.company.services = parse_list(&value);
        }

        if let Some(value) = read_env("REPLYBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("REPLYBOT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("REPLYBOT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        let log_level =
            read_env("REPLYBOT_LOGGING_LEVEL").or_else(|| read_env("REPLYBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("REPLYBOT_LOGGING_FORMAT").or_else(|| read_env("REPLYBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.telegram.bot_token = secret_value(bot_token);
        }
        if let Some(api_base_url) = overrides.api_base_url {
            self.telegram.api_base_url = api_base_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(health_check_port) = overrides.health_check_port {
            self.server.health_check_port = health_check_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)?;
        validate_company(&self.company)?;
        validate_keywords(&self.keywords)?;
        validate_responses(&self.responses)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `load` would read for `explicit_path`, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
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

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let token = telegram.bot_token.expose_secret();
    if token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Create a bot with @BotFather and set REPLYBOT_TELEGRAM_BOT_TOKEN (or TELEGRAM_TOKEN)".to_string(),
        ));
    }
    let well_formed = token.split_once(':').is_some_and(|(bot_id, secret)| {
        !bot_id.is_empty() && bot_id.bytes().all(|byte| byte.is_ascii_digit()) && !secret.is_empty()
    });
    if !well_formed {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot_id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }

    let base_url = telegram.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "telegram.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if telegram.poll_timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "telegram.poll_timeout_secs must be in range 0..=60".to_string(),
        ));
    }

    if telegram.max_delay_ms < telegram.base_delay_ms {
        return Err(ConfigError::Validation(
            "telegram.max_delay_ms must be greater than or equal to telegram.base_delay_ms"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_company(company: &CompanyProfile) -> Result<(), ConfigError> {
    let required = [
        ("company.name", &company.name),
        ("company.email", &company.email),
        ("company.phone_primary", &company.phone_primary),
        ("company.phone_secondary", &company.phone_secondary),
        ("company.website", &company.website),
    ];
    if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ConfigError::Validation(format!("{key} must not be empty")));
    }

    if !company.website.starts_with("http://") && !company.website.starts_with("https://") {
        return Err(ConfigError::Validation(
            "company.website must start with http:// or https://".to_string(),
        ));
    }

    if company.services.is_empty() || company.services.iter().any(|name| name.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "company.services must list at least one service and no blank names".to_string(),
        ));
    }

    Ok(())
}

fn validate_keywords(keywords: &BTreeMap<Intent, Vec<String>>) -> Result<(), ConfigError> {
    if keywords.contains_key(&Intent::Fallback) {
        return Err(ConfigError::Validation(
            "keywords.fallback is not allowed: fallback is chosen when nothing else matches"
                .to_string(),
        ));
    }

    for (intent, values) in keywords {
        if values.iter().all(|keyword| keyword.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "keywords.{intent} must contain at least one non-blank keyword"
            )));
        }
    }

    let table = KeywordTable::with_overrides(keywords);
    for label in QuickActionMenu::standard().labels() {
        let Some(expected) = QuickActionMenu::intent_for(label) else {
            continue;
        };
        let resolved = table.classify(label);
        if resolved != expected {
            return Err(ConfigError::Validation(format!(
                "keywords must route the `{label}` button to {expected}, but it classifies as \
                 {resolved}"
            )));
        }
    }

    Ok(())
}

fn validate_responses(responses: &BTreeMap<Intent, Vec<String>>) -> Result<(), ConfigError> {
    for (intent, variants) in responses {
        if variants.is_empty() || variants.iter().any(|variant| variant.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "responses.{intent} must contain at least one variant and no blank variants"
            )));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
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

fn parse_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(str::to_owned).collect()
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

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    telegram: Option<TelegramPatch>,
    company: Option<CompanyPatch>,
    keywords: Option<BTreeMap<Intent, Vec<String>>>,
    responses: Option<BTreeMap<Intent, Vec<String>>>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
    poll_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompanyPatch {
    name: Option<String>,
    email: Option<String>,
    phone_primary: Option<String>,
    phone_secondary: Option<String>,
    website: Option<String>,
    services: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
