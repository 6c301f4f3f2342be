use std::sync::Arc;

use replybot_core::config::{AppConfig, ConfigError};
use replybot_core::{CatalogError, Responder};
use replybot_telegram::api::User;
use replybot_telegram::commands::bot_command_specs;
use replybot_telegram::events::default_dispatcher;
use replybot_telegram::gateway::{GatewayError, HttpGateway, MessagingGateway};
use replybot_telegram::polling::{PollingRunner, ReconnectPolicy};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub bot: User,
    pub gateway: Arc<dyn MessagingGateway>,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("response catalog could not be built: {0}")]
    Catalog(#[from] CatalogError),
    #[error("telegram gateway unavailable: {0}")]
    Gateway(#[from] GatewayError),
}

/// Loads config and bootstraps in one step. The binary loads config itself so it can start
/// logging first.
#[cfg(test)]
pub async fn bootstrap(
    options: replybot_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let gateway = Arc::new(HttpGateway::new(&config.telegram)?);
    bootstrap_with_gateway(config, gateway).await
}

/// Builds the responder, verifies the token with `getMe` and registers the command menu.
pub async fn bootstrap_with_gateway(
    config: AppConfig,
    gateway: Arc<dyn MessagingGateway>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let responder = Responder::from_config(&config)?;
    info!(
        event_name = "system.bootstrap.catalog_built",
        correlation_id = "bootstrap",
        company = %config.company.name,
        "response catalog rendered"
    );

    let bot = gateway.get_me().await?;
    info!(
        event_name = "system.bootstrap.bot_identified",
        correlation_id = "bootstrap",
        bot_id = bot.id,
        bot_username = bot.username.as_deref().unwrap_or("unknown"),
        "telegram token accepted"
    );

    if let Err(error) = gateway.set_my_commands(&bot_command_specs()).await {
        warn!(
            event_name = "system.bootstrap.commands_registered",
            correlation_id = "bootstrap",
            error = %error,
            "failed to register bot commands; continuing"
        );
    }

    let runner = PollingRunner::new(
        gateway.clone(),
        default_dispatcher(Arc::new(responder), bot.username.clone()),
        ReconnectPolicy::from(&config.telegram),
        config.telegram.poll_timeout_secs,
    );

    Ok(Application { config, bot, gateway, runner })
}
