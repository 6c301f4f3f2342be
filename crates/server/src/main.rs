mod bootstrap;
mod health;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use replybot_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;

fn init_logging(config: &AppConfig) {
    use replybot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.gateway.clone(),
    )
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = wait_for_shutdown().await {
            tracing::error!(error = %error, "failed to listen for shutdown signal");
        }
        tracing::info!(
            event_name = "system.server.stopping",
            correlation_id = "shutdown",
            "replybot-server stopping"
        );
        let _ = shutdown_tx.send(true);
    });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bot_username = app.bot.username.as_deref().unwrap_or("unknown"),
        "replybot-server started"
    );

    let summary = app.runner.run(shutdown_rx).await?;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        updates_received = summary.updates_received,
        replies_sent = summary.replies_sent,
        "replybot-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
