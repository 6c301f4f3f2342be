use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use replybot_core::ApplicationError;
use replybot_telegram::gateway::MessagingGateway;
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct HealthState {
    gateway: Arc<dyn MessagingGateway>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub gateway: HealthCheck,
    pub checked_at: String,
}

pub fn router(gateway: Arc<dyn MessagingGateway>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { gateway })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    gateway: Arc<dyn MessagingGateway>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(gateway)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let gateway = gateway_check(state.gateway.as_ref()).await;
    let ready = gateway.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "replybot-server runtime initialized".to_string(),
        },
        gateway,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn gateway_check(gateway: &dyn MessagingGateway) -> HealthCheck {
    match gateway.get_me().await {
        Ok(bot) => {
            let username = bot.username.as_deref().unwrap_or("unknown");
            HealthCheck { status: "ready", detail: format!("getMe succeeded for @{username}") }
        }
        Err(gateway_error) => {
            let failure = ApplicationError::Gateway(gateway_error.to_string());
            warn!(
                event_name = "system.health.gateway_degraded",
                correlation_id = "health",
                error_class = failure.error_class(),
                error = %failure,
                "telegram getMe failed during health check"
            );
            let interface = failure.into_interface("health");
            HealthCheck {
                status: "degraded",
                detail: format!("{} ({gateway_error})", interface.user_message()),
            }
        }
    }
}
