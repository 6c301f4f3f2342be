use std::time::Duration;

use async_trait::async_trait;
use replybot_core::config::TelegramConfig;
use replybot_core::SendAction;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::api::{
    ApiResponse, BotCommandSpec, GetUpdatesRequest, Message, SendMessageRequest,
    SetMyCommandsRequest, Update, User,
};

/// Headroom added to the long-poll timeout before the HTTP client gives up on a request.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("telegram request failed: {0}")]
    Http(String),
    #[error("telegram `{method}` returned error {code:?}: {description}")]
    Api { method: String, code: Option<i64>, description: String },
    #[error("telegram `{method}` response could not be decoded: {message}")]
    Decode { method: String, message: String },
}

/// The outbound side of the chat platform as seen by the runner.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn get_me(&self) -> Result<User, GatewayError>;
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, GatewayError>;
    async fn send_message(&self, action: &SendAction) -> Result<Message, GatewayError>;
    async fn set_my_commands(&self, commands: &[BotCommandSpec]) -> Result<(), GatewayError>;
}

#[derive(Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    api_base_url: String,
    bot_token: SecretString,
}

impl HttpGateway {
    pub fn new(config: &TelegramConfig) -> Result<Self, GatewayError> {
        let timeout = Duration::from_secs(config.poll_timeout_secs + REQUEST_TIMEOUT_MARGIN_SECS);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GatewayError::Http(error.without_url().to_string()))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base_url, self.bot_token.expose_secret(), method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        // Errors are stripped of their URL since it embeds the bot token.
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|error| GatewayError::Http(error.without_url().to_string()))?;

        let status = response.status();
        let envelope = match response.json::<ApiResponse<T>>().await {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(GatewayError::Api {
                    method: method.to_owned(),
                    code: Some(i64::from(status.as_u16())),
                    description: status.canonical_reason().unwrap_or("unknown status").to_owned(),
                });
            }
            Err(error) => {
                return Err(GatewayError::Decode {
                    method: method.to_owned(),
                    message: error.without_url().to_string(),
                });
            }
        };

        unwrap_envelope(method, envelope)
    }
}

fn unwrap_envelope<T>(method: &str, envelope: ApiResponse<T>) -> Result<T, GatewayError> {
    if !envelope.ok {
        return Err(GatewayError::Api {
            method: method.to_owned(),
            code: envelope.error_code,
            description: envelope.description.unwrap_or_else(|| "no description".to_owned()),
        });
    }

    envelope.result.ok_or_else(|| GatewayError::Decode {
        method: method.to_owned(),
        message: "response is missing `result`".to_owned(),
    })
}

#[async_trait]
impl MessagingGateway for HttpGateway {
    async fn get_me(&self) -> Result<User, GatewayError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, GatewayError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message".to_owned()],
        };
        self.call("getUpdates", &request).await
    }

    async fn send_message(&self, action: &SendAction) -> Result<Message, GatewayError> {
        self.call("sendMessage", &SendMessageRequest::from_action(action)).await
    }

    async fn set_my_commands(&self, commands: &[BotCommandSpec]) -> Result<(), GatewayError> {
        let request = SetMyCommandsRequest { commands: commands.to_vec() };
        let accepted: bool = self.call("setMyCommands", &request).await?;
        if accepted {
            Ok(())
        } else {
            Err(GatewayError::Api {
                method: "setMyCommands".to_owned(),
                code: None,
                description: "command list was not accepted".to_owned(),
            })
        }
    }
}
