use async_trait::async_trait;
use replybot_core::SendAction;
use replybot_telegram::api::{BotCommandSpec, Chat, Message, Update, User};
use replybot_telegram::gateway::{GatewayError, MessagingGateway};
use tokio::sync::Mutex;

/// Gateway whose `getMe` either always succeeds or always fails. Never yields updates.
pub struct StaticGateway {
    identity: Result<User, GatewayError>,
    commands: Mutex<Vec<String>>,
}

impl StaticGateway {
    pub fn ready(username: &str) -> Self {
        Self {
            identity: Ok(User {
                id: 4242,
                is_bot: true,
                first_name: "Replybot".to_owned(),
                username: Some(username.to_owned()),
            }),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self { identity: Err(error), commands: Mutex::new(Vec::new()) }
    }

    pub async fn registered_commands(&self) -> Vec<String> {
        self.commands.lock().await.clone()
    }
}

#[async_trait]
impl MessagingGateway for StaticGateway {
    async fn get_me(&self) -> Result<User, GatewayError> {
        self.identity.clone()
    }

    async fn get_updates(
        &self,
        _offset: Option<i64>,
        _timeout_secs: u64,
    ) -> Result<Vec<Update>, GatewayError> {
        Ok(Vec::new())
    }

    async fn send_message(&self, action: &SendAction) -> Result<Message, GatewayError> {
        Ok(Message {
            message_id: 1,
            date: 0,
            chat: Chat { id: action.chat_id, kind: "private".to_owned() },
            from: None,
            text: Some(action.text.clone()),
        })
    }

    async fn set_my_commands(&self, commands: &[BotCommandSpec]) -> Result<(), GatewayError> {
        let mut registered = self.commands.lock().await;
        *registered = commands.iter().map(|entry| entry.command.clone()).collect();
        Ok(())
    }
}
