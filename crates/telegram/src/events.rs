use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use replybot_core::{InboundMessage, Responder, SendAction};
use thiserror::Error;

use crate::api::Update;
use crate::commands::parse_command;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Message,
    EditedMessage,
    Unsupported,
}

impl Update {
    pub fn kind(&self) -> UpdateKind {
        if self.message.is_some() {
            UpdateKind::Message
        } else if self.edited_message.is_some() {
            UpdateKind::EditedMessage
        } else {
            UpdateKind::Unsupported
        }
    }
}

/// What a Telegram update means for the responder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundOutcome {
    Message(InboundMessage),
    /// A `/command@other_bot` in a shared chat.
    AddressedElsewhere { command: String },
    Unsupported,
}

/// Maps a new-message update onto the core's inbound message.
///
/// Messages without text still produce an `InboundMessage` so the sender gets the fallback
/// reply. Commands keep the full text alongside the parsed command name.
pub fn inbound_message(update: &Update, bot_username: Option<&str>) -> InboundOutcome {
    let Some(message) = &update.message else {
        return InboundOutcome::Unsupported;
    };

    let command = match message.text.as_deref().and_then(parse_command) {
        Some(parsed) if !parsed.is_addressed_to(bot_username) => {
            return InboundOutcome::AddressedElsewhere { command: parsed.name };
        }
        Some(parsed) => Some(parsed.name),
        None => None,
    };

    InboundOutcome::Message(InboundMessage {
        chat_id: message.chat.id,
        sender_id: message.from.as_ref().map(|user| user.id),
        text: message.text.clone(),
        command,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

impl EventContext {
    pub fn for_update(update: &Update) -> Self {
        Self { correlation_id: update.update_id.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(SendAction),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("update {update_id} was routed to the message handler without a message")]
    MissingMessage { update_id: i64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn update_kind(&self) -> UpdateKind;
    async fn handle(
        &self,
        update: &Update,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<UpdateKind, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.update_kind(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        update: &Update,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&update.kind()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(update, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher with the message handler wired to `responder`. Edited messages are ignored.
pub fn default_dispatcher(
    responder: Arc<Responder>,
    bot_username: Option<String>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(responder, bot_username));
    dispatcher
}

pub struct MessageHandler {
    responder: Arc<Responder>,
    bot_username: Option<String>,
}

impl MessageHandler {
    pub fn new(responder: Arc<Responder>, bot_username: Option<String>) -> Self {
        Self { responder, bot_username }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn update_kind(&self) -> UpdateKind {
        UpdateKind::Message
    }

    async fn handle(
        &self,
        update: &Update,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        match inbound_message(update, self.bot_username.as_deref()) {
            InboundOutcome::Message(message) => {
                let action = self.responder.handle(&message);
                tracing::debug!(
                    event_name = "core.responder.intent_resolved",
                    correlation_id = %ctx.correlation_id,
                    chat_id = message.chat_id,
                    intent = %action.intent,
                    via_command = message.is_command(),
                    "resolved inbound message"
                );
                Ok(HandlerResult::Responded(action))
            }
            InboundOutcome::AddressedElsewhere { command } => {
                tracing::debug!(
                    correlation_id = %ctx.correlation_id,
                    command = %command,
                    "command addressed to another bot"
                );
                Ok(HandlerResult::Ignored)
            }
            InboundOutcome::Unsupported => {
                Err(EventHandlerError::MissingMessage { update_id: update.update_id })
            }
        }
    }
}
