use std::sync::Arc;

use replybot_core::config::{AppConfig, LoadOptions};
use replybot_core::{ApplicationError, FixedPicker, InboundMessage, Intent, Responder};
use replybot_telegram::api::SendMessageRequest;
use serde::Serialize;

use crate::commands::{escape_json, CommandResult};

/// Chat id used for previews; nothing is sent.
const PREVIEW_CHAT_ID: i64 = 0;

#[derive(Debug, Clone, Default)]
pub struct ReplyArgs {
    pub command: Option<String>,
    pub variant: Option<usize>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReplyPreview<'a> {
    command: &'static str,
    status: &'static str,
    intent: Intent,
    inbound: &'a InboundMessage,
    request: SendMessageRequest,
}

/// Runs one message through the configured responder and prints the `sendMessage` body it
/// would produce.
pub fn run(args: ReplyArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error("reply", &ApplicationError::from(error)),
    };

    let mut responder = match Responder::from_config(&config) {
        Ok(responder) => responder,
        Err(error) => return CommandResult::from_error("reply", &ApplicationError::from(error)),
    };
    if let Some(index) = args.variant {
        responder = responder.with_picker(Arc::new(FixedPicker(index)));
    }

    let inbound = inbound_message(args.command, args.text);
    let action = responder.handle(&inbound);
    let preview = ReplyPreview {
        command: "reply",
        status: "ok",
        intent: action.intent,
        inbound: &inbound,
        request: SendMessageRequest::from_action(&action),
    };

    let output = serde_json::to_string(&preview).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"reply\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    });
    CommandResult { exit_code: 0, output }
}

fn inbound_message(command: Option<String>, text: Option<String>) -> InboundMessage {
    let command = command
        .map(|name| name.trim().trim_start_matches('/').to_ascii_lowercase())
        .filter(|name| !name.is_empty());

    InboundMessage { chat_id: PREVIEW_CHAT_ID, sender_id: None, text, command }
}
