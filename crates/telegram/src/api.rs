//! Serde models for the subset of the Bot API the bot talks to.

use serde::{Deserialize, Serialize};

use crate::keyboard::ReplyKeyboardMarkup;

/// Envelope every Bot API method responds with.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub date: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyKeyboardMarkup>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommandSpec {
    pub command: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SetMyCommandsRequest {
    pub commands: Vec<BotCommandSpec>,
}

#[cfg(test)]
mod tests {
    use super::{ApiResponse, Update, User};

    #[test]
    fn decodes_text_update_and_ignores_unknown_fields() {
        let raw = r#"{
            "update_id": 815,
            "message": {
                "message_id": 12,
                "date": 1730000000,
                "chat": {"id": -1001, "type": "supergroup", "title": "Ops"},
                "from": {"id": 7, "is_bot": false, "first_name": "Ada", "language_code": "en"},
                "text": "/help@brantech_bot",
                "entities": [{"offset": 0, "length": 18, "type": "bot_command"}]
            }
        }"#;

        let update: Update = serde_json::from_str(raw).expect("update decodes");
        let message = update.message.expect("message present");

        assert_eq!(update.update_id, 815);
        assert_eq!(message.chat.id, -1001);
        assert_eq!(message.chat.kind, "supergroup");
        assert_eq!(message.from.map(|user| user.id), Some(7));
        assert_eq!(message.text.as_deref(), Some("/help@brantech_bot"));
        assert!(update.edited_message.is_none());
    }

    #[test]
    fn decodes_error_envelope_without_result() {
        let raw = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;

        let response: ApiResponse<User> = serde_json::from_str(raw).expect("envelope decodes");

        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(401));
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
    }
}
