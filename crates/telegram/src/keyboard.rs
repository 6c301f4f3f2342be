use replybot_core::{QuickActionMenu, SendAction};
use serde::{Deserialize, Serialize};

use crate::api::SendMessageRequest;

/// Replies are formatted with Telegram's legacy Markdown.
pub const PARSE_MODE: &str = "Markdown";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub is_persistent: bool,
}

impl From<&QuickActionMenu> for ReplyKeyboardMarkup {
    fn from(menu: &QuickActionMenu) -> Self {
        let keyboard = menu
            .rows()
            .iter()
            .map(|row| row.iter().map(|label| KeyboardButton { text: label.clone() }).collect())
            .collect();
        Self { keyboard, resize_keyboard: true, is_persistent: true }
    }
}

impl SendMessageRequest {
    pub fn from_action(action: &SendAction) -> Self {
        Self {
            chat_id: action.chat_id,
            text: action.text.clone(),
            parse_mode: Some(PARSE_MODE.to_owned()),
            reply_markup: Some(ReplyKeyboardMarkup::from(&action.menu)),
        }
    }
}
