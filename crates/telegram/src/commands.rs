use replybot_core::Intent;

use crate::api::BotCommandSpec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BotCommand {
    pub intent: Intent,
    pub description: &'static str,
}

impl BotCommand {
    pub fn name(&self) -> &'static str {
        self.intent.as_str()
    }
}

/// Commands advertised to Telegram clients, in menu order.
pub const BOT_COMMANDS: [BotCommand; 5] = [
    BotCommand { intent: Intent::Start, description: "Welcome message" },
    BotCommand { intent: Intent::Help, description: "Show available commands" },
    BotCommand { intent: Intent::About, description: "Learn about the company" },
    BotCommand { intent: Intent::Services, description: "See the services we offer" },
    BotCommand { intent: Intent::Contact, description: "Get our contact details" },
];

pub fn bot_command_specs() -> Vec<BotCommandSpec> {
    BOT_COMMANDS
        .iter()
        .map(|command| BotCommandSpec {
            command: command.name().to_owned(),
            description: command.description.to_owned(),
        })
        .collect()
}

/// A `/name@bot args` message split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lower-cased command name without the slash.
    pub name: String,
    pub mention: Option<String>,
    pub args: String,
}

impl ParsedCommand {
    /// Commands without a mention are addressed to every bot in the chat.
    pub fn is_addressed_to(&self, bot_username: Option<&str>) -> bool {
        match (&self.mention, bot_username) {
            (None, _) => true,
            (Some(mention), Some(username)) => mention.eq_ignore_ascii_case(username),
            (Some(_), None) => false,
        }
    }
}

/// Parses a leading bot command. Returns `None` when the text is not a command.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let trimmed = text.trim_start();
    let rest = trimmed.strip_prefix('/')?;

    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let (name, mention) = match head.split_once('@') {
        Some((name, mention)) => (name, Some(mention.to_owned())),
        None => (head, None),
    };

    if name.is_empty() || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return None;
    }

    Some(ParsedCommand { name: name.to_ascii_lowercase(), mention, args: args.to_owned() })
}
