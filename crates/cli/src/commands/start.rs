use replybot_core::config::{AppConfig, LoadOptions};
use replybot_core::{ApplicationError, Intent, Responder};

use crate::commands::CommandResult;

/// Loads config and renders the catalog, the same preflight the server runs before polling.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error("start", &ApplicationError::from(error)),
    };

    let responder = match Responder::from_config(&config) {
        Ok(responder) => responder,
        Err(error) => return CommandResult::from_error("start", &ApplicationError::from(error)),
    };

    let variants: usize =
        Intent::ALL.iter().map(|intent| responder.catalog().variants(*intent).len()).sum();
    CommandResult::success(
        "start",
        format!(
            "preflight passed: {} intents with {variants} response variants ready for {}",
            Intent::ALL.len(),
            config.company.name
        ),
    )
}
