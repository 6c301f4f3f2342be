use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{CatalogError, QuickActionMenu, ResponseCatalog, TemplateSet};
use crate::config::AppConfig;
use crate::intent::{Intent, KeywordTable};
use crate::variant::{ThreadRngPicker, VariantPicker};

/// A parsed incoming message as delivered by the messaging gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub sender_id: Option<i64>,
    pub text: Option<String>,
    /// Explicit bot command name without the leading slash, e.g. `services`.
    pub command: Option<String>,
}

impl InboundMessage {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, sender_id: None, text: Some(text.into()), command: None }
    }

    pub fn command(chat_id: i64, name: impl Into<String>) -> Self {
        Self { chat_id, sender_id: None, text: None, command: Some(name.into()) }
    }

    pub fn with_sender(mut self, sender_id: i64) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_command(&self) -> bool {
        self.command.is_some()
    }
}

/// The single outbound send produced for one inbound message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendAction {
    pub chat_id: i64,
    pub intent: Intent,
    pub text: String,
    pub menu: QuickActionMenu,
}

/// Classifies inbound messages and turns them into replies.
///
/// Holds only immutable tables, so one instance can serve any number of chats concurrently.
#[derive(Clone)]
pub struct Responder {
    keywords: KeywordTable,
    catalog: Arc<ResponseCatalog>,
    picker: Arc<dyn VariantPicker>,
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("keywords", &self.keywords)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl Responder {
    pub fn new(
        keywords: KeywordTable,
        catalog: Arc<ResponseCatalog>,
        picker: Arc<dyn VariantPicker>,
    ) -> Self {
        Self { keywords, catalog, picker }
    }

    /// Builds the keyword table and catalog described by `config`, picking variants at random.
    pub fn from_config(config: &AppConfig) -> Result<Self, CatalogError> {
        let templates = TemplateSet::builtin().with_overrides(&config.responses);
        let catalog = ResponseCatalog::with_templates(&config.company, &templates)?;
        Ok(Self::new(
            KeywordTable::with_overrides(&config.keywords),
            Arc::new(catalog),
            Arc::new(ThreadRngPicker),
        ))
    }

    pub fn with_picker(mut self, picker: Arc<dyn VariantPicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn catalog(&self) -> &ResponseCatalog {
        &self.catalog
    }

    pub fn classify(&self, text: &str) -> Intent {
        self.keywords.classify(text)
    }

    /// Commands map straight to their intent and never look at the text. Unknown commands
    /// resolve to `Fallback`, and a message without text classifies as empty.
    pub fn resolve(&self, message: &InboundMessage) -> Intent {
        if let Some(command) = &message.command {
            return Intent::from_command(command).unwrap_or(Intent::Fallback);
        }

        self.classify(message.text.as_deref().unwrap_or_default())
    }

    pub fn handle(&self, message: &InboundMessage) -> SendAction {
        let intent = self.resolve(message);
        let reply = self.catalog.render(intent, self.picker.as_ref());
        SendAction { chat_id: message.chat_id, intent, text: reply.text, menu: reply.menu }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{InboundMessage, Responder};
    use crate::catalog::{CompanyProfile, QuickActionMenu, ResponseCatalog};
    use crate::config::AppConfig;
    use crate::intent::{Intent, KeywordTable};
    use crate::variant::FixedPicker;

    fn responder() -> Responder {
        let catalog = ResponseCatalog::from_profile(&CompanyProfile::default()).expect("catalog");
        Responder::new(KeywordTable::default(), Arc::new(catalog), Arc::new(FixedPicker(0)))
    }

    #[test]
    fn explicit_command_bypasses_keyword_matching() {
        let responder = responder();

        let message = InboundMessage::command(42, "services").with_text("hello, contact me");
        let action = responder.handle(&message);

        assert!(message.is_command());
        assert_eq!(action.intent, Intent::Services);
        assert_eq!(action.chat_id, 42);
        assert!(action.text.contains("Our services"));
    }

    #[test]
    fn every_command_maps_to_its_intent() {
        let responder = responder();

        for (name, intent) in [
            ("start", Intent::Start),
            ("help", Intent::Help),
            ("about", Intent::About),
            ("services", Intent::Services),
            ("contact", Intent::Contact),
        ] {
            assert_eq!(responder.resolve(&InboundMessage::command(1, name)), intent);
        }
    }

    #[test]
    fn unknown_command_falls_back() {
        let responder = responder();
        let message = InboundMessage::command(1, "pricing").with_text("hello");

        assert_eq!(responder.resolve(&message), Intent::Fallback);
    }

    #[test]
    fn free_text_is_classified() {
        let responder = responder();

        let action = responder.handle(&InboundMessage::text(7, "can I get your contact email"));
        assert_eq!(action.intent, Intent::Contact);
        assert!(action.text.contains("info@brantechsolutions.com"));

        let greeting =
            responder.handle(&InboundMessage::text(7, "hi there, what services do you offer?"));
        assert_eq!(greeting.intent, Intent::Start);
    }

    #[test]
    fn message_without_text_gets_fallback_reply() {
        let responder = responder();
        let message = InboundMessage { chat_id: 9, sender_id: Some(3), text: None, command: None };

        let action = responder.handle(&message);
        assert_eq!(action.intent, Intent::Fallback);
        assert!(!action.text.is_empty());
        assert_eq!(action.menu, QuickActionMenu::standard());
    }

    #[test]
    fn menu_labels_route_back_to_their_intents() {
        let responder = responder();
        let expected = [Intent::About, Intent::Services, Intent::Contact, Intent::Help];

        let labels = responder.catalog().menu().labels().collect::<Vec<_>>();
        assert_eq!(labels.len(), expected.len());
        for (label, intent) in labels.into_iter().zip(expected) {
            assert_eq!(responder.classify(label), intent, "label {label:?}");
        }
    }

    #[test]
    fn picker_controls_variant_choice() {
        let responder = responder().with_picker(Arc::new(FixedPicker(2)));

        let action = responder.handle(&InboundMessage::command(1, "start"));
        assert_eq!(action.text, responder.catalog().variants(Intent::Start)[2]);
    }

    #[test]
    fn from_config_applies_keyword_and_response_overrides() {
        let mut config = AppConfig::default();
        config.keywords.insert(Intent::Services, vec!["catalogue".to_owned()]);
        config.responses.insert(
            Intent::Services,
            vec!["We do {{ company.services | length }} things".to_owned()],
        );

        let responder = Responder::from_config(&config).expect("responder");
        let action = responder.handle(&InboundMessage::text(5, "Send me the catalogue"));

        assert_eq!(action.intent, Intent::Services);
        assert_eq!(action.text, "We do 4 things");
    }
}
