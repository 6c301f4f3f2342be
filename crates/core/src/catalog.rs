use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

use crate::intent::Intent;
use crate::variant::VariantPicker;

/// Static facts about the business the bot answers for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub email: String,
    pub phone_primary: String,
    pub phone_secondary: String,
    pub website: String,
    pub services: Vec<String>,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: "Brantech Solutions".to_owned(),
            email: "info@brantechsolutions.com".to_owned(),
            phone_primary: "+1 (555) 010-0100".to_owned(),
            phone_secondary: "+1 (555) 010-0199".to_owned(),
            website: "https://brantechsolutions.com".to_owned(),
            services: vec![
                "Custom software development".to_owned(),
                "Business process automation".to_owned(),
                "Website design and hosting".to_owned(),
                "IT support and consulting".to_owned(),
            ],
        }
    }
}

/// Reply shortcuts shown under every message. Tapping a label sends it back as plain text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuickActionMenu {
    rows: Vec<Vec<String>>,
}

impl Default for QuickActionMenu {
    fn default() -> Self {
        Self::standard()
    }
}

impl QuickActionMenu {
    pub fn standard() -> Self {
        Self {
            rows: vec![
                vec!["About".to_owned(), "Services".to_owned()],
                vec!["Contact Us".to_owned(), "Help".to_owned()],
            ],
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }

    /// The intent a label names by its first word, e.g. `Contact Us` -> `Contact`.
    pub fn intent_for(label: &str) -> Option<Intent> {
        label.split_whitespace().next().and_then(Intent::from_command)
    }
}

/// Unrendered Tera sources for every intent. Templates see the profile as `company`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateSet {
    templates: BTreeMap<Intent, Vec<String>>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateSet {
    pub fn builtin() -> Self {
        let templates = Intent::ALL
            .into_iter()
            .map(|intent| {
                let variants =
                    builtin_templates(intent).iter().map(|source| (*source).to_owned()).collect();
                (intent, variants)
            })
            .collect();
        Self { templates }
    }

    /// Replaces the variants of every intent present in `overrides`.
    pub fn with_overrides(mut self, overrides: &BTreeMap<Intent, Vec<String>>) -> Self {
        for (intent, variants) in overrides {
            self.templates.insert(*intent, variants.clone());
        }
        self
    }

    pub fn variants(&self, intent: Intent) -> &[String] {
        self.templates.get(&intent).map(Vec::as_slice).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no response template registered for intent `{0}`")]
    EmptyIntent(Intent),
    #[error("response template {variant} for intent `{intent}` failed to render: {source}")]
    Template {
        intent: Intent,
        variant: usize,
        #[source]
        source: tera::Error,
    },
    #[error("response template {variant} for intent `{intent}` rendered to empty text")]
    EmptyVariant { intent: Intent, variant: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub intent: Intent,
    pub text: String,
    pub menu: QuickActionMenu,
}

/// Pre-rendered responses for every intent.
///
/// All templates are rendered against the company profile at construction, so a catalog that
/// exists can always answer: `render` never fails and never returns empty text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseCatalog {
    entries: Vec<Vec<String>>,
    menu: QuickActionMenu,
}

impl ResponseCatalog {
    pub fn from_profile(profile: &CompanyProfile) -> Result<Self, CatalogError> {
        Self::with_templates(profile, &TemplateSet::builtin())
    }

    pub fn with_templates(
        profile: &CompanyProfile,
        templates: &TemplateSet,
    ) -> Result<Self, CatalogError> {
        let mut context = Context::new();
        context.insert("company", &markdown_profile(profile));

        let mut entries = Vec::with_capacity(Intent::ALL.len());
        for intent in Intent::ALL {
            let sources = templates.variants(intent);
            if sources.is_empty() {
                return Err(CatalogError::EmptyIntent(intent));
            }

            let mut rendered = Vec::with_capacity(sources.len());
            for (variant, template) in sources.iter().enumerate() {
                let text = Tera::one_off(template, &context, false)
                    .map_err(|source| CatalogError::Template { intent, variant, source })?;
                if text.trim().is_empty() {
                    return Err(CatalogError::EmptyVariant { intent, variant });
                }
                rendered.push(text);
            }
            entries.push(rendered);
        }

        Ok(Self { entries, menu: QuickActionMenu::standard() })
    }

    pub fn render(&self, intent: Intent, picker: &dyn VariantPicker) -> Reply {
        let variants = self.variants(intent);
        let index = picker.pick(variants.len()).min(variants.len().saturating_sub(1));
        let text = variants.get(index).cloned().unwrap_or_default();
        Reply { intent, text, menu: self.menu.clone() }
    }

    pub fn variants(&self, intent: Intent) -> &[String] {
        self.entries.get(intent.index()).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn menu(&self) -> &QuickActionMenu {
        &self.menu
    }
}

/// Characters that open an entity in Telegram's legacy Markdown.
const MARKDOWN_SPECIAL: [char; 4] = ['_', '*', '`', '['];

/// Backslash-escapes legacy Markdown entity characters so the value renders literally.
pub fn escape_markdown(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if MARKDOWN_SPECIAL.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn markdown_profile(profile: &CompanyProfile) -> CompanyProfile {
    CompanyProfile {
        name: escape_markdown(&profile.name),
        email: escape_markdown(&profile.email),
        phone_primary: escape_markdown(&profile.phone_primary),
        phone_secondary: escape_markdown(&profile.phone_secondary),
        website: escape_markdown(&profile.website),
        services: profile.services.iter().map(|service| escape_markdown(service)).collect(),
    }
}

fn builtin_templates(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Start => &[
            "👋 Hello! I'm the *{{ company.name }}* bot.\nType /help to see available commands, or tap a button below.",
            "Hi there! 👋 Welcome to *{{ company.name }}*.\nAsk me about our services, or type /help to see what I can do.",
            "Hey, good to see you! 😊 This is the *{{ company.name }}* assistant.\nType /help for the list of commands.",
        ],
        Intent::Help => &[
            "Here's what I can do:\n/start - Welcome message\n/help - Show this help message\n/about - Learn more about {{ company.name }}\n/services - See the services we offer\n/contact - Get our contact details\n\nYou can also type a question or tap one of the buttons below.",
        ],
        Intent::About => &[
            "🤖 *{{ company.name }}* builds technology and automation solutions for growing businesses.\nThis bot was created by {{ company.name }} to help with tech and automation tasks.\nLearn more at {{ company.website }}",
        ],
        Intent::Services => &[
            "🛠 *Our services*\n{% for service in company.services %}• {{ service }}\n{% endfor %}\nWant to discuss a project? Tap *Contact Us*.",
        ],
        Intent::Contact => &[
            "📞 *Contact {{ company.name }}*\nEmail: {{ company.email }}\nPhone: {{ company.phone_primary }} / {{ company.phone_secondary }}\nWebsite: {{ company.website }}",
        ],
        Intent::Fallback => &[
            "🤔 Sorry, I didn't quite catch that.\nTry one of the buttons below, or type /help to see what I can do.",
            "Hmm, I'm not sure how to answer that yet. Type /help for the list of commands.",
            "I didn't understand that one. 🙏 Pick an option below or send /help.",
        ],
    }
}
