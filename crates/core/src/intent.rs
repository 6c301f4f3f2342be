use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of reasons a user writes to the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Start,
    Help,
    About,
    Services,
    Contact,
    Fallback,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown intent `{0}` (expected start|help|about|services|contact|fallback)")]
pub struct UnknownIntent(pub String);

impl Intent {
    pub const ALL: [Intent; 6] =
        [Self::Start, Self::Help, Self::About, Self::Services, Self::Contact, Self::Fallback];

    /// Keyword evaluation order. Earlier entries win when a message matches several sets.
    pub const CLASSIFIABLE: [Intent; 5] =
        [Self::Start, Self::Help, Self::About, Self::Services, Self::Contact];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::About => "about",
            Self::Services => "services",
            Self::Contact => "contact",
            Self::Fallback => "fallback",
        }
    }

    /// Maps an explicit bot command name (without the leading slash) to its intent.
    ///
    /// `fallback` is not a command; unknown names return `None`.
    pub fn from_command(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('/').to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "about" => Some(Self::About),
            "services" => Some(Self::Services),
            "contact" => Some(Self::Contact),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == normalized)
            .ok_or_else(|| UnknownIntent(value.to_owned()))
    }
}

/// Lowercase substrings that route a message to one intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordSet {
    intent: Intent,
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(intent: Intent, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect::<Vec<_>>();
        keywords.sort();
        keywords.dedup();
        Self { intent, keywords }
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// `normalized` must already be lower-cased.
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|keyword| normalized.contains(keyword.as_str()))
    }
}

/// One keyword set per classifiable intent, held in priority order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordTable {
    sets: Vec<KeywordSet>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            sets: Intent::CLASSIFIABLE
                .into_iter()
                .map(|intent| KeywordSet::new(intent, default_keywords(intent).iter().copied()))
                .collect(),
        }
    }
}

impl KeywordTable {
    /// Replaces the keywords of the listed intents. Entries for `Fallback` are ignored since it
    /// has no keyword set.
    pub fn with_overrides(overrides: &BTreeMap<Intent, Vec<String>>) -> Self {
        let mut table = Self::default();
        for set in &mut table.sets {
            if let Some(keywords) = overrides.get(&set.intent) {
                *set = KeywordSet::new(set.intent, keywords);
            }
        }
        table
    }

    pub fn sets(&self) -> &[KeywordSet] {
        &self.sets
    }

    pub fn keywords_for(&self, intent: Intent) -> &[String] {
        self.sets
            .iter()
            .find(|set| set.intent == intent)
            .map(KeywordSet::keywords)
            .unwrap_or_default()
    }

    /// Total over all inputs: the first matching set in priority order wins, otherwise
    /// `Fallback`.
    pub fn classify(&self, text: &str) -> Intent {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Intent::Fallback;
        }

        self.sets
            .iter()
            .find(|set| set.matches(&normalized))
            .map(KeywordSet::intent)
            .unwrap_or(Intent::Fallback)
    }
}

pub fn normalize_text(input: &str) -> String {
    input.to_lowercase()
}

/// Built-in keywords. Matching is plain substring containment, so short greetings also fire
/// inside longer words (`hi` in "this" or "shipping" routes to `Start`). Operators who need
/// tighter routing replace a set through `[keywords]`.
fn default_keywords(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Start => &[
            "hello",
            "hi",
            "hey",
            "good morning",
            "good afternoon",
            "good evening",
            "greetings",
            "start",
        ],
        Intent::Help => &["help", "assist", "support", "what can you do", "commands"],
        Intent::About => &["about", "who are you", "company", "brantech"],
        Intent::Services => &[
            "service",
            "offer",
            "automation",
            "website",
            "web design",
            "software",
            "develop",
        ],
        Intent::Contact => &[
            "contact",
            "email",
            "phone",
            "call",
            "reach",
            "whatsapp",
            "address",
            "location",
        ],
        Intent::Fallback => &[],
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{Intent, KeywordSet, KeywordTable};

    #[test]
    fn classifies_each_intent_from_its_own_keywords() {
        let table = KeywordTable::default();

        assert_eq!(table.classify("hello"), Intent::Start);
        assert_eq!(table.classify("I need some help"), Intent::Help);
        assert_eq!(table.classify("tell me about the company"), Intent::About);
        assert_eq!(table.classify("what services do you offer"), Intent::Services);
        assert_eq!(table.classify("can I get your contact email"), Intent::Contact);
    }

    #[test]
    fn classification_ignores_case() {
        let table = KeywordTable::default();

        for input in ["HELLO", "Hello", "hello", "hElLo"] {
            assert_eq!(table.classify(input), Intent::Start, "input {input:?}");
        }
    }

    #[test]
    fn earlier_intent_wins_when_keywords_overlap() {
        let table = KeywordTable::default();

        assert_eq!(table.classify("hi there, what services do you offer?"), Intent::Start);
        assert_eq!(table.classify("hello, how do I contact you"), Intent::Start);
        assert_eq!(table.classify("please help me find your phone number"), Intent::Help);
        assert_eq!(table.classify("about your automation services"), Intent::About);
        assert_eq!(table.classify("do you offer support by email"), Intent::Help);
        assert_eq!(table.classify("send the software pricing by email"), Intent::Services);
    }

    #[test]
    fn short_greetings_match_inside_longer_words() {
        let table = KeywordTable::default();

        assert_eq!(table.classify("which services ship abroad"), Intent::Start);
        assert_eq!(table.classify("shipping"), Intent::Start);
    }

    #[test]
    fn unmatched_and_empty_text_fall_back() {
        let table = KeywordTable::default();

        assert_eq!(table.classify(""), Intent::Fallback);
        assert_eq!(table.classify("   "), Intent::Fallback);
        assert_eq!(table.classify("xyzzy plugh"), Intent::Fallback);
        assert_eq!(table.classify("🙂🙂🙂"), Intent::Fallback);
    }

    #[test]
    fn classify_is_total_for_arbitrary_input() {
        let table = KeywordTable::default();
        let inputs = [
            "\u{0}",
            "ÄÖÜ straße",
            "\n\t\r",
            "/start",
            "🤖 HEY 🤖",
            "a very long message that keeps going and going without any of the trigger words",
        ];

        for input in inputs {
            let intent = table.classify(input);
            assert!(Intent::ALL.contains(&intent));
        }
    }

    #[test]
    fn keyword_sets_are_in_priority_order() {
        let table = KeywordTable::default();
        let order = table.sets().iter().map(KeywordSet::intent).collect::<Vec<_>>();

        assert_eq!(order, Intent::CLASSIFIABLE.to_vec());
        assert!(table.keywords_for(Intent::Fallback).is_empty());
    }

    #[test]
    fn overrides_replace_keywords_but_keep_priority() {
        let overrides = BTreeMap::from([
            (Intent::Contact, vec!["  Ring Us ".to_owned(), "".to_owned()]),
            (Intent::Fallback, vec!["ignored".to_owned()]),
        ]);
        let table = KeywordTable::with_overrides(&overrides);

        assert_eq!(table.keywords_for(Intent::Contact), ["ring us".to_owned()]);
        assert_eq!(table.classify("please RING US tomorrow"), Intent::Contact);
        assert_eq!(table.classify("what is your email"), Intent::Fallback);
        assert_eq!(table.classify("ignored"), Intent::Fallback);
        assert_eq!(table.sets().len(), Intent::CLASSIFIABLE.len());
    }

    #[test]
    fn command_names_map_to_intents() {
        assert_eq!(Intent::from_command("start"), Some(Intent::Start));
        assert_eq!(Intent::from_command("/SERVICES"), Some(Intent::Services));
        assert_eq!(Intent::from_command("contact"), Some(Intent::Contact));
        assert_eq!(Intent::from_command("fallback"), None);
        assert_eq!(Intent::from_command("pricing"), None);
    }

    #[test]
    fn intent_names_round_trip_through_from_str() {
        for intent in Intent::ALL {
            assert_eq!(intent.as_str().parse::<Intent>(), Ok(intent));
        }
        assert!("greeting".parse::<Intent>().is_err());
    }
}
