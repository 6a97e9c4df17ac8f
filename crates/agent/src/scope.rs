//! Keyword gate deciding whether a message belongs to the business domain.
//!
//! Evaluation order is fixed and the first matching step decides:
//! greeting (always allowed) → off-topic phrase (veto) → domain keyword →
//! short message (benefit of the doubt) → reject.

use querystream_core::config::ScopeConfig;
use serde::Serialize;

use crate::conversation::{find_phrase, normalize_text};

const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "hiya",
    "good morning",
    "good afternoon",
    "good evening",
    "morning",
    "afternoon",
    "evening",
    "greetings",
    "howdy",
    "how are you",
    "how's it going",
    "nice to meet you",
    "pleased to meet you",
];

const OFF_TOPIC: &[&str] = &[
    "weather",
    "news",
    "politics",
    "sports",
    "recipe",
    "cooking",
    "movie",
    "music",
    "celebrity",
    "game",
    "football",
    "cricket",
    "dating",
    "medical",
    "doctor",
    "medicine",
    "travel",
    "holiday",
    "vacation",
    "flight",
    "hotel",
    "restaurant recommendation",
    "food delivery",
    "uber",
    "taxi",
    "bitcoin",
    "cryptocurrency",
    "stock market",
    "investment",
    "joke",
    "funny",
    "meme",
];

const DOMAIN_KEYWORDS: &[&str] = &[
    "querystream",
    "chatbot",
    "ai",
    "price",
    "pricing",
    "cost",
    "service",
    "business",
    "automation",
    "customer service",
    "website",
    "integration",
    "analytics",
    "uk",
    "restaurant",
    "salon",
    "gym",
    "retail",
    "shop",
    "help",
    "setup",
    "contact",
    "email",
    "phone",
    "consultation",
    "demo",
    "features",
    "support",
    "how",
    "what",
    "when",
    "where",
    "why",
    "can",
    "do",
    "does",
    "will",
    "would",
    "technical",
    "security",
    "gdpr",
    "uptime",
    "refund",
    "cancel",
    "contract",
    "update",
    "maintenance",
    "training",
    "learn",
    "work",
    "platform",
    "wordpress",
    "squarespace",
    "wix",
    "shopify",
    "professional",
    "starter",
    "package",
    "monthly",
    "reliable",
    "secure",
    "ssl",
    "enterprise",
    "backup",
    "monitoring",
    "response",
];

pub const DEFAULT_SHORT_MESSAGE_THRESHOLD: usize = 25;

/// Phrase sets and threshold driving [`ScopeFilter`]. Entries are stored
/// lowercased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeVocabulary {
    pub greetings: Vec<String>,
    pub off_topic: Vec<String>,
    pub keywords: Vec<String>,
    pub short_message_threshold: usize,
}

impl Default for ScopeVocabulary {
    fn default() -> Self {
        Self {
            greetings: lowercase_all(GREETINGS.iter().copied()),
            off_topic: lowercase_all(OFF_TOPIC.iter().copied()),
            keywords: lowercase_all(DOMAIN_KEYWORDS.iter().copied()),
            short_message_threshold: DEFAULT_SHORT_MESSAGE_THRESHOLD,
        }
    }
}

impl ScopeVocabulary {
    pub fn from_config(config: &ScopeConfig) -> Self {
        let defaults = Self::default();
        let pick = |custom: &Option<Vec<String>>, fallback: Vec<String>| match custom {
            Some(values) => lowercase_all(values.iter().map(String::as_str)),
            None => fallback,
        };

        Self {
            greetings: pick(&config.greetings, defaults.greetings),
            off_topic: pick(&config.off_topic, defaults.off_topic),
            keywords: pick(&config.keywords, defaults.keywords),
            short_message_threshold: config.short_message_threshold,
        }
    }
}

fn lowercase_all<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values.map(normalize_text).filter(|value| !value.is_empty()).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScopeReason {
    Greeting { phrase: String },
    OffTopic { phrase: String },
    Keyword { keyword: String },
    ShortMessage { length: usize },
    NoSignal,
}

impl ScopeReason {
    pub fn step(&self) -> &'static str {
        match self {
            Self::Greeting { .. } => "greeting",
            Self::OffTopic { .. } => "off_topic",
            Self::Keyword { .. } => "keyword",
            Self::ShortMessage { .. } => "short_message",
            Self::NoSignal => "no_signal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScopeVerdict {
    pub in_scope: bool,
    pub reason: ScopeReason,
}

#[derive(Clone, Debug, Default)]
pub struct ScopeFilter {
    vocabulary: ScopeVocabulary,
}

impl ScopeFilter {
    pub fn new(vocabulary: ScopeVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &ScopeVocabulary {
        &self.vocabulary
    }

    pub fn is_in_scope(&self, message: &str) -> bool {
        self.classify(message).in_scope
    }

    pub fn classify(&self, message: &str) -> ScopeVerdict {
        let normalized = normalize_text(message);

        if let Some(phrase) = find_phrase(&normalized, &self.vocabulary.greetings) {
            return allow(ScopeReason::Greeting { phrase: phrase.to_string() });
        }

        if let Some(phrase) = find_phrase(&normalized, &self.vocabulary.off_topic) {
            return ScopeVerdict {
                in_scope: false,
                reason: ScopeReason::OffTopic { phrase: phrase.to_string() },
            };
        }

        if let Some(keyword) = find_phrase(&normalized, &self.vocabulary.keywords) {
            return allow(ScopeReason::Keyword { keyword: keyword.to_string() });
        }

        // Measured on the raw message, before trimming.
        let length = message.chars().count();
        if length < self.vocabulary.short_message_threshold {
            return allow(ScopeReason::ShortMessage { length });
        }

        ScopeVerdict { in_scope: false, reason: ScopeReason::NoSignal }
    }
}

fn allow(reason: ScopeReason) -> ScopeVerdict {
    ScopeVerdict { in_scope: true, reason }
}
