//! Static replies served when the generation call cannot produce an answer.
//!
//! Rules are checked in a fixed priority order and the first match wins:
//! repeated greeting → greeting → pricing → services → overview. The table is
//! built once from [`DomainKnowledge`] and never changes afterwards.

use querystream_core::{ChatMessage, DomainKnowledge, Sender};
use serde::Serialize;

use crate::conversation::{contains_word_phrase, find_phrase, normalize_text, tokenize};

const PRICING_TERMS: &[&str] = &["price", "pricing", "cost"];
const SERVICE_TERMS: &[&str] = &["service", "what"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackRuleId {
    RepeatGreeting,
    Greeting,
    Pricing,
    Services,
    Overview,
}

impl FallbackRuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RepeatGreeting => "repeat_greeting",
            Self::Greeting => "greeting",
            Self::Pricing => "pricing",
            Self::Services => "services",
            Self::Overview => "overview",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Trigger {
    /// Greeting in the message and in an earlier user turn.
    RepeatedGreeting,
    Greeting,
    AnyTerm(Vec<String>),
    Always,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackRule {
    pub id: FallbackRuleId,
    trigger: Trigger,
    pub response: String,
}

/// What a trigger is evaluated against. Built once per lookup.
struct Probe<'a> {
    normalized: String,
    tokens: Vec<String>,
    history: &'a [ChatMessage],
}

#[derive(Clone, Debug)]
pub struct FallbackTable {
    rules: Vec<FallbackRule>,
    greetings: Vec<String>,
    history_window: usize,
}

impl FallbackTable {
    pub fn from_knowledge(
        knowledge: &DomainKnowledge,
        greetings: &[String],
        history_window: usize,
    ) -> Self {
        let rules = vec![
            FallbackRule {
                id: FallbackRuleId::RepeatGreeting,
                trigger: Trigger::RepeatedGreeting,
                response: repeat_greeting_reply(knowledge),
            },
            FallbackRule {
                id: FallbackRuleId::Greeting,
                trigger: Trigger::Greeting,
                response: greeting_reply(knowledge),
            },
            FallbackRule {
                id: FallbackRuleId::Pricing,
                trigger: Trigger::AnyTerm(owned(PRICING_TERMS)),
                response: pricing_reply(knowledge),
            },
            FallbackRule {
                id: FallbackRuleId::Services,
                trigger: Trigger::AnyTerm(owned(SERVICE_TERMS)),
                response: services_reply(knowledge),
            },
            FallbackRule {
                id: FallbackRuleId::Overview,
                trigger: Trigger::Always,
                response: overview_reply(knowledge),
            },
        ];

        Self {
            rules,
            greetings: greetings.iter().map(|greeting| normalize_text(greeting)).collect(),
            history_window,
        }
    }

    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }

    /// First rule whose trigger matches. The last rule always matches.
    pub fn select(&self, message: &str, history: &[ChatMessage]) -> &FallbackRule {
        let normalized = normalize_text(message);
        let probe = Probe { tokens: tokenize(&normalized), normalized, history };

        self.rules
            .iter()
            .find(|rule| self.matches(&rule.trigger, &probe))
            .unwrap_or_else(|| &self.rules[self.rules.len() - 1])
    }

    fn matches(&self, trigger: &Trigger, probe: &Probe<'_>) -> bool {
        match trigger {
            Trigger::RepeatedGreeting => {
                self.is_greeting(&probe.tokens) && self.greeted_before(probe.history)
            }
            Trigger::Greeting => self.is_greeting(&probe.tokens),
            Trigger::AnyTerm(terms) => find_phrase(&probe.normalized, terms).is_some(),
            Trigger::Always => true,
        }
    }

    fn is_greeting(&self, tokens: &[String]) -> bool {
        self.greetings.iter().any(|greeting| contains_word_phrase(tokens, greeting))
    }

    fn greeted_before(&self, history: &[ChatMessage]) -> bool {
        let start = history.len().saturating_sub(self.history_window);
        history[start..]
            .iter()
            .filter(|entry| entry.sender == Sender::User)
            .any(|entry| self.is_greeting(&tokenize(&normalize_text(&entry.text))))
    }
}

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|term| term.to_string()).collect()
}

fn repeat_greeting_reply(knowledge: &DomainKnowledge) -> String {
    format!(
        "Good to hear from you again! Let's pick up where we left off. I can tell you about \
         {}'s pricing, features, setup process, or how a chatbot could work for your business. \
         What would you like to know?",
        knowledge.company
    )
}

fn greeting_reply(knowledge: &DomainKnowledge) -> String {
    format!(
        "Hello! Welcome to {}. {}\n\nI can help with pricing, features, the setup process, or how \
         a chatbot could work for your business. What would you like to know?",
        knowledge.company, knowledge.summary
    )
}

fn pricing_reply(knowledge: &DomainKnowledge) -> String {
    let mut lines =
        vec!["Our pricing is transparent and affordable for UK businesses:".to_string()];
    for package in &knowledge.packages {
        lines.push(String::new());
        lines.push(format!("**{}**", knowledge.package_line(package)));
        lines.extend(package.highlights.iter().map(|highlight| format!("- {highlight}")));
    }
    if !knowledge.contract_terms.is_empty() {
        lines.push(String::new());
        lines.push(format!("{}.", knowledge.contract_terms.join(", ")));
    }
    lines.push(String::new());
    lines.push(format!("Contact {} for a free consultation!", knowledge.contact.email));
    lines.join("\n")
}

fn services_reply(knowledge: &DomainKnowledge) -> String {
    let mut lines =
        vec![format!("{} provides AI chatbot solutions for UK businesses:", knowledge.company)];
    for service in &knowledge.services {
        lines.push(String::new());
        lines.push(format!("**{}:** {}", service.name, service.description));
    }
    if !knowledge.industries.is_empty() {
        let industries =
            knowledge.industries.iter().map(|industry| industry.name.as_str()).collect::<Vec<_>>();
        lines.push(String::new());
        lines.push(format!("We work with {} across the UK.", industries.join(", ")));
    }
    lines.push(String::new());
    lines.push(format!(
        "Want to know more? Email {} for a free consultation.",
        knowledge.contact.email
    ));
    lines.join("\n")
}

fn overview_reply(knowledge: &DomainKnowledge) -> String {
    let mut lines = vec![
        format!("Welcome to {}! {}", knowledge.company, knowledge.summary),
        String::new(),
        "Our chatbots help you:".to_string(),
    ];
    lines.extend(knowledge.features.iter().take(4).map(|feature| format!("- {feature}")));
    lines.push(String::new());
    lines.push(format!(
        "Interested in learning more? Contact {} or call {} for a free consultation ({}).",
        knowledge.contact.email, knowledge.contact.phone, knowledge.contact.response_time
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use querystream_core::{ChatMessage, DomainKnowledge};

    use super::{FallbackRuleId, FallbackTable};
    use crate::scope::ScopeVocabulary;

    fn table() -> FallbackTable {
        FallbackTable::from_knowledge(
            &DomainKnowledge::querystream(),
            &ScopeVocabulary::default().greetings,
            4,
        )
    }

    #[test]
    fn plain_greeting_without_history() {
        assert_eq!(table().select("hello", &[]).id, FallbackRuleId::Greeting);
    }

    #[test]
    fn repeated_greeting_is_not_answered_with_a_second_welcome() {
        let history = vec![ChatMessage::user("good morning")];
        assert_eq!(table().select("hello", &history).id, FallbackRuleId::RepeatGreeting);
    }

    #[test]
    fn bot_greetings_do_not_count_as_prior_greetings() {
        let history = vec![ChatMessage::bot("Hello! How can I help?")];
        assert_eq!(table().select("hello", &history).id, FallbackRuleId::Greeting);
    }

    #[test]
    fn prior_greeting_outside_window_is_ignored() {
        let mut history = vec![ChatMessage::user("hi there")];
        for index in 0..4 {
            history.push(ChatMessage::bot(format!("answer {index}")));
        }
        assert_eq!(table().select("hello", &history).id, FallbackRuleId::Greeting);
    }

    #[test]
    fn pricing_reply_lists_both_packages() {
        let table = table();
        let rule = table.select("What's your pricing?", &[]);

        assert_eq!(rule.id, FallbackRuleId::Pricing);
        assert!(rule.response.contains("Starter Package: £150 setup + £40/month"));
        assert!(rule.response.contains("Professional Package: £200 setup + £50/month"));
    }

    #[test]
    fn service_and_what_questions_get_overview_of_services() {
        let table = table();
        assert_eq!(table.select("what do you do", &[]).id, FallbackRuleId::Services);
        assert_eq!(table.select("Tell me about your services", &[]).id, FallbackRuleId::Services);
    }

    #[test]
    fn greeting_detection_uses_whole_words() {
        // "which" must not read as "hi".
        assert_eq!(table().select("which one suits me", &[]).id, FallbackRuleId::Overview);
    }

    #[test]
    fn quoted_greetings_are_still_greetings() {
        assert_eq!(table().select("'hello'", &[]).id, FallbackRuleId::Greeting);
        assert_eq!(table().select("\"Hi!\"", &[]).id, FallbackRuleId::Greeting);
    }

    #[test]
    fn typographic_apostrophe_greeting_matches() {
        assert_eq!(table().select("how\u{2019}s it going", &[]).id, FallbackRuleId::Greeting);
    }

    #[test]
    fn quoted_prior_greeting_is_remembered() {
        let history = vec![ChatMessage::user("'hi'"), ChatMessage::bot("Hello! How can I help?")];
        assert_eq!(table().select("Hello", &history).id, FallbackRuleId::RepeatGreeting);
    }

    #[test]
    fn catch_all_includes_contact_details() {
        let table = table();
        let rule = table.select("tell me more", &[]);

        assert_eq!(rule.id, FallbackRuleId::Overview);
        assert!(rule.response.contains("hello@querystream.co.uk"));
        assert!(rule.response.contains("+44 7123 456 789"));
    }

    #[test]
    fn selection_is_deterministic() {
        let table = table();
        let history = vec![ChatMessage::user("hey"), ChatMessage::bot("Hi!")];
        let first = table.select("hey again, what does it cost?", &history).clone();
        for _ in 0..10 {
            assert_eq!(table.select("hey again, what does it cost?", &history), &first);
        }
    }

    #[test]
    fn rules_are_in_priority_order() {
        let ids = table().rules().iter().map(|rule| rule.id).collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![
                FallbackRuleId::RepeatGreeting,
                FallbackRuleId::Greeting,
                FallbackRuleId::Pricing,
                FallbackRuleId::Services,
                FallbackRuleId::Overview,
            ]
        );
    }
}
