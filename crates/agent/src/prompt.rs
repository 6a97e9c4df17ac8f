use querystream_core::config::{StyleSettings, Tone};
use querystream_core::{ChatMessage, DomainKnowledge};

use crate::conversation::render_transcript;

pub const DEFAULT_HISTORY_WINDOW: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleConfig {
    pub tone: Tone,
    pub max_words: Option<u32>,
    pub repeat_greetings: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self { tone: Tone::Conversational, max_words: Some(120), repeat_greetings: false }
    }
}

impl From<&StyleSettings> for StyleConfig {
    fn from(settings: &StyleSettings) -> Self {
        Self {
            tone: settings.tone,
            max_words: settings.max_words,
            repeat_greetings: settings.repeat_greetings,
        }
    }
}

/// Builds the full prompt for one generation call. Pure: nothing is cached and
/// no argument is modified.
pub fn build_prompt(
    knowledge: &DomainKnowledge,
    history: &[ChatMessage],
    user_message: &str,
    style: &StyleConfig,
    history_window: usize,
) -> String {
    assemble(&knowledge.render(), history, user_message, style, history_window)
}

/// Holds the rendered knowledge block so it is produced once per process
/// rather than once per request.
#[derive(Clone, Debug)]
pub struct PromptComposer {
    knowledge_block: String,
    style: StyleConfig,
    history_window: usize,
}

impl PromptComposer {
    pub fn new(knowledge: &DomainKnowledge, style: StyleConfig, history_window: usize) -> Self {
        Self { knowledge_block: knowledge.render(), style, history_window }
    }

    pub fn compose(&self, history: &[ChatMessage], user_message: &str) -> String {
        assemble(&self.knowledge_block, history, user_message, &self.style, self.history_window)
    }
}

fn assemble(
    knowledge_block: &str,
    history: &[ChatMessage],
    user_message: &str,
    style: &StyleConfig,
    history_window: usize,
) -> String {
    let mut prompt = String::with_capacity(knowledge_block.len() + 512);
    prompt.push_str(knowledge_block.trim_end());
    prompt.push_str("\n\n");

    let transcript = render_transcript(history, history_window);
    if !transcript.is_empty() {
        prompt.push_str("Recent conversation:\n");
        prompt.push_str(&transcript);
        prompt.push('\n');
    }

    prompt.push_str("Response guidelines:\n");
    prompt.push_str(&style_block(style, !transcript.is_empty()));
    prompt.push('\n');

    prompt.push_str(&format!("User: {user_message}"));
    prompt
}

fn style_block(style: &StyleConfig, conversation_started: bool) -> String {
    let mut block = String::new();
    match style.tone {
        Tone::Conversational => {
            block.push_str(
                "- Reply in a warm, conversational tone, the way a helpful member of the team \
                 would. Use plain language and short paragraphs.\n",
            );
        }
        Tone::Comprehensive => {
            block.push_str(
                "- Provide a comprehensive, detailed response. Be thorough and informative while \
                 remaining professional. Include specific examples, benefits, and actionable \
                 information where relevant.\n",
            );
        }
    }

    if let Some(max_words) = style.max_words {
        block.push_str(&format!("- Keep the reply under {max_words} words.\n"));
    }

    if !style.repeat_greetings && conversation_started {
        block.push_str(
            "- The conversation is already under way. Do not greet the user again; answer the \
             message directly.\n",
        );
    }

    block.push_str(
        "- Write only the assistant's reply. Do not continue the conversation on the user's \
         behalf.\n",
    );
    block
}

#[cfg(test)]
mod tests {
    use querystream_core::config::Tone;
    use querystream_core::{ChatMessage, DomainKnowledge};

    use super::{build_prompt, PromptComposer, StyleConfig, DEFAULT_HISTORY_WINDOW};

    fn long_history(turns: usize) -> Vec<ChatMessage> {
        (0..turns)
            .map(|index| {
                if index % 2 == 0 {
                    ChatMessage::user(format!("marker-user-{index}"))
                } else {
                    ChatMessage::bot(format!("marker-bot-{index}"))
                }
            })
            .collect()
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let knowledge = DomainKnowledge::querystream();
        let history = vec![ChatMessage::user("hi"), ChatMessage::bot("Hello! How can I help?")];
        let prompt = build_prompt(
            &knowledge,
            &history,
            "How long does setup take?",
            &StyleConfig::default(),
            DEFAULT_HISTORY_WINDOW,
        );

        let knowledge_at = prompt.find("You are the QueryStream AI Assistant").expect("knowledge");
        let history_at = prompt.find("Recent conversation:").expect("history");
        let style_at = prompt.find("Response guidelines:").expect("style");
        let message_at = prompt.find("User: How long does setup take?").expect("message");

        assert!(knowledge_at < history_at);
        assert!(history_at < style_at);
        assert!(style_at < message_at);
        assert!(prompt.ends_with("User: How long does setup take?"));
    }

    #[test]
    fn never_includes_more_than_window_entries() {
        let knowledge = DomainKnowledge::querystream();
        let history = long_history(10);
        let prompt =
            build_prompt(&knowledge, &history, "pricing?", &StyleConfig::default(), 4);

        for index in 0..6 {
            assert!(!prompt.contains(&format!("-{index}\n")), "turn {index} should be dropped");
        }
        for index in 6..10 {
            assert!(prompt.contains(&format!("-{index}\n")), "turn {index} should be kept");
        }
    }

    #[test]
    fn empty_history_omits_transcript_and_greeting_rule() {
        let knowledge = DomainKnowledge::querystream();
        let prompt = build_prompt(&knowledge, &[], "hello", &StyleConfig::default(), 4);

        assert!(!prompt.contains("Recent conversation:"));
        assert!(!prompt.contains("Do not greet the user again"));
    }

    #[test]
    fn style_knobs_change_instructions() {
        let knowledge = DomainKnowledge::querystream();
        let history = long_history(2);

        let comprehensive = StyleConfig {
            tone: Tone::Comprehensive,
            max_words: None,
            repeat_greetings: true,
        };
        let prompt = build_prompt(&knowledge, &history, "features?", &comprehensive, 4);
        assert!(prompt.contains("comprehensive, detailed response"));
        assert!(!prompt.contains("Keep the reply under"));
        assert!(!prompt.contains("Do not greet the user again"));

        let terse = StyleConfig { max_words: Some(60), ..StyleConfig::default() };
        let prompt = build_prompt(&knowledge, &history, "features?", &terse, 4);
        assert!(prompt.contains("conversational tone"));
        assert!(prompt.contains("Keep the reply under 60 words."));
        assert!(prompt.contains("Do not greet the user again"));
    }

    #[test]
    fn composer_matches_pure_builder() {
        let knowledge = DomainKnowledge::querystream();
        let history = long_history(5);
        let composer = PromptComposer::new(&knowledge, StyleConfig::default(), 3);

        assert_eq!(
            composer.compose(&history, "What do you offer?"),
            build_prompt(&knowledge, &history, "What do you offer?", &StyleConfig::default(), 3)
        );
    }
}
