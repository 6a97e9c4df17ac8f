use querystream_core::ChatMessage;

/// Lowercased, trimmed form every phrase comparison works on. Typographic
/// apostrophes become `'` so phrase lists only need the ASCII spelling.
pub fn normalize_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .replace(|character: char| matches!(character, '\u{2018}' | '\u{2019}'), "'")
}

/// Lowercases and splits on anything that is not alphanumeric or an
/// apostrophe, so `"Hi!! what's new"` becomes `["hi", "what's", "new"]`.
/// Typographic apostrophes count as `'`, and quotes wrapping a word are
/// dropped, so `'hello'` yields `hello`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars().flat_map(char::to_lowercase) {
        match character {
            '\u{2018}' | '\u{2019}' | '\'' => sanitized.push('\''),
            character if character.is_alphanumeric() => sanitized.push(character),
            _ => sanitized.push(' '),
        }
    }
    sanitized
        .split_whitespace()
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Substring match on already-normalized text.
pub fn find_phrase<'a>(normalized_text: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases.iter().map(String::as_str).find(|phrase| normalized_text.contains(phrase))
}

/// Whole-word match: every word of `phrase` appears as consecutive tokens.
pub fn contains_word_phrase(tokens: &[String], phrase: &str) -> bool {
    let phrase_tokens = tokenize(&normalize_text(phrase));
    if phrase_tokens.is_empty() || phrase_tokens.len() > tokens.len() {
        return false;
    }
    tokens.windows(phrase_tokens.len()).any(|window| window == phrase_tokens.as_slice())
}

/// `"<sender>: <text>"` lines for the last `window` turns, oldest first.
pub fn render_transcript(history: &[ChatMessage], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .map(|message| {
            format!("{}: {}\n", message.sender.transcript_label(), message.text.trim())
        })
        .collect()
}
