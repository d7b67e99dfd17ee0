//! Lossless word/punctuation/whitespace tokenizer.
//!
//! Concatenating the `text` of every token in order reproduces the input
//! exactly. `index` is the byte offset of the token in the original string.

use serde::Serialize;

use crate::domain::Language;

/// Punctuation split out of words for every language (includes the Arabic
/// question mark and comma).
const PUNCTUATION: &[char] = &['.', '!', '?', ',', ';', ':', '؟', '،'];

/// Inverted marks only appear in Spanish text.
const SPANISH_PUNCTUATION: &[char] = &['¿', '¡'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Word,
    Punctuation,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub index: usize,
}

impl Token {
    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

fn is_punctuation(c: char, language: Language) -> bool {
    PUNCTUATION.contains(&c) || (language == Language::Spanish && SPANISH_PUNCTUATION.contains(&c))
}

fn classify(c: char, language: Language) -> TokenKind {
    if c.is_whitespace() {
        TokenKind::Whitespace
    } else if is_punctuation(c, language) {
        TokenKind::Punctuation
    } else {
        TokenKind::Word
    }
}

/// Split `text` into tokens. Whitespace runs and word runs are single tokens;
/// every punctuation mark is its own token.
pub fn tokenize(text: &str, language: Language) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for (index, c) in text.char_indices() {
        let kind = classify(c, language);
        match tokens.last_mut() {
            Some(last) if last.kind == kind && kind != TokenKind::Punctuation => {
                last.text.push(c);
            }
            _ => tokens.push(Token {
                text: c.to_string(),
                kind,
                index,
            }),
        }
    }

    tokens
}

/// Tokenize optional input; `None` yields no tokens.
pub fn tokenize_opt(text: Option<&str>, language: Language) -> Vec<Token> {
    text.map(|t| tokenize(t, language)).unwrap_or_default()
}

/// Word tokens only.
pub fn word_tokens(tokens: &[Token]) -> impl Iterator<Item = &Token> {
    tokens.iter().filter(|t| t.is_word())
}

/// Convenience: the word strings of `text`.
pub fn words(text: &str, language: Language) -> Vec<String> {
    tokenize(text, language)
        .into_iter()
        .filter(Token::is_word)
        .map(|t| t.text)
        .collect()
}

/// Reassemble tokens into the original text.
pub fn join(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}
