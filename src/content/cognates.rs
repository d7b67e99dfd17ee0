//! Hebrew cognate lookup and display gating for Arabic content.
//!
//! Learners who already read Hebrew get the shared Semitic root pointed out.
//! Whether a cognate is shown is decided by pure predicates over tokenizer and
//! adapter output; nothing here touches storage.

use serde::Serialize;

use super::tokenizer::{tokenize, Token};
use crate::domain::{Cognate, ContentType, Language, PracticeItem};
use crate::validation::fold_arabic;

/// Word -> optional cognate. Implementations must be pure.
pub trait CognateLookup {
    fn lookup(&self, word: &str, language: Language) -> Option<Cognate>;
}

/// (arabic, hebrew, transliteration, meaning)
static ARABIC_HEBREW_COGNATES: &[(&str, &str, &str, &str)] = &[
    ("سلام", "שלום", "shalom", "peace"),
    ("بيت", "בית", "bayit", "house"),
    ("كلب", "כלב", "kelev", "dog"),
    ("يوم", "יום", "yom", "day"),
    ("عين", "עין", "ayin", "eye"),
    ("راس", "ראש", "rosh", "head"),
    ("اسم", "שם", "shem", "name"),
    ("لسان", "לשון", "lashon", "tongue"),
    ("ملك", "מלך", "melekh", "king"),
    ("كتاب", "כתב", "ktav", "writing"),
    ("ارض", "ארץ", "eretz", "land"),
    ("شمس", "שמש", "shemesh", "sun"),
    ("ليل", "לילה", "laila", "night"),
    ("قلب", "לב", "lev", "heart"),
    ("اب", "אב", "av", "father"),
    ("ام", "אם", "em", "mother"),
    ("اخ", "אח", "ach", "brother"),
    ("ثلاث", "שלוש", "shalosh", "three"),
    ("خمس", "חמש", "chamesh", "five"),
    ("جديد", "חדש", "chadash", "new"),
];

/// Built-in Arabic -> Hebrew table. Lookups ignore diacritics, alef variants and
/// a leading definite article.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCognates;

impl CognateLookup for StaticCognates {
    fn lookup(&self, word: &str, language: Language) -> Option<Cognate> {
        if language != Language::Arabic {
            return None;
        }
        let folded = fold_arabic(word.trim());
        let candidates = [
            folded.as_str(),
            folded.strip_prefix("ال").unwrap_or(folded.as_str()),
        ];

        candidates.iter().find_map(|candidate| {
            ARABIC_HEBREW_COGNATES
                .iter()
                .find(|(arabic, ..)| arabic == candidate)
                .map(|(_, hebrew, translit, meaning)| Cognate {
                    language: Language::Hebrew,
                    word: hebrew.to_string(),
                    transliteration: Some(translit.to_string()),
                    meaning: Some(meaning.to_string()),
                })
        })
    }
}

/// Learner preferences that influence gating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CognatePrefs {
    pub knows_hebrew: bool,
}

/// A cognate found for one word token of a longer text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CognateHint {
    pub token_index: usize,
    pub word: String,
    pub cognate: Cognate,
}

/// Shortest Arabic word worth matching; one-letter particles produce noise.
const MIN_HINT_WORD_CHARS: usize = 2;

fn single_word(tokens: &[Token]) -> bool {
    tokens.iter().filter(|t| t.is_word()).count() == 1
}

/// The item's own cognate enrichment, or a lookup for single-word items.
pub fn resolve_cognate(item: &PracticeItem, lookup: &dyn CognateLookup) -> Option<Cognate> {
    if let Some(cognate) = &item.cognate {
        return Some(cognate.clone());
    }
    if item.content_type != ContentType::Word {
        return None;
    }
    let tokens = tokenize(&item.target_text, item.language);
    if !single_word(&tokens) {
        return None;
    }
    let word = tokens.iter().find(|t| t.is_word())?;
    lookup.lookup(&word.text, item.language)
}

/// Whether a Hebrew cognate may be displayed next to `item`.
pub fn should_show_hebrew_cognate(
    item: &PracticeItem,
    cognate: Option<&Cognate>,
    prefs: CognatePrefs,
) -> bool {
    let Some(cognate) = cognate else {
        return false;
    };
    if !prefs.knows_hebrew
        || item.language != Language::Arabic
        || item.content_type != ContentType::Word
        || cognate.language != Language::Hebrew
        || cognate.word.trim().is_empty()
        || cognate.word.trim() == item.target_text.trim()
    {
        return false;
    }
    single_word(&tokenize(&item.target_text, item.language))
}

/// Gated cognate for `item`, ready for display.
pub fn display_cognate(
    item: &PracticeItem,
    lookup: &dyn CognateLookup,
    prefs: CognatePrefs,
) -> Option<Cognate> {
    let cognate = resolve_cognate(item, lookup)?;
    should_show_hebrew_cognate(item, Some(&cognate), prefs).then_some(cognate)
}

/// Per-word cognate hints for Arabic sentences, passages and dialogs.
pub fn cognate_hints(
    item: &PracticeItem,
    lookup: &dyn CognateLookup,
    prefs: CognatePrefs,
) -> Vec<CognateHint> {
    if !prefs.knows_hebrew
        || item.language != Language::Arabic
        || !item.content_type.is_multi_word()
    {
        return Vec::new();
    }

    tokenize(&item.target_text, item.language)
        .into_iter()
        .enumerate()
        .filter(|(_, t)| t.is_word() && t.text.chars().count() >= MIN_HINT_WORD_CHARS)
        .filter_map(|(token_index, t)| {
            lookup
                .lookup(&t.text, item.language)
                .map(|cognate| CognateHint {
                    token_index,
                    word: t.text,
                    cognate,
                })
        })
        .collect()
}
