//! Source row -> PracticeItem adapters.
//!
//! Adapters are total: optional columns that are missing or malformed become
//! absent fields, never errors. Only id, text and translation are assumed to
//! be present.
//!
//! Mastery tokens are translated per origin and are deliberately NOT mapped
//! onto a shared vocabulary:
//!
//! | origin              | source value           | masteryLevelRaw        |
//! |---------------------|------------------------|------------------------|
//! | `lesson_vocab_item` | NULL / empty           | `new`                  |
//! | `lesson_vocab_item` | anything else          | passed through, trimmed|
//! | `saved_word`        | `learned`              | `practiced`            |
//! | `saved_word`        | anything else / NULL   | `learning`             |

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;

use crate::domain::{
    AnswerType, Cognate, ContentType, Language, LessonVocabRow, Linkage, MasteryRaw, MemoryAid,
    Origin, OriginType, PracticeItem, PromptType, SavedWordRow, SourceRow,
};

/// Lesson rows with an unknown or missing language are treated as Arabic,
/// the language every lesson was authored in before the column existed.
const LESSON_DEFAULT_LANGUAGE: Language = Language::Arabic;

const LESSON_DEFAULT_MASTERY: &str = "new";

/// Saved-word status that counts as practiced; every other status is "learning".
const SAVED_WORD_LEARNED_STATUS: &str = "learned";
const SAVED_WORD_PRACTICED: &str = "practiced";
const SAVED_WORD_LEARNING: &str = "learning";

/// Item id for a lesson vocabulary row.
pub fn lesson_item_id(row_id: i64) -> String {
    format!("vocab-{}", row_id)
}

/// Item id for a saved-word row.
pub fn saved_word_item_id(row_id: i64) -> String {
    format!("saved-{}", row_id)
}

/// Map lesson vocabulary rows.
pub fn from_lesson_vocab(rows: &[LessonVocabRow]) -> Vec<PracticeItem> {
    rows.iter().map(lesson_vocab_item).collect()
}

/// Map saved-word rows.
pub fn from_saved_words(rows: &[SavedWordRow]) -> Vec<PracticeItem> {
    rows.iter().map(saved_word_item).collect()
}

/// Map a mixed list of rows, keeping the first item for any repeated id.
pub fn normalize(rows: &[SourceRow]) -> Vec<PracticeItem> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(|row| match row {
            SourceRow::LessonVocab(r) => lesson_vocab_item(r),
            SourceRow::SavedWord(r) => saved_word_item(r),
        })
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

fn lesson_vocab_item(row: &LessonVocabRow) -> PracticeItem {
    let language = row
        .language
        .as_deref()
        .and_then(Language::from_str)
        .unwrap_or(LESSON_DEFAULT_LANGUAGE);
    let content_type = row
        .content_type
        .as_deref()
        .and_then(ContentType::from_str)
        .unwrap_or(ContentType::Word);

    let mastery = non_empty(row.mastery_level.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| LESSON_DEFAULT_MASTERY.to_string());

    PracticeItem {
        id: lesson_item_id(row.id),
        language,
        content_type,
        target_text: row.word.clone(),
        translation: row.translation.clone(),
        transliteration: non_empty(row.transliteration.as_deref()).map(str::to_string),
        prompt_type: PromptType::TargetText,
        answer_type: AnswerType::Translation,
        mastery: MasteryRaw::new(OriginType::LessonVocabItem, mastery),
        times_practiced: count(row.times_practiced),
        times_correct: count(row.times_correct),
        last_reviewed: parse_timestamp(row.last_reviewed.as_deref()),
        next_review: parse_timestamp(row.next_review.as_deref()),
        origin: Origin {
            origin_type: OriginType::LessonVocabItem,
            id: row.id.to_string(),
        },
        linkage: Linkage {
            lesson_id: row.lesson_id.map(|id| id.to_string()),
            vocab_item_id: Some(row.id.to_string()),
            ..Linkage::default()
        },
        letter_breakdown: parse_json_list(row.letter_breakdown.as_deref()),
        cognate: parse_cognate(row.hebrew_cognate.as_deref()),
        example_sentences: parse_json_list(row.example_sentences.as_deref()),
        memory: memory_aid(row.memory_note.as_deref(), row.memory_image_url.as_deref()),
    }
}

/// Saved words are always single Arabic words; the table has no language or
/// content type columns.
fn saved_word_item(row: &SavedWordRow) -> PracticeItem {
    let mastery = match row.status.as_deref().map(str::trim) {
        Some(SAVED_WORD_LEARNED_STATUS) => SAVED_WORD_PRACTICED,
        _ => SAVED_WORD_LEARNING,
    };

    PracticeItem {
        id: saved_word_item_id(row.id),
        language: Language::Arabic,
        content_type: ContentType::Word,
        target_text: row.word.clone(),
        translation: row.translation.clone(),
        transliteration: non_empty(row.transliteration.as_deref()).map(str::to_string),
        prompt_type: PromptType::TargetText,
        answer_type: AnswerType::Translation,
        mastery: MasteryRaw::new(OriginType::SavedWord, mastery),
        times_practiced: count(row.times_practiced),
        times_correct: count(row.times_correct),
        last_reviewed: parse_timestamp(row.last_reviewed.as_deref()),
        next_review: parse_timestamp(row.next_review.as_deref()),
        origin: Origin {
            origin_type: OriginType::SavedWord,
            id: row.id.to_string(),
        },
        linkage: Linkage {
            saved_word_id: Some(row.id.to_string()),
            lookup_id: non_empty(row.source_lookup_id.as_deref()).map(str::to_string),
            ..Linkage::default()
        },
        letter_breakdown: parse_json_list(row.letter_breakdown.as_deref()),
        cognate: parse_cognate(row.hebrew_cognate.as_deref()),
        example_sentences: parse_json_list(row.example_sentences.as_deref()),
        memory: memory_aid(row.memory_note.as_deref(), row.memory_image_url.as_deref()),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Accepts RFC 3339 and SQLite's `YYYY-MM-DD HH:MM:SS`.
fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = non_empty(value)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a JSON array column; malformed or empty arrays are absent.
fn parse_json_list<T: DeserializeOwned>(value: Option<&str>) -> Option<Vec<T>> {
    let value = non_empty(value)?;
    match serde_json::from_str::<Vec<T>>(value) {
        Ok(list) if !list.is_empty() => Some(list),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Ignoring malformed enrichment column: {}", e);
            None
        }
    }
}

/// The cognate column only ever holds Hebrew cognates. Older rows store the
/// bare Hebrew word instead of a JSON object.
fn parse_cognate(value: Option<&str>) -> Option<Cognate> {
    let value = non_empty(value)?;

    #[derive(serde::Deserialize)]
    struct StoredCognate {
        #[serde(alias = "hebrew")]
        word: Option<String>,
        transliteration: Option<String>,
        meaning: Option<String>,
    }

    if value.starts_with('{') {
        let stored: StoredCognate = serde_json::from_str(value).ok()?;
        let word = non_empty(stored.word.as_deref())?.to_string();
        return Some(Cognate {
            language: Language::Hebrew,
            word,
            transliteration: stored.transliteration,
            meaning: stored.meaning,
        });
    }

    Some(Cognate {
        language: Language::Hebrew,
        word: value.to_string(),
        transliteration: None,
        meaning: None,
    })
}

fn memory_aid(note: Option<&str>, image_url: Option<&str>) -> Option<MemoryAid> {
    let note = non_empty(note).map(str::to_string);
    let image_url = non_empty(image_url).map(str::to_string);
    if note.is_none() && image_url.is_none() {
        return None;
    }
    Some(MemoryAid { note, image_url })
}
