//! Row shapes returned by the learning database, one type per origin.
//!
//! Enrichment columns are stored as JSON text and stay raw here; the adapters
//! in `content::adapters` decide what a malformed value means.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonVocabRow {
  pub id: i64,
  pub lesson_id: Option<i64>,
  pub language: Option<String>,
  pub content_type: Option<String>,
  pub word: String,
  pub translation: String,
  pub transliteration: Option<String>,
  pub letter_breakdown: Option<String>,
  pub hebrew_cognate: Option<String>,
  pub example_sentences: Option<String>,
  pub memory_note: Option<String>,
  pub memory_image_url: Option<String>,
  pub mastery_level: Option<String>,
  pub times_practiced: i64,
  pub times_correct: i64,
  pub last_reviewed: Option<String>,
  pub next_review: Option<String>,
}

/// A word saved from a lookup. The saved-words table only ever holds Arabic
/// single words.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedWordRow {
  pub id: i64,
  pub word: String,
  pub translation: String,
  pub transliteration: Option<String>,
  pub status: Option<String>,
  pub letter_breakdown: Option<String>,
  pub hebrew_cognate: Option<String>,
  pub example_sentences: Option<String>,
  pub memory_note: Option<String>,
  pub memory_image_url: Option<String>,
  pub source_lookup_id: Option<String>,
  pub times_practiced: i64,
  pub times_correct: i64,
  pub last_reviewed: Option<String>,
  pub next_review: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
  LessonVocab(LessonVocabRow),
  SavedWord(SavedWordRow),
}

impl From<LessonVocabRow> for SourceRow {
  fn from(row: LessonVocabRow) -> Self {
    Self::LessonVocab(row)
  }
}

impl From<SavedWordRow> for SourceRow {
  fn from(row: SavedWordRow) -> Self {
    Self::SavedWord(row)
  }
}
