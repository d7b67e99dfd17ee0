use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  Arabic,
  Hebrew,
  Spanish,
}

impl Language {
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "arabic" | "ar" => Some(Self::Arabic),
      "hebrew" | "he" => Some(Self::Hebrew),
      "spanish" | "es" => Some(Self::Spanish),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Arabic => "arabic",
      Self::Hebrew => "hebrew",
      Self::Spanish => "spanish",
    }
  }

  pub fn is_rtl(&self) -> bool {
    matches!(self, Self::Arabic | Self::Hebrew)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
  Word,
  Sentence,
  Passage,
  Dialog,
}

impl ContentType {
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "word" | "phrase" => Some(Self::Word),
      "sentence" => Some(Self::Sentence),
      "passage" => Some(Self::Passage),
      "dialog" | "dialogue" => Some(Self::Dialog),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Word => "word",
      Self::Sentence => "sentence",
      Self::Passage => "passage",
      Self::Dialog => "dialog",
    }
  }

  /// Multi-word content is checked token by token instead of as a single string.
  pub fn is_multi_word(&self) -> bool {
    !matches!(self, Self::Word)
  }
}

/// What the learner is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
  TargetText,
  Translation,
}

/// What the learner has to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
  Translation,
  TargetText,
  Transliteration,
}

/// Source system an item was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginType {
  LessonVocabItem,
  SavedWord,
  LookupResult,
  VoiceTurn,
}

impl OriginType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::LessonVocabItem => "lesson_vocab_item",
      Self::SavedWord => "saved_word",
      Self::LookupResult => "lookup_result",
      Self::VoiceTurn => "voice_turn",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
  #[serde(rename = "type")]
  pub origin_type: OriginType,
  pub id: String,
}

/// Back-references to the records an item was derived from. Navigation only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Linkage {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lesson_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vocab_item_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub saved_word_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lookup_id: Option<String>,
}

/// Mastery token as stored by the source system.
///
/// The vocabulary differs per origin (lesson rows use "new"/"learning"/..., saved
/// words use "learning"/"practiced"), so the raw value is only reachable
/// together with the origin it belongs to. Comparing values across origins is
/// meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRaw {
  pub origin_type: OriginType,
  pub raw_value: String,
}

impl MasteryRaw {
  pub fn new(origin_type: OriginType, raw_value: impl Into<String>) -> Self {
    Self {
      origin_type,
      raw_value: raw_value.into(),
    }
  }

  /// Raw value, but only if the caller is interpreting it for the right origin.
  pub fn value_for(&self, origin_type: OriginType) -> Option<&str> {
    (self.origin_type == origin_type).then_some(self.raw_value.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterBreakdown {
  pub letter: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sound: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cognate {
  pub language: Language,
  pub word: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transliteration: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub meaning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleSentence {
  pub target_text: String,
  pub translation: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transliteration: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryAid {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
}

/// Canonical, source-agnostic learnable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeItem {
  pub id: String,
  pub language: Language,
  pub content_type: ContentType,

  pub target_text: String,
  pub translation: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transliteration: Option<String>,

  pub prompt_type: PromptType,
  pub answer_type: AnswerType,

  // Learning state, un-normalized across sources
  pub mastery: MasteryRaw,
  #[serde(default)]
  pub times_practiced: u32,
  #[serde(default)]
  pub times_correct: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_reviewed: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_review: Option<DateTime<Utc>>,

  pub origin: Origin,
  #[serde(default)]
  pub linkage: Linkage,

  // Optional enrichments
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub letter_breakdown: Option<Vec<LetterBreakdown>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cognate: Option<Cognate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub example_sentences: Option<Vec<ExampleSentence>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub memory: Option<MemoryAid>,
}

impl PracticeItem {
  /// Minimal item with default framing (show target text, answer with translation).
  pub fn new(
    id: impl Into<String>,
    language: Language,
    content_type: ContentType,
    target_text: impl Into<String>,
    translation: impl Into<String>,
    origin: Origin,
  ) -> Self {
    let mastery = MasteryRaw::new(origin.origin_type, "new");
    Self {
      id: id.into(),
      language,
      content_type,
      target_text: target_text.into(),
      translation: translation.into(),
      transliteration: None,
      prompt_type: PromptType::TargetText,
      answer_type: AnswerType::Translation,
      mastery,
      times_practiced: 0,
      times_correct: 0,
      last_reviewed: None,
      next_review: None,
      origin,
      linkage: Linkage::default(),
      letter_breakdown: None,
      cognate: None,
      example_sentences: None,
      memory: None,
    }
  }

  /// Text shown to the learner for this item.
  pub fn prompt_text(&self) -> &str {
    match self.prompt_type {
      PromptType::TargetText => &self.target_text,
      PromptType::Translation => &self.translation,
    }
  }

  /// Text the learner is expected to produce.
  ///
  /// Transliteration answers fall back to the target text when the item has no
  /// transliteration.
  pub fn expected_answer(&self) -> &str {
    match self.answer_type {
      AnswerType::Translation => &self.translation,
      AnswerType::TargetText => &self.target_text,
      AnswerType::Transliteration => self
        .transliteration
        .as_deref()
        .unwrap_or(&self.target_text),
    }
  }

  /// Language the expected answer is written in, if it is the target language.
  pub fn answer_language(&self) -> Option<Language> {
    match self.answer_type {
      AnswerType::TargetText => Some(self.language),
      AnswerType::Transliteration if self.transliteration.is_none() => Some(self.language),
      _ => None,
    }
  }
}
