//! Answer checking with per-language and per-content-type leniency.
//!
//! - Arabic answers ignore harakat and tatweel and fold hamza/alef variants
//! - Hebrew answers ignore niqqud and cantillation
//! - Spanish answers that differ only by accents are `CloseEnough`
//! - Translations ignore case, punctuation, contractions, British spellings and
//!   leading articles; `a, b` / `a / b` / `a; b` list acceptable alternatives
//! - Words tolerate a single typo; longer content is compared word by word

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::content::tokenizer::words;
use crate::domain::{AnswerType, ContentType, Language, PracticeItem};

// ============================================================================
// Normalization tables
// ============================================================================

/// British/American spelling equivalences (normalized to American)
static SPELLING_EQUIVALENCES: &[(&str, &str)] = &[
  ("colour", "color"),
  ("favour", "favor"),
  ("favourite", "favorite"),
  ("neighbour", "neighbor"),
  ("centre", "center"),
  ("theatre", "theater"),
  ("metre", "meter"),
  ("grey", "gray"),
  ("practise", "practice"),
  ("traveller", "traveler"),
  ("mum", "mom"),
  ("organise", "organize"),
  ("realise", "realize"),
  ("recognise", "recognize"),
];

/// Contraction expansions (normalized to expanded form)
static CONTRACTIONS: &[(&str, &str)] = &[
  ("i'm", "i am"),
  ("you're", "you are"),
  ("he's", "he is"),
  ("she's", "she is"),
  ("it's", "it is"),
  ("we're", "we are"),
  ("they're", "they are"),
  ("that's", "that is"),
  ("what's", "what is"),
  ("where's", "where is"),
  ("how's", "how is"),
  ("isn't", "is not"),
  ("aren't", "are not"),
  ("don't", "do not"),
  ("doesn't", "does not"),
  ("didn't", "did not"),
  ("can't", "cannot"),
  ("won't", "will not"),
  ("i'll", "i will"),
  ("let's", "let us"),
];

/// Words dropped from the start of a translation ("to eat", "the book").
static LEADING_ARTICLES: &[&str] = &["to", "the", "a", "an"];

/// Separators between acceptable alternatives in a stored translation.
const ALTERNATIVE_SEPARATORS: &[char] = &[',', '/', ';'];

// ============================================================================
// Result types
// ============================================================================

/// Result of answer validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerResult {
  /// Full match after normalization
  Correct,
  /// Typo, missing accent or one word off
  CloseEnough,
  /// Wrong answer
  Incorrect,
}

impl AnswerResult {
  pub fn is_correct(&self) -> bool {
    !matches!(self, Self::Incorrect)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Correct => "correct",
      Self::CloseEnough => "close_enough",
      Self::Incorrect => "incorrect",
    }
  }
}

// ============================================================================
// Script folding
// ============================================================================

/// Strip Arabic harakat, superscript alef and tatweel; fold hamza carriers,
/// alef maqsura and ta marbuta.
pub fn fold_arabic(input: &str) -> String {
  input
    .chars()
    .filter(|c| !matches!(*c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}'))
    .map(|c| match c {
      'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
      'ى' => 'ي',
      'ة' => 'ه',
      'ؤ' => 'و',
      'ئ' => 'ي',
      other => other,
    })
    .collect()
}

/// Strip Hebrew niqqud and cantillation marks; maqaf becomes a space.
pub fn fold_hebrew(input: &str) -> String {
  input
    .chars()
    .filter_map(|c| match c {
      '\u{05BE}' => Some(' '),
      '\u{0591}'..='\u{05BD}' | '\u{05BF}' | '\u{05C1}' | '\u{05C2}' | '\u{05C4}' | '\u{05C5}'
      | '\u{05C7}' => None,
      other => Some(other),
    })
    .collect()
}

/// Remove combining accents (é -> e, ñ -> n).
pub fn fold_accents(input: &str) -> String {
  input.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Lowercase, fold script-specific marks, drop punctuation, collapse spaces.
fn normalize_target(input: &str, language: Language) -> String {
  let folded = match language {
    Language::Arabic => fold_arabic(input),
    Language::Hebrew => fold_hebrew(input),
    Language::Spanish => input.nfc().collect(),
  };
  clean(&folded.to_lowercase())
}

fn clean(input: &str) -> String {
  input
    .chars()
    .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Normalize an English translation answer.
fn normalize_translation(input: &str) -> String {
  let lowered = remove_parentheticals(&input.to_lowercase().replace('’', "'"));
  let mut out: Vec<String> = Vec::new();

  for word in clean(&lowered).split(' ').filter(|w| !w.is_empty()) {
    if let Some((_, expanded)) = CONTRACTIONS.iter().find(|(c, _)| *c == word) {
      out.extend(expanded.split(' ').map(str::to_string));
      continue;
    }
    let word = word.trim_matches('\'');
    let word = SPELLING_EQUIVALENCES
      .iter()
      .find(|(british, _)| *british == word)
      .map(|(_, american)| *american)
      .unwrap_or(word);
    if !word.is_empty() {
      out.push(word.to_string());
    }
  }

  if out.len() > 1 && LEADING_ARTICLES.contains(&out[0].as_str()) {
    out.remove(0);
  }
  out.join(" ")
}

/// Drop "(informal)" style annotations.
fn remove_parentheticals(input: &str) -> String {
  let mut depth = 0usize;
  input
    .chars()
    .filter(|c| match c {
      '(' => {
        depth += 1;
        false
      }
      ')' => {
        depth = depth.saturating_sub(1);
        false
      }
      _ => depth == 0,
    })
    .collect()
}

// ============================================================================
// Distance helpers
// ============================================================================

/// Edit distance between two sequences.
fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
  if a.is_empty() {
    return b.len();
  }
  if b.is_empty() {
    return a.len();
  }

  let mut prev: Vec<usize> = (0..=b.len()).collect();
  let mut curr = vec![0usize; b.len() + 1];

  for i in 1..=a.len() {
    curr[0] = i;
    for j in 1..=b.len() {
      let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
      curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
    }
    std::mem::swap(&mut prev, &mut curr);
  }

  prev[b.len()]
}

/// Levenshtein distance between two strings (by chars).
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  edit_distance(&a, &b)
}

/// Typos allowed for a single word of `len` characters.
fn typo_budget(len: usize) -> usize {
  if len >= 2 { 1 } else { 0 }
}

/// Word edits allowed for a sentence of `word_count` words.
fn word_edit_budget(word_count: usize) -> usize {
  (word_count / 5).max(1)
}

// ============================================================================
// Comparison
// ============================================================================

fn compare_single(input: &str, expected: &str) -> AnswerResult {
  if input.is_empty() {
    return AnswerResult::Incorrect;
  }
  if input == expected {
    return AnswerResult::Correct;
  }
  let distance = levenshtein_distance(input, expected);
  if distance <= typo_budget(expected.chars().count()) {
    AnswerResult::CloseEnough
  } else {
    AnswerResult::Incorrect
  }
}

fn compare_sequence(input: &str, expected: &str) -> AnswerResult {
  if input.is_empty() {
    return AnswerResult::Incorrect;
  }
  if input == expected {
    return AnswerResult::Correct;
  }
  let input_words: Vec<&str> = input.split(' ').collect();
  let expected_words: Vec<&str> = expected.split(' ').collect();

  // Same words with small typos in each
  if input_words.len() == expected_words.len()
    && input_words
      .iter()
      .zip(&expected_words)
      .all(|(i, e)| compare_single(i, e).is_correct())
  {
    return AnswerResult::CloseEnough;
  }

  if edit_distance(&input_words, &expected_words) <= word_edit_budget(expected_words.len()) {
    AnswerResult::CloseEnough
  } else {
    AnswerResult::Incorrect
  }
}

fn compare(input: &str, expected: &str, content_type: ContentType) -> AnswerResult {
  if content_type.is_multi_word() {
    compare_sequence(input, expected)
  } else {
    compare_single(input, expected)
  }
}

/// Prefer the strongest result across alternatives.
fn best(results: impl Iterator<Item = AnswerResult>) -> AnswerResult {
  let mut best = AnswerResult::Incorrect;
  for result in results {
    match result {
      AnswerResult::Correct => return AnswerResult::Correct,
      AnswerResult::CloseEnough => best = AnswerResult::CloseEnough,
      AnswerResult::Incorrect => {}
    }
  }
  best
}

/// Acceptable alternatives of a stored translation, whole string first.
fn translation_alternatives(expected: &str) -> Vec<String> {
  let mut alternatives = vec![normalize_translation(expected)];
  for part in expected.split(ALTERNATIVE_SEPARATORS) {
    let normalized = normalize_translation(part);
    if !normalized.is_empty() && !alternatives.contains(&normalized) {
      alternatives.push(normalized);
    }
  }
  alternatives
}

fn check_translation(input: &str, expected: &str, content_type: ContentType) -> AnswerResult {
  let input = normalize_translation(input);
  // A list of alternatives is a list of short answers even for sentence items
  let alternatives = translation_alternatives(expected);
  best(alternatives.iter().enumerate().map(|(i, alt)| {
    let content_type = if i == 0 { content_type } else { ContentType::Word };
    let content_type = if alt.contains(' ') && content_type == ContentType::Word {
      ContentType::Sentence
    } else {
      content_type
    };
    compare(&input, alt, content_type)
  }))
}

fn check_target(
  input: &str,
  expected: &str,
  language: Language,
  content_type: ContentType,
) -> AnswerResult {
  // Tokenize first so punctuation is split out consistently per language
  let input = normalize_target(&words(input, language).join(" "), language);
  let expected = normalize_target(&words(expected, language).join(" "), language);

  let strict = compare(&input, &expected, content_type);
  if strict == AnswerResult::Correct || language != Language::Spanish {
    return strict;
  }

  // Accent-only mistakes never count as fully correct
  match compare(&fold_accents(&input), &fold_accents(&expected), content_type) {
    AnswerResult::Incorrect => AnswerResult::Incorrect,
    _ => AnswerResult::CloseEnough,
  }
}

fn check_transliteration(input: &str, expected: &str, content_type: ContentType) -> AnswerResult {
  let normalize = |s: &str| {
    clean(&fold_accents(&s.to_lowercase()).replace(['\'', '-', 'ʼ', 'ʿ', 'ʾ'], ""))
  };
  compare(&normalize(input), &normalize(expected), content_type)
}

/// Check `input` against what `item` expects.
pub fn check_answer(item: &PracticeItem, input: &str) -> AnswerResult {
  let input = input.trim();
  if input.is_empty() {
    return AnswerResult::Incorrect;
  }

  match item.answer_type {
    AnswerType::Translation => check_translation(input, &item.translation, item.content_type),
    AnswerType::TargetText => {
      check_target(input, &item.target_text, item.language, item.content_type)
    }
    AnswerType::Transliteration => match &item.transliteration {
      Some(expected) => check_transliteration(input, expected, item.content_type),
      None => check_target(input, &item.target_text, item.language, item.content_type),
    },
  }
}
