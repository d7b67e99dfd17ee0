use std::fmt;

use super::Language;

/// A named, filtered set of practice items. Each deck owns its own card stack
/// and exercise queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Deck {
  /// Every lesson item followed by every saved word
  All,
  Saved,
  Lesson(i64),
  Language(Language),
}

impl Deck {
  /// Parse `all`, `saved`, `lesson:<id>` or `language:<lang>`.
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim() {
      "all" | "" => Some(Self::All),
      "saved" => Some(Self::Saved),
      other => {
        let (kind, arg) = other.split_once(':')?;
        match kind {
          "lesson" => arg.parse().ok().map(Self::Lesson),
          "language" => Language::from_str(arg).map(Self::Language),
          _ => None,
        }
      }
    }
  }

  /// Storage key for the deck's card stack snapshot.
  pub fn cards_key(&self) -> String {
    format!("cards:{}", self)
  }

  /// Storage key for the deck's exercise snapshot.
  pub fn exercise_key(&self) -> String {
    format!("exercise:{}", self)
  }
}

impl fmt::Display for Deck {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::All => write!(f, "all"),
      Self::Saved => write!(f, "saved"),
      Self::Lesson(id) => write!(f, "lesson:{}", id),
      Self::Language(lang) => write!(f, "language:{}", lang.as_str()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_and_display() {
    for raw in ["all", "saved", "lesson:4", "language:hebrew"] {
      assert_eq!(Deck::parse(raw).unwrap().to_string(), raw);
    }
    assert_eq!(Deck::parse(""), Some(Deck::All));
    assert_eq!(Deck::parse("lesson:x"), None);
    assert_eq!(Deck::parse("language:klingon"), None);
    assert_eq!(Deck::parse("tier:1"), None);
  }

  #[test]
  fn test_storage_keys() {
    let deck = Deck::Lesson(2);
    assert_eq!(deck.cards_key(), "cards:lesson:2");
    assert_eq!(deck.exercise_key(), "exercise:lesson:2");
  }
}
