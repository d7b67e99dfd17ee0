pub mod kv;
pub mod saved_words;
pub mod schema;
pub mod settings;
pub mod vocabulary;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config;
use crate::content::adapters;
use crate::domain::{ContentType, Deck, Language, Origin, OriginType, PracticeItem, SourceRow};

// Re-export all public items from submodules
pub use kv::SqliteStore;
pub use saved_words::*;
pub use schema::run_migrations;
pub use settings::*;
pub use vocabulary::*;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).ok();
  }

  // Create backup before migrations if database exists
  if path.exists() {
    let backup_path = path.with_extension("db.backup");
    if let Err(e) = std::fs::copy(path, &backup_path) {
      tracing::warn!("Could not create database backup: {}", e);
    }
  }

  let conn = Connection::open(path)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Migrated in-memory database, for tests and throwaway runs.
pub fn open_in_memory() -> Result<DbPool> {
  let conn = Connection::open_in_memory()?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

// ==================== Seeding ====================

/// (word, translation, transliteration, hebrew cognate JSON)
const STARTER_ARABIC: &[(&str, &str, &str, Option<&str>)] = &[
  ("سلام", "peace", "salaam", Some(r#"{"word":"שלום","transliteration":"shalom","meaning":"peace"}"#)),
  ("بيت", "house", "bayt", Some(r#"{"word":"בית","transliteration":"bayit","meaning":"house"}"#)),
  ("كتاب", "book", "kitaab", None),
  ("قلب", "heart", "qalb", Some(r#"{"word":"לב","transliteration":"lev","meaning":"heart"}"#)),
  ("شمس", "sun", "shams", None),
];

const STARTER_SPANISH: &[(&str, &str, ContentType)] = &[
  ("hola", "hello", ContentType::Word),
  ("gracias", "thank you", ContentType::Word),
  ("¿Cómo estás?", "how are you", ContentType::Sentence),
];

/// Seed starter lessons into an empty database.
pub fn seed_starter_lessons(conn: &Connection) -> Result<()> {
  let count: i64 = conn.query_row("SELECT COUNT(*) FROM vocabulary_items", [], |row| row.get(0))?;
  if count > 0 {
    return Ok(());
  }

  let arabic = insert_lesson(conn, "Arabic basics", Language::Arabic)?;
  for (word, translation, transliteration, cognate) in STARTER_ARABIC {
    insert_vocab_item(
      conn,
      &NewVocabItem {
        lesson_id: Some(arabic),
        language: Some(Language::Arabic),
        content_type: Some(ContentType::Word),
        word,
        translation,
        transliteration: Some(*transliteration),
        hebrew_cognate: *cognate,
        ..Default::default()
      },
    )?;
  }
  insert_vocab_item(
    conn,
    &NewVocabItem {
      lesson_id: Some(arabic),
      language: Some(Language::Arabic),
      content_type: Some(ContentType::Sentence),
      word: "هذا بيت كبير",
      translation: "this is a big house",
      ..Default::default()
    },
  )?;

  let spanish = insert_lesson(conn, "Spanish greetings", Language::Spanish)?;
  for (word, translation, content_type) in STARTER_SPANISH {
    insert_vocab_item(
      conn,
      &NewVocabItem {
        lesson_id: Some(spanish),
        language: Some(Language::Spanish),
        content_type: Some(*content_type),
        word,
        translation,
        ..Default::default()
      },
    )?;
  }

  tracing::info!("Seeded starter lessons");
  Ok(())
}

// ==================== Practice items ====================

/// Source rows for a deck, lesson rows first.
pub fn load_source_rows(conn: &Connection, deck: &Deck) -> Result<Vec<SourceRow>> {
  let mut rows: Vec<SourceRow> = match deck {
    Deck::All => get_all_vocab(conn)?,
    Deck::Saved => Vec::new(),
    Deck::Lesson(id) => get_lesson_vocab(conn, *id)?,
    Deck::Language(lang) => get_vocab_by_language(conn, *lang)?,
  }
  .into_iter()
  .map(SourceRow::from)
  .collect();

  // Saved words are always Arabic
  let with_saved = matches!(deck, Deck::All | Deck::Saved | Deck::Language(Language::Arabic));
  if with_saved {
    rows.extend(get_saved_words(conn)?.into_iter().map(SourceRow::from));
  }
  Ok(rows)
}

/// Normalized practice items for a deck.
pub fn load_practice_items(conn: &Connection, deck: &Deck) -> Result<Vec<PracticeItem>> {
  let rows = crate::profile_scope!("load_source_rows", { load_source_rows(conn, deck)? });
  Ok(adapters::normalize(&rows))
}

/// Next review time: correct answers double the interval per prior correct
/// answer (1, 2, 4 ... days, capped); a miss retries shortly.
pub fn next_review_after(now: DateTime<Utc>, correct: bool, prior_correct: i64) -> DateTime<Utc> {
  if !correct {
    return now + Duration::minutes(config::RETRY_AFTER_MINUTES);
  }
  let exponent = prior_correct.clamp(0, 30) as u32;
  let days = 2i64.pow(exponent).min(config::MAX_REVIEW_INTERVAL_DAYS);
  now + Duration::days(days)
}

/// Write an exercise result back onto the row the item came from. Returns
/// false when the origin has no backing row (lookups, voice turns) or the row
/// is gone.
pub fn record_practice_result(
  conn: &Connection,
  origin: &Origin,
  correct: bool,
  now: DateTime<Utc>,
) -> Result<bool> {
  let Ok(id) = origin.id.parse::<i64>() else {
    tracing::debug!("Origin id {} has no backing row", origin.id);
    return Ok(false);
  };
  let reviewed_at = now.to_rfc3339();

  match origin.origin_type {
    OriginType::LessonVocabItem => {
      let Some(prior) = get_vocab_times_correct(conn, id)? else {
        return Ok(false);
      };
      let next = next_review_after(now, correct, prior).to_rfc3339();
      record_vocab_result(conn, id, correct, &reviewed_at, &next)
    }
    OriginType::SavedWord => {
      let Some(prior) = get_saved_word_times_correct(conn, id)? else {
        return Ok(false);
      };
      let next = next_review_after(now, correct, prior).to_rfc3339();
      let Some(times_correct) = record_saved_word_result(conn, id, correct, &reviewed_at, &next)? else {
        return Ok(false);
      };
      if correct && times_correct >= config::SAVED_WORD_LEARNED_AFTER {
        set_saved_word_status(conn, id, STATUS_LEARNED)?;
        tracing::debug!("Saved word {} marked learned", id);
      }
      Ok(true)
    }
    OriginType::LookupResult | OriginType::VoiceTurn => Ok(false),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
  }

  #[test]
  fn test_next_review_intervals() {
    assert_eq!(next_review_after(now(), false, 5), now() + Duration::minutes(10));
    assert_eq!(next_review_after(now(), true, 0), now() + Duration::days(1));
    assert_eq!(next_review_after(now(), true, 3), now() + Duration::days(8));
    assert_eq!(next_review_after(now(), true, 40), now() + Duration::days(60));
  }

  #[test]
  fn test_seed_is_idempotent() {
    let pool = open_in_memory().unwrap();
    let conn = pool.lock().unwrap();
    seed_starter_lessons(&conn).unwrap();
    let first = get_all_vocab(&conn).unwrap().len();
    seed_starter_lessons(&conn).unwrap();
    assert_eq!(get_all_vocab(&conn).unwrap().len(), first);
    assert_eq!(get_lessons(&conn).unwrap().len(), 2);
  }

  #[test]
  fn test_deck_item_selection() {
    let pool = open_in_memory().unwrap();
    let conn = pool.lock().unwrap();
    seed_starter_lessons(&conn).unwrap();
    save_word(
      &conn,
      &NewSavedWord {
        word: "جديد",
        translation: "new",
        ..Default::default()
      },
    )
    .unwrap();

    let all = load_practice_items(&conn, &Deck::All).unwrap();
    assert_eq!(all.len(), STARTER_ARABIC.len() + 1 + STARTER_SPANISH.len() + 1);
    assert_eq!(all.last().unwrap().origin.origin_type, OriginType::SavedWord);

    let saved = load_practice_items(&conn, &Deck::Saved).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, "saved-1");

    let spanish = load_practice_items(&conn, &Deck::Language(Language::Spanish)).unwrap();
    assert_eq!(spanish.len(), STARTER_SPANISH.len());
    assert!(spanish.iter().all(|i| i.language == Language::Spanish));

    let arabic = load_practice_items(&conn, &Deck::Language(Language::Arabic)).unwrap();
    assert_eq!(arabic.len(), STARTER_ARABIC.len() + 2);

    let lesson = load_practice_items(&conn, &Deck::Lesson(1)).unwrap();
    assert_eq!(lesson.len(), STARTER_ARABIC.len() + 1);
    assert_eq!(lesson[0].cognate.as_ref().unwrap().word, "שלום");
  }

  #[test]
  fn test_record_result_by_origin() {
    let pool = open_in_memory().unwrap();
    let conn = pool.lock().unwrap();
    seed_starter_lessons(&conn).unwrap();
    let (saved_id, _) = save_word(
      &conn,
      &NewSavedWord {
        word: "عين",
        translation: "eye",
        ..Default::default()
      },
    )
    .unwrap();

    let vocab = Origin {
      origin_type: OriginType::LessonVocabItem,
      id: "1".into(),
    };
    assert!(record_practice_result(&conn, &vocab, true, now()).unwrap());
    let row = &get_lesson_vocab(&conn, 1).unwrap()[0];
    assert_eq!(row.times_correct, 1);
    assert_eq!(row.mastery_level, None);

    let saved = Origin {
      origin_type: OriginType::SavedWord,
      id: saved_id.to_string(),
    };
    for _ in 0..2 {
      record_practice_result(&conn, &saved, true, now()).unwrap();
    }
    assert_eq!(get_saved_words(&conn).unwrap()[0].status.as_deref(), Some("learning"));
    record_practice_result(&conn, &saved, true, now()).unwrap();
    assert_eq!(get_saved_words(&conn).unwrap()[0].status.as_deref(), Some(STATUS_LEARNED));

    let lookup = Origin {
      origin_type: OriginType::LookupResult,
      id: "abc".into(),
    };
    assert!(!record_practice_result(&conn, &lookup, true, now()).unwrap());
    let missing = Origin {
      origin_type: OriginType::LessonVocabItem,
      id: "999".into(),
    };
    assert!(!record_practice_result(&conn, &missing, false, now()).unwrap());
  }

  #[test]
  fn test_init_db_creates_file_and_backs_up_on_reopen() {
    let env = crate::testing::TestEnv::new().unwrap();
    let path = env.db_path();
    {
      let pool = init_db(&path).unwrap();
      seed_starter_lessons(&pool.lock().unwrap()).unwrap();
    }
    assert!(path.exists());

    let pool = init_db(&path).unwrap();
    assert!(path.with_extension("db.backup").exists());
    assert_eq!(get_lessons(&pool.lock().unwrap()).unwrap().len(), 2);
  }
}
