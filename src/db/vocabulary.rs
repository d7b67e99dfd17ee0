//! Lessons and lesson vocabulary rows

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use crate::domain::{ContentType, Language, LessonVocabRow};
#[cfg(feature = "profiling")]
use crate::profiling::EventType;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub language: String,
    pub item_count: i64,
}

/// Fields for a new vocabulary row. Enrichments are raw JSON text.
#[derive(Debug, Clone, Default)]
pub struct NewVocabItem<'a> {
    pub lesson_id: Option<i64>,
    pub language: Option<Language>,
    pub content_type: Option<ContentType>,
    pub word: &'a str,
    pub translation: &'a str,
    pub transliteration: Option<&'a str>,
    pub letter_breakdown: Option<&'a str>,
    pub hebrew_cognate: Option<&'a str>,
    pub example_sentences: Option<&'a str>,
    pub memory_note: Option<&'a str>,
}

const VOCAB_COLUMNS: &str = "id, lesson_id, language, content_type, word, translation, \
     transliteration, letter_breakdown, hebrew_cognate, example_sentences, memory_note, \
     memory_image_url, mastery_level, times_practiced, times_correct, last_reviewed, next_review";

fn vocab_from_row(row: &Row) -> Result<LessonVocabRow> {
    Ok(LessonVocabRow {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        language: row.get(2)?,
        content_type: row.get(3)?,
        word: row.get(4)?,
        translation: row.get(5)?,
        transliteration: row.get(6)?,
        letter_breakdown: row.get(7)?,
        hebrew_cognate: row.get(8)?,
        example_sentences: row.get(9)?,
        memory_note: row.get(10)?,
        memory_image_url: row.get(11)?,
        mastery_level: row.get(12)?,
        times_practiced: row.get(13)?,
        times_correct: row.get(14)?,
        last_reviewed: row.get(15)?,
        next_review: row.get(16)?,
    })
}

// ==================== Lessons ====================

pub fn insert_lesson(conn: &Connection, title: &str, language: Language) -> Result<i64> {
    conn.execute(
        "INSERT INTO lessons (title, language) VALUES (?1, ?2)",
        params![title, language.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_lessons(conn: &Connection) -> Result<Vec<Lesson>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT l.id, l.title, l.language, COUNT(v.id)
    FROM lessons l
    LEFT JOIN vocabulary_items v ON v.lesson_id = l.id
    GROUP BY l.id
    ORDER BY l.id
    "#,
    )?;
    let lessons = stmt
        .query_map([], |row| {
            Ok(Lesson {
                id: row.get(0)?,
                title: row.get(1)?,
                language: row.get(2)?,
                item_count: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(lessons)
}

pub fn lesson_exists(conn: &Connection, lesson_id: i64) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM lessons WHERE id = ?1", [lesson_id], |_| Ok(()))
        .optional()?
        .is_some())
}

// ==================== Vocabulary ====================

pub fn insert_vocab_item(conn: &Connection, item: &NewVocabItem) -> Result<i64> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "insert".into(),
        table: "vocabulary_items".into(),
    });

    conn.execute(
        r#"
    INSERT INTO vocabulary_items
      (lesson_id, language, content_type, word, translation, transliteration,
       letter_breakdown, hebrew_cognate, example_sentences, memory_note)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    "#,
        params![
            item.lesson_id,
            item.language.map(|l| l.as_str()),
            item.content_type.map(|c| c.as_str()),
            item.word,
            item.translation,
            item.transliteration,
            item.letter_breakdown,
            item.hebrew_cognate,
            item.example_sentences,
            item.memory_note,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_all_vocab(conn: &Connection) -> Result<Vec<LessonVocabRow>> {
    query_vocab(conn, "", params![])
}

pub fn get_lesson_vocab(conn: &Connection, lesson_id: i64) -> Result<Vec<LessonVocabRow>> {
    query_vocab(conn, "WHERE lesson_id = ?1", [lesson_id])
}

/// Rows whose language column matches. NULL language counts as Arabic, the
/// same default the adapter applies.
pub fn get_vocab_by_language(conn: &Connection, language: Language) -> Result<Vec<LessonVocabRow>> {
    let rows = get_all_vocab(conn)?;
    Ok(rows
        .into_iter()
        .filter(|row| {
            row.language
                .as_deref()
                .and_then(Language::from_str)
                .unwrap_or(Language::Arabic)
                == language
        })
        .collect())
}

fn query_vocab<P: rusqlite::Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<LessonVocabRow>> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "select".into(),
        table: "vocabulary_items".into(),
    });

    let sql = format!(
        "SELECT {} FROM vocabulary_items {} ORDER BY lesson_id, id",
        VOCAB_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, vocab_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// Store a practice result. Returns false when the row no longer exists.
pub fn record_vocab_result(
    conn: &Connection,
    id: i64,
    correct: bool,
    reviewed_at: &str,
    next_review: &str,
) -> Result<bool> {
    let updated = conn.execute(
        r#"
    UPDATE vocabulary_items
    SET times_practiced = times_practiced + 1,
        times_correct = times_correct + ?2,
        last_reviewed = ?3,
        next_review = ?4
    WHERE id = ?1
    "#,
        params![id, correct as i64, reviewed_at, next_review],
    )?;
    Ok(updated > 0)
}

pub fn get_vocab_times_correct(conn: &Connection, id: i64) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT times_correct FROM vocabulary_items WHERE id = ?1",
        [id],
        |row| row.get(0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_fetch_by_lesson() {
        let conn = conn();
        let lesson = insert_lesson(&conn, "Greetings", Language::Arabic).unwrap();
        insert_vocab_item(
            &conn,
            &NewVocabItem {
                lesson_id: Some(lesson),
                word: "سلام",
                translation: "peace",
                hebrew_cognate: Some(r#"{"word":"שלום"}"#),
                ..Default::default()
            },
        )
        .unwrap();
        insert_vocab_item(
            &conn,
            &NewVocabItem {
                word: "hola",
                translation: "hello",
                language: Some(Language::Spanish),
                ..Default::default()
            },
        )
        .unwrap();

        let rows = get_lesson_vocab(&conn, lesson).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].word, "سلام");
        assert_eq!(rows[0].hebrew_cognate.as_deref(), Some(r#"{"word":"שלום"}"#));
        assert!(rows[0].language.is_none());

        assert_eq!(get_all_vocab(&conn).unwrap().len(), 2);
        assert_eq!(get_vocab_by_language(&conn, Language::Arabic).unwrap().len(), 1);
        assert_eq!(get_vocab_by_language(&conn, Language::Spanish).unwrap()[0].word, "hola");

        let lessons = get_lessons(&conn).unwrap();
        assert_eq!(lessons[0].item_count, 1);
        assert!(lesson_exists(&conn, lesson).unwrap());
        assert!(!lesson_exists(&conn, lesson + 100).unwrap());
    }

    #[test]
    fn test_record_result_updates_counters() {
        let conn = conn();
        let id = insert_vocab_item(
            &conn,
            &NewVocabItem {
                word: "بيت",
                translation: "house",
                ..Default::default()
            },
        )
        .unwrap();

        assert!(record_vocab_result(&conn, id, true, "2024-01-01T00:00:00Z", "2024-01-03T00:00:00Z").unwrap());
        assert!(record_vocab_result(&conn, id, false, "2024-01-02T00:00:00Z", "2024-01-02T00:10:00Z").unwrap());
        assert!(!record_vocab_result(&conn, 999, true, "x", "y").unwrap());

        let row = &get_all_vocab(&conn).unwrap()[0];
        assert_eq!(row.times_practiced, 2);
        assert_eq!(row.times_correct, 1);
        assert_eq!(row.next_review.as_deref(), Some("2024-01-02T00:10:00Z"));
        assert_eq!(get_vocab_times_correct(&conn, id).unwrap(), Some(1));
    }
}
