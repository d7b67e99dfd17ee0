//! Saved words (lookup results kept for practice)

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::SavedWordRow;
#[cfg(feature = "profiling")]
use crate::profiling::EventType;

/// Saved-word status once a word has been answered correctly often enough.
pub const STATUS_LEARNED: &str = "learned";

/// Fields for a newly saved word. Enrichments are raw JSON text.
#[derive(Debug, Clone, Default)]
pub struct NewSavedWord<'a> {
    pub word: &'a str,
    pub translation: &'a str,
    pub transliteration: Option<&'a str>,
    pub letter_breakdown: Option<&'a str>,
    pub hebrew_cognate: Option<&'a str>,
    pub example_sentences: Option<&'a str>,
    pub memory_note: Option<&'a str>,
    pub source_lookup_id: Option<&'a str>,
}

fn saved_word_from_row(row: &Row) -> Result<SavedWordRow> {
    Ok(SavedWordRow {
        id: row.get(0)?,
        word: row.get(1)?,
        translation: row.get(2)?,
        transliteration: row.get(3)?,
        status: row.get(4)?,
        letter_breakdown: row.get(5)?,
        hebrew_cognate: row.get(6)?,
        example_sentences: row.get(7)?,
        memory_note: row.get(8)?,
        memory_image_url: row.get(9)?,
        source_lookup_id: row.get(10)?,
        times_practiced: row.get(11)?,
        times_correct: row.get(12)?,
        last_reviewed: row.get(13)?,
        next_review: row.get(14)?,
    })
}

/// Insert a saved word, or return the existing row id when the same word with
/// the same translation is already saved.
pub fn save_word(conn: &Connection, word: &NewSavedWord) -> Result<(i64, bool)> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "insert".into(),
        table: "saved_words".into(),
    });

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM saved_words WHERE word = ?1 AND translation = ?2",
            params![word.word, word.translation],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok((id, false));
    }

    conn.execute(
        r#"
    INSERT INTO saved_words
      (word, translation, transliteration, letter_breakdown, hebrew_cognate,
       example_sentences, memory_note, source_lookup_id)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    "#,
        params![
            word.word,
            word.translation,
            word.transliteration,
            word.letter_breakdown,
            word.hebrew_cognate,
            word.example_sentences,
            word.memory_note,
            word.source_lookup_id,
        ],
    )?;
    Ok((conn.last_insert_rowid(), true))
}

pub fn get_saved_words(conn: &Connection) -> Result<Vec<SavedWordRow>> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "select".into(),
        table: "saved_words".into(),
    });

    let mut stmt = conn.prepare(
        r#"
    SELECT id, word, translation, transliteration, status, letter_breakdown,
           hebrew_cognate, example_sentences, memory_note, memory_image_url,
           source_lookup_id, times_practiced, times_correct, last_reviewed, next_review
    FROM saved_words
    ORDER BY id
    "#,
    )?;
    let rows = stmt
        .query_map([], saved_word_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// Store a practice result and return the new correct count, or `None` when
/// the row no longer exists.
pub fn record_saved_word_result(
    conn: &Connection,
    id: i64,
    correct: bool,
    reviewed_at: &str,
    next_review: &str,
) -> Result<Option<i64>> {
    let updated = conn.execute(
        r#"
    UPDATE saved_words
    SET times_practiced = times_practiced + 1,
        times_correct = times_correct + ?2,
        last_reviewed = ?3,
        next_review = ?4
    WHERE id = ?1
    "#,
        params![id, correct as i64, reviewed_at, next_review],
    )?;
    if updated == 0 {
        return Ok(None);
    }
    get_saved_word_times_correct(conn, id)
}

pub fn get_saved_word_times_correct(conn: &Connection, id: i64) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT times_correct FROM saved_words WHERE id = ?1",
        [id],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_saved_word_status(conn: &Connection, id: i64, status: &str) -> Result<()> {
    conn.execute(
        "UPDATE saved_words SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;
    Ok(())
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
    fn test_save_is_idempotent_per_word_and_translation() {
        let conn = conn();
        let word = NewSavedWord {
            word: "كتاب",
            translation: "book",
            source_lookup_id: Some("lookup-9"),
            ..Default::default()
        };
        let (id, created) = save_word(&conn, &word).unwrap();
        assert!(created);
        assert_eq!(save_word(&conn, &word).unwrap(), (id, false));

        let rows = get_saved_words(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status.as_deref(), Some("learning"));
        assert_eq!(rows[0].source_lookup_id.as_deref(), Some("lookup-9"));
    }

    #[test]
    fn test_record_result_and_status() {
        let conn = conn();
        let (id, _) = save_word(
            &conn,
            &NewSavedWord {
                word: "قلب",
                translation: "heart",
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(record_saved_word_result(&conn, id, true, "a", "b").unwrap(), Some(1));
        assert_eq!(record_saved_word_result(&conn, id, false, "a", "b").unwrap(), Some(1));
        assert_eq!(record_saved_word_result(&conn, id + 1, true, "a", "b").unwrap(), None);

        set_saved_word_status(&conn, id, STATUS_LEARNED).unwrap();
        let row = &get_saved_words(&conn).unwrap()[0];
        assert_eq!(row.status.as_deref(), Some(STATUS_LEARNED));
        assert_eq!(row.times_practiced, 2);
    }
}
