use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Create tables with COMPLETE schema for new databases
  // Migrations below handle upgrades for existing databases
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS lessons (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      title TEXT NOT NULL,
      language TEXT NOT NULL DEFAULT 'arabic',
      created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS vocabulary_items (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      lesson_id INTEGER,
      language TEXT,
      content_type TEXT,
      word TEXT NOT NULL,
      translation TEXT NOT NULL,
      transliteration TEXT,
      -- JSON enrichment columns, parsed leniently on read
      letter_breakdown TEXT,
      hebrew_cognate TEXT,
      example_sentences TEXT,
      memory_note TEXT,
      memory_image_url TEXT,
      mastery_level TEXT,
      times_practiced INTEGER NOT NULL DEFAULT 0,
      times_correct INTEGER NOT NULL DEFAULT 0,
      last_reviewed TEXT,
      next_review TEXT,
      FOREIGN KEY (lesson_id) REFERENCES lessons(id)
    );

    CREATE TABLE IF NOT EXISTS saved_words (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      word TEXT NOT NULL,
      translation TEXT NOT NULL,
      transliteration TEXT,
      status TEXT NOT NULL DEFAULT 'learning',
      letter_breakdown TEXT,
      hebrew_cognate TEXT,
      example_sentences TEXT,
      memory_note TEXT,
      memory_image_url TEXT,
      source_lookup_id TEXT,
      times_practiced INTEGER NOT NULL DEFAULT 0,
      times_correct INTEGER NOT NULL DEFAULT 0,
      last_reviewed TEXT,
      next_review TEXT,
      created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS settings (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS kv_store (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    -- Default settings
    INSERT OR IGNORE INTO settings (key, value) VALUES ('knows_hebrew', 'false');

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_vocabulary_items_lesson ON vocabulary_items(lesson_id);
    CREATE INDEX IF NOT EXISTS idx_saved_words_word ON saved_words(word);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // These are no-ops for new databases (columns already exist)
  // ============================================================

  // Migration: vocabulary rows gained language/content type after Arabic-only lessons
  add_column_if_missing(conn, "vocabulary_items", "language", "TEXT")?;
  add_column_if_missing(conn, "vocabulary_items", "content_type", "TEXT")?;

  // Migration: memory aids and practice counters
  add_column_if_missing(conn, "vocabulary_items", "memory_image_url", "TEXT")?;
  add_column_if_missing(conn, "saved_words", "memory_image_url", "TEXT")?;
  add_column_if_missing(conn, "saved_words", "times_practiced", "INTEGER NOT NULL DEFAULT 0")?;
  add_column_if_missing(conn, "saved_words", "times_correct", "INTEGER NOT NULL DEFAULT 0")?;
  add_column_if_missing(conn, "saved_words", "source_lookup_id", "TEXT")?;

  // Indexes on migrated columns
  conn.execute(
    "CREATE INDEX IF NOT EXISTS idx_vocabulary_items_language ON vocabulary_items(language)",
    [],
  )?;

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}
