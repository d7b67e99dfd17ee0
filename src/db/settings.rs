//! User preferences stored in the settings table

use rusqlite::{params, Connection, OptionalExtension, Result};

#[cfg(feature = "profiling")]
use crate::profiling::EventType;

const KNOWS_HEBREW: &str = "knows_hebrew";

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "select".into(),
        table: "settings".into(),
    });

    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

/// Whether the learner reads Hebrew (enables cognate hints)
pub fn get_knows_hebrew(conn: &Connection) -> Result<bool> {
    get_setting(conn, KNOWS_HEBREW).map(|v| v.as_deref() == Some("true"))
}

pub fn set_knows_hebrew(conn: &Connection, knows: bool) -> Result<()> {
    set_setting(conn, KNOWS_HEBREW, if knows { "true" } else { "false" })
}
