//! Application configuration constants.
//!
//! Runtime values resolve with priority: config.toml > .env / environment >
//! default.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    database: Option<DatabaseConfig>,
    server: Option<ServerConfig>,
    practice: Option<PracticeConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct PracticeConfig {
    undo_window_ms: Option<u64>,
}

const CONFIG_FILE: &str = "config.toml";

fn parse_config(contents: &str) -> Option<AppConfig> {
    match toml::from_str::<AppConfig>(contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring malformed {}: {}", CONFIG_FILE, e);
            None
        }
    }
}

/// Read config.toml (if present) after loading `.env` into the environment.
fn load_config_file() -> AppConfig {
    let _ = dotenvy::dotenv();
    std::fs::read_to_string(CONFIG_FILE)
        .ok()
        .and_then(|contents| parse_config(&contents))
        .unwrap_or_default()
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={}", name, raw);
            None
        }
    }
}

// ==================== Database Configuration ====================

/// Load database path with priority: config.toml > .env > default
pub fn load_database_path() -> PathBuf {
    let config = load_config_file();

    if let Some(path) = config.database.and_then(|db| db.path) {
        tracing::info!("Using database from config.toml: {}", path);
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var("DATABASE_PATH") {
        tracing::info!("Using database from DATABASE_PATH env: {}", path);
        return PathBuf::from(path);
    }

    let default = PathBuf::from(crate::paths::db_path());
    tracing::info!("Using default database path: {}", default.display());
    default
}

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Default server port
pub const SERVER_PORT: u16 = 3000;

pub fn server_port() -> u16 {
    load_config_file()
        .server
        .and_then(|s| s.port)
        .or_else(|| env_parsed("PORT"))
        .unwrap_or(SERVER_PORT)
}

/// Get the full server bind address
pub fn server_bind_addr(port: u16) -> String {
    format!("{}:{}", SERVER_ADDR, port)
}

// ==================== Practice Configuration ====================

/// How long a card action stays undoable
pub const UNDO_WINDOW_MS: u64 = 5000;

pub fn undo_window() -> Duration {
    let ms = load_config_file()
        .practice
        .and_then(|p| p.undo_window_ms)
        .or_else(|| env_parsed("UNDO_WINDOW_MS"))
        .unwrap_or(UNDO_WINDOW_MS);
    Duration::from_millis(ms)
}

/// Longest answer accepted by the exercise endpoint, in characters
pub const MAX_ANSWER_CHARS: usize = 500;

// ==================== Review Scheduling ====================

/// Upper bound on the correct-answer review interval
pub const MAX_REVIEW_INTERVAL_DAYS: i64 = 60;

/// Retry delay after an incorrect answer
pub const RETRY_AFTER_MINUTES: i64 = 10;

/// Correct answers after which a saved word counts as learned
pub const SAVED_WORD_LEARNED_AFTER: i64 = 3;

// ==================== Deck Registry ====================

/// Idle time after which a deck's engines are dropped from memory
pub const DECK_EXPIRY_HOURS: i64 = 1;

/// Probability threshold for deck cleanup (0-255, lower = more frequent)
/// Value of 25 means ~10% chance (25/256) on each deck access
pub const DECK_CLEANUP_THRESHOLD: u8 = 25;
