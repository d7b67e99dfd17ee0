//! Test fixtures shared by unit tests.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::domain::{ContentType, Language, Origin, OriginType, PracticeItem};

/// Arabic word items with the given ids. Item `id` translates to
/// `meaning <id>` and points back at lesson vocab row `id`.
pub fn sample_items(ids: &[&str]) -> Vec<PracticeItem> {
    ids.iter()
        .map(|id| {
            PracticeItem::new(
                *id,
                Language::Arabic,
                ContentType::Word,
                "كلمة",
                format!("meaning {}", id),
                Origin {
                    origin_type: OriginType::LessonVocabItem,
                    id: id.to_string(),
                },
            )
        })
        .collect()
}

/// Temporary data directory for tests that need a database file on disk.
pub struct TestEnv {
    /// Removed with everything in it when dropped
    pub temp: TempDir,
}

impl TestEnv {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.path().join("data").join("kalima.db")
    }
}
