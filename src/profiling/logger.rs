//! JSONL writer for profiling events.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;

use super::event::{EventType, ProfileEvent};

/// Events between flushes.
const FLUSH_EVERY: u64 = 100;

static LOGGER: Mutex<Option<ProfileLogger>> = Mutex::new(None);

struct ProfileLogger {
    writer: BufWriter<File>,
    total_events: u64,
    practice_events: u64,
}

impl ProfileLogger {
    fn open(session_id: &str) -> std::io::Result<Self> {
        let dir = crate::paths::data_dir();
        create_dir_all(dir)?;
        let filename = format!("{}/profile_{}.jsonl", dir, session_id);
        let file = OpenOptions::new().create(true).append(true).open(&filename)?;
        tracing::info!("Profiling enabled: writing to {}", filename);

        Ok(Self {
            writer: BufWriter::new(file),
            total_events: 0,
            practice_events: 0,
        })
    }

    fn write(&mut self, event: &ProfileEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!("Dropping unserializable profile event: {}", e);
                return;
            }
        };
        if let Err(e) = writeln!(self.writer, "{}", json) {
            tracing::debug!("Profile write failed: {}", e);
        }
        tracing::trace!(target: "kalima::profile", "{}", json);

        self.total_events += 1;
        if event.event.is_practice() {
            self.practice_events += 1;
        }
        if self.total_events % FLUSH_EVERY == 0 {
            let _ = self.writer.flush();
        }
    }
}

fn logger() -> MutexGuard<'static, Option<ProfileLogger>> {
    LOGGER.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record(event: ProfileEvent) {
    if let Some(logger) = logger().as_mut() {
        logger.write(&event);
    }
}

/// Open a new timestamped log in the data directory. Call once from main.
pub fn init() {
    let mut guard = logger();
    if guard.is_some() {
        tracing::warn!("Profiler already initialized");
        return;
    }

    let session_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    match ProfileLogger::open(&session_id) {
        Ok(mut logger) => {
            logger.write(&ProfileEvent::new(EventType::SessionStart { session_id }));
            *guard = Some(logger);
        }
        Err(e) => tracing::error!("Failed to initialize profiler: {}", e),
    }
}

/// Write the session summary and close the log.
pub fn shutdown() {
    let Some(mut logger) = logger().take() else {
        return;
    };
    let (total_events, practice_events) = (logger.total_events, logger.practice_events);
    logger.write(&ProfileEvent::new(EventType::SessionEnd {
        total_events,
        practice_events,
    }));
    let _ = logger.writer.flush();
    tracing::info!(
        "Profiling session ended: {} events, {} from practice",
        total_events,
        practice_events
    );
}

pub fn log_event(event: EventType) {
    record(ProfileEvent::new(event));
}

pub fn log_timed(name: &str, duration: Duration) {
    record(ProfileEvent::timed(name, duration));
}
