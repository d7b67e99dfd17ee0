//! Opt-in event log for practice sessions.
//!
//! Built with `--features profiling`, every card action, graded answer,
//! snapshot restore and deck load is appended as one JSON line to
//! `$DATA_DIR/profile_<timestamp>.jsonl`, and `profile_scope!` blocks record
//! their duration. Without the feature the macros compile away.
//!
//! ```rust,ignore
//! crate::profile_log!(crate::profiling::EventType::CardAction {
//!     action: "dismiss".into(),
//!     item_id: "vocab-1".into(),
//! });
//! ```

#[cfg(feature = "profiling")]
mod event;
#[cfg(feature = "profiling")]
mod logger;

#[cfg(feature = "profiling")]
pub use event::*;
#[cfg(feature = "profiling")]
pub use logger::*;

#[cfg(not(feature = "profiling"))]
mod noop;
#[cfg(not(feature = "profiling"))]
pub use noop::*;

/// Record one profiling event.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_log {
    ($event:expr) => {
        $crate::profiling::log_event($event)
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_log {
    ($($args:tt)*) => {};
}

/// Run a block, recording how long it took under `name`.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr, $body:block) => {{
        let started = std::time::Instant::now();
        let result = $body;
        $crate::profiling::log_timed($name, started.elapsed());
        result
    }};
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr, $body:block) => {
        $body
    };
}
