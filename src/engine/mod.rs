//! Practice session engines: the card stack (browse and save-or-skip) and the
//! exercise queue (prompt, answer, feedback). Both persist through a
//! [`KeyValueStore`] and know nothing about HTTP or SQL.

pub mod card_stack;
pub mod exercise_queue;
pub mod scheduler;
pub mod snapshot;
pub mod storage;

pub use card_stack::{ActionOutcome, CardAction, CardActionType, CardStack, CardState, CardStatus};
pub use exercise_queue::{ExerciseQueue, Feedback, Progress};
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle, TokioScheduler};
pub use snapshot::{ExerciseSnapshot, Phase, QueueEntry, SnapshotError};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
