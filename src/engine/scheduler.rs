//! Deferred callbacks for time-based engine behavior (undo expiry).
//!
//! `TokioScheduler` runs tasks on the tokio runtime. `ManualScheduler` keeps a
//! virtual clock that tests advance explicitly; due tasks fire during
//! `advance`, in due-time order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled task. Cancelling prevents the task from running if it
/// has not fired yet.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
  cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst)
  }
}

pub trait Scheduler: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
  fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;
}

/// Wall-clock scheduler backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::default();
    let guard = handle.clone();

    match tokio::runtime::Handle::try_current() {
      Ok(runtime) => {
        runtime.spawn(async move {
          tokio::time::sleep(delay).await;
          if !guard.is_cancelled() {
            task();
          }
        });
      }
      Err(_) => {
        // Engines also check expiry lazily, so a missing runtime only delays cleanup
        tracing::warn!("No tokio runtime available; deferred task dropped");
      }
    }

    handle
  }
}

struct PendingTask {
  due: DateTime<Utc>,
  seq: u64,
  handle: TaskHandle,
  task: Task,
}

struct ManualState {
  now: DateTime<Utc>,
  next_seq: u64,
  pending: Vec<PendingTask>,
}

/// Virtual-time scheduler.
pub struct ManualScheduler {
  state: Mutex<ManualState>,
}

impl Default for ManualScheduler {
  fn default() -> Self {
    Self::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().unwrap_or_default())
  }
}

impl ManualScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn starting_at(now: DateTime<Utc>) -> Self {
    Self {
      state: Mutex::new(ManualState {
        now,
        next_seq: 0,
        pending: Vec::new(),
      }),
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Number of tasks that have not fired or been cancelled.
  pub fn pending_count(&self) -> usize {
    self
      .lock()
      .pending
      .iter()
      .filter(|p| !p.handle.is_cancelled())
      .count()
  }

  /// Move the clock forward, running every task that comes due on the way.
  pub fn advance(&self, by: Duration) {
    let target = {
      let state = self.lock();
      state.now + chrono::Duration::milliseconds(by.as_millis() as i64)
    };

    loop {
      let next = {
        let mut state = self.lock();
        let position = state
          .pending
          .iter()
          .enumerate()
          .filter(|(_, p)| p.due <= target)
          .min_by_key(|(_, p)| (p.due, p.seq))
          .map(|(i, _)| i);
        match position {
          Some(i) => {
            let pending = state.pending.remove(i);
            state.now = pending.due;
            Some(pending)
          }
          None => {
            state.now = target;
            None
          }
        }
      };

      // Run outside the lock so tasks may schedule follow-ups
      match next {
        Some(pending) if !pending.handle.is_cancelled() => (pending.task)(),
        Some(_) => {}
        None => break,
      }
    }
  }
}

impl Scheduler for ManualScheduler {
  fn now(&self) -> DateTime<Utc> {
    self.lock().now
  }

  fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::default();
    let mut state = self.lock();
    let due = state.now + chrono::Duration::milliseconds(delay.as_millis() as i64);
    let seq = state.next_seq;
    state.next_seq += 1;
    state.pending.push(PendingTask {
      due,
      seq,
      handle: handle.clone(),
      task,
    });
    handle
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;

  #[test]
  fn test_manual_scheduler_fires_at_due_time() {
    let scheduler = ManualScheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    scheduler.schedule(
      Duration::from_millis(100),
      Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
      }),
    );

    scheduler.advance(Duration::from_millis(99));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    scheduler.advance(Duration::from_millis(1));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.pending_count(), 0);
  }

  #[test]
  fn test_manual_scheduler_cancel() {
    let scheduler = ManualScheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let handle = scheduler.schedule(
      Duration::from_millis(10),
      Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
      }),
    );
    handle.cancel();
    scheduler.advance(Duration::from_secs(1));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn test_manual_scheduler_clock_advances() {
    let scheduler = ManualScheduler::new();
    let start = scheduler.now();
    scheduler.advance(Duration::from_millis(5000));
    assert_eq!((scheduler.now() - start).num_milliseconds(), 5000);
  }

  #[test]
  fn test_tasks_run_in_due_order() {
    let scheduler = ManualScheduler::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for (delay, label) in [(30, "c"), (10, "a"), (20, "b")] {
      let order = order.clone();
      scheduler.schedule(
        Duration::from_millis(delay),
        Box::new(move || order.lock().unwrap().push(label)),
      );
    }
    scheduler.advance(Duration::from_millis(50));
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
  }
}
