//! Durable key-value storage the engines persist their snapshots into.
//!
//! The engines only see this trait. The server uses the SQLite-backed
//! `db::kv::SqliteStore`; tests use `MemoryStore`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
  /// Backend lock poisoned or connection gone
  #[error("Storage unavailable")]
  Unavailable,
  /// Backend rejected the read or write
  #[error("Storage backend error: {0}")]
  Backend(String),
  /// Snapshot could not be encoded
  #[error("Failed to encode snapshot: {0}")]
  Encode(String),
}

/// Key-value capability. Writes for the same key must apply in call order.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
  fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
  fn remove(&self, key: &str) -> Result<(), StorageError>;
  fn clear(&self) -> Result<(), StorageError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
    entries.remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<(), StorageError> {
    let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
    entries.clear();
    Ok(())
  }
}

/// Serialize `value` and write it under `key`.
pub(crate) fn write_json<T: serde::Serialize + ?Sized>(
  store: &dyn KeyValueStore,
  key: &str,
  value: &T,
) -> Result<(), StorageError> {
  let json = serde_json::to_string(value).map_err(|e| StorageError::Encode(e.to_string()))?;
  store.set(key, &json)
}

/// Store that rejects every write; reads succeed. Used to exercise rollback.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FailingStore {
  pub inner: MemoryStore,
  pub fail_writes: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl FailingStore {
  pub fn set_failing(&self, failing: bool) {
    self
      .fail_writes
      .store(failing, std::sync::atomic::Ordering::SeqCst);
  }

  fn check(&self) -> Result<(), StorageError> {
    if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
      Err(StorageError::Backend("disk full".to_string()))
    } else {
      Ok(())
    }
  }
}

#[cfg(test)]
impl KeyValueStore for FailingStore {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    self.inner.get(key)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    self.check()?;
    self.inner.set(key, value)
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    self.check()?;
    self.inner.remove(key)
  }

  fn clear(&self) -> Result<(), StorageError> {
    self.check()?;
    self.inner.clear()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    assert_eq!(store.get("a").unwrap(), None);

    store.set("a", "1").unwrap();
    store.set("a", "2").unwrap();
    assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));

    store.set("b", "3").unwrap();
    store.remove("a").unwrap();
    assert_eq!(store.get("a").unwrap(), None);
    assert_eq!(store.len(), 1);

    store.clear().unwrap();
    assert!(store.is_empty());
  }

  #[test]
  fn test_failing_store_rejects_writes() {
    let store = FailingStore::default();
    store.set("k", "v").unwrap();
    store.set_failing(true);
    assert!(matches!(store.set("k", "w"), Err(StorageError::Backend(_))));
    assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
  }
}
