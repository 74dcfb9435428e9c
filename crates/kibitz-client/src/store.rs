//! Shared key/value port with change notification.
//!
//! Preferences, the last-analyzed position and the cross-instance signals all
//! go through this port. Implementations may be backed by any persistent,
//! multi-instance medium; [`MemoryStore`] is the in-process reference
//! implementation used by tests and single-instance embedders.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StoreError;

/// Change-notification handler. Receives the new value.
pub type StoreHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Persistent key/value store shared across controller instances.
pub trait SignalStore: Send + Sync {
    /// Current value under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Write `value` under `key` and notify subscribers.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Register `handler` for subsequent writes to `key`.
    fn subscribe(&self, key: &str, handler: StoreHandler);
}

/// In-process [`SignalStore`]. Handlers run on the writer's thread; writes
/// from a handler are allowed.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    subscribers: Mutex<Vec<(String, StoreHandler)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        // Snapshot the handlers so they run without any store lock held.
        let handlers: Vec<StoreHandler> = self
            .subscribers
            .lock()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(value);
        }
        Ok(())
    }

    fn subscribe(&self, key: &str, handler: StoreHandler) {
        self.subscribers.lock().push((key.to_string(), handler));
    }
}

/// A single persisted preference: one value under one key, parsed on every
/// read, with a default for missing or malformed stored values.
#[derive(Clone)]
pub struct StoredProp<T> {
    store: Arc<dyn SignalStore>,
    key: String,
    default: T,
}

impl<T> StoredProp<T>
where
    T: FromStr + Display + Clone,
{
    pub fn new(store: Arc<dyn SignalStore>, key: impl Into<String>, default: T) -> Self {
        StoredProp { store, key: key.into(), default }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stored value, or the default when absent or unparseable.
    pub fn get(&self) -> T {
        self.store
            .get(&self.key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| self.default.clone())
    }

    /// Persist `value`. Store failures are logged and swallowed.
    pub fn set(&self, value: T) {
        if let Err(e) = self.store.set(&self.key, &value.to_string()) {
            log::warn!("failed to persist {}: {e}", self.key);
        }
    }
}
