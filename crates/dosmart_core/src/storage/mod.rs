//! Durable client-side storage for the session token, username and the
//! optional task mirror.

use crate::error::AppError;
use crate::model::Task;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub mod json_store;

pub use json_store::JsonFileStore;

pub const TOKEN_KEY: &str = "token";
pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USERNAME_KEY: &str = "username";
pub const TASKS_KEY: &str = "tasks";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, AppError>;

    fn set(&self, key: &str, value: Value) -> Result<(), AppError>;

    fn remove(&self, key: &str) -> Result<(), AppError>;

    fn get_string(&self, key: &str) -> Result<Option<String>, AppError> {
        match self.get(key)? {
            Some(Value::String(value)) => Ok(Some(value)),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(AppError::invalid_data(format!("{key} must be a string"))),
        }
    }
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Token persisted by the last login, falling back to the legacy key.
pub fn stored_token(store: &dyn KeyValueStore) -> Result<Option<String>, AppError> {
    match store.get_string(TOKEN_KEY)? {
        Some(token) if !token.is_empty() => Ok(Some(token)),
        _ => store.get_string(AUTH_TOKEN_KEY),
    }
}

/// Last mirrored task list, `None` when nothing was ever mirrored.
pub fn stored_tasks(store: &dyn KeyValueStore) -> Result<Option<Vec<Task>>, AppError> {
    match store.get(TASKS_KEY)? {
        Some(Value::Null) | None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|err| AppError::invalid_data(format!("stored tasks: {err}"))),
    }
}

pub fn mirror_tasks(store: &dyn KeyValueStore, tasks: &[Task]) -> Result<(), AppError> {
    let value =
        serde_json::to_value(tasks).map_err(|err| AppError::invalid_data(err.to_string()))?;
    store.set(TASKS_KEY, value)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::io("storage lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::io("storage lock poisoned"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::io("storage lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}
