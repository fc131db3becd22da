use crate::config::app_file;
use crate::error::AppError;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "session.json";
const STORE_ENV_VAR: &str = "DOSMART_STORE_PATH";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredEntries {
    schema_version: u32,
    #[serde(default)]
    entries: BTreeMap<String, Value>,
}

/// Key-value storage backed by a single JSON file.
///
/// Every write is a full load-modify-save of the file; writes to different
/// keys are not atomic with respect to each other.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(store_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let mut stored = load_entries(&self.path)?;
        Ok(stored.entries.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), AppError> {
        let mut stored = load_entries(&self.path)?;
        stored.entries.insert(key.to_string(), value);
        save_entries(&self.path, &stored.entries)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut stored = load_entries(&self.path)?;
        if stored.entries.remove(key).is_none() {
            return Ok(());
        }
        save_entries(&self.path, &stored.entries)
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    app_file(STORE_ENV_VAR, STORE_FILE_NAME)
}

fn load_entries(path: &Path) -> Result<StoredEntries, AppError> {
    if !path.exists() {
        return Ok(StoredEntries {
            schema_version: SCHEMA_VERSION,
            entries: BTreeMap::new(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredEntries =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(stored)
}

fn save_entries(path: &Path, entries: &BTreeMap<String, Value>) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredEntries {
        schema_version: SCHEMA_VERSION,
        entries: entries.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}
