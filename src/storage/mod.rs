//! Key-value persistence for session state.
//!
//! The store is deliberately dumb: string keys, JSON string values. The
//! auth store mirrors every mutation into it so identity survives process
//! restarts.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const KEY_TOKEN: &str = "token";
pub const KEY_TOKEN_TYPE: &str = "tokenType";
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";
pub const KEY_USER_INFO: &str = "userInfo";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("HOME environment variable not set")]
    NoHome,
}

pub trait KeyStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed accessors over any [`KeyStore`].
pub trait KeyStoreExt: KeyStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("discarding unreadable stored value for '{}': {}", key, e);
                None
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        self.set_raw(key, serde_json::to_string(value)?)
    }
}

impl<S: KeyStore + ?Sized> KeyStoreExt for S {}

/// Volatile store for tests and one-shot CLI runs.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.values.lock().expect("storage lock").get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.values
            .lock()
            .expect("storage lock")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().expect("storage lock").remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct FileStoreSnapshot {
    updated_at: Option<DateTime<Utc>>,
    values: HashMap<String, String>,
}

/// Store persisted as pretty-printed JSON in the config directory, so a
/// CLI session keeps its login across invocations.
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store file under the config directory.
    /// `SHELL_CONFIG_DIR` overrides the default `~/.config/admin-shell`.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = config_dir()?;
        Self::open(dir.join("storage.json"))
    }

    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let snapshot: FileStoreSnapshot = serde_json::from_str(&content)?;
            snapshot.values
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        let snapshot = FileStoreSnapshot {
            updated_at: Some(Utc::now()),
            values: values.clone(),
        };
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&snapshot)?)?;
        Ok(())
    }
}

impl KeyStore for FileStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.values.lock().expect("storage lock").get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut values = self.values.lock().expect("storage lock");
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().expect("storage lock");
        values.remove(key);
        self.flush(&values)
    }
}

fn config_dir() -> Result<PathBuf, StorageError> {
    let dir = if let Ok(custom) = std::env::var("SHELL_CONFIG_DIR") {
        PathBuf::from(custom)
    } else {
        let home = std::env::var("HOME").map_err(|_| StorageError::NoHome)?;
        PathBuf::from(home).join(".config").join("admin-shell")
    };
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_json() {
        let store = MemoryStore::new();
        store.set_json("answer", &vec![1, 2, 3]).unwrap();

        let back: Vec<i32> = store.get_json("answer").unwrap();
        assert_eq!(back, vec![1, 2, 3]);

        store.remove("answer").unwrap();
        assert!(store.get_raw("answer").is_none());
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = std::env::temp_dir()
            .join(format!("admin-shell-test-{}", uuid::Uuid::new_v4()))
            .join("storage.json");

        {
            let store = FileStore::open(path.clone()).unwrap();
            store.set_raw(KEY_TOKEN, "\"abc\"".to_string()).unwrap();
        }

        let reopened = FileStore::open(path.clone()).unwrap();
        assert_eq!(reopened.get_raw(KEY_TOKEN).as_deref(), Some("\"abc\""));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn unreadable_stored_json_is_discarded() {
        let store = MemoryStore::new();
        store.set_raw("broken", "{not json".to_string()).unwrap();
        let back: Option<Vec<i32>> = store.get_json("broken");
        assert!(back.is_none());
    }
}
