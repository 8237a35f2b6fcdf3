//! Local key/value preferences (display name, persisted access token).

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const DISPLAY_NAME_KEY: &str = "user_full_name";
pub const TOKEN_KEY: &str = "typenote_token";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("preference file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("preference file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait PreferenceStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Stored display name, if one was saved and is not blank.
pub fn load_display_name(store: &dyn PreferenceStore) -> Option<String> {
    store
        .get_item(DISPLAY_NAME_KEY)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Saves the trimmed name. Blank names are ignored and return `Ok(None)`.
pub fn save_display_name(
    store: &dyn PreferenceStore,
    name: &str,
) -> Result<Option<String>, StorageError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    store.set_item(DISPLAY_NAME_KEY, name)?;
    Ok(Some(name.to_string()))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
        Ok(())
    }
}

/// A JSON object of string values in a single file.
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename, so readers never observe a half-written file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(json) if json.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut items = self.load()?;
        f(&mut items);
        self.save(&items)
    }
}

impl PreferenceStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        match self.load() {
            Ok(items) => items.get(key).cloned(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable preference file");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }
}
