//! Flat JSON backing stores
//!
//! One store is one pretty-printed JSON document on disk. Reading a store
//! that does not exist yet creates it with a built-in default mapping;
//! writing always overwrites the whole document. Writes go through a
//! temporary file and an atomic rename so a crash mid-write cannot leave a
//! truncated store behind.

use crate::errors::Result;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level document type of a store
pub type JsonMap = serde_json::Map<String, JsonValue>;

/// Handle to one named JSON store inside a store directory
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
    name: String,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Path of the store file on disk
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Read the store, creating it with `default` if it does not exist
    pub fn read_or_init(&self, default: impl FnOnce() -> JsonMap) -> Result<JsonMap> {
        let path = self.path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let value: JsonValue = serde_json::from_str(&content)?;
            match value {
                JsonValue::Object(map) => Ok(map),
                _ => Ok(JsonMap::new()),
            }
        } else {
            let map = default();
            self.write(&map)?;
            Ok(map)
        }
    }

    /// Overwrite the store with `map`, pretty-printed, via temp file + rename
    pub fn write(&self, map: &JsonMap) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let content = serde_json::to_string_pretty(&JsonValue::Object(map.clone()))?;
        let tmp = self.dir.join(format!("{}.tmp", self.name));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, self.path())?;
        Ok(())
    }
}

/// Resolve a store file path inside a directory, for callers that need the
/// location without opening the store
pub fn store_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
