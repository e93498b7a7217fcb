//! Persistence of the last entered body measurements.
//!
//! Storage failures never reach the user: saving logs a warning and loading
//! falls back to nothing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StylesError;
use crate::request::BodyData;

/// Key under which body data is stored.
pub const BODY_DATA_KEY: &str = "styles-body-data";

/// A string key-value store.
pub trait KeyValueStore {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StylesError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StylesError>;
}

/// Store backed by one JSON object in a file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use the file at `path`; it is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location, `state.json` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("state.json"))
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StylesError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents)
            .map_err(|e| StylesError::Config(format!("Corrupt state file {}: {e}", self.path.display())))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StylesError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StylesError> {
        // A corrupt file is replaced rather than blocking every later save.
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| StylesError::Config(format!("Failed to encode state: {e}")))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Remember `data` for the next session. Failures are logged and ignored.
pub fn save_body_data(store: &dyn KeyValueStore, data: &BodyData) {
    let result = serde_json::to_string(data)
        .map_err(|e| StylesError::Config(e.to_string()))
        .and_then(|json| store.set(BODY_DATA_KEY, &json));
    match result {
        Ok(()) => debug!("body data saved"),
        Err(e) => warn!(error = %e, "failed to save body data"),
    }
}

/// Body data from a previous session, if any was stored and still parses.
#[must_use]
pub fn load_body_data(store: &dyn KeyValueStore) -> Option<BodyData> {
    let raw = match store.get(BODY_DATA_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "failed to load body data");
            return None;
        }
    };
    serde_json::from_str(&raw)
        .map_err(|e| warn!(error = %e, "ignoring unreadable saved body data"))
        .ok()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::request::BodyType;

    #[derive(Default)]
    struct MemoryStore {
        entries: RefCell<HashMap<String, String>>,
        fail: bool,
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>, StylesError> {
            if self.fail {
                return Err(StylesError::Config("unavailable".into()));
            }
            Ok(self.entries.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StylesError> {
            if self.fail {
                return Err(StylesError::Config("quota exceeded".into()));
            }
            self.entries.borrow_mut().insert(key.into(), value.into());
            Ok(())
        }
    }

    fn sample() -> BodyData {
        BodyData { height: Some("175cm".into()), body_type: Some(BodyType::Athletic), ..BodyData::default() }
    }

    #[test]
    fn saved_data_is_loaded_back() {
        let store = MemoryStore::default();
        assert!(load_body_data(&store).is_none());
        save_body_data(&store, &sample());
        assert_eq!(load_body_data(&store), Some(sample()));
        assert!(store.entries.borrow()[BODY_DATA_KEY].contains("\"bodyType\":\"athletic\""));
    }

    #[test]
    fn failures_are_swallowed() {
        let store = MemoryStore { fail: true, ..MemoryStore::default() };
        save_body_data(&store, &sample());
        assert!(load_body_data(&store).is_none());
    }

    #[test]
    fn unparseable_value_loads_as_none() {
        let store = MemoryStore::default();
        store.set(BODY_DATA_KEY, "{not json").unwrap();
        assert!(load_body_data(&store).is_none());
    }

    #[test]
    fn json_file_store_persists_entries() {
        let dir = std::env::temp_dir().join("styles_store_test");
        let _ = std::fs::remove_dir_all(&dir);
        let store = JsonFileStore::in_dir(&dir);

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("other", "x").unwrap();
        store.set("k", "v2").unwrap();

        let reopened = JsonFileStore::in_dir(&dir);
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));

        std::fs::write(dir.join("state.json"), "garbage").unwrap();
        assert!(reopened.get("k").is_err());
        reopened.set("k", "v3").unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v3"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
