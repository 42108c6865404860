use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub const DEFAULT_KEY_PREFIX: &str = "lola_";

/// Whether the user accepted the enhanced experience (bool).
pub const ENHANCED_EXPERIENCE: &str = "enhancedExperience";
/// Whether the opt-in offer has ever been shown (bool).
pub const ENHANCED_EXPERIENCE_SHOWN: &str = "enhancedExperienceShown";
/// Start of the current session, epoch millis.
pub const SESSION_START: &str = "sessionStart";
/// Rolling click/keystroke counters for the current session.
pub const INTERACTION_COUNTS: &str = "interactionCounts";

/// Storage key -> JSON text, mirroring what a browser keeps in `localStorage`.
type Entries = BTreeMap<String, String>;

/// Namespaced key/value preference storage persisted as a single JSON file.
///
/// The file is only created on the first write. Entries never expire; a `set`
/// overwrites whatever was stored under the same key.
pub struct PreferenceStore {
    path: Option<PathBuf>,
    prefix: String,
    entries: RwLock<Entries>,
}

impl PreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        let entries = load_entries(&path);
        Self {
            path: Some(path),
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            entries: RwLock::new(entries),
        }
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            entries: RwLock::new(Entries::new()),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Read and decode a preference. Missing or undecodable entries yield `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = self.storage_key(key);
        let raw = self.read().get(&storage_key).cloned()?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log_warn!("ignoring corrupt preference {storage_key}: {err}");
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(&self.storage_key(key))
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let storage_key = self.storage_key(key);
        let serialized = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize preference {storage_key}"))?;

        let mut guard = self.write();
        guard.insert(storage_key, serialized);
        self.persist(&guard)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.write();
        if guard.remove(&self.storage_key(key)).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }

    /// Set a boolean flag unless it is already `true`, as one step.
    /// Returns whether this call set it. The in-memory flag stays set even
    /// if persisting fails.
    pub fn set_flag_once(&self, key: &str) -> Result<bool> {
        let storage_key = self.storage_key(key);
        let mut guard = self.write();
        let already_set = guard
            .get(&storage_key)
            .and_then(|raw| serde_json::from_str::<bool>(raw).ok())
            .unwrap_or(false);
        if already_set {
            return Ok(false);
        }

        guard.insert(storage_key, "true".to_string());
        self.persist(&guard)?;
        Ok(true)
    }

    fn persist(&self, entries: &Entries) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create preference directory {}", parent.display())
                })?;
            }
        }

        let serialized = serde_json::to_string_pretty(entries)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write preferences to {}", path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn load_entries(path: &Path) -> Entries {
    if !path.exists() {
        log_debug!("no preference file at {}; starting empty", path.display());
        return Entries::new();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            log_warn!("failed to read preferences from {}: {err}", path.display());
            return Entries::new();
        }
    };

    serde_json::from_str(&contents).unwrap_or_else(|err| {
        log_warn!("preference file {} is corrupt ({err}); starting empty", path.display());
        Entries::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counters {
        clicks: u64,
        keystrokes: u64,
    }

    #[test]
    fn test_round_trip_values() {
        let store = PreferenceStore::in_memory();

        store.set(ENHANCED_EXPERIENCE, &true).unwrap();
        store.set(SESSION_START, &1_700_000_000_000i64).unwrap();
        store
            .set(INTERACTION_COUNTS, &Counters { clicks: 3, keystrokes: 41 })
            .unwrap();
        store
            .set("nested", &serde_json::json!({"a": [1, 2, {"b": null}], "c": "d"}))
            .unwrap();

        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE), Some(true));
        assert_eq!(store.get::<i64>(SESSION_START), Some(1_700_000_000_000));
        assert_eq!(
            store.get::<Counters>(INTERACTION_COUNTS),
            Some(Counters { clicks: 3, keystrokes: 41 })
        );
        assert_eq!(
            store.get::<serde_json::Value>("nested"),
            Some(serde_json::json!({"a": [1, 2, {"b": null}], "c": "d"}))
        );
    }

    #[test]
    fn test_missing_key_is_none() {
        let store = PreferenceStore::in_memory();
        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE_SHOWN), None);
        assert!(!store.contains(ENHANCED_EXPERIENCE_SHOWN));
    }

    #[test]
    fn test_set_overwrites() {
        let store = PreferenceStore::in_memory();
        store.set(ENHANCED_EXPERIENCE, &true).unwrap();
        store.set(ENHANCED_EXPERIENCE, &false).unwrap();
        store.set(ENHANCED_EXPERIENCE, &false).unwrap();
        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE), Some(false));
    }

    #[test]
    fn test_type_mismatch_is_none() {
        let store = PreferenceStore::in_memory();
        store.set(ENHANCED_EXPERIENCE, "definitely").unwrap();
        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE), None);
    }

    #[test]
    fn test_file_created_lazily_and_namespaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prefs").join("store.json");
        let store = PreferenceStore::new(path.clone());

        assert!(!path.exists());
        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE), None);
        assert!(!path.exists());

        store.set(ENHANCED_EXPERIENCE, &true).unwrap();
        assert!(path.exists());

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("lola_enhancedExperience").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        {
            let store = PreferenceStore::new(path.clone());
            store.set(ENHANCED_EXPERIENCE_SHOWN, &true).unwrap();
        }

        let reopened = PreferenceStore::new(path);
        assert_eq!(reopened.get::<bool>(ENHANCED_EXPERIENCE_SHOWN), Some(true));
    }

    #[test]
    fn test_corrupt_entry_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        fs::write(&path, r#"{"lola_enhancedExperience": "{not json"}"#).unwrap();
        let store = PreferenceStore::new(path.clone());
        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE), None);

        fs::write(&path, "this is not a preference file").unwrap();
        let store = PreferenceStore::new(path);
        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE), None);
        store.set(ENHANCED_EXPERIENCE, &true).unwrap();
        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE), Some(true));
    }

    #[test]
    fn test_remove_and_custom_prefix() {
        let store = PreferenceStore::in_memory().with_prefix("test_");
        store.set(SESSION_START, &5u64).unwrap();
        assert!(store.contains(SESSION_START));
        store.remove(SESSION_START).unwrap();
        assert_eq!(store.get::<u64>(SESSION_START), None);
    }

    #[test]
    fn test_set_flag_once() {
        let store = PreferenceStore::in_memory();
        store.set(ENHANCED_EXPERIENCE_SHOWN, &false).unwrap();

        assert!(store.set_flag_once(ENHANCED_EXPERIENCE_SHOWN).unwrap());
        assert!(!store.set_flag_once(ENHANCED_EXPERIENCE_SHOWN).unwrap());
        assert_eq!(store.get::<bool>(ENHANCED_EXPERIENCE_SHOWN), Some(true));
    }

    #[test]
    fn test_set_flag_once_across_threads() {
        let store = std::sync::Arc::new(PreferenceStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.set_flag_once(ENHANCED_EXPERIENCE_SHOWN).unwrap())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
