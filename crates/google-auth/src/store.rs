//! Persistent key-value storage
//!
//! The manager persists its credential through the `KeyValueStore` trait so
//! the host decides where records live: browser-style local storage, a file
//! on disk, or an in-memory map in tests. Only one slot per flow is ever
//! used.
//!
//! `FileStore` keeps the slots in a single JSON file. All writes use atomic
//! temp-file + rename to prevent corruption on crash, and the file is set to
//! 0600 since it holds OAuth tokens.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};

/// Persistent key-value store collaborator. Survives process restarts
/// (except for [`MemoryStore`], which exists for tests and ephemeral hosts).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store: one JSON object mapping slot keys to raw values.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the slot map, treating a missing or unreadable file as empty.
    fn read_slots(&self) -> HashMap<String, String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    fn write_slots(&self, slots: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(slots)
            .map_err(|e| Error::Io(format!("serializing store: {e}")))?;
        write_atomic(&self.path, &json)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_slots().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.read_slots();
        slots.insert(key.to_owned(), value.to_owned());
        self.write_slots(&slots)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.read_slots();
        if slots.remove(key).is_some() {
            self.write_slots(&slots)?;
        }
        Ok(())
    }
}

/// Write a file atomically: temp file in the same directory, then rename
/// over the target. Permissions are set to 0600 before the rename.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("store path has no parent directory".into()))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Io(format!("creating store directory: {e}")))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));
    std::fs::write(&tmp_path, contents.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp store file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::Io(format!("setting store file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted store");
    Ok(())
}

/// In-memory store for tests and hosts without durable storage.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot, e.g. to simulate a previous session.
    pub fn with_slot(self, key: &str, value: &str) -> Self {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_roundtrip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileStore::new(&path);
        store.set("googleCredentials", r#"{"accessToken":"A"}"#).unwrap();

        // Fresh instance simulates a process restart
        let store2 = FileStore::new(&path);
        assert_eq!(
            store2.get("googleCredentials").as_deref(),
            Some(r#"{"accessToken":"A"}"#)
        );
    }

    #[test]
    fn file_store_missing_file_reads_as_empty() {
        let store = FileStore::new("/nonexistent/credentials.json");
        assert!(store.get("googleCredentials").is_none());
    }

    #[test]
    fn file_store_remove_clears_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileStore::new(&path);
        store.set("googleCredentials", "value").unwrap();
        store.remove("googleCredentials").unwrap();
        assert!(store.get("googleCredentials").is_none());

        // Removing an absent slot is a no-op
        store.remove("googleCredentials").unwrap();
    }

    #[test]
    fn file_store_overwrites_existing_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileStore::new(&path);
        store.set("slot", "first").unwrap();
        store.set("slot", "second").unwrap();
        assert_eq!(store.get("slot").as_deref(), Some("second"));
    }

    #[test]
    fn file_store_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json {{{{").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get("googleCredentials").is_none());

        // A write replaces the corrupt file with a valid one
        store.set("slot", "value").unwrap();
        assert_eq!(store.get("slot").as_deref(), Some("value"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileStore::new(&path);
        store.set("googleCredentials", "value").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "store file must be 0600, got {mode:o}");
    }

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.get("k").is_none());
    }

    #[test]
    fn memory_store_with_slot_prepopulates() {
        let store = MemoryStore::new().with_slot("googleCredentials", "{}");
        assert_eq!(store.get("googleCredentials").as_deref(), Some("{}"));
    }
}
