//! Session Storage - persistence layer for the current session
//!
//! A single serialized record lives under one fixed key of a `KeyValueSlot`.
//! Corrupt or incomplete records are cleared on load and reported as absent.

use crate::auth::Session;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use unsaidtalks_core::{persistence_error, DashboardResult, KeyValueSlot};

/// Fields a stored record must carry to be accepted
const REQUIRED_FIELDS: [&str; 3] = ["id", "email", "role"];

/// Codec between the current session and its durable slot
#[derive(Clone)]
pub struct SessionStore {
    slot: Arc<dyn KeyValueSlot>,
    key: String,
}

impl SessionStore {
    pub fn new(slot: Arc<dyn KeyValueSlot>, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored session, self-healing on corruption
    pub fn load(&self) -> Option<Session> {
        let raw = match self.slot.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read session slot");
                return None;
            }
        };

        match decode(&raw) {
            Ok(session) => {
                debug!(key = %self.key, user_id = %session.id, "Loaded stored session");
                Some(session)
            }
            Err(reason) => {
                warn!(key = %self.key, reason = %reason, "Discarding invalid stored session");
                if let Err(e) = self.slot.remove(&self.key) {
                    warn!(key = %self.key, error = %e, "Failed to clear invalid session record");
                }
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> DashboardResult<()> {
        let raw = serde_json::to_string(session)?;
        self.slot.set(&self.key, &raw)?;
        debug!(key = %self.key, user_id = %session.id, "Saved session");
        Ok(())
    }

    pub fn clear(&self) -> DashboardResult<()> {
        self.slot.remove(&self.key)?;
        debug!(key = %self.key, "Cleared session");
        Ok(())
    }
}

fn decode(raw: &str) -> Result<Session, String> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| format!("record is not valid JSON: {}", e))?;

    for field in REQUIRED_FIELDS {
        match value.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            _ => return Err(format!("missing required field `{}`", field)),
        }
    }

    serde_json::from_value(value).map_err(|e| format!("record has an invalid shape: {}", e))
}

/// Slot store keeping one JSON file per key in a directory
pub struct FileSlotStore {
    storage_dir: PathBuf,
}

impl FileSlotStore {
    /// Create the store, creating the directory if it doesn't exist
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> DashboardResult<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir).map_err(|e| {
            persistence_error!(
                format!("Failed to create {}", storage_dir.display()),
                "file_slot_store",
                e
            )
        })?;

        info!("Session storage initialized at: {}", storage_dir.display());
        Ok(Self { storage_dir })
    }

    fn path_for(&self, key: &str) -> DashboardResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(persistence_error!(
                format!("Invalid slot key: {:?}", key),
                "file_slot_store"
            ));
        }
        Ok(self.storage_dir.join(format!("{}.json", key)))
    }
}

impl KeyValueSlot for FileSlotStore {
    fn get(&self, key: &str) -> DashboardResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence_error!(
                format!("Failed to read {}", path.display()),
                "file_slot_store",
                e
            )),
        }
    }

    fn set(&self, key: &str, value: &str) -> DashboardResult<()> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a half-written record
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| {
                persistence_error!(
                    format!("Failed to write {}", path.display()),
                    "file_slot_store",
                    e
                )
            })
    }

    fn remove(&self, key: &str) -> DashboardResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(persistence_error!(
                format!("Failed to remove {}", path.display()),
                "file_slot_store",
                e
            )),
        }
    }
}

/// Process-local slot store
#[derive(Default)]
pub struct MemorySlotStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueSlot for MemorySlotStore {
    fn get(&self, key: &str) -> DashboardResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> DashboardResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> DashboardResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, SessionInput};
    use chrono::Utc;

    fn memory_store() -> (Arc<MemorySlotStore>, SessionStore) {
        let slot = Arc::new(MemorySlotStore::new());
        let store = SessionStore::new(slot.clone(), "unsaidtalks_user");
        (slot, store)
    }

    fn sample() -> Session {
        SessionInput::new("m-17", "Ravi", "ravi@example.com", Role::Mentor)
            .with_avatar("/avatars/ravi.png")
            .into_session(Utc::now())
    }

    #[test]
    fn test_save_then_load() {
        let (_, store) = memory_store();
        let session = sample();
        store.save(&session).unwrap();
        assert_eq!(store.load(), Some(session));
    }

    #[test]
    fn test_missing_required_fields_are_discarded() {
        for field in REQUIRED_FIELDS {
            let (slot, store) = memory_store();
            let mut value = serde_json::to_value(sample()).unwrap();
            value.as_object_mut().unwrap().remove(field);
            slot.set(store.key(), &value.to_string()).unwrap();

            assert_eq!(store.load(), None, "record without `{}` must be absent", field);
            assert_eq!(slot.get(store.key()).unwrap(), None, "slot must be cleared");
        }
    }

    #[test]
    fn test_garbage_is_discarded() {
        let (slot, store) = memory_store();
        slot.set(store.key(), "{not json").unwrap();
        assert_eq!(store.load(), None);
        assert_eq!(slot.get(store.key()).unwrap(), None);
    }

    #[test]
    fn test_unknown_role_is_discarded() {
        let (slot, store) = memory_store();
        slot.set(
            store.key(),
            r#"{"id":"u1","email":"a@b.c","role":"guest"}"#,
        )
        .unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_minimal_record_gets_defaults() {
        let (slot, store) = memory_store();
        slot.set(
            store.key(),
            r#"{"id":"u1","email":"a@b.c","role":"super-admin"}"#,
        )
        .unwrap();

        let session = store.load().unwrap();
        assert_eq!(session.role, Role::SuperAdmin);
        assert_eq!(session.name, "");
        assert!(!session.verified);
        assert_eq!(session.last_login, None);
    }

    #[test]
    fn test_file_slot_store() {
        let dir = tempfile::tempdir().unwrap();
        let slot = Arc::new(FileSlotStore::new(dir.path().join("data")).unwrap());
        let store = SessionStore::new(slot.clone(), "unsaidtalks_user");

        assert_eq!(store.load(), None);
        let session = sample();
        store.save(&session).unwrap();
        assert!(dir.path().join("data/unsaidtalks_user.json").exists());
        assert_eq!(store.load(), Some(session));

        store.clear().unwrap();
        assert_eq!(store.load(), None);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_slot_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlotStore::new(dir.path()).unwrap();
        assert!(slot.set("../escape", "x").is_err());
        assert!(slot.get("").is_err());
    }
}
