//! Key-value persistence layer for SISMED.
//!
//! The desktop shell keeps every record collection in a single named slot,
//! one JSON document per slot. [`KeyValueStore`] is the raw string port;
//! [`LocalStorage`] is the typed JSON adapter the rest of the crate uses.

mod memory;
mod schema;
mod sqlite;

pub use memory::*;
pub use schema::*;
pub use sqlite::*;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Slot names shared with the desktop shell.
pub mod keys {
    pub const PATIENTS: &str = "sismed-patients";
    pub const MEDICATIONS: &str = "sismed-medications";
    pub const PRESCRIPTIONS: &str = "sismed-prescriptions";
    pub const DESKTOP_CONFIG: &str = "sismed-desktop-config";
}

/// Storage errors the caller must see.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("slot {key} could not be decoded: {reason}")]
    Undecodable { key: String, reason: String },

    #[error("slot {key} was not loaded, refusing to overwrite it: {reason}")]
    Unloaded { key: String, reason: String },

    #[error("failed to create storage directory {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Raw string slots, the shape of browser `localStorage`.
pub trait KeyValueStore {
    /// Value stored under `key`, if any.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> StorageResult<()>;

    /// Remove every slot.
    fn clear(&mut self) -> StorageResult<()>;

    /// All stored keys.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Typed JSON adapter over a [`KeyValueStore`].
#[derive(Debug)]
pub struct LocalStorage<S> {
    store: S,
}

impl<S: KeyValueStore> LocalStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Read and decode the value under `key`.
    ///
    /// Never fails: a missing slot, an undecodable value or a backend read
    /// error all yield `default`.
    pub fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.store.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "Slot empty, using default");
                return default;
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to read slot, using default");
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Stored value could not be decoded, using default");
                default
            }
        }
    }

    /// Read and decode the value under `key` without any fallback.
    ///
    /// `Ok(None)` means the slot is empty. Callers that rewrite the whole slot
    /// use this so a value they cannot decode is never replaced.
    pub fn read_strict<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(raw) = self.store.get_item(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Undecodable {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Read with `T::default()` as the fallback.
    pub fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.read(key, T::default())
    }

    /// Serialize `value` and store it under `key`.
    pub fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> StorageResult<()> {
        let json = serde_json::to_string(value)?;
        self.store.set_item(key, &json)?;
        debug!(key, bytes = json.len(), "Slot written");
        Ok(())
    }

    /// Whether `key` currently holds a value.
    pub fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.store.get_item(key)?.is_some())
    }

    pub fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.store.remove_item(key)
    }

    /// Names of every occupied slot.
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        self.store.keys()
    }

    /// Remove every slot.
    pub fn clear(&mut self) -> StorageResult<()> {
        self.store.clear()
    }
}
