//! Persistent key-value storage for serialized lists and flags.
//!
//! `KeyValueStore` is the seam the document library writes through.
//! Two backings: `JsonFileStore` (device data directory, survives restarts)
//! and `MemoryStore` (tests, ephemeral sessions). `SecureStore` wraps any
//! backing and encrypts values at rest.

pub mod file;
pub mod memory;
pub mod secure;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use secure::{DeviceKey, SecureStore};

use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("Corrupted store data: {0}")]
    Corrupt(String),

    #[error("Internal lock error")]
    LockPoisoned,
}

/// String-keyed persistent storage.
///
/// Implementations are shared across threads; every method takes `&self`.
/// A single call is atomic, a read-modify-write sequence is not.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove several keys.
    fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        (**self).multi_remove(keys)
    }
}
