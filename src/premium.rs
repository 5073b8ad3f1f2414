//! Premium flag, kept in the encrypted store.
//!
//! Checkout happens outside this crate; after a successful purchase the
//! shell calls `unlock`.

use crate::config::PREMIUM_KEY;
use crate::store::{KeyValueStore, StoreError};

const UNLOCKED: &str = "true";

pub struct PremiumGate<K> {
    store: K,
}

impl<K: KeyValueStore> PremiumGate<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    /// True only when the stored flag is exactly `"true"`. A value that
    /// cannot be decrypted reads as not premium.
    pub fn is_premium(&self) -> Result<bool, StoreError> {
        match self.store.get(PREMIUM_KEY) {
            Ok(value) => Ok(value.as_deref() == Some(UNLOCKED)),
            Err(e @ (StoreError::Crypto(_) | StoreError::Corrupt(_))) => {
                tracing::warn!("Premium flag unreadable, treating as locked: {e}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn unlock(&self) -> Result<(), StoreError> {
        self.store.set(PREMIUM_KEY, UNLOCKED)?;
        tracing::info!("Premium unlocked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::{DeviceKey, JsonFileStore, MemoryStore, SecureStore};

    #[test]
    fn locked_by_default() {
        let gate = PremiumGate::new(MemoryStore::new());
        assert!(!gate.is_premium().unwrap());
    }

    #[test]
    fn unlock_sets_flag() {
        let gate = PremiumGate::new(MemoryStore::new());
        gate.unlock().unwrap();
        assert!(gate.is_premium().unwrap());
    }

    #[test]
    fn other_values_are_not_premium() {
        let store = Arc::new(MemoryStore::new());
        let gate = PremiumGate::new(store.clone());
        for value in ["false", "TRUE", "1", ""] {
            store.set(PREMIUM_KEY, value).unwrap();
            assert!(!gate.is_premium().unwrap(), "{value:?}");
        }
    }

    #[test]
    fn unlock_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("secure.json");
        let key_path = dir.path().join("device.key");

        {
            let store = SecureStore::new(
                JsonFileStore::open(&store_path).unwrap(),
                DeviceKey::load_or_create(&key_path).unwrap(),
            );
            PremiumGate::new(store).unlock().unwrap();
        }

        let store = SecureStore::new(
            JsonFileStore::open(&store_path).unwrap(),
            DeviceKey::load_or_create(&key_path).unwrap(),
        );
        assert!(PremiumGate::new(store).is_premium().unwrap());
    }

    #[test]
    fn undecryptable_flag_reads_as_locked() {
        let backing = Arc::new(MemoryStore::new());
        SecureStore::new(backing.clone(), DeviceKey::generate())
            .set(PREMIUM_KEY, UNLOCKED)
            .unwrap();

        let gate = PremiumGate::new(SecureStore::new(backing, DeviceKey::generate()));
        assert!(!gate.is_premium().unwrap());
    }
}
