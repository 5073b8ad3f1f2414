//! Encrypted key-value storage for small secrets and flags.
//!
//! Values are sealed with AES-256-GCM under a per-device random key, then
//! base64-encoded so any `KeyValueStore` backing can hold them.
//! Stored value layout (before base64): [12-byte nonce][ciphertext + tag].

use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{KeyValueStore, StoreError};

pub const KEY_LENGTH: usize = 32; // AES-256
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Device encryption key, zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DeviceKey {
    key_bytes: [u8; KEY_LENGTH],
}

impl DeviceKey {
    /// Fresh random key.
    pub fn generate() -> Self {
        let mut key_bytes = [0u8; KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        Self { key_bytes }
    }

    pub fn from_bytes(key_bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key_bytes }
    }

    /// Load the key file at `path`, creating it on first use.
    pub fn load_or_create(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            let mut bytes = fs::read(path)?;
            if bytes.len() != KEY_LENGTH {
                bytes.zeroize();
                return Err(StoreError::Corrupt(format!(
                    "device key at {} has invalid length",
                    path.display()
                )));
            }
            let mut key_bytes = [0u8; KEY_LENGTH];
            key_bytes.copy_from_slice(&bytes);
            bytes.zeroize();
            return Ok(Self { key_bytes });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let key = Self::generate();
        fs::write(path, key.key_bytes)?;
        tracing::info!(path = %path.display(), "Device key created");
        Ok(key)
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key_bytes));

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| StoreError::Crypto("encryption failed".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
        if sealed.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(StoreError::Corrupt("sealed value too short".into()));
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key_bytes));
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);

        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| StoreError::Crypto("decryption failed: wrong key or corrupted data".into()))
    }
}

/// `KeyValueStore` wrapper that encrypts every value.
pub struct SecureStore<K> {
    inner: K,
    key: DeviceKey,
}

impl<K: KeyValueStore> SecureStore<K> {
    pub fn new(inner: K, key: DeviceKey) -> Self {
        Self { inner, key }
    }
}

impl<K: KeyValueStore> KeyValueStore for SecureStore<K> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(encoded) = self.inner.get(key)? else {
            return Ok(None);
        };
        let sealed = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| StoreError::Corrupt(format!("{key}: {e}")))?;
        let plaintext = self.key.open(&sealed)?;
        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|_| StoreError::Corrupt(format!("{key}: not UTF-8")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let sealed = self.key.seal(value.as_bytes())?;
        self.inner.set(key, &STANDARD.encode(sealed))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.inner.multi_remove(keys)
    }
}
