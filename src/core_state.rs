//! Shared application state behind the command layer.
//!
//! `CoreState` is built once at startup and wrapped in `Arc` so every
//! command (and every blocking task a command spawns) sees the same library,
//! secure store and view cache.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LibraryConfig;
use crate::files::LocalFileStore;
use crate::library::{DocumentLibrary, DocumentRecord, LibraryError};
use crate::premium::PremiumGate;
use crate::producer::PdfProducer;
use crate::qr::ScanDebouncer;
use crate::store::{DeviceKey, JsonFileStore, KeyValueStore, SecureStore, StoreError};

pub type SharedStore = Arc<dyn KeyValueStore>;
pub type Library = DocumentLibrary<SharedStore, LocalFileStore>;

// ═══════════════════════════════════════════════════════════
// LibraryView: read-through cache for the presentation layer
// ═══════════════════════════════════════════════════════════

/// Snapshot of both lists as last read from the library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryView {
    pub recent: Vec<DocumentRecord>,
    pub favourites: Vec<DocumentRecord>,
    /// Uris of `favourites`, for star markers on recent rows.
    pub favourite_uris: BTreeSet<String>,
}

impl LibraryView {
    pub fn is_favourite(&self, uri: &str) -> bool {
        self.favourite_uris.contains(uri)
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    library: Arc<Library>,
    premium: PremiumGate<SharedStore>,
    producer: PdfProducer,
    scans: Mutex<ScanDebouncer>,
    view: RwLock<LibraryView>,
    pub config: LibraryConfig,
}

impl CoreState {
    /// Open the stores under `config.data_dir` and read the initial view.
    ///
    /// Leftover staging files from an interrupted render are removed.
    pub fn open(config: LibraryConfig) -> Result<Self, CoreError> {
        let kv: SharedStore = Arc::new(JsonFileStore::open(config.kv_store_path())?);
        let secure: SharedStore = Arc::new(SecureStore::new(
            JsonFileStore::open(config.secure_store_path())?,
            DeviceKey::load_or_create(&config.device_key_path())?,
        ));
        let files = LocalFileStore::open(config.documents_dir()).map_err(LibraryError::from)?;
        files.clean_staging();

        let state = Self::with_stores(config, kv, secure, files);
        state.refresh_view()?;

        tracing::info!(
            data_dir = %state.config.data_dir.display(),
            capacity = state.library.capacity(),
            "Core state opened"
        );
        Ok(state)
    }

    /// Assemble state from already-open stores.
    pub fn with_stores(
        config: LibraryConfig,
        kv: SharedStore,
        secure: SharedStore,
        files: LocalFileStore,
    ) -> Self {
        let library = DocumentLibrary::new(kv, files, config.recent_capacity);
        Self {
            library: Arc::new(library),
            premium: PremiumGate::new(secure),
            producer: PdfProducer::default(),
            scans: Mutex::new(ScanDebouncer::default()),
            view: RwLock::new(LibraryView::default()),
            config,
        }
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    pub fn premium(&self) -> &PremiumGate<SharedStore> {
        &self.premium
    }

    pub fn producer(&self) -> &PdfProducer {
        &self.producer
    }

    // ── View cache ──────────────────────────────────────────

    /// Last published view.
    pub fn view(&self) -> Result<LibraryView, CoreError> {
        let guard = self.view.read().map_err(|_| CoreError::LockPoisoned)?;
        Ok(guard.clone())
    }

    /// Re-read both lists and publish a new view.
    ///
    /// The write lock is held across the reads: views publish in read order.
    pub fn refresh_view(&self) -> Result<LibraryView, CoreError> {
        let mut guard = self.view.write().map_err(|_| CoreError::LockPoisoned)?;

        let recent = self.library.list_recent()?;
        let favourites = self.library.list_favourites()?;
        let favourite_uris = favourites.iter().map(|f| f.uri.clone()).collect();
        let view = LibraryView {
            recent,
            favourites,
            favourite_uris,
        };
        *guard = view.clone();
        Ok(view)
    }

    // ── Scans ───────────────────────────────────────────────

    /// Whether a decoded scan should be handled or is a repeat.
    pub fn accept_scan(&self, value: &str) -> Result<bool, CoreError> {
        let mut scans = self.scans.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(scans.accept(value))
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Background task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileStore;
    use crate::store::MemoryStore;

    fn memory_state(dir: &std::path::Path) -> CoreState {
        let config = LibraryConfig::with_data_dir(dir);
        let files = LocalFileStore::open(config.documents_dir()).unwrap();
        CoreState::with_stores(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            files,
        )
    }

    fn record_file(state: &CoreState, name: &str) -> DocumentRecord {
        let staging = state.library().files().staging_dir().unwrap();
        let path = staging.join(format!("{name}.tmp"));
        std::fs::write(&path, b"%PDF").unwrap();
        state
            .library()
            .record_produced(name, &path.to_string_lossy())
            .unwrap()
    }

    #[test]
    fn new_state_has_empty_view() {
        let dir = tempfile::tempdir().unwrap();
        let state = memory_state(dir.path());
        assert_eq!(state.view().unwrap(), LibraryView::default());
    }

    #[test]
    fn view_changes_only_on_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let state = memory_state(dir.path());
        let record = record_file(&state, "A");
        state.library().toggle_favourite(&record).unwrap();

        assert!(state.view().unwrap().recent.is_empty());

        let view = state.refresh_view().unwrap();
        assert_eq!(view.recent, vec![record.clone()]);
        assert!(view.is_favourite(&record.uri));
        assert_eq!(state.view().unwrap(), view);
    }

    #[test]
    fn concurrent_refreshes_end_on_latest_lists() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(memory_state(dir.path()));
        let records: Vec<DocumentRecord> = (0..6)
            .map(|i| record_file(&state, &format!("Doc{i}")))
            .collect();

        let handles: Vec<_> = records
            .into_iter()
            .map(|record| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    state.library().toggle_favourite(&record).unwrap();
                    state.refresh_view().unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let view = state.view().unwrap();
        assert_eq!(view.favourites, state.library().list_favourites().unwrap());
        assert_eq!(view.favourite_uris.len(), 6);
    }

    #[test]
    fn open_creates_layout_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = LibraryConfig::with_data_dir(dir.path());

        let uri = {
            let state = CoreState::open(config.clone()).unwrap();
            record_file(&state, "Persisted").uri
        };

        assert!(config.documents_dir().join("favorites").is_dir());
        assert!(config.device_key_path().exists());

        let reopened = CoreState::open(config).unwrap();
        let view = reopened.view().unwrap();
        assert_eq!(view.recent.len(), 1);
        assert_eq!(view.recent[0].uri, uri);
    }

    #[test]
    fn open_clears_staging_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let config = LibraryConfig::with_data_dir(dir.path());
        let staging = config.documents_dir().join(".staging");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("orphan.pdf"), b"half written").unwrap();

        CoreState::open(config).unwrap();
        assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[test]
    fn repeat_scan_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let state = memory_state(dir.path());
        assert!(state.accept_scan("https://example.com").unwrap());
        assert!(!state.accept_scan("https://example.com").unwrap());
        assert!(state.accept_scan("other").unwrap());
    }
}
