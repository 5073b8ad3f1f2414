use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::config::{FAVOURITES_KEY, RECENT_KEY};
use crate::files::{path_to_uri, uri_to_path, FileStore};
use crate::producer::{DocumentProducer, ImageSource, ProducedDocument};
use crate::store::KeyValueStore;

use super::naming::{final_pdf_name, format_size};
use super::record::{
    decode_list, encode_list, insert_recent, DeleteAllReport, DocumentRecord, FavouriteToggle,
};
use super::LibraryError;

// ═══════════════════════════════════════════════════════════
// DocumentLibrary
// ═══════════════════════════════════════════════════════════

/// Owner of the recent and favourite lists.
///
/// Every mutating operation holds `guard` for its whole read-modify-write,
/// including slow steps (rendering, moving files), so two mutations never
/// interleave against the same keys. Reads skip the guard.
pub struct DocumentLibrary<K, F> {
    kv: K,
    files: F,
    capacity: usize,
    guard: Mutex<()>,
}

/// A name that passed validation and duplicate checks, with the pruned
/// recent list it was checked against.
struct NameClaim {
    final_name: String,
    destination: PathBuf,
    recent: Vec<DocumentRecord>,
}

impl<K: KeyValueStore, F: FileStore> DocumentLibrary<K, F> {
    pub fn new(kv: K, files: F, capacity: usize) -> Self {
        Self {
            kv,
            files,
            capacity: capacity.max(1),
            guard: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, LibraryError> {
        self.guard.lock().map_err(|_| LibraryError::LockPoisoned)
    }

    // ── Reads ───────────────────────────────────────────────

    /// Recent documents, newest first. Unreadable content reads as empty.
    pub fn list_recent(&self) -> Result<Vec<DocumentRecord>, LibraryError> {
        self.load_list(RECENT_KEY)
    }

    /// Favourite documents, most recently promoted first.
    pub fn list_favourites(&self) -> Result<Vec<DocumentRecord>, LibraryError> {
        self.load_list(FAVOURITES_KEY)
    }

    pub fn is_favourite(&self, uri: &str) -> Result<bool, LibraryError> {
        Ok(self.list_favourites()?.iter().any(|f| f.uri == uri))
    }

    /// Resolve a document for viewing. Fails with `FileNotFound` if the
    /// backing file is gone.
    pub fn open_document(&self, uri: &str) -> Result<PathBuf, LibraryError> {
        if !self.files.exists(uri) {
            tracing::warn!(uri = %uri, "Document file missing on open");
            return Err(LibraryError::FileNotFound(uri.to_string()));
        }
        Ok(uri_to_path(uri))
    }

    fn load_list(&self, key: &str) -> Result<Vec<DocumentRecord>, LibraryError> {
        let Some(raw) = self.kv.get(key)? else {
            return Ok(Vec::new());
        };
        match decode_list(key, &raw) {
            Ok(list) => Ok(list),
            Err(e @ LibraryError::StorageCorrupt { .. }) => {
                tracing::warn!("{e}; treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn save_list(&self, key: &str, list: &[DocumentRecord]) -> Result<(), LibraryError> {
        self.kv.set(key, &encode_list(list)?)?;
        Ok(())
    }

    // ── Recording ───────────────────────────────────────────

    /// Validate `name` against the live library without recording anything.
    /// Returns the final file name (`<name>.pdf`).
    pub fn check_name(&self, name: &str) -> Result<String, LibraryError> {
        let _guard = self.lock()?;
        Ok(self.claim_name(name)?.final_name)
    }

    /// Record a PDF produced at `source_uri` under the user-supplied `name`.
    ///
    /// The file is moved to `<document-root>/<name>.pdf` and a record is
    /// prepended to the recent list. Fails with `InvalidName` or
    /// `DuplicateName` before touching the file. If the record cannot be
    /// persisted the file is moved back to `source_uri`.
    pub fn record_produced(
        &self,
        name: &str,
        source_uri: &str,
    ) -> Result<DocumentRecord, LibraryError> {
        let _guard = self.lock()?;
        let claim = self.claim_name(name)?;

        let source = uri_to_path(source_uri);
        if !source.exists() {
            return Err(LibraryError::FileNotFound(source_uri.to_string()));
        }

        self.files.move_into(&source, &claim.destination)?;
        let destination = claim.destination.clone();
        self.commit(claim, None, None).inspect_err(|e| {
            tracing::warn!(dest = %destination.display(), "Recording failed, returning file: {e}");
            if let Err(undo) = self.files.move_into(&destination, &source) {
                tracing::warn!(dest = %destination.display(), "File not returned to source: {undo}");
            }
        })
    }

    /// Render `images` with `producer` and record the result as `name`.
    ///
    /// The name is checked before rendering. On any failure after the render
    /// the rendered file and its thumbnail are removed and both lists are
    /// left untouched.
    pub fn produce_document<P>(
        &self,
        name: &str,
        images: &[ImageSource],
        producer: &P,
    ) -> Result<DocumentRecord, LibraryError>
    where
        P: DocumentProducer + ?Sized,
    {
        let _guard = self.lock()?;
        let claim = self.claim_name(name)?;

        let staging = self.files.staging_dir()?;
        let ProducedDocument {
            path,
            pages,
            thumbnail_png,
        } = producer.render(images, &staging)?;

        if let Err(e) = self.files.move_into(&path, &claim.destination) {
            let _ = self.files.delete(&path_to_uri(&path));
            return Err(e.into());
        }

        let thumbnail = thumbnail_png.and_then(|png| self.write_thumbnail(&claim.final_name, &png));
        let destination = path_to_uri(&claim.destination);
        self.commit(claim, Some(pages), thumbnail.clone())
            .inspect_err(|e| {
                tracing::warn!(dest = %destination, "Recording failed, removing output: {e}");
                for uri in std::iter::once(&destination).chain(thumbnail.as_ref()) {
                    if let Err(undo) = self.files.delete(uri) {
                        tracing::warn!(uri = %uri, "Output not removed: {undo}");
                    }
                }
            })
    }

    /// Trim, validate, prune and check for duplicates.
    /// Caller must hold the guard.
    fn claim_name(&self, name: &str) -> Result<NameClaim, LibraryError> {
        let final_name = final_pdf_name(name)?;
        let destination = self.files.document_path(&final_name);

        let (recent, _) = self.prune_locked(true)?;

        let file_exists = self.files.exists(&path_to_uri(&destination));
        let name_taken = recent.iter().any(|r| r.name == final_name);
        if file_exists || name_taken {
            tracing::info!(
                name = %final_name,
                file_exists,
                name_taken,
                "Rejected duplicate document name"
            );
            return Err(LibraryError::DuplicateName(final_name));
        }

        Ok(NameClaim {
            final_name,
            destination,
            recent,
        })
    }

    /// Build the record for a file already at `claim.destination` and
    /// publish it at the front of the recent list.
    fn commit(
        &self,
        claim: NameClaim,
        pages: Option<u32>,
        thumbnail: Option<String>,
    ) -> Result<DocumentRecord, LibraryError> {
        let uri = path_to_uri(&claim.destination);
        let size = self
            .files
            .size(&uri)
            .map(format_size)
            .unwrap_or_else(|_| format_size(0));

        let record = DocumentRecord {
            name: claim.final_name,
            uri,
            date: Utc::now().to_rfc3339(),
            size: Some(size),
            pages,
            thumbnail,
        };

        let recent = insert_recent(claim.recent, record.clone(), self.capacity);
        self.save_list(RECENT_KEY, &recent)?;

        tracing::info!(
            name = %record.name,
            pages = ?record.pages,
            recent = recent.len(),
            "Document recorded"
        );
        Ok(record)
    }

    fn write_thumbnail(&self, final_name: &str, png: &[u8]) -> Option<String> {
        let written = self.files.thumbnails_dir().and_then(|dir| {
            let path = dir.join(format!("{final_name}.png"));
            std::fs::write(&path, png).map(|_| path)
        });
        match written {
            Ok(path) => Some(path_to_uri(&path)),
            Err(e) => {
                tracing::warn!(name = %final_name, "Thumbnail not saved: {e}");
                None
            }
        }
    }

    // ── Pruning ─────────────────────────────────────────────

    /// Drop recent entries whose backing file no longer exists.
    /// Returns how many were dropped.
    pub fn prune_recent(&self) -> Result<usize, LibraryError> {
        let _guard = self.lock()?;
        let (_, dropped) = self.prune_locked(false)?;
        Ok(dropped)
    }

    /// Caller must hold the guard. With `always_persist`, the pruned list is
    /// written even when nothing was dropped, which also replaces unreadable
    /// stored content.
    fn prune_locked(
        &self,
        always_persist: bool,
    ) -> Result<(Vec<DocumentRecord>, usize), LibraryError> {
        let (live, missing): (Vec<DocumentRecord>, Vec<DocumentRecord>) = self
            .list_recent()?
            .into_iter()
            .partition(|r| self.files.exists(&r.uri));
        let dropped = missing.len();
        for record in &missing {
            self.delete_thumbnail(record);
        }

        if dropped > 0 || always_persist {
            self.save_list(RECENT_KEY, &live)?;
        }
        if dropped > 0 {
            tracing::info!(dropped, remaining = live.len(), "Pruned missing documents from recent list");
        }
        Ok((live, dropped))
    }

    // ── Favourites ──────────────────────────────────────────

    /// Add `record` to favourites, or remove it if a favourite with the same
    /// uri exists.
    pub fn toggle_favourite(
        &self,
        record: &DocumentRecord,
    ) -> Result<FavouriteToggle, LibraryError> {
        let _guard = self.lock()?;
        let mut favourites = self.list_favourites()?;

        let outcome = if favourites.iter().any(|f| f.uri == record.uri) {
            favourites.retain(|f| f.uri != record.uri);
            FavouriteToggle::Removed
        } else {
            favourites.insert(0, record.clone());
            FavouriteToggle::Added
        };

        self.save_list(FAVOURITES_KEY, &favourites)?;
        tracing::debug!(uri = %record.uri, outcome = ?outcome, "Favourite toggled");
        Ok(outcome)
    }

    /// Remove the favourite with `uri`. Returns whether one was removed.
    pub fn remove_favourite(&self, uri: &str) -> Result<bool, LibraryError> {
        let _guard = self.lock()?;
        let mut favourites = self.list_favourites()?;
        let before = favourites.len();
        favourites.retain(|f| f.uri != uri);
        if favourites.len() == before {
            return Ok(false);
        }
        self.save_list(FAVOURITES_KEY, &favourites)?;
        Ok(true)
    }

    // ── Deletion ────────────────────────────────────────────

    /// Delete the document's file, then drop it from both lists.
    ///
    /// If the file cannot be deleted neither list changes. Deleting a
    /// document whose file is already gone succeeds.
    pub fn delete_document(&self, record: &DocumentRecord) -> Result<(), LibraryError> {
        let _guard = self.lock()?;

        self.files.delete(&record.uri)?;
        self.delete_thumbnail(record);

        let mut recent = self.list_recent()?;
        let recent_before = recent.len();
        recent.retain(|r| r.uri != record.uri);
        if recent.len() != recent_before {
            self.save_list(RECENT_KEY, &recent)?;
        }

        let mut favourites = self.list_favourites()?;
        let favourites_before = favourites.len();
        favourites.retain(|f| f.uri != record.uri);
        if favourites.len() != favourites_before {
            self.save_list(FAVOURITES_KEY, &favourites)?;
        }

        tracing::info!(name = %record.name, "Document deleted");
        Ok(())
    }

    /// Delete every file in the recent list and reset both lists.
    ///
    /// Best effort per file: a record whose file could not be deleted stays
    /// in the recent list and is reported. Favourites are always cleared.
    pub fn delete_all(&self) -> Result<DeleteAllReport, LibraryError> {
        let _guard = self.lock()?;
        let recent = self.list_recent()?;

        let mut report = DeleteAllReport::default();
        for record in recent {
            match self.files.delete(&record.uri) {
                Ok(()) => {
                    self.delete_thumbnail(&record);
                    report.deleted += 1;
                }
                Err(e) => {
                    tracing::warn!(name = %record.name, "Delete failed, keeping record: {e}");
                    report.failed.push(record);
                }
            }
        }

        if report.failed.is_empty() {
            self.kv.multi_remove(&[RECENT_KEY, FAVOURITES_KEY])?;
        } else {
            self.save_list(RECENT_KEY, &report.failed)?;
            self.kv.remove(FAVOURITES_KEY)?;
        }

        tracing::info!(
            deleted = report.deleted,
            failed = report.failed.len(),
            "Library cleared"
        );
        Ok(report)
    }

    fn delete_thumbnail(&self, record: &DocumentRecord) {
        if let Some(thumb) = record.thumbnail.as_deref() {
            if let Err(e) = self.files.delete(thumb) {
                tracing::warn!(name = %record.name, "Thumbnail not deleted: {e}");
            }
        }
    }
}
