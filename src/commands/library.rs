//! Document library commands: load, produce, favourite, open, delete.
//!
//! Each mutating command republishes the `LibraryView` before returning.

use std::sync::Arc;

use crate::core_state::{CoreState, LibraryView};
use crate::library::{DeleteAllReport, DocumentRecord, FavouriteToggle};
use crate::producer::ImageSource;

/// Prune entries whose file vanished, then publish a fresh view.
/// Called when the home screen comes into focus.
pub async fn load_library(state: &Arc<CoreState>) -> Result<LibraryView, String> {
    super::run_blocking(state, |state| {
        let dropped = state.library().prune_recent()?;
        if dropped > 0 {
            tracing::debug!(dropped, "Recent list pruned on load");
        }
        state.refresh_view()
    })
    .await
}

/// Cached view, without touching storage.
pub fn get_library_view(state: &CoreState) -> Result<LibraryView, String> {
    state.view().map_err(|e| e.to_string())
}

/// Render the images at `image_uris` (in order) into `<name>.pdf`.
pub async fn create_pdf_from_images(
    state: &Arc<CoreState>,
    name: String,
    image_uris: Vec<String>,
) -> Result<DocumentRecord, String> {
    let images: Vec<ImageSource> = image_uris.iter().map(|u| ImageSource::from_uri(u)).collect();

    super::run_blocking(state, move |state| {
        let record = state
            .library()
            .produce_document(&name, &images, state.producer())?;
        state.refresh_view()?;
        Ok(record)
    })
    .await
}

pub fn toggle_favourite(
    state: &CoreState,
    record: DocumentRecord,
) -> Result<FavouriteToggle, String> {
    let outcome = state
        .library()
        .toggle_favourite(&record)
        .map_err(|e| e.to_string())?;
    state.refresh_view().map_err(|e| e.to_string())?;
    Ok(outcome)
}

pub fn remove_favourite(state: &CoreState, uri: String) -> Result<bool, String> {
    let removed = state
        .library()
        .remove_favourite(&uri)
        .map_err(|e| e.to_string())?;
    state.refresh_view().map_err(|e| e.to_string())?;
    Ok(removed)
}

/// Filesystem path for the viewer. Errors with "File not found" when the
/// document is gone.
pub fn open_document(state: &CoreState, uri: String) -> Result<String, String> {
    state
        .library()
        .open_document(&uri)
        .map(|path| path.to_string_lossy().into_owned())
        .map_err(|e| e.to_string())
}

pub async fn delete_document(
    state: &Arc<CoreState>,
    record: DocumentRecord,
) -> Result<(), String> {
    super::run_blocking(state, move |state| {
        state.library().delete_document(&record)?;
        state.refresh_view()?;
        Ok(())
    })
    .await
}

pub async fn delete_all_documents(state: &Arc<CoreState>) -> Result<DeleteAllReport, String> {
    super::run_blocking(state, |state| {
        let report = state.library().delete_all()?;
        state.refresh_view()?;
        Ok(report)
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

    use super::*;
    use crate::commands::test_support::state_in;

    fn write_png(dir: &std::path::Path, name: &str) -> String {
        let img = RgbImage::from_pixel(40, 30, Rgb([10u8, 200, 30]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        let path = dir.join(name);
        std::fs::write(&path, buf).unwrap();
        format!("file://{}", path.display())
    }

    #[tokio::test]
    async fn create_pdf_records_and_refreshes_view() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let images = vec![write_png(dir.path(), "a.png"), write_png(dir.path(), "b.png")];

        let record = create_pdf_from_images(&state, "Scan".into(), images)
            .await
            .unwrap();

        assert_eq!(record.name, "Scan.pdf");
        assert_eq!(record.pages, Some(2));
        assert!(record.thumbnail.is_some());
        let bytes = std::fs::read(&record.uri).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(get_library_view(&state).unwrap().recent, vec![record]);
    }

    #[tokio::test]
    async fn duplicate_name_is_reported_as_message() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let image = write_png(dir.path(), "a.png");

        create_pdf_from_images(&state, "Twice".into(), vec![image.clone()])
            .await
            .unwrap();
        let err = create_pdf_from_images(&state, "Twice".into(), vec![image])
            .await
            .unwrap_err();

        assert_eq!(err, "A PDF named Twice.pdf already exists");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let err = create_pdf_from_images(&state, "  ".into(), vec![write_png(dir.path(), "a.png")])
            .await
            .unwrap_err();
        assert_eq!(err, "Please enter a valid PDF name");
    }

    #[tokio::test]
    async fn unreadable_image_fails_without_recording() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let bogus = dir.path().join("bogus.jpg");
        std::fs::write(&bogus, b"not an image").unwrap();

        let err = create_pdf_from_images(&state, "Bad".into(), vec![bogus.display().to_string()])
            .await
            .unwrap_err();

        assert!(err.starts_with("Could not create PDF"));
        assert!(load_library(&state).await.unwrap().recent.is_empty());
    }

    #[tokio::test]
    async fn favourite_and_delete_flow() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let record = create_pdf_from_images(&state, "Fav".into(), vec![write_png(dir.path(), "a.png")])
            .await
            .unwrap();

        assert_eq!(toggle_favourite(&state, record.clone()).unwrap(), FavouriteToggle::Added);
        assert!(get_library_view(&state).unwrap().is_favourite(&record.uri));
        assert!(open_document(&state, record.uri.clone()).is_ok());

        delete_document(&state, record.clone()).await.unwrap();

        let view = get_library_view(&state).unwrap();
        assert!(view.recent.is_empty());
        assert!(view.favourites.is_empty());
        assert_eq!(
            open_document(&state, record.uri.clone()).unwrap_err(),
            format!("File not found: {}", record.uri)
        );
    }

    #[tokio::test]
    async fn remove_favourite_updates_view() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let record = create_pdf_from_images(&state, "R".into(), vec![write_png(dir.path(), "a.png")])
            .await
            .unwrap();
        toggle_favourite(&state, record.clone()).unwrap();

        assert!(remove_favourite(&state, record.uri.clone()).unwrap());
        assert!(get_library_view(&state).unwrap().favourites.is_empty());
        assert!(!remove_favourite(&state, record.uri).unwrap());
    }

    #[tokio::test]
    async fn load_library_prunes_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let record = create_pdf_from_images(&state, "Gone".into(), vec![write_png(dir.path(), "a.png")])
            .await
            .unwrap();
        std::fs::remove_file(&record.uri).unwrap();

        let view = load_library(&state).await.unwrap();
        assert!(view.recent.is_empty());
    }

    #[tokio::test]
    async fn delete_all_empties_view() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        for name in ["One", "Two"] {
            let record = create_pdf_from_images(&state, name.into(), vec![write_png(dir.path(), "a.png")])
                .await
                .unwrap();
            toggle_favourite(&state, record).unwrap();
        }

        let report = delete_all_documents(&state).await.unwrap();

        assert_eq!(report.deleted, 2);
        assert!(report.is_complete());
        assert_eq!(get_library_view(&state).unwrap(), LibraryView::default());
    }
}
