use super::LibraryError;

/// Extension appended to every user-supplied document name.
pub const PDF_EXTENSION: &str = ".pdf";

/// Longest accepted base name, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Turn a user-supplied base name into the stored file name.
///
/// The name is trimmed; an empty result, a path separator, a NUL byte,
/// a bare `.`/`..` or an over-long name is rejected with `InvalidName`.
/// Names are otherwise kept as typed, so duplicate checks compare what the
/// user sees.
pub fn final_pdf_name(name: &str) -> Result<String, LibraryError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.chars().count() > MAX_NAME_CHARS
        || trimmed.contains(['/', '\\', '\0'])
    {
        return Err(LibraryError::InvalidName);
    }
    Ok(format!("{trimmed}{PDF_EXTENSION}"))
}

/// Human-readable size, truncated to whole kilobytes.
pub fn format_size(bytes: u64) -> String {
    format!("{} KB", bytes / 1024)
}
