//! QR generation and scan handling commands.

use serde::{Deserialize, Serialize};

use crate::core_state::CoreState;
use crate::qr::{qr_for_input, scanned_link};

/// QR code data returned for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrCodeData {
    /// The normalised URL actually encoded.
    pub url: String,
    pub svg: String,
}

/// A scan that passed debouncing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub data: String,
    /// Link to open in the browser.
    pub link: String,
}

pub fn generate_qr_code(input: String) -> Result<QrCodeData, String> {
    let (url, svg) = qr_for_input(&input).map_err(|e| e.to_string())?;
    Ok(QrCodeData { url, svg })
}

/// Handle a decoded camera scan. `None` when the same code was just seen.
pub fn handle_scan(state: &CoreState, data: String) -> Result<Option<ScanResult>, String> {
    if !state.accept_scan(&data).map_err(|e| e.to_string())? {
        return Ok(None);
    }
    let link = scanned_link(&data);
    tracing::debug!(link = %link, "Scan accepted");
    Ok(Some(ScanResult { data, link }))
}
