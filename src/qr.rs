//! QR helpers: URL normalisation for generation, SVG rendering, and
//! handling of decoded camera scans.
//!
//! Decoding itself happens in the platform camera layer; this module only
//! sees the decoded string.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use thiserror::Error;

/// Same value scanned again within this window is ignored.
pub const SCAN_DEBOUNCE: Duration = Duration::from_millis(2000);

pub const QR_MIN_PX: u32 = 200;
pub const QR_MAX_PX: u32 = 300;

const DARK_COLOR: &str = "#1c1917";
const LIGHT_COLOR: &str = "#ffffff";

/// Domain with TLD, `localhost` or dotted IPv4, then optional port, path,
/// query and fragment.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(https?://)?((([a-z0-9]([a-z0-9-]*[a-z0-9])*)\.)+[a-z]{2,}|localhost|[0-9]{1,3}(\.[0-9]{1,3}){3})(:[0-9]+)?(/[-a-z0-9%_.~+]*)*(\?[;&a-z0-9%_.~+=-]*)?(#[-a-z0-9_]*)?$",
    )
    .unwrap()
});

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QrError {
    #[error("Please enter a URL")]
    MissingUrl,

    #[error("Please enter a valid URL: {0}")]
    InvalidUrl(String),

    #[error("QR generation failed: {0}")]
    Generation(String),
}

// ═══════════════════════════════════════════════════════════
// Generation
// ═══════════════════════════════════════════════════════════

/// Trim, add `https://` when no scheme is given, and validate.
pub fn normalize_url(input: &str) -> Result<String, QrError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(QrError::MissingUrl);
    }

    let lower = trimmed.to_ascii_lowercase();
    let url = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    if !URL_PATTERN.is_match(&url) {
        return Err(QrError::InvalidUrl(trimmed.to_string()));
    }
    Ok(url)
}

/// Render `url` as an SVG QR code.
pub fn generate_qr_svg(url: &str) -> Result<String, QrError> {
    use qrcode::render::svg;
    use qrcode::QrCode;

    let code = QrCode::new(url.as_bytes()).map_err(|e| QrError::Generation(e.to_string()))?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_PX, QR_MIN_PX)
        .max_dimensions(QR_MAX_PX, QR_MAX_PX)
        .dark_color(svg::Color(DARK_COLOR))
        .light_color(svg::Color(LIGHT_COLOR))
        .quiet_zone(true)
        .build())
}

/// Normalise and render in one step.
pub fn qr_for_input(input: &str) -> Result<(String, String), QrError> {
    let url = normalize_url(input)?;
    let svg = generate_qr_svg(&url)?;
    tracing::debug!(url = %url, "QR code generated");
    Ok((url, svg))
}

// ═══════════════════════════════════════════════════════════
// Scanning
// ═══════════════════════════════════════════════════════════

/// Link to open for a decoded scan. Anything not already starting with
/// `http` gets an `https://` prefix.
pub fn scanned_link(data: &str) -> String {
    let data = data.trim();
    if data.starts_with("http") {
        data.to_string()
    } else {
        format!("https://{data}")
    }
}

/// Suppresses repeat scans of the same code while it stays in view.
#[derive(Debug)]
pub struct ScanDebouncer {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl ScanDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether `value` should be handled now.
    pub fn accept(&mut self, value: &str) -> bool {
        self.accept_at(value, Instant::now())
    }

    pub fn accept_at(&mut self, value: &str, now: Instant) -> bool {
        if let Some((last_value, at)) = &self.last {
            if last_value == value && now.saturating_duration_since(*at) < self.window {
                return false;
            }
        }
        self.last = Some((value.to_string(), now));
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for ScanDebouncer {
    fn default() -> Self {
        Self::new(SCAN_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- URL normalisation ----------------------------------------------------

    #[test]
    fn bare_domain_gets_https() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
    }

    #[test]
    fn existing_scheme_is_kept() {
        assert_eq!(
            normalize_url("  http://example.com/a?b=1#top ").unwrap(),
            "http://example.com/a?b=1#top"
        );
        assert_eq!(normalize_url("HTTPS://Example.COM").unwrap(), "HTTPS://Example.COM");
    }

    #[test]
    fn localhost_and_ipv4_are_accepted() {
        assert_eq!(
            normalize_url("localhost:8080/x").unwrap(),
            "https://localhost:8080/x"
        );
        assert_eq!(normalize_url("192.168.0.1").unwrap(), "https://192.168.0.1");
    }

    #[test]
    fn empty_input_is_missing() {
        assert_eq!(normalize_url("   "), Err(QrError::MissingUrl));
    }

    #[test]
    fn malformed_input_is_invalid() {
        for input in ["not a url", "example", "http://", "exa mple.com", "-bad.com"] {
            assert!(
                matches!(normalize_url(input), Err(QrError::InvalidUrl(_))),
                "{input:?} should be rejected"
            );
        }
    }

    // -- SVG rendering --------------------------------------------------------

    #[test]
    fn generates_svg() {
        let svg = generate_qr_svg("https://example.com").unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
        assert!(svg.contains(DARK_COLOR));
    }

    #[test]
    fn qr_for_input_returns_normalised_url() {
        let (url, svg) = qr_for_input("example.org/page").unwrap();
        assert_eq!(url, "https://example.org/page");
        assert!(svg.starts_with("<?xml") || svg.starts_with("<svg"));
    }

    // -- Scans ----------------------------------------------------------------

    #[test]
    fn scanned_link_prefixes_non_http() {
        assert_eq!(scanned_link("example.com"), "https://example.com");
        assert_eq!(scanned_link("http://a.b"), "http://a.b");
        assert_eq!(scanned_link("https://a.b"), "https://a.b");
    }

    #[test]
    fn same_value_is_suppressed_within_window() {
        let mut debouncer = ScanDebouncer::default();
        let t0 = Instant::now();
        assert!(debouncer.accept_at("abc", t0));
        assert!(!debouncer.accept_at("abc", t0 + Duration::from_millis(500)));
        assert!(!debouncer.accept_at("abc", t0 + Duration::from_millis(1999)));
        assert!(debouncer.accept_at("abc", t0 + Duration::from_millis(2000)));
    }

    #[test]
    fn new_value_is_accepted_immediately() {
        let mut debouncer = ScanDebouncer::default();
        let t0 = Instant::now();
        assert!(debouncer.accept_at("first", t0));
        assert!(debouncer.accept_at("second", t0 + Duration::from_millis(10)));
        assert!(debouncer.accept_at("first", t0 + Duration::from_millis(20)));
    }

    #[test]
    fn reset_forgets_last_scan() {
        let mut debouncer = ScanDebouncer::default();
        assert!(debouncer.accept("abc"));
        debouncer.reset();
        assert!(debouncer.accept("abc"));
    }
}
