//! Upload validation
//!
//! Checks that uploaded bytes are a PDF the edit engine can work with.

use crate::error::EditError;
use lopdf::Document;

/// Facts about an uploaded PDF, gathered while validating it
#[derive(Debug, Clone, Default)]
pub struct PdfInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    /// Whether the document is encrypted
    pub encrypted: bool,
    /// File size in bytes
    pub size_bytes: usize,
}

/// Parse the upload fully and make sure it has at least one page
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, EditError> {
    quick_validate(bytes)?;

    let version = extract_version(bytes);

    let document = Document::load_mem(bytes)
        .map_err(|e| EditError::InvalidUpload(format!("Failed to parse PDF: {}", e)))?;

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(EditError::InvalidUpload("PDF has no pages".to_string()));
    }

    Ok(PdfInfo {
        page_count,
        version,
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
    })
}

/// Cheap structural checks that need no parsing
pub fn quick_validate(bytes: &[u8]) -> Result<(), EditError> {
    if bytes.len() < 8 {
        return Err(EditError::InvalidUpload(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(EditError::InvalidUpload(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    // The EOF marker should be near the end
    let tail = if bytes.len() > 1024 {
        &bytes[bytes.len() - 1024..]
    } else {
        bytes
    };

    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(EditError::InvalidUpload(
            "PDF appears truncated (missing %%EOF marker)".to_string(),
        ));
    }

    Ok(())
}

/// Extract PDF version from header
fn extract_version(bytes: &[u8]) -> String {
    // Header format: %PDF-1.7
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}
