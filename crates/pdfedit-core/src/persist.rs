//! Persistence strategy
//!
//! Two ways to turn an edited [`PdfDocument`] back into bytes:
//!
//! - [`PersistMode::Incremental`]: the previous bytes are kept verbatim and
//!   an update section holding only the modified objects is appended. Only
//!   valid while page count and order are unchanged.
//! - [`PersistMode::FullRewrite`]: the file is regenerated from the current
//!   page sequence, dropping unreachable objects. Required after any delete
//!   or move.

use crate::document::PdfDocument;
use crate::error::EditError;
use lopdf::IncrementalDocument;
use std::fmt;
use tracing::debug;

/// Trailer keys describing the previous cross-reference section. They must
/// not leak into a trailer written for a new section.
const STALE_TRAILER_KEYS: [&[u8]; 8] = [
    b"Prev", b"XRefStm", b"Type", b"W", b"Index", b"Length", b"Filter", b"DecodeParms",
];

/// Trailer keys that identify an encrypted file
const ENCRYPTION_TRAILER_KEYS: [&[u8]; 2] = [b"Encrypt", b"ID"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    Incremental,
    FullRewrite,
}

impl fmt::Display for PersistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistMode::Incremental => write!(f, "incremental"),
            PersistMode::FullRewrite => write!(f, "full_rewrite"),
        }
    }
}

/// Serialize `doc` with the given mode
pub fn render(doc: &PdfDocument, mode: PersistMode) -> Result<Vec<u8>, EditError> {
    let bytes = match mode {
        PersistMode::Incremental => incremental_update(doc)?,
        PersistMode::FullRewrite => full_rewrite(doc)?,
    };
    debug!(
        "Rendered {} save: {} -> {} bytes",
        mode,
        doc.source_bytes().len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Append the touched objects to the previous bytes
fn incremental_update(doc: &PdfDocument) -> Result<Vec<u8>, EditError> {
    let prev = doc.inner().clone();
    let prev_trailer = prev.trailer.clone();
    let mut update = IncrementalDocument::create_from(doc.source_bytes().to_vec(), prev);

    for &id in doc.touched() {
        let object = doc.inner().get_object(id)?.clone();
        update.new_document.objects.insert(id, object);
    }

    let trailer = &mut update.new_document.trailer;
    for key in STALE_TRAILER_KEYS.iter().filter(|&&key| key != b"Prev") {
        trailer.remove(key);
    }
    // The appended section stays readable with the original key material
    for key in ENCRYPTION_TRAILER_KEYS {
        if let Ok(value) = prev_trailer.get(key) {
            trailer.set(key.to_vec(), value.clone());
        }
    }

    let mut buffer = Vec::new();
    update
        .save_to(&mut buffer)
        .map_err(|e| EditError::Pdf(format!("Incremental save failed: {}", e)))?;
    Ok(buffer)
}

/// Regenerate the whole file from the current page tree
fn full_rewrite(doc: &PdfDocument) -> Result<Vec<u8>, EditError> {
    let mut compacted = doc.inner().clone();
    for key in STALE_TRAILER_KEYS {
        compacted.trailer.remove(key);
    }

    compacted.prune_objects();
    // Stream data of an encrypted file is ciphertext; compressing it would
    // make it undecryptable.
    if !compacted.is_encrypted() {
        compacted.compress();
    }

    let mut buffer = Vec::new();
    compacted
        .save_to(&mut buffer)
        .map_err(|e| EditError::Pdf(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_encrypted_pdf, create_test_pdf};
    use crate::rotation::Rotation;
    use lopdf::{Document, ObjectId};

    /// Raw (undecoded) content stream bytes of every page, in page order
    fn raw_contents(doc: &Document) -> Vec<Vec<u8>> {
        doc.get_pages()
            .into_values()
            .map(|page_id: ObjectId| {
                let content_id = doc
                    .get_dictionary(page_id)
                    .unwrap()
                    .get(b"Contents")
                    .unwrap()
                    .as_reference()
                    .unwrap();
                let stream = doc.get_object(content_id).unwrap().as_stream().unwrap();
                assert!(!stream.dict.has(b"Filter"));
                stream.content.clone()
            })
            .collect()
    }

    fn assert_encryption_kept(doc: &Document, original: &Document) {
        assert!(doc.is_encrypted());
        assert_eq!(
            doc.get_encrypted().unwrap(),
            original.get_encrypted().unwrap()
        );
        assert_eq!(
            doc.trailer.get(b"ID").unwrap(),
            original.trailer.get(b"ID").unwrap()
        );
    }

    #[test]
    fn test_incremental_keeps_previous_bytes_as_prefix() {
        let original = create_test_pdf(3);
        let mut doc = PdfDocument::load(original.clone()).unwrap();
        doc.set_rotation(1, Rotation::from_degrees(90)).unwrap();

        let saved = render(&doc, PersistMode::Incremental).unwrap();
        assert!(saved.len() > original.len());
        assert_eq!(&saved[..original.len()], original.as_slice());
    }

    #[test]
    fn test_incremental_update_is_readable() {
        let mut doc = PdfDocument::load(create_test_pdf(3)).unwrap();
        doc.set_rotation(2, Rotation::from_degrees(270)).unwrap();

        let saved = render(&doc, PersistMode::Incremental).unwrap();
        let reloaded = PdfDocument::load(saved).unwrap();
        assert_eq!(reloaded.page_count(), 3);
        assert_eq!(reloaded.rotation(2).unwrap().degrees(), 270);
        assert_eq!(reloaded.rotation(0).unwrap(), Rotation::NONE);
    }

    #[test]
    fn test_full_rewrite_drops_deleted_page() {
        let mut doc = PdfDocument::load(create_test_pdf(4)).unwrap();
        let ids = doc.page_ids();
        doc.select(&[ids[0], ids[2], ids[3]]).unwrap();

        let saved = render(&doc, PersistMode::FullRewrite).unwrap();
        let reloaded = Document::load_mem(&saved).unwrap();
        assert_eq!(reloaded.get_pages().len(), 3);
        assert!(!reloaded.objects.contains_key(&ids[1]));
    }

    #[test]
    fn test_full_rewrite_after_incremental_update() {
        let mut doc = PdfDocument::load(create_test_pdf(3)).unwrap();
        doc.set_rotation(0, Rotation::from_degrees(90)).unwrap();
        let rotated = render(&doc, PersistMode::Incremental).unwrap();

        let mut doc = PdfDocument::load(rotated).unwrap();
        let ids = doc.page_ids();
        doc.select(&[ids[1], ids[2], ids[0]]).unwrap();
        let rewritten = render(&doc, PersistMode::FullRewrite).unwrap();

        let reloaded = PdfDocument::load(rewritten).unwrap();
        let degrees: Vec<u16> = reloaded
            .rotations()
            .unwrap()
            .iter()
            .map(|r| r.degrees())
            .collect();
        assert_eq!(degrees, vec![0, 0, 90]);
    }

    #[test]
    fn test_persist_mode_display() {
        assert_eq!(PersistMode::Incremental.to_string(), "incremental");
        assert_eq!(PersistMode::FullRewrite.to_string(), "full_rewrite");
    }

    #[test]
    fn test_incremental_keeps_encryption_entries() {
        let source = create_encrypted_pdf(3);
        let original = Document::load_mem(&source).unwrap();
        let mut doc = PdfDocument::load(source).unwrap();
        assert!(doc.is_encrypted());
        doc.set_rotation(0, Rotation::from_degrees(90)).unwrap();

        let saved = render(&doc, PersistMode::Incremental).unwrap();
        let reloaded = Document::load_mem(&saved).unwrap();

        assert_encryption_kept(&reloaded, &original);
        assert_eq!(raw_contents(&reloaded), raw_contents(&original));
    }

    #[test]
    fn test_full_rewrite_keeps_encryption_and_skips_compression() {
        let source = create_encrypted_pdf(3);
        let original = Document::load_mem(&source).unwrap();
        let before = raw_contents(&original);

        let mut doc = PdfDocument::load(source).unwrap();
        let ids = doc.page_ids();
        doc.select(&[ids[2], ids[0]]).unwrap();

        let saved = render(&doc, PersistMode::FullRewrite).unwrap();
        let reloaded = Document::load_mem(&saved).unwrap();

        assert_encryption_kept(&reloaded, &original);
        assert_eq!(reloaded.get_pages().len(), 2);
        assert_eq!(raw_contents(&reloaded), vec![before[2].clone(), before[0].clone()]);
    }

    #[test]
    fn test_encryption_survives_rotate_then_move() {
        let source = create_encrypted_pdf(3);
        let original = Document::load_mem(&source).unwrap();

        let mut doc = PdfDocument::load(source).unwrap();
        doc.set_rotation(1, Rotation::from_degrees(180)).unwrap();
        let rotated = render(&doc, PersistMode::Incremental).unwrap();

        let mut doc = PdfDocument::load(rotated).unwrap();
        let ids = doc.page_ids();
        doc.select(&[ids[1], ids[0], ids[2]]).unwrap();
        let moved = render(&doc, PersistMode::FullRewrite).unwrap();

        let reloaded = Document::load_mem(&moved).unwrap();
        assert_encryption_kept(&reloaded, &original);
        let reloaded = PdfDocument::load(moved).unwrap();
        assert_eq!(reloaded.rotation(0).unwrap().degrees(), 180);
    }
}
