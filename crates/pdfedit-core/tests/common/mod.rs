//! Shared helpers for pdfedit-core integration tests

#![allow(dead_code)]

use pdfedit_core::ledger::initial_indices;
use pdfedit_core::{Ledger, PdfDocument};

#[path = "../../src/fixtures.rs"]
mod fixtures;

pub use fixtures::create_test_pdf;

/// Parsed document plus the ledger of a fresh upload
pub fn fresh_session(num_pages: u32) -> (PdfDocument, Ledger) {
    let doc = PdfDocument::load(create_test_pdf(num_pages)).unwrap();
    let ledger = Ledger::from_parts(
        &initial_indices(doc.page_count()),
        &doc.rotations().unwrap(),
    )
    .unwrap();
    (doc, ledger)
}
