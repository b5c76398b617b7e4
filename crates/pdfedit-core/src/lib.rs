//! Page-level PDF edit sessions
//!
//! A session holds one uploaded PDF and a ledger recording, for every live
//! page, the page number it had at upload time and its current rotation.
//! Pages can be rotated, deleted and moved; document and ledger always
//! change together.
//!
//! Saving picks one of two strategies per operation:
//! - rotations are appended as an incremental update to the existing file
//! - deletes and moves regenerate the file from the new page sequence
//!
//! [`Editor`] is the entry point: it serializes the load/edit/persist cycle
//! per session and leaves sessions with different ids fully independent.

pub mod document;
pub mod editor;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod persist;
pub mod rotation;
pub mod store;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use document::PdfDocument;
pub use editor::{Editor, Export, PageListing};
pub use engine::{apply, EditOp, Outcome, SkipReason};
pub use error::EditError;
pub use ledger::{Ledger, PageRecord};
pub use locks::SessionLocks;
pub use persist::PersistMode;
pub use rotation::Rotation;
pub use store::{Session, SessionId, SessionStore, StoredContent};
pub use validation::{quick_validate, validate_pdf, PdfInfo};
