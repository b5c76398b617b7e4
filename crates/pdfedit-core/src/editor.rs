//! Editor: store, locks and edit engine behind one entry point
//!
//! Every operation that reads or writes a session runs inside that
//! session's lock, so a mutation's load/mutate/persist cycle is never
//! interleaved with another request for the same id.

use crate::engine::{self, EditOp, Outcome};
use crate::error::EditError;
use crate::ledger::PageRecord;
use crate::locks::SessionLocks;
use crate::store::{download_name, SessionId, SessionStore};
use std::path::PathBuf;
use tracing::{info, warn};

/// Read-only projection of a session for the page listing
#[derive(Debug, Clone)]
pub struct PageListing {
    pub filename: String,
    pub pages: Vec<PageRecord>,
}

/// Current content of a session, ready for download
#[derive(Debug, Clone)]
pub struct Export {
    pub bytes: Vec<u8>,
    pub download_name: String,
    /// Revision the bytes belong to
    pub revision: u64,
}

#[derive(Debug)]
pub struct Editor {
    store: SessionStore,
    locks: SessionLocks,
}

impl Editor {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            locks: SessionLocks::new(),
        }
    }

    /// Editor over a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, EditError> {
        Ok(Self::new(SessionStore::open(root)?))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn upload(&self, bytes: &[u8], filename: &str) -> Result<SessionId, EditError> {
        self.store.create(bytes, filename)
    }

    pub fn pages(&self, id: &SessionId) -> Result<PageListing, EditError> {
        self.locks.with(id, || {
            let session = self.store.load(id)?;
            Ok(PageListing {
                filename: session.filename,
                pages: session.ledger.records().to_vec(),
            })
        })
    }

    /// Load, edit and persist a session as one unit
    pub fn apply(&self, id: &SessionId, op: EditOp) -> Result<Outcome, EditError> {
        self.locks.with(id, || {
            let mut session = self.store.load(id)?;
            let outcome = engine::apply(&mut session.document, &mut session.ledger, op)?;

            match outcome {
                Outcome::Applied(mode) => {
                    self.store.replace(&mut session, mode)?;
                    info!(
                        "Session {}: applied {} ({} save, {} pages)",
                        id,
                        op,
                        mode,
                        session.ledger.len()
                    );
                }
                Outcome::Skipped(reason) => {
                    warn!("Session {}: skipped {}: {}", id, op, reason);
                }
            }
            Ok(outcome)
        })
    }

    pub fn export(&self, id: &SessionId) -> Result<Export, EditError> {
        self.locks.with(id, || {
            let content = self.store.read_content(id)?;
            Ok(Export {
                bytes: content.bytes,
                download_name: download_name(&content.filename),
                revision: content.revision,
            })
        })
    }

    pub fn destroy(&self, id: &SessionId) -> Result<(), EditError> {
        self.locks.with(id, || self.store.destroy(id))
    }

    /// Destroy the session after a download of `revision`.
    ///
    /// An edit committed since the export keeps the session alive; `false`
    /// is returned in that case.
    pub fn destroy_if_revision(&self, id: &SessionId, revision: u64) -> Result<bool, EditError> {
        self.locks.with(id, || {
            let destroyed = self.store.destroy_if_revision(id, revision)?;
            if !destroyed {
                warn!(
                    "Session {}: kept after download, revision {} is no longer current",
                    id, revision
                );
            }
            Ok(destroyed)
        })
    }
}
