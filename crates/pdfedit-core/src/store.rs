//! Session store
//!
//! Each session owns two artifacts in the store directory:
//!
//! - `<id>.json`: metadata (original filename, original page numbers in
//!   current order, current revision)
//! - `<id>.<revision>.pdf`: the document content of that revision
//!
//! A replace writes the next revision's content next to the current one and
//! then swaps in new metadata pointing at it. The metadata rename is the
//! commit point, so readers following the metadata always see content and
//! ledger from the same revision.

use crate::document::PdfDocument;
use crate::error::EditError;
use crate::ledger::{initial_indices, Ledger};
use crate::persist::{self, PersistMode};
use crate::validation::validate_pdf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Opaque session identifier: 32 lowercase hex digits of a random UUID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().simple().to_string())
    }

    /// Anything that is not a well-formed id cannot name a session
    pub fn parse(raw: &str) -> Result<Self, EditError> {
        let well_formed = raw.len() == 32
            && raw
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if well_formed {
            Ok(SessionId(raw.to_string()))
        } else {
            Err(EditError::NotFound(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionId::parse(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Metadata {
    filename: String,
    pages: Vec<u32>,
    #[serde(default)]
    revision: u64,
}

/// A loaded session: document and ledger in lockstep
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    /// Original filename without extension
    pub filename: String,
    pub document: PdfDocument,
    pub ledger: Ledger,
    revision: u64,
}

impl Session {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn download_name(&self) -> String {
        download_name(&self.filename)
    }
}

/// Current content of a session as stored on disk
#[derive(Debug, Clone)]
pub struct StoredContent {
    pub bytes: Vec<u8>,
    /// Original filename without extension
    pub filename: String,
    pub revision: u64,
}

/// Name offered for the edited file, e.g. `report_edited.pdf`
pub fn download_name(filename: &str) -> String {
    format!("{}_edited.pdf", filename)
}

/// File-system backed store of edit sessions
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, EditError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an uploaded PDF as a new session
    pub fn create(&self, bytes: &[u8], filename: &str) -> Result<SessionId, EditError> {
        let info = validate_pdf(bytes)?;
        let id = SessionId::generate();

        let content_path = self.content_path(&id, 0);
        write_atomic(&self.root, &content_path, bytes, false)
            .map_err(|e| collision_or_failure(e, &id))?;

        let metadata = Metadata {
            filename: filename.to_string(),
            pages: initial_indices(info.page_count as usize),
            revision: 0,
        };
        let written = serde_json::to_vec(&metadata)
            .map_err(EditError::from)
            .and_then(|json| {
                write_atomic(&self.root, &self.metadata_path(&id), &json, false)
                    .map_err(|e| collision_or_failure(e, &id))
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&content_path);
            return Err(e);
        }

        info!(
            "Created session {} for '{}' ({} pages, {} bytes, encrypted: {})",
            id, filename, info.page_count, info.size_bytes, info.encrypted
        );
        Ok(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.metadata_path(id).exists()
    }

    /// Load document and ledger of a session
    pub fn load(&self, id: &SessionId) -> Result<Session, EditError> {
        let metadata = self.read_metadata(id)?;
        let bytes = self.read_revision(id, metadata.revision)?;
        let document = PdfDocument::load(bytes)?;
        let rotations = document.rotations()?;

        let ledger = Ledger::from_parts(&metadata.pages, &rotations).ok_or_else(|| {
            EditError::Corrupt(format!(
                "Session {} lists {} pages but the document has {}",
                id,
                metadata.pages.len(),
                rotations.len()
            ))
        })?;

        Ok(Session {
            id: id.clone(),
            filename: metadata.filename,
            document,
            ledger,
            revision: metadata.revision,
        })
    }

    /// Raw content of the current revision, without parsing the document
    pub fn read_content(&self, id: &SessionId) -> Result<StoredContent, EditError> {
        let metadata = self.read_metadata(id)?;
        let bytes = self.read_revision(id, metadata.revision)?;
        Ok(StoredContent {
            bytes,
            filename: metadata.filename,
            revision: metadata.revision,
        })
    }

    /// Persist the session's document and ledger as the next revision.
    ///
    /// On success `session` is reloaded from the written bytes so it can be
    /// edited further. On failure the previous revision stays current.
    pub fn replace(&self, session: &mut Session, mode: PersistMode) -> Result<(), EditError> {
        let current = self.read_metadata(&session.id)?;
        if current.revision != session.revision {
            return Err(EditError::Corrupt(format!(
                "Session {} is at revision {}, edit was based on {}",
                session.id, current.revision, session.revision
            )));
        }
        if session.ledger.len() != session.document.page_count() {
            return Err(EditError::Corrupt(format!(
                "Ledger has {} entries but document has {} pages",
                session.ledger.len(),
                session.document.page_count()
            )));
        }

        let bytes = persist::render(&session.document, mode)?;
        self.commit(session, bytes, mode)
    }

    /// Write `bytes` as the session's next revision.
    ///
    /// The bytes are parsed before anything touches the disk, so a render
    /// that cannot be read back never becomes current.
    fn commit(
        &self,
        session: &mut Session,
        bytes: Vec<u8>,
        mode: PersistMode,
    ) -> Result<(), EditError> {
        let reparsed = PdfDocument::load(bytes.clone())?;
        let next = session.revision + 1;

        let content_path = self.content_path(&session.id, next);
        write_atomic(&self.root, &content_path, &bytes, true)?;

        let metadata = Metadata {
            filename: session.filename.clone(),
            pages: session.ledger.original_indices(),
            revision: next,
        };
        let committed = serde_json::to_vec(&metadata)
            .map_err(EditError::from)
            .and_then(|json| {
                write_atomic(&self.root, &self.metadata_path(&session.id), &json, true)
                    .map_err(EditError::from)
            });
        if let Err(e) = committed {
            let _ = fs::remove_file(&content_path);
            return Err(e);
        }

        let superseded = self.content_path(&session.id, session.revision);
        if let Err(e) = fs::remove_file(&superseded) {
            warn!("Failed to remove {}: {}", superseded.display(), e);
        }

        debug!(
            "Session {} committed revision {} ({} save, {} bytes)",
            session.id,
            next,
            mode,
            bytes.len()
        );

        session.document = reparsed;
        session.revision = next;
        Ok(())
    }

    /// Remove every artifact of a session. Missing artifacts are not an error.
    pub fn destroy(&self, id: &SessionId) -> Result<(), EditError> {
        remove_if_exists(&self.metadata_path(id))?;

        let prefix = format!("{}.", id);
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let owned = name
                .to_str()
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".pdf"));
            if owned {
                remove_if_exists(&entry.path())?;
            }
        }

        info!("Destroyed session {}", id);
        Ok(())
    }

    /// Destroy the session only while it is still at `revision`.
    ///
    /// Returns `false` and leaves everything in place when the session has
    /// moved on or no longer exists.
    pub fn destroy_if_revision(&self, id: &SessionId, revision: u64) -> Result<bool, EditError> {
        let current = match self.read_metadata(id) {
            Ok(metadata) => metadata.revision,
            Err(EditError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        if current != revision {
            return Ok(false);
        }
        self.destroy(id)?;
        Ok(true)
    }

    fn metadata_path(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    fn content_path(&self, id: &SessionId, revision: u64) -> PathBuf {
        self.root.join(format!("{}.{}.pdf", id, revision))
    }

    fn read_metadata(&self, id: &SessionId) -> Result<Metadata, EditError> {
        match fs::read(self.metadata_path(id)) {
            Ok(json) => Ok(serde_json::from_slice(&json)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(EditError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_revision(&self, id: &SessionId, revision: u64) -> Result<Vec<u8>, EditError> {
        match fs::read(self.content_path(id, revision)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(EditError::Corrupt(format!(
                "Session {} has no content for revision {}",
                id, revision
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write to a temporary file in `dir`, flush it to disk, then rename it onto
/// `target`. With `overwrite == false` an existing target is left alone and
/// `AlreadyExists` is returned.
fn write_atomic(dir: &Path, target: &Path, bytes: &[u8], overwrite: bool) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    let persisted = if overwrite {
        tmp.persist(target)
    } else {
        tmp.persist_noclobber(target)
    };
    persisted.map(|_| ()).map_err(|e| e.error)
}

fn collision_or_failure(err: io::Error, id: &SessionId) -> EditError {
    if err.kind() == io::ErrorKind::AlreadyExists {
        EditError::IdCollision(id.to_string())
    } else {
        EditError::PersistenceFailure(err)
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
