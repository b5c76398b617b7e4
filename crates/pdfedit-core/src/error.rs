use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("Session data is inconsistent: {0}")]
    Corrupt(String),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] std::io::Error),

    /// A freshly generated session id already exists on disk.
    #[error("Session id collision: {0}")]
    IdCollision(String),
}

impl From<lopdf::Error> for EditError {
    fn from(err: lopdf::Error) -> Self {
        EditError::Pdf(err.to_string())
    }
}
