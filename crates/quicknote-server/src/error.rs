use thiserror::Error;

pub type Result<T> = std::result::Result<T, NoteError>;

/// Failures surfaced by the access façade.
///
/// `NotFound` covers missing, expired and exhausted notes alike; callers get
/// no way to tell them apart.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("invalid note: {0}")]
    Validation(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("note not found")]
    NotFound,
}

impl From<anyhow::Error> for NoteError {
    fn from(err: anyhow::Error) -> Self {
        NoteError::Persistence(format!("{err:#}"))
    }
}

impl From<quicknote_core::Error> for NoteError {
    fn from(err: quicknote_core::Error) -> Self {
        match err {
            quicknote_core::Error::Validation(msg) => NoteError::Validation(msg),
            other => NoteError::Validation(other.to_string()),
        }
    }
}
