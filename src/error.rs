//! Error types shared by the codec, the token store and the remote gateway.
//!
//! Application glue (CLI, workspace) wraps these in `anyhow::Error`; the
//! library modules return them directly so callers can match on the variant.

use thiserror::Error;

/// Failures surfaced by a contents API call.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid GitHub token or token expired")]
    Unauthorized,

    #[error("Token lacks required permissions. Ensure it has repo access.")]
    Forbidden,

    /// Absent file or repository. Call sites decide whether this is a real
    /// error or the "nothing written yet" sentinel.
    #[error("Repository not found or insufficient permissions")]
    NotFound,

    #[error("Remote file changed while writing (409 conflict)")]
    Conflict,

    #[error("GitHub API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Request to GitHub failed: {0}")]
    Transport(String),

    #[error("Unexpected response from GitHub: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Map an HTTP status and response message onto the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 => RemoteError::Unauthorized,
            403 => RemoteError::Forbidden,
            404 => RemoteError::NotFound,
            409 => RemoteError::Conflict,
            _ => RemoteError::Status {
                status,
                message: message.into(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict)
    }

    /// HTTP status this error corresponds to, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Unauthorized => Some(401),
            RemoteError::Forbidden => Some(403),
            RemoteError::NotFound => Some(404),
            RemoteError::Conflict => Some(409),
            RemoteError::Status { status, .. } => Some(*status),
            RemoteError::Transport(_) | RemoteError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RemoteError::from_status(status.as_u16(), err.to_string()),
            None if err.is_decode() => RemoteError::Decode(err.to_string()),
            None => RemoteError::Transport(err.to_string()),
        }
    }
}

/// Malformed CSV input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("Invalid CSV format: {0}")]
    InvalidFormat(String),
}

/// Token storage failures. `Decode` means the stored value is garbage and
/// callers treat it as "no token".
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Stored token is malformed: {0}")]
    Decode(String),

    #[error("Token storage unavailable: {0}")]
    Storage(#[from] std::io::Error),
}

/// In-memory board edits that reference something that is not there.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Board {0} not found")]
    UnknownBoard(String),

    #[error("Column {0} not found")]
    UnknownColumn(String),

    #[error("Task {0} not found")]
    UnknownTask(String),

    #[error("Library {0} not found")]
    UnknownLibrary(String),
}
