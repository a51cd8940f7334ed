//! Error types shared by the notes store and its repositories.

use thiserror::Error;
use uuid::Uuid;

/// Everything that can go wrong between the notes store and its backends.
#[derive(Debug, Error)]
pub enum NotesError {
    /// Input was rejected before reaching storage (e.g. a blank title).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The targeted note does not exist for the current owner.
    #[error("Note not found: {0}")]
    NotFound(Uuid),

    /// No authenticated user, or the credentials were rejected.
    #[error("Not authenticated: {0}")]
    Auth(String),

    /// The network call or the storage medium failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A supplied password did not match the note's hash.
    #[error("Incorrect password")]
    Password,

    /// The password hasher failed, or a stored hash could not be parsed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// The note is password protected and has not been unlocked this session.
    #[error("Note is locked: {0}")]
    Locked(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NotesError>;

impl From<reqwest::Error> for NotesError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl NotesError {
    /// Short message suitable for showing to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound(_) => "Note no longer exists".to_string(),
            Self::Auth(_) => "User not authenticated".to_string(),
            Self::Transport(e) => format!("Could not reach storage: {e}"),
            Self::Password => "Incorrect password. Please try again.".to_string(),
            Self::Hashing(_) => "Failed to verify password. Please try again.".to_string(),
            Self::Locked(_) => "This note is password protected".to_string(),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
