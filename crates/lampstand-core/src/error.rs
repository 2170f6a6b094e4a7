//! Error taxonomy for the reader core.
//!
//! `Display` strings on [`ReaderError`] are the messages the view shows in
//! place of the failed content area, so they are written for end users.

use thiserror::Error;

/// Failures raised by the durable key-value layer.
///
/// These never reach the user: every store recovers locally by logging and
/// falling back to its empty or default state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite storage failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored value is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ReaderError {
    /// No network and the requested translation is not available offline.
    #[error("You are currently offline. Please connect to the internet or download this translation in the settings menu for offline access.")]
    Connectivity,

    #[error("Could not find {book_id} chapter {chapter} in the selected translation. Please try another selection.")]
    NotFound { book_id: String, chapter: u32 },

    /// Any other remote failure; `status` is absent for transport errors.
    #[error("{message}")]
    Fetch { status: Option<u16>, message: String },

    #[error("Failed to generate commentary: {0}")]
    Generation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
}

impl ReaderError {
    pub fn fetch(status: Option<u16>, message: impl Into<String>) -> Self {
        ReaderError::Fetch {
            status,
            message: message.into(),
        }
    }
}
