//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
///
/// The ingestion engine treats [`Error::Database`] as fatal to the whole
/// run (a persistence error), while archive and extraction errors are
/// caught at per-item scope, counted, and traversal continues.
#[derive(Debug, Error)]
pub enum Error {
    /// Archive reading failed.
    #[error("Archive error: {0}")]
    Archive(#[from] mailvault_archive::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error (blob store writes).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error must abort the whole run rather than be counted
    /// against a single item.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
