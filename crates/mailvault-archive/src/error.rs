//! Error types for archive operations.

use std::string::FromUtf8Error;

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Archive error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Archive container missing or unreadable. Fatal for the whole run.
    #[error("Cannot open archive: {0}")]
    Open(String),

    /// A folder could not be enumerated.
    #[error("Cannot enumerate folder: {0}")]
    Folder(String),

    /// A message is structurally broken (not merely sparse).
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// An attachment payload could not be read.
    #[error("Cannot read attachment: {0}")]
    Attachment(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// I/O error while reading the container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
