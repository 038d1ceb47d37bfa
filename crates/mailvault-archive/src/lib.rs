//! # mailvault-archive
//!
//! Mail-archive container reading for `MailVault`.
//!
//! This crate provides:
//! - Capability traits for archive containers, folders, messages and
//!   attachments ([`ArchiveSource`] and friends)
//! - A filesystem export backend ([`FsArchive`]): a directory tree of
//!   RFC-822 `.eml` files
//! - Tolerant header and MIME-lite message parsing (decode side only)
//!
//! Parsing is deliberately forgiving: archives recovered from litigation
//! holds are routinely damaged, and a sparse message must surface as `None`
//! fields rather than an error. Only structurally broken containers or
//! entries error.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;
mod source;

pub mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Part, RawMessage, TransferEncoding};
pub use source::{
    ArchiveAttachment, ArchiveFolder, ArchiveMessage, ArchiveSource, FsArchive, FsAttachment,
    FsFolder, FsMessage,
};
