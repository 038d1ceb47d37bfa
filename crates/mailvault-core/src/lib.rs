//! # mailvault-core
//!
//! Core ingestion logic for `MailVault`.
//!
//! This crate provides:
//! - The batch ingestion engine: one-pass archive traversal with
//!   per-message transactions and failure isolation
//! - Transport-header normalization
//! - Multi-tier heuristic thread resolution
//! - Content-addressed attachment storage (`SHA-256` dedup per profile)
//! - Keyword and stakeholder matching
//! - The relational index (`SQLite`) and status queries

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
mod error;
pub mod headers;
pub mod index;
pub mod matching;
pub mod store;
pub mod thread;

pub use config::{Keyword, Stakeholder};
pub use engine::{IngestionEngine, IngestionRequest, IngestionStats};
pub use error::{Error, Result};
pub use headers::MessageHeaders;
pub use index::{AttachmentRecord, IngestionStatus, IndexRepository, MessageRecord};
pub use store::{ContentStore, StoredBlob};
pub use thread::{
    DEFAULT_CONVERSATION_ROOT_LEN, ResolverContext, ThreadKeys, normalize_subject,
};
