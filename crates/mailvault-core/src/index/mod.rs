//! Relational index models and storage.

mod model;
mod repository;

pub use model::{AttachmentRecord, IngestionStatus, MessageRecord};
pub use repository::IndexRepository;
