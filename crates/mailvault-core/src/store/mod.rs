//! Content-addressed attachment blob storage.

mod content;

pub use content::{ContentStore, StoredBlob};
