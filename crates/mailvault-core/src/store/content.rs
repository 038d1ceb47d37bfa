//! Content-addressed blob store for extracted attachments.
//!
//! Blobs are stored at `<root>/attachments/<profile_id>/<sha256><ext>`, so
//! identical byte content is written at most once per profile no matter how
//! many messages reference it. The store owns on-disk lifetime; nothing in
//! the engine ever deletes a blob.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Content-addressed attachment store rooted at a directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

/// Outcome of storing one payload.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Where the blob lives (newly written or pre-existing).
    pub path: PathBuf,
    /// Hex SHA-256 of the payload.
    pub hash: String,
    /// False when an identical payload was already stored.
    pub newly_written: bool,
}

impl ContentStore {
    /// Creates a store rooted at `root`. The directory tree is created
    /// lazily on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores a payload, deduplicating on content hash.
    ///
    /// The destination filename is the hex SHA-256 plus the original
    /// filename's extension. If the destination already exists the write is
    /// skipped and the existing path is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written. Callers
    /// treat that as a single-attachment failure, not a message failure.
    pub async fn store(
        &self,
        profile_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob> {
        let hash = hex_sha256(bytes);
        let extension = Path::new(original_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let dest_dir = self.root.join("attachments").join(profile_id);
        fs::create_dir_all(&dest_dir).await?;

        let path = dest_dir.join(format!("{hash}{extension}"));
        let newly_written = if fs::try_exists(&path).await? {
            false
        } else {
            fs::write(&path, bytes).await?;
            true
        };

        Ok(StoredBlob {
            path,
            hash,
            newly_written,
        })
    }
}

/// Hex-encoded SHA-256 of a byte slice.
#[must_use]
pub(crate) fn hex_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_writes_hash_named_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        let blob = store.store("case-1", "report.pdf", b"payload").await.unwrap();
        assert!(blob.newly_written);
        assert!(blob.path.ends_with(format!("{}.pdf", blob.hash)));

        let on_disk = std::fs::read(&blob.path).unwrap();
        assert_eq!(on_disk, b"payload");
        assert_eq!(hex_sha256(&on_disk), blob.hash);
    }

    #[tokio::test]
    async fn test_identical_content_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        let first = store.store("case-1", "a.pdf", b"same bytes").await.unwrap();
        let second = store.store("case-1", "b.pdf", b"same bytes").await.unwrap();

        // Same extension-less content under different names with the same
        // extension dedups to one file.
        assert!(first.newly_written);
        assert!(!second.newly_written);
        assert_eq!(first.path, second.path);

        let files: Vec<_> = std::fs::read_dir(first.path.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_profiles_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        let a = store.store("case-1", "x.bin", b"bytes").await.unwrap();
        let b = store.store("case-2", "x.bin", b"bytes").await.unwrap();
        assert!(a.newly_written);
        assert!(b.newly_written);
        assert_ne!(a.path, b.path);
        assert_eq!(a.hash, b.hash);
    }

    #[tokio::test]
    async fn test_no_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let blob = store.store("p", "README", b"text").await.unwrap();
        assert!(blob.path.ends_with(&blob.hash));
    }

    #[test]
    fn test_hex_sha256_known_vector() {
        assert_eq!(
            hex_sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
