//! Archive capability traits and the filesystem export backend.
//!
//! The ingestion engine only ever talks to the narrow traits below, so the
//! concrete container format stays swappable. The shipped backend,
//! [`FsArchive`], reads a mailbox export laid out as a directory tree:
//! sub-directories are folders and `*.eml` files are messages.
//!
//! Optionality is part of the contract: a merely-missing field is `None`,
//! never an error. Only structurally broken containers or entries error.

use crate::encoding::decode_base64_lenient;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::{Part, RawMessage};
use chrono::{DateTime, FixedOffset};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// An openable mail-archive container.
pub trait ArchiveSource: Sized {
    /// Folder type exposed by this container.
    type Folder: ArchiveFolder;

    /// Opens the container at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] when the container is missing or unreadable.
    /// Corruption at open time is fatal for the whole run; there are no
    /// retries.
    fn open(path: &Path) -> Result<Self>;

    /// Returns the root folder of the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be enumerated.
    fn root_folder(&self) -> Result<Self::Folder>;

    /// Base name of the container, used as the source-archive label.
    fn name(&self) -> &str;

    /// Absolute path of the container.
    fn path(&self) -> &Path;
}

/// A folder within an archive: indexable messages and sub-folders.
pub trait ArchiveFolder: Sized {
    /// Message type exposed by this folder.
    type Message: ArchiveMessage;

    /// Folder display name, if the container records one.
    fn name(&self) -> Option<String>;

    /// Number of messages directly in this folder.
    fn message_count(&self) -> usize;

    /// Loads the message at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if that single entry is unreadable or structurally
    /// broken; siblings are unaffected.
    fn message(&self, index: usize) -> Result<Self::Message>;

    /// Number of direct sub-folders.
    fn sub_folder_count(&self) -> usize;

    /// Opens the sub-folder at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if that sub-folder cannot be enumerated.
    fn sub_folder(&self, index: usize) -> Result<Self>;
}

/// One message within an archive folder.
///
/// Every accessor is optional; archives routinely lack any of these fields.
pub trait ArchiveMessage {
    /// Attachment type exposed by this message.
    type Attachment: ArchiveAttachment;

    /// Message subject.
    fn subject(&self) -> Option<String>;
    /// Sender email address.
    fn sender_address(&self) -> Option<String>;
    /// Sender display name.
    fn sender_name(&self) -> Option<String>;
    /// To recipients as a display string.
    fn display_to(&self) -> Option<String>;
    /// Cc recipients as a display string.
    fn display_cc(&self) -> Option<String>;
    /// When the message was sent.
    fn sent_at(&self) -> Option<DateTime<FixedOffset>>;
    /// Raw transport-header blob.
    fn transport_headers(&self) -> Option<String>;
    /// Plain text body.
    fn plain_body(&self) -> Option<String>;
    /// HTML body.
    fn html_body(&self) -> Option<String>;
    /// Protocol-level message id (native field, not the header).
    fn internet_message_id(&self) -> Option<String>;
    /// Conversation-index token as a hex string.
    fn conversation_index(&self) -> Option<String>;

    /// Number of attachment slots on the message.
    fn attachment_count(&self) -> usize;

    /// Loads the attachment at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if that single slot is unreadable.
    fn attachment(&self, index: usize) -> Result<Self::Attachment>;
}

/// One attachment slot on a message.
pub trait ArchiveAttachment {
    /// Attachment filename.
    fn name(&self) -> Option<String>;
    /// Declared MIME type.
    fn mime_type(&self) -> Option<String>;
    /// Declared payload size, when the container records one.
    fn declared_size(&self) -> Option<u64>;
    /// Whether the archive marks the attachment inline.
    fn is_inline(&self) -> bool;
    /// Content-ID, when present.
    fn content_id(&self) -> Option<String>;

    /// Buffered read of the payload given a known size.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be produced this way; callers
    /// fall back to [`ArchiveAttachment::data`].
    fn read_buffer(&self, size: u64) -> Result<Vec<u8>>;

    /// Direct in-memory payload, the second-tier access path.
    fn data(&self) -> Option<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// Filesystem export backend
// ---------------------------------------------------------------------------

/// A mailbox export on disk: directories are folders, `*.eml` files are
/// messages.
#[derive(Debug)]
pub struct FsArchive {
    root: PathBuf,
    name: String,
}

impl ArchiveSource for FsArchive {
    type Folder = FsFolder;

    fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::Open(format!(
                "archive not found or not a directory: {}",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map_or_else(|| "archive".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self {
            root: path.to_path_buf(),
            name,
        })
    }

    fn root_folder(&self) -> Result<FsFolder> {
        FsFolder::scan(&self.root, None)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.root
    }
}

/// A directory acting as an archive folder.
#[derive(Debug)]
pub struct FsFolder {
    name: Option<String>,
    message_paths: Vec<PathBuf>,
    sub_folder_paths: Vec<PathBuf>,
}

impl FsFolder {
    fn scan(path: &Path, name: Option<String>) -> Result<Self> {
        let entries = fs::read_dir(path)
            .map_err(|e| Error::Folder(format!("{}: {e}", path.display())))?;

        let mut message_paths = Vec::new();
        let mut sub_folder_paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::Folder(format!("{}: {e}", path.display())))?;
            let entry_path = entry.path();
            if entry_path.is_dir() {
                sub_folder_paths.push(entry_path);
            } else if entry_path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
            {
                message_paths.push(entry_path);
            }
        }

        // Deterministic traversal order regardless of directory listing order
        message_paths.sort();
        sub_folder_paths.sort();

        Ok(Self {
            name,
            message_paths,
            sub_folder_paths,
        })
    }
}

impl ArchiveFolder for FsFolder {
    type Message = FsMessage;

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn message_count(&self) -> usize {
        self.message_paths.len()
    }

    fn message(&self, index: usize) -> Result<FsMessage> {
        let path = self
            .message_paths
            .get(index)
            .ok_or_else(|| Error::Malformed(format!("no message at index {index}")))?;
        let raw = fs::read(path)?;
        let message = RawMessage::parse(&raw)?;
        Ok(FsMessage::new(message))
    }

    fn sub_folder_count(&self) -> usize {
        self.sub_folder_paths.len()
    }

    fn sub_folder(&self, index: usize) -> Result<Self> {
        let path = self
            .sub_folder_paths
            .get(index)
            .ok_or_else(|| Error::Folder(format!("no sub-folder at index {index}")))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Self::scan(path, name)
    }
}

/// A parsed `.eml` message.
#[derive(Debug)]
pub struct FsMessage {
    message: RawMessage,
    attachments: Vec<Part>,
}

impl FsMessage {
    fn new(message: RawMessage) -> Self {
        let attachments = message
            .attachment_parts()
            .into_iter()
            .cloned()
            .collect();
        Self {
            message,
            attachments,
        }
    }

    fn headers(&self) -> &Headers {
        &self.message.headers
    }
}

impl ArchiveMessage for FsMessage {
    type Attachment = FsAttachment;

    fn subject(&self) -> Option<String> {
        self.headers().get_decoded("subject")
    }

    fn sender_address(&self) -> Option<String> {
        self.headers()
            .get("from")
            .and_then(|v| parse_mailbox(v).0)
    }

    fn sender_name(&self) -> Option<String> {
        self.headers()
            .get_decoded("from")
            .and_then(|v| parse_mailbox(&v).1)
    }

    fn display_to(&self) -> Option<String> {
        self.headers().get_decoded("to")
    }

    fn display_cc(&self) -> Option<String> {
        self.headers().get_decoded("cc")
    }

    fn sent_at(&self) -> Option<DateTime<FixedOffset>> {
        self.headers()
            .get("date")
            .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
    }

    fn transport_headers(&self) -> Option<String> {
        Some(self.message.raw_headers.clone())
    }

    fn plain_body(&self) -> Option<String> {
        self.message.plain_body()
    }

    fn html_body(&self) -> Option<String> {
        self.message.html_body()
    }

    fn internet_message_id(&self) -> Option<String> {
        // Exports carry the id only as a header; there is no separate native
        // field the way PST property sets have.
        self.headers().get("message-id").map(ToString::to_string)
    }

    fn conversation_index(&self) -> Option<String> {
        let raw = self.headers().get("thread-index")?;
        let bytes = decode_base64_lenient(raw.trim()).ok()?;
        let mut hex = String::with_capacity(bytes.len() * 2);
        for byte in &bytes {
            let _ = write!(hex, "{byte:02x}");
        }
        Some(hex)
    }

    fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    fn attachment(&self, index: usize) -> Result<FsAttachment> {
        let part = self
            .attachments
            .get(index)
            .ok_or_else(|| Error::Attachment(format!("no attachment at index {index}")))?;
        Ok(FsAttachment { part: part.clone() })
    }
}

/// An attachment part of a parsed `.eml` message.
#[derive(Debug)]
pub struct FsAttachment {
    part: Part,
}

impl ArchiveAttachment for FsAttachment {
    fn name(&self) -> Option<String> {
        self.part.filename()
    }

    fn mime_type(&self) -> Option<String> {
        Some(self.part.content_type().essence())
    }

    fn declared_size(&self) -> Option<u64> {
        // The export format does not record a size separate from the payload.
        None
    }

    fn is_inline(&self) -> bool {
        self.part.is_inline()
    }

    fn content_id(&self) -> Option<String> {
        self.part.content_id()
    }

    fn read_buffer(&self, _size: u64) -> Result<Vec<u8>> {
        self.part.decode_body()
    }

    fn data(&self) -> Option<Vec<u8>> {
        self.part.decode_body().ok()
    }
}

/// Splits an RFC-ish mailbox string into (address, display name).
///
/// `"Jane Doe <jane@example.com>"` yields both; a bare address yields only
/// the address.
fn parse_mailbox(value: &str) -> (Option<String>, Option<String>) {
    let value = value.trim();
    if let Some(open) = value.find('<') {
        let close = value.rfind('>').unwrap_or(value.len());
        let address = value[open + 1..close].trim();
        let name = value[..open].trim().trim_matches('"').trim();
        (
            (!address.is_empty()).then(|| address.to_string()),
            (!name.is_empty()).then(|| name.to_string()),
        )
    } else if value.contains('@') {
        (Some(value.to_string()), None)
    } else {
        (None, (!value.is_empty()).then(|| value.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    fn write_eml(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_open_missing_archive_is_fatal() {
        let result = FsArchive::open(Path::new("/nonexistent/archive"));
        assert!(matches!(result, Err(Error::Open(_))));
    }

    #[test]
    fn test_folder_tree_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(
            dir.path(),
            "one.eml",
            "From: a@example.com\r\nSubject: Root message\r\n\r\nhi",
        );
        let inbox = dir.path().join("Inbox");
        fs::create_dir(&inbox).unwrap();
        write_eml(
            &inbox,
            "two.eml",
            "From: b@example.com\r\nSubject: Nested\r\n\r\nhello",
        );
        // Non-message files are ignored
        fs::write(dir.path().join("notes.txt"), "not a message").unwrap();

        let archive = FsArchive::open(dir.path()).unwrap();
        let root = archive.root_folder().unwrap();
        assert_eq!(root.message_count(), 1);
        assert_eq!(root.sub_folder_count(), 1);

        let sub = root.sub_folder(0).unwrap();
        assert_eq!(sub.name().unwrap(), "Inbox");
        assert_eq!(sub.message_count(), 1);

        let message = sub.message(0).unwrap();
        assert_eq!(message.subject().unwrap(), "Nested");
        assert_eq!(message.sender_address().unwrap(), "b@example.com");
    }

    #[test]
    fn test_garbage_message_errors_without_poisoning_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.eml"), [0u8, 1, 2, 3]).unwrap();
        write_eml(
            dir.path(),
            "good.eml",
            "From: a@example.com\r\nSubject: Fine\r\n\r\nok",
        );

        let archive = FsArchive::open(dir.path()).unwrap();
        let root = archive.root_folder().unwrap();
        assert_eq!(root.message_count(), 2);
        assert!(root.message(0).is_err()); // bad.eml sorts first
        assert!(root.message(1).is_ok());
    }

    #[test]
    fn test_message_optional_fields_absent() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(dir.path(), "sparse.eml", "X-Anything: at all\r\n\r\n");

        let archive = FsArchive::open(dir.path()).unwrap();
        let message = archive.root_folder().unwrap().message(0).unwrap();
        assert!(message.subject().is_none());
        assert!(message.sender_address().is_none());
        assert!(message.sent_at().is_none());
        assert!(message.conversation_index().is_none());
        assert_eq!(message.attachment_count(), 0);
    }

    #[test]
    fn test_conversation_index_hex() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(
            dir.path(),
            "conv.eml",
            "Subject: t\r\nThread-Index: AQHZAQ==\r\n\r\n",
        );

        let archive = FsArchive::open(dir.path()).unwrap();
        let message = archive.root_folder().unwrap().message(0).unwrap();
        assert_eq!(message.conversation_index().unwrap(), "0101d901");
    }

    #[test]
    fn test_parse_mailbox() {
        assert_eq!(
            parse_mailbox("Jane Doe <jane@example.com>"),
            (
                Some("jane@example.com".to_string()),
                Some("Jane Doe".to_string())
            )
        );
        assert_eq!(
            parse_mailbox("jane@example.com"),
            (Some("jane@example.com".to_string()), None)
        );
        assert_eq!(parse_mailbox(""), (None, None));
    }
}
