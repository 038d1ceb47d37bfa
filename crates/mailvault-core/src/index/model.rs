//! Index data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the `email_index` table: normalized metadata for one archive
/// message. Written once per message, insert-or-replace on the natural key
/// so re-runs are idempotent.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Owning case/project id.
    pub profile_id: String,
    /// Profile type (`project` or `case`).
    pub profile_type: String,
    /// Absolute path of the source archive.
    pub source_path: String,
    /// Protocol-level message id, when the archive carries one.
    pub message_id: Option<String>,
    /// Trimmed `In-Reply-To` value.
    pub in_reply_to: Option<String>,
    /// Message subject.
    pub subject: String,
    /// Sender address or display name.
    pub from_address: String,
    /// To recipients display string.
    pub to_addresses: String,
    /// Cc recipients display string.
    pub cc_addresses: String,
    /// When the message was sent (RFC 3339), when known.
    pub date_sent: Option<String>,
    /// Opaque conversation-index token (hex), when present.
    pub conversation_index: Option<String>,
    /// Resolved thread id. Always present; the resolver guarantees a
    /// fallback.
    pub thread_id: String,
    /// Slash-joined folder provenance within the archive.
    pub folder_path: String,
    /// Matched keyword labels, sorted.
    pub keywords: Vec<String>,
    /// Matched stakeholder display names, sorted.
    pub stakeholders: Vec<String>,
    /// Number of attachments carried by the message.
    pub attachments_count: u32,
    /// Whether the message has any attachments.
    pub has_attachments: bool,
    /// When this row was indexed.
    pub indexed_at: DateTime<Utc>,
    /// Base name of the source archive.
    pub source_archive_name: String,
}

impl MessageRecord {
    /// Natural identity for the idempotent upsert: the message id when
    /// present, otherwise folder path + subject + date.
    #[must_use]
    pub fn natural_key(&self) -> String {
        self.message_id.clone().unwrap_or_else(|| {
            format!(
                "{}|{}|{}",
                self.folder_path,
                self.subject,
                self.date_sent.as_deref().unwrap_or("")
            )
        })
    }
}

/// One row of the `attachments` table: provenance for one logical
/// attachment occurrence. The blob itself is deduplicated by the content
/// store; record rows are written per occurrence.
#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    /// Owning case/project id.
    pub profile_id: String,
    /// Message id of the owning email, when it had one.
    pub email_reference_id: Option<String>,
    /// Original attachment filename.
    pub filename: String,
    /// Where the deduplicated blob lives.
    pub storage_path: String,
    /// Payload size in bytes.
    pub size_bytes: i64,
    /// Declared MIME type.
    pub mime_type: String,
    /// Base name of the source archive.
    pub source_archive_name: String,
    /// Hex SHA-256 of the payload.
    pub content_hash: String,
    /// Whether the archive marked the attachment inline.
    pub is_inline: bool,
    /// Sender of the owning email.
    pub from_email: String,
    /// When the owning email was sent (RFC 3339), when known.
    pub date_sent: Option<String>,
    /// Keyword labels matched on the owning email, sorted.
    pub keywords: Vec<String>,
    /// Stakeholder display names matched on the owning email, sorted.
    pub stakeholders: Vec<String>,
    /// When the attachment was extracted.
    pub extracted_at: DateTime<Utc>,
    /// Downstream document classification; null at ingestion time.
    pub document_type: Option<String>,
}

/// Result of the status query: a simple count against the index,
/// independent of any in-flight run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionStatus {
    /// Indexed email count for the profile.
    pub total_emails: i64,
    /// `"complete"` or `"error"`.
    pub status: String,
    /// Error message when the query failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MessageRecord {
        MessageRecord {
            profile_id: "p1".to_string(),
            profile_type: "project".to_string(),
            source_path: "/archives/export".to_string(),
            message_id: Some("<m1@example.com>".to_string()),
            in_reply_to: None,
            subject: "Weekly update".to_string(),
            from_address: "a@example.com".to_string(),
            to_addresses: String::new(),
            cc_addresses: String::new(),
            date_sent: Some("2024-03-01T10:00:00+00:00".to_string()),
            conversation_index: None,
            thread_id: "thread-abc".to_string(),
            folder_path: "Root/Inbox".to_string(),
            keywords: vec![],
            stakeholders: vec![],
            attachments_count: 0,
            has_attachments: false,
            indexed_at: Utc::now(),
            source_archive_name: "export".to_string(),
        }
    }

    #[test]
    fn test_natural_key_uses_message_id() {
        assert_eq!(record().natural_key(), "<m1@example.com>");
    }

    #[test]
    fn test_natural_key_fallback_without_message_id() {
        let mut r = record();
        r.message_id = None;
        assert_eq!(
            r.natural_key(),
            "Root/Inbox|Weekly update|2024-03-01T10:00:00+00:00"
        );
    }
}
