//! Ingestion run orchestration.
//!
//! Drives the depth-first archive traversal: per message, normalize headers,
//! resolve the thread, extract and store attachments, match keywords and
//! stakeholders, then commit one message-scoped transaction. Per-item
//! failures are counted and traversal continues; only archive-open and
//! persistence errors abort the run.

use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use mailvault_archive::{ArchiveAttachment, ArchiveFolder, ArchiveMessage, ArchiveSource};

use super::stats::IngestionStats;
use crate::config::{Keyword, Stakeholder};
use crate::headers::MessageHeaders;
use crate::index::{AttachmentRecord, IndexRepository, MessageRecord};
use crate::matching::{identify_stakeholders, match_keywords};
use crate::store::ContentStore;
use crate::thread::{DEFAULT_CONVERSATION_ROOT_LEN, ResolverContext, ThreadKeys};
use crate::{Error, Result};

/// Parameters for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    /// Owning case/project id.
    pub profile_id: String,
    /// Profile type (`project` or `case`).
    pub profile_type: String,
    /// Keyword list; when `None` it is loaded from the index database.
    pub keywords: Option<Vec<Keyword>>,
    /// Stakeholder roster; when `None` it is loaded from the index database.
    pub stakeholders: Option<Vec<Stakeholder>>,
    /// Conversation-index root truncation length.
    pub conversation_root_len: usize,
}

impl IngestionRequest {
    /// Creates a request with defaults: `project` profile type, configs
    /// loaded from the database, default conversation-root length.
    #[must_use]
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            profile_type: "project".to_string(),
            keywords: None,
            stakeholders: None,
            conversation_root_len: DEFAULT_CONVERSATION_ROOT_LEN,
        }
    }
}

/// The batch ingestion engine: one index repository, one content store,
/// no shared mutable state across runs.
pub struct IngestionEngine {
    index: IndexRepository,
    store: ContentStore,
}

/// Source provenance captured once per run.
struct SourceInfo {
    path: String,
    archive_name: String,
}

/// One attachment payload pulled out of a message.
struct ExtractedAttachment {
    name: String,
    mime_type: String,
    size: i64,
    is_inline: bool,
    data: Vec<u8>,
}

impl IngestionEngine {
    /// Creates an engine over an index repository and a content store.
    #[must_use]
    pub const fn new(index: IndexRepository, store: ContentStore) -> Self {
        Self { index, store }
    }

    /// The underlying index repository (status queries, inspection).
    #[must_use]
    pub const fn index(&self) -> &IndexRepository {
        &self.index
    }

    /// Runs a full ingestion of the archive at `archive_path`.
    ///
    /// Never returns `Err`: a fatal failure (archive won't open, persistence
    /// error) lands in `stats.error` with whatever progress was committed
    /// before it. `total_messages == successful + failed` holds on every
    /// exit path.
    pub async fn ingest<S: ArchiveSource>(
        &self,
        archive_path: &Path,
        request: &IngestionRequest,
    ) -> IngestionStats {
        let mut stats = IngestionStats::start();
        let mut resolver = ResolverContext::with_conversation_root_len(request.conversation_root_len);

        if let Err(e) = self
            .run::<S>(archive_path, request, &mut stats, &mut resolver)
            .await
        {
            warn!("Ingestion aborted: {e}");
            stats.error = Some(e.to_string());
        }

        stats.finalize(resolver.threads_identified());
        info!(
            "Ingestion complete: {} processed, {} failed, {} attachments",
            stats.successful, stats.failed, stats.attachments_stored
        );
        stats
    }

    async fn run<S: ArchiveSource>(
        &self,
        archive_path: &Path,
        request: &IngestionRequest,
        stats: &mut IngestionStats,
        resolver: &mut ResolverContext,
    ) -> Result<()> {
        let archive = S::open(archive_path)?;
        let source = SourceInfo {
            path: std::fs::canonicalize(archive.path())
                .unwrap_or_else(|_| archive.path().to_path_buf())
                .display()
                .to_string(),
            archive_name: archive.name().to_string(),
        };

        let keywords = match &request.keywords {
            Some(list) => list.clone(),
            None => {
                self.index
                    .load_keywords(&request.profile_id, &request.profile_type)
                    .await?
            }
        };
        let stakeholders = match &request.stakeholders {
            Some(list) => list.clone(),
            None => {
                self.index
                    .load_stakeholders(&request.profile_id, &request.profile_type)
                    .await?
            }
        };

        let root = archive.root_folder()?;
        self.process_folder(
            &root, "", &source, request, &keywords, &stakeholders, stats, resolver,
        )
        .await
    }

    /// Depth-first folder traversal. A failure enumerating one sub-folder is
    /// logged and its siblings continue; only fatal errors propagate.
    #[allow(clippy::too_many_arguments)]
    async fn process_folder<F: ArchiveFolder>(
        &self,
        folder: &F,
        parent_path: &str,
        source: &SourceInfo,
        request: &IngestionRequest,
        keywords: &[Keyword],
        stakeholders: &[Stakeholder],
        stats: &mut IngestionStats,
        resolver: &mut ResolverContext,
    ) -> Result<()> {
        let folder_name = folder.name().unwrap_or_else(|| "Root".to_string());
        let current_path = if parent_path.is_empty() {
            folder_name
        } else {
            format!("{parent_path}/{folder_name}")
        };

        for index in 0..folder.message_count() {
            stats.total_messages += 1;
            let outcome = match folder.message(index) {
                Ok(message) => {
                    self.process_message(
                        &message,
                        &current_path,
                        source,
                        request,
                        keywords,
                        stakeholders,
                        stats,
                        resolver,
                    )
                    .await
                }
                Err(e) => Err(Error::Archive(e)),
            };

            match outcome {
                Ok(()) => stats.successful += 1,
                Err(e) if e.is_fatal() => {
                    // Keep successful + failed == total_messages even on the
                    // abort path.
                    stats.failed += 1;
                    return Err(e);
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!("Failed to process message in folder {current_path}: {e}");
                }
            }
        }

        for index in 0..folder.sub_folder_count() {
            match folder.sub_folder(index) {
                Ok(sub) => {
                    Box::pin(self.process_folder(
                        &sub,
                        &current_path,
                        source,
                        request,
                        keywords,
                        stakeholders,
                        stats,
                        resolver,
                    ))
                    .await?;
                }
                Err(e) => warn!("Failed to traverse sub-folder in {current_path}: {e}"),
            }
        }

        Ok(())
    }

    /// Runs the full per-message pipeline and commits one transaction.
    ///
    /// Returns `Err` for this message only, unless the error is a
    /// persistence error; those are fatal and the open transaction rolls
    /// back on drop.
    #[allow(clippy::too_many_arguments)]
    async fn process_message<M: ArchiveMessage>(
        &self,
        message: &M,
        folder_path: &str,
        source: &SourceInfo,
        request: &IngestionRequest,
        keywords: &[Keyword],
        stakeholders: &[Stakeholder],
        stats: &mut IngestionStats,
        resolver: &mut ResolverContext,
    ) -> Result<()> {
        let raw_headers = message.transport_headers();
        let headers = MessageHeaders::parse(raw_headers.as_deref());

        let native_id = message.internet_message_id();
        let message_id = headers.message_id(native_id.as_deref());
        let in_reply_to = headers.in_reply_to();
        let references = headers.references();
        let conversation_index = message.conversation_index();
        let subject = message.subject().unwrap_or_default();

        let thread_id = resolver.resolve(&ThreadKeys {
            message_id: message_id.as_deref(),
            in_reply_to: in_reply_to.as_deref(),
            references: references.as_deref(),
            conversation_index: conversation_index.as_deref(),
            subject: &subject,
        });

        let sender = message
            .sender_address()
            .or_else(|| message.sender_name())
            .unwrap_or_default();
        let to_addresses = message.display_to().unwrap_or_default();
        let cc_addresses = message.display_cc().unwrap_or_default();
        let date_sent = message.sent_at().map(|dt| dt.to_rfc3339());

        let body_text = message
            .plain_body()
            .filter(|body| !body.trim().is_empty())
            .or_else(|| message.html_body().map(|html| html_to_text(&html)))
            .unwrap_or_default();

        let attachments = extract_attachments(message);
        let attachment_names: Vec<String> =
            attachments.iter().map(|a| a.name.clone()).collect();

        let matched_keywords = match_keywords(&subject, &body_text, &attachment_names, keywords);
        let matched_stakeholders = identify_stakeholders(
            Some(&sender),
            Some(&to_addresses),
            Some(&cc_addresses),
            stakeholders,
        );

        let record = MessageRecord {
            profile_id: request.profile_id.clone(),
            profile_type: request.profile_type.clone(),
            source_path: source.path.clone(),
            message_id: message_id.clone(),
            in_reply_to,
            subject,
            from_address: sender.clone(),
            to_addresses,
            cc_addresses,
            date_sent: date_sent.clone(),
            conversation_index,
            thread_id,
            folder_path: folder_path.to_string(),
            keywords: matched_keywords.clone(),
            stakeholders: matched_stakeholders.clone(),
            attachments_count: u32::try_from(attachments.len()).unwrap_or(u32::MAX),
            has_attachments: !attachments.is_empty(),
            indexed_at: Utc::now(),
            source_archive_name: source.archive_name.clone(),
        };

        let mut tx = self.index.begin().await?;
        self.index.upsert_message(&mut tx, &record).await?;

        for attachment in &attachments {
            // A blob-store failure skips this one attachment; the owning
            // message still succeeds.
            let blob = match self
                .store
                .store(&request.profile_id, &attachment.name, &attachment.data)
                .await
            {
                Ok(blob) => blob,
                Err(e) => {
                    warn!("Failed to store attachment {}: {e}", attachment.name);
                    continue;
                }
            };

            let attachment_record = AttachmentRecord {
                profile_id: request.profile_id.clone(),
                email_reference_id: message_id.clone(),
                filename: attachment.name.clone(),
                storage_path: blob.path.display().to_string(),
                size_bytes: attachment.size,
                mime_type: attachment.mime_type.clone(),
                source_archive_name: source.archive_name.clone(),
                content_hash: blob.hash.clone(),
                is_inline: attachment.is_inline,
                from_email: sender.clone(),
                date_sent: date_sent.clone(),
                keywords: matched_keywords.clone(),
                stakeholders: matched_stakeholders.clone(),
                extracted_at: Utc::now(),
                document_type: None,
            };
            self.index.insert_attachment(&mut tx, &attachment_record).await?;
            stats.attachments_stored += 1;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Pulls every readable attachment payload from a message. Unreadable slots
/// are skipped; that is never fatal to the message.
fn extract_attachments<M: ArchiveMessage>(message: &M) -> Vec<ExtractedAttachment> {
    let mut extracted = Vec::new();
    for index in 0..message.attachment_count() {
        let attachment = match message.attachment(index) {
            Ok(a) => a,
            Err(e) => {
                warn!("Failed to open attachment slot {index}: {e}");
                continue;
            }
        };
        let Some(data) = read_attachment_bytes(&attachment) else {
            warn!("Failed to read attachment payload at slot {index}");
            continue;
        };
        let is_inline = attachment.is_inline() || attachment.content_id().is_some();
        extracted.push(ExtractedAttachment {
            name: attachment
                .name()
                .unwrap_or_else(|| format!("attachment_{index}")),
            mime_type: attachment.mime_type().unwrap_or_default(),
            size: i64::try_from(data.len()).unwrap_or(i64::MAX),
            is_inline,
            data,
        });
    }
    extracted
}

/// Two-tier payload access: buffered read with a known size first, direct
/// in-memory data second.
fn read_attachment_bytes<A: ArchiveAttachment>(attachment: &A) -> Option<Vec<u8>> {
    if let Some(size) = attachment.declared_size()
        && let Ok(bytes) = attachment.read_buffer(size)
    {
        return Some(bytes);
    }
    attachment.data()
}

/// Reduces an HTML body to matchable text.
fn html_to_text(html: &str) -> String {
    htmd::convert(html).unwrap_or_default()
}
