//! Index storage repository.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Transaction};
use tracing::error;

use super::model::{AttachmentRecord, IngestionStatus, MessageRecord};
use crate::Result;
use crate::config::{Keyword, Stakeholder};

/// Repository for the relational index: email metadata, attachment
/// provenance, and the per-profile keyword/stakeholder configuration.
pub struct IndexRepository {
    pool: SqlitePool,
}

impl IndexRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_index (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id TEXT NOT NULL,
                profile_type TEXT NOT NULL DEFAULT 'project',
                source_path TEXT NOT NULL DEFAULT '',
                natural_key TEXT NOT NULL,
                message_id TEXT,
                in_reply_to TEXT,
                subject TEXT NOT NULL DEFAULT '',
                from_address TEXT NOT NULL DEFAULT '',
                to_addresses TEXT NOT NULL DEFAULT '',
                cc_addresses TEXT NOT NULL DEFAULT '',
                date_sent TEXT,
                conversation_index TEXT,
                thread_id TEXT NOT NULL,
                folder_path TEXT NOT NULL DEFAULT '',
                keywords TEXT NOT NULL DEFAULT '',
                stakeholders TEXT NOT NULL DEFAULT '',
                attachments_count INTEGER NOT NULL DEFAULT 0,
                has_attachments INTEGER NOT NULL DEFAULT 0,
                indexed_date TEXT NOT NULL,
                source_archive_name TEXT NOT NULL DEFAULT '',
                UNIQUE(profile_id, source_archive_name, natural_key)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id TEXT NOT NULL,
                email_reference_id TEXT,
                filename TEXT NOT NULL DEFAULT '',
                file_path TEXT NOT NULL,
                file_size INTEGER NOT NULL DEFAULT 0,
                mime_type TEXT NOT NULL DEFAULT '',
                source_archive_name TEXT NOT NULL DEFAULT '',
                hash TEXT NOT NULL,
                is_inline INTEGER NOT NULL DEFAULT 0,
                from_email TEXT NOT NULL DEFAULT '',
                date_sent TEXT,
                keywords TEXT NOT NULL DEFAULT '',
                stakeholders TEXT NOT NULL DEFAULT '',
                extracted_date TEXT NOT NULL,
                document_type TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Configuration tables, written by the surrounding application;
        // read-only from the engine's point of view.
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id TEXT NOT NULL,
                profile_type TEXT NOT NULL DEFAULT 'project',
                keyword_name TEXT NOT NULL,
                variations TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS stakeholders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id TEXT NOT NULL,
                profile_type TEXT NOT NULL DEFAULT 'project',
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Indexes for the common lookups
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_email_index_profile
            ON email_index(profile_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_email_index_thread
            ON email_index(profile_id, thread_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_attachments_hash
            ON attachments(profile_id, hash)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Begins a transaction scoped to one message's writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot start a transaction; that
    /// is a persistence error and fatal to the run.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Writes one message row inside the given transaction, insert-or-update
    /// on the natural identity so re-ingesting the same archive is
    /// idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert_message(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        record: &MessageRecord,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO email_index (
                profile_id, profile_type, source_path, natural_key, message_id,
                in_reply_to, subject, from_address, to_addresses, cc_addresses,
                date_sent, conversation_index, thread_id, folder_path, keywords,
                stakeholders, attachments_count, has_attachments, indexed_date,
                source_archive_name
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(profile_id, source_archive_name, natural_key) DO UPDATE SET
                profile_type = excluded.profile_type,
                source_path = excluded.source_path,
                message_id = excluded.message_id,
                in_reply_to = excluded.in_reply_to,
                subject = excluded.subject,
                from_address = excluded.from_address,
                to_addresses = excluded.to_addresses,
                cc_addresses = excluded.cc_addresses,
                date_sent = excluded.date_sent,
                conversation_index = excluded.conversation_index,
                thread_id = excluded.thread_id,
                folder_path = excluded.folder_path,
                keywords = excluded.keywords,
                stakeholders = excluded.stakeholders,
                attachments_count = excluded.attachments_count,
                has_attachments = excluded.has_attachments,
                indexed_date = excluded.indexed_date
            ",
        )
        .bind(&record.profile_id)
        .bind(&record.profile_type)
        .bind(&record.source_path)
        .bind(record.natural_key())
        .bind(&record.message_id)
        .bind(&record.in_reply_to)
        .bind(&record.subject)
        .bind(&record.from_address)
        .bind(&record.to_addresses)
        .bind(&record.cc_addresses)
        .bind(&record.date_sent)
        .bind(&record.conversation_index)
        .bind(&record.thread_id)
        .bind(&record.folder_path)
        .bind(record.keywords.join(","))
        .bind(record.stakeholders.join(","))
        .bind(record.attachments_count)
        .bind(record.has_attachments)
        .bind(record.indexed_at.to_rfc3339())
        .bind(&record.source_archive_name)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Writes one attachment provenance row inside the given transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_attachment(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        record: &AttachmentRecord,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO attachments (
                profile_id, email_reference_id, filename, file_path, file_size,
                mime_type, source_archive_name, hash, is_inline, from_email,
                date_sent, keywords, stakeholders, extracted_date, document_type
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&record.profile_id)
        .bind(&record.email_reference_id)
        .bind(&record.filename)
        .bind(&record.storage_path)
        .bind(record.size_bytes)
        .bind(&record.mime_type)
        .bind(&record.source_archive_name)
        .bind(&record.content_hash)
        .bind(record.is_inline)
        .bind(&record.from_email)
        .bind(&record.date_sent)
        .bind(record.keywords.join(","))
        .bind(record.stakeholders.join(","))
        .bind(record.extracted_at.to_rfc3339())
        .bind(&record.document_type)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Loads the configured keyword list for a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load_keywords(
        &self,
        profile_id: &str,
        profile_type: &str,
    ) -> Result<Vec<Keyword>> {
        let rows = sqlx::query(
            r"
            SELECT keyword_name, variations FROM keywords
            WHERE profile_id = ? AND profile_type = ?
            ",
        )
        .bind(profile_id)
        .bind(profile_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("keyword_name");
                let variations: String = row.get("variations");
                Keyword::from_row(&name, &variations)
            })
            .filter(|kw| !kw.label.is_empty())
            .collect())
    }

    /// Loads the configured stakeholder roster for a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load_stakeholders(
        &self,
        profile_id: &str,
        profile_type: &str,
    ) -> Result<Vec<Stakeholder>> {
        let rows = sqlx::query(
            r"
            SELECT name, email, role FROM stakeholders
            WHERE profile_id = ? AND profile_type = ?
            ",
        )
        .bind(profile_id)
        .bind(profile_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                let email: String = row.get("email");
                let role: String = row.get("role");
                Stakeholder::from_row(&name, &email, &role)
            })
            .collect())
    }

    /// Adds a keyword configuration row (used by the surrounding
    /// application and test setup).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn add_keyword(
        &self,
        profile_id: &str,
        profile_type: &str,
        keyword_name: &str,
        variations: &str,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO keywords (profile_id, profile_type, keyword_name, variations)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(profile_id)
        .bind(profile_type)
        .bind(keyword_name)
        .bind(variations)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Adds a stakeholder roster row (used by the surrounding application
    /// and test setup).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn add_stakeholder(
        &self,
        profile_id: &str,
        profile_type: &str,
        name: &str,
        email: &str,
        role: &str,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO stakeholders (profile_id, profile_type, name, email, role)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(profile_id)
        .bind(profile_type)
        .bind(name)
        .bind(email)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of indexed emails for a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn message_count(&self, profile_id: &str) -> Result<i64> {
        let row = sqlx::query(r"SELECT COUNT(*) as count FROM email_index WHERE profile_id = ?")
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Status query: a simple count against the index, independent of any
    /// in-flight run. Query failures are reported in the structure rather
    /// than propagated.
    pub async fn status(&self, profile_id: &str) -> IngestionStatus {
        match self.message_count(profile_id).await {
            Ok(total) => IngestionStatus {
                total_emails: total,
                status: "complete".to_string(),
                error: None,
            },
            Err(e) => {
                error!("Failed to fetch ingestion status: {e}");
                IngestionStatus {
                    total_emails: 0,
                    status: "error".to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// All attachment rows for a profile, ordered by insertion.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn attachments_for_profile(
        &self,
        profile_id: &str,
    ) -> Result<Vec<AttachmentRecord>> {
        let rows = sqlx::query(
            r"
            SELECT profile_id, email_reference_id, filename, file_path, file_size,
                   mime_type, source_archive_name, hash, is_inline, from_email,
                   date_sent, keywords, stakeholders, extracted_date, document_type
            FROM attachments
            WHERE profile_id = ?
            ORDER BY id
            ",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(|row| {
                let extracted_str: String = row.get("extracted_date");
                let extracted_at = DateTime::parse_from_rfc3339(&extracted_str)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                AttachmentRecord {
                    profile_id: row.get("profile_id"),
                    email_reference_id: row.get("email_reference_id"),
                    filename: row.get("filename"),
                    storage_path: row.get("file_path"),
                    size_bytes: row.get("file_size"),
                    mime_type: row.get("mime_type"),
                    source_archive_name: row.get("source_archive_name"),
                    content_hash: row.get("hash"),
                    is_inline: row.get::<bool, _>("is_inline"),
                    from_email: row.get("from_email"),
                    date_sent: row.get("date_sent"),
                    keywords: split_csv(&row.get::<String, _>("keywords")),
                    stakeholders: split_csv(&row.get::<String, _>("stakeholders")),
                    extracted_at,
                    document_type: row.get("document_type"),
                }
            })
            .collect();

        Ok(records)
    }

    /// Thread ids assigned for a profile, one per indexed message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn thread_ids_for_profile(&self, profile_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(r"SELECT thread_id FROM email_index WHERE profile_id = ? ORDER BY id")
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("thread_id")).collect())
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(profile_id: &str, message_id: Option<&str>, subject: &str) -> MessageRecord {
        MessageRecord {
            profile_id: profile_id.to_string(),
            profile_type: "project".to_string(),
            source_path: "/archives/export".to_string(),
            message_id: message_id.map(ToString::to_string),
            in_reply_to: None,
            subject: subject.to_string(),
            from_address: "a@example.com".to_string(),
            to_addresses: String::new(),
            cc_addresses: String::new(),
            date_sent: None,
            conversation_index: None,
            thread_id: "thread-1".to_string(),
            folder_path: "Root".to_string(),
            keywords: vec!["Delay".to_string()],
            stakeholders: vec![],
            attachments_count: 0,
            has_attachments: false,
            indexed_at: Utc::now(),
            source_archive_name: "export".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let repo = IndexRepository::in_memory().await.unwrap();
        let record = message("p1", Some("<m1@x>"), "Hello");

        for _ in 0..2 {
            let mut tx = repo.begin().await.unwrap();
            repo.upsert_message(&mut tx, &record).await.unwrap();
            tx.commit().await.unwrap();
        }

        assert_eq!(repo.message_count("p1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_messages_without_ids_fall_back_to_composite_key() {
        let repo = IndexRepository::in_memory().await.unwrap();

        let first = message("p1", None, "Subject A");
        let mut second = message("p1", None, "Subject B");
        second.folder_path = "Root/Sent".to_string();

        let mut tx = repo.begin().await.unwrap();
        repo.upsert_message(&mut tx, &first).await.unwrap();
        repo.upsert_message(&mut tx, &second).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.message_count("p1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let repo = IndexRepository::in_memory().await.unwrap();
        let record = message("p1", Some("<m1@x>"), "Hello");

        let mut tx = repo.begin().await.unwrap();
        repo.upsert_message(&mut tx, &record).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(repo.message_count("p1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attachment_roundtrip() {
        let repo = IndexRepository::in_memory().await.unwrap();
        let record = AttachmentRecord {
            profile_id: "p1".to_string(),
            email_reference_id: Some("<m1@x>".to_string()),
            filename: "report.pdf".to_string(),
            storage_path: "/blobs/abc.pdf".to_string(),
            size_bytes: 7,
            mime_type: "application/pdf".to_string(),
            source_archive_name: "export".to_string(),
            content_hash: "abc123".to_string(),
            is_inline: false,
            from_email: "a@example.com".to_string(),
            date_sent: None,
            keywords: vec!["Delay".to_string()],
            stakeholders: vec![],
            extracted_at: Utc::now(),
            document_type: None,
        };

        let mut tx = repo.begin().await.unwrap();
        repo.insert_attachment(&mut tx, &record).await.unwrap();
        tx.commit().await.unwrap();

        let rows = repo.attachments_for_profile("p1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].filename, "report.pdf");
        assert_eq!(rows[0].content_hash, "abc123");
        assert_eq!(rows[0].keywords, vec!["Delay"]);
        assert!(rows[0].document_type.is_none());
    }

    #[tokio::test]
    async fn test_config_load() {
        let repo = IndexRepository::in_memory().await.unwrap();
        repo.add_keyword("p1", "project", "Delay", "postponement,hold-up")
            .await
            .unwrap();
        repo.add_stakeholder("p1", "project", "Jane", "JANE@X.COM", "PM")
            .await
            .unwrap();

        let keywords = repo.load_keywords("p1", "project").await.unwrap();
        assert_eq!(keywords.len(), 1);
        assert_eq!(keywords[0].variations, vec!["postponement", "hold-up"]);

        let roster = repo.load_stakeholders("p1", "project").await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].email, "jane@x.com");

        // Scoping by profile
        assert!(repo.load_keywords("p2", "project").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_counts() {
        let repo = IndexRepository::in_memory().await.unwrap();
        let status = repo.status("p1").await;
        assert_eq!(status.total_emails, 0);
        assert_eq!(status.status, "complete");

        let mut tx = repo.begin().await.unwrap();
        repo.upsert_message(&mut tx, &message("p1", Some("<m1@x>"), "s"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.status("p1").await.total_emails, 1);
    }
}
