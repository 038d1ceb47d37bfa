//! `MailVault` - batch mail-archive ingestion and indexing tool.
//!
//! Walks a mailbox export, indexes every message into `SQLite`, resolves
//! conversation threads, and extracts attachments into a content-addressed
//! blob store.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailvault_archive::FsArchive;
use mailvault_core::{
    ContentStore, DEFAULT_CONVERSATION_ROOT_LEN, IndexRepository, IngestionEngine,
    IngestionRequest,
};

#[derive(Parser, Debug)]
#[command(name = "mailvault", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a mailbox export into the index.
    Ingest {
        /// Path to the archive (a directory tree of .eml files).
        archive: PathBuf,

        /// Profile the ingested data belongs to.
        #[arg(long)]
        profile_id: String,

        /// Profile type the keyword/stakeholder configuration is scoped by.
        #[arg(long, default_value = "project")]
        profile_type: String,

        /// Path of the SQLite index database.
        #[arg(long, default_value = "mailvault.db")]
        db: String,

        /// Root directory for extracted attachment blobs.
        #[arg(long, default_value = "blobs")]
        blob_root: PathBuf,

        /// Conversation-index root truncation length.
        #[arg(long, default_value_t = DEFAULT_CONVERSATION_ROOT_LEN)]
        conversation_root_len: usize,

        /// Emit the run statistics as JSON instead of key/value lines.
        #[arg(long)]
        json: bool,
    },

    /// Report how many emails are indexed for a profile.
    Status {
        /// Profile to query.
        #[arg(long)]
        profile_id: String,

        /// Path of the SQLite index database.
        #[arg(long, default_value = "mailvault.db")]
        db: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailvault=info,mailvault_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ingest {
            archive,
            profile_id,
            profile_type,
            db,
            blob_root,
            conversation_root_len,
            json,
        } => {
            info!("Starting ingestion of {}", archive.display());

            let index = IndexRepository::new(&db).await?;
            let store = ContentStore::new(blob_root);
            let engine = IngestionEngine::new(index, store);

            let mut request = IngestionRequest::new(profile_id);
            request.profile_type = profile_type;
            request.conversation_root_len = conversation_root_len;

            let stats = engine.ingest::<FsArchive>(&archive, &request).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("total_messages: {}", stats.total_messages);
                println!("successful: {}", stats.successful);
                println!("failed: {}", stats.failed);
                println!("attachments_stored: {}", stats.attachments_stored);
                println!("threads_identified: {}", stats.threads_identified);
                if let Some(duration) = stats.duration_seconds {
                    println!("duration_seconds: {duration:.2}");
                }
                if let Some(error) = &stats.error {
                    println!("error: {error}");
                }
            }
        }
        Command::Status { profile_id, db } => {
            let index = IndexRepository::new(&db).await?;
            let status = index.status(&profile_id).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
