//! Thumbnail backfill job.
//!
//! Walks catalog records oldest-first, migrates legacy image references to
//! the dual `{original, thumb}` shape, and derives missing thumbnails.
//! Dry-run by default; pass --execute to write changes.

use anyhow::{Context, Result};
use clap::Parser;

use bookswap_cli::{init_tracing, merge_backfill_flags};
use bookswap_core::{BackfillConfig, DbConfig, StorageConfig};
use bookswap_db::{setup_database, BookRepository};
use bookswap_services::BackfillMigrator;
use bookswap_storage::select_storage;

#[derive(Parser, Debug)]
#[command(name = "backfill_thumbnails")]
#[command(about = "Backfill thumbnails and migrate legacy image references")]
struct Args {
    /// Apply changes. Without this flag the job reports what it would do
    /// and writes nothing.
    #[arg(long)]
    execute: bool,

    /// Records per page
    #[arg(long, value_name = "N")]
    limit: Option<u32>,

    /// 1-based page to start from
    #[arg(long, value_name = "N")]
    start_page: Option<u32>,

    /// Stop after this many pages (0 = no cap)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let config = merge_backfill_flags(
        BackfillConfig::from_env()?,
        args.execute,
        args.limit,
        args.start_page,
        args.max_pages,
    );
    config.validate()?;

    let db_config = DbConfig::from_env()?;
    let pool = setup_database(&db_config)
        .await
        .context("Failed to set up database")?;
    let repo = BookRepository::new(pool);

    let storage_config = StorageConfig::from_env()?;
    let storage = select_storage(&storage_config)
        .await
        .context("Failed to initialize storage backend")?;

    let migrator =
        BackfillMigrator::new(Box::new(repo), storage, storage_config.prefix.clone(), config);
    migrator.run().await?;

    Ok(())
}
