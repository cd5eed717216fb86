use bookswap_core::BackfillConfig;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Apply command-line overrides on top of the environment-derived backfill
/// configuration. Flags win over environment variables.
pub fn merge_backfill_flags(
    mut config: BackfillConfig,
    execute: bool,
    limit: Option<u32>,
    start_page: Option<u32>,
    max_pages: Option<u32>,
) -> BackfillConfig {
    if execute {
        config.dry_run = false;
    }
    if let Some(limit) = limit {
        config.limit = limit;
    }
    if let Some(start_page) = start_page {
        config.start_page = start_page;
    }
    if let Some(max_pages) = max_pages {
        config.max_pages = max_pages;
    }
    config
}
