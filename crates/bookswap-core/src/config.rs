//! Configuration module
//!
//! Environment-driven configuration for the storage backend and the backfill
//! job. Values are read once at startup; the resolved configuration is
//! immutable for the process lifetime.

use std::env;

const DEFAULT_PREFIX: &str = "uploads/books";
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 6 * 60 * 60;
const DEFAULT_BACKFILL_LIMIT: u32 = 100;
const DEFAULT_BACKFILL_START_PAGE: u32 = 1;
const DEFAULT_BACKFILL_MAX_PAGES: u32 = 0; // 0 = no cap
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Object storage configuration.
///
/// `bucket` and `region` are optional on purpose: when either is missing the
/// process degrades to the in-memory staging backend instead of failing.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub prefix: String,
    pub signed_urls: bool,
    pub signed_url_ttl_secs: u64,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let region = env::var("AWS_REGION").ok().filter(|s| !s.is_empty());
        let bucket = env::var("S3_BUCKET").ok().filter(|s| !s.is_empty());

        let prefix = env::var("S3_PREFIX")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string())
            .trim_matches('/')
            .to_string();

        let signed_urls = env::var("S3_SIGNED_URLS")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let signed_url_ttl_secs = env::var("S3_SIGNED_URL_TTL")
            .unwrap_or_else(|_| DEFAULT_SIGNED_URL_TTL_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_SIGNED_URL_TTL_SECS);

        let config = StorageConfig {
            region,
            bucket,
            prefix,
            signed_urls,
            signed_url_ttl_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.prefix.is_empty() {
            return Err(anyhow::anyhow!("S3_PREFIX must not be empty"));
        }
        if self.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("S3_SIGNED_URL_TTL must be at least 1 second"));
        }
        Ok(())
    }

    /// Whether enough configuration is present to use the real backend.
    pub fn is_s3_configured(&self) -> bool {
        self.bucket.is_some() && self.region.is_some()
    }

    /// Names of the backend variables that are missing, for startup warnings.
    pub fn missing_vars(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.region.is_none() {
            missing.push("AWS_REGION");
        }
        if self.bucket.is_none() {
            missing.push("S3_BUCKET");
        }
        missing
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            region: None,
            bucket: None,
            prefix: DEFAULT_PREFIX.to_string(),
            signed_urls: false,
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
        }
    }
}

/// Backfill job configuration.
///
/// Dry-run defaults to true: the migrator never mutates records without an
/// explicit opt-in.
#[derive(Clone, Debug)]
pub struct BackfillConfig {
    pub dry_run: bool,
    pub limit: u32,
    pub start_page: u32,
    pub max_pages: u32,
}

impl BackfillConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let dry_run = env::var("BACKFILL_DRY_RUN")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        let limit = env::var("BACKFILL_LIMIT")
            .unwrap_or_else(|_| DEFAULT_BACKFILL_LIMIT.to_string())
            .parse::<u32>()
            .unwrap_or(DEFAULT_BACKFILL_LIMIT);

        let start_page = env::var("BACKFILL_START_PAGE")
            .unwrap_or_else(|_| DEFAULT_BACKFILL_START_PAGE.to_string())
            .parse::<u32>()
            .unwrap_or(DEFAULT_BACKFILL_START_PAGE);

        let max_pages = env::var("BACKFILL_MAX_PAGES")
            .unwrap_or_else(|_| DEFAULT_BACKFILL_MAX_PAGES.to_string())
            .parse::<u32>()
            .unwrap_or(DEFAULT_BACKFILL_MAX_PAGES);

        let config = BackfillConfig {
            dry_run,
            limit,
            start_page,
            max_pages,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.limit == 0 {
            return Err(anyhow::anyhow!("BACKFILL_LIMIT must be at least 1"));
        }
        if self.start_page == 0 {
            return Err(anyhow::anyhow!("BACKFILL_START_PAGE is 1-based"));
        }
        Ok(())
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        BackfillConfig {
            dry_run: true,
            limit: DEFAULT_BACKFILL_LIMIT,
            start_page: DEFAULT_BACKFILL_START_PAGE,
            max_pages: DEFAULT_BACKFILL_MAX_PAGES,
        }
    }
}

/// Database configuration. Unlike storage, a missing DATABASE_URL is fatal.
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| DEFAULT_DB_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

        let acquire_timeout_secs = env::var("DB_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| DEFAULT_DB_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS);

        Ok(DbConfig {
            database_url,
            max_connections,
            acquire_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_defaults() {
        let config = StorageConfig::default();
        assert!(!config.is_s3_configured());
        assert_eq!(config.prefix, "uploads/books");
        assert!(!config.signed_urls);
        assert_eq!(config.signed_url_ttl_secs, 21600);
        assert_eq!(config.missing_vars(), vec!["AWS_REGION", "S3_BUCKET"]);
    }

    #[test]
    fn storage_validate_rejects_empty_prefix() {
        let config = StorageConfig {
            prefix: String::new(),
            ..StorageConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn storage_configured_needs_both_vars() {
        let config = StorageConfig {
            bucket: Some("covers".to_string()),
            ..StorageConfig::default()
        };
        assert!(!config.is_s3_configured());
        assert_eq!(config.missing_vars(), vec!["AWS_REGION"]);

        let config = StorageConfig {
            bucket: Some("covers".to_string()),
            region: Some("us-east-1".to_string()),
            ..StorageConfig::default()
        };
        assert!(config.is_s3_configured());
        assert!(config.missing_vars().is_empty());
    }

    #[test]
    fn backfill_defaults_to_dry_run() {
        let config = BackfillConfig::default();
        assert!(config.dry_run);
        assert_eq!(config.limit, 100);
        assert_eq!(config.start_page, 1);
        assert_eq!(config.max_pages, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backfill_validate_rejects_zero_page_size() {
        let config = BackfillConfig {
            limit: 0,
            ..BackfillConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BackfillConfig {
            start_page: 0,
            ..BackfillConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
