//! Environment-driven configuration.
//!
//! Every tunable comes from `VIDHARVEST_*` environment variables (loaded
//! through `.env` by `main`), with the defaults the tool ships with. The
//! structs are plain data handed into constructors; nothing reads the
//! environment after startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default canonical domain of the target site.
pub const DEFAULT_DOMAIN: &str = "https://example.com";

const DEFAULT_DELAY_SECS: u64 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_BATCH_LIMIT: i64 = 100;

/// Settings shared by both jobs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Canonical domain, scheme included.
    pub domain: String,
    /// SQLite URL; `None` disables the database sink and makes `migrate`
    /// unavailable.
    pub database_url: Option<String>,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            domain: env_or("VIDHARVEST_DOMAIN", DEFAULT_DOMAIN.to_string()),
            database_url: std::env::var("VIDHARVEST_DATABASE_URL").ok(),
            request_timeout: Duration::from_secs(env_or(
                "VIDHARVEST_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
        }
    }
}

/// Settings for the harvesting loop.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Listing-page URL template; a trailing numeric segment is replaced by
    /// the page number, otherwise `/<page>` is appended.
    pub template: String,
    pub start_page: u32,
    pub end_page: u32,
    /// Fixed sleep between page fetches.
    pub delay: Duration,
    /// Optional flat-file sink; `.json` selects array output, anything else
    /// newline-delimited.
    pub output_path: Option<PathBuf>,
}

impl CrawlConfig {
    pub fn from_env(domain: &str) -> Self {
        Self {
            template: env_or("VIDHARVEST_TEMPLATE", domain.to_string()),
            start_page: env_or("VIDHARVEST_START_PAGE", 1),
            end_page: env_or("VIDHARVEST_END_PAGE", 1),
            delay: Duration::from_secs(env_or("VIDHARVEST_DELAY_SECS", DEFAULT_DELAY_SECS)),
            output_path: std::env::var("VIDHARVEST_OUTPUT").ok().map(PathBuf::from),
        }
    }
}

/// Settings for the migration job.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Metadata endpoint template with a `{url}` placeholder.
    pub metadata_endpoint: String,
    /// Max pending records taken per run.
    pub batch_limit: i64,
    /// Fixed sleep between records.
    pub delay: Duration,
}

impl MigrationConfig {
    pub fn from_env() -> Option<Self> {
        let metadata_endpoint = match std::env::var("VIDHARVEST_METADATA_ENDPOINT") {
            Ok(endpoint) => endpoint,
            Err(_) => return None,
        };

        Some(Self {
            metadata_endpoint,
            batch_limit: env_or("VIDHARVEST_BATCH_LIMIT", DEFAULT_BATCH_LIMIT),
            delay: Duration::from_secs(env_or("VIDHARVEST_DELAY_SECS", DEFAULT_DELAY_SECS)),
        })
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid value for {name}, using default");
                default
            }
        },
        Err(_) => default,
    }
}
