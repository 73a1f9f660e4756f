//! Configuration management
//!
//! Settings come from `.env` (via dotenvy) and the process environment, on top
//! of the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tenement_common::Jurisdiction;

use crate::db::MAX_UPSERT_BATCH_SIZE;
use crate::ingest::models::EndpointDescriptor;
use crate::ingest::retry::RetryPolicy;

// ============================================================================
// Database Defaults
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/tenements";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Ingestion Defaults
// ============================================================================

/// Records written per upsert statement.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Records requested per ArcGIS page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Attempts per page (first try included).
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Fixed delay between page attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Pause between consecutive ArcGIS pages.
pub const DEFAULT_PAGE_DELAY_MS: u64 = 500;

/// Health probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Data fetch timeout (per HTTP call).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Maximum features requested from a WFS endpoint.
pub const DEFAULT_WFS_FEATURE_CAP: usize = 5000;

pub const USER_AGENT: &str = concat!("tenement-ingest/", env!("CARGO_PKG_VERSION"));

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ingest: IngestSettings,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Tuning knobs shared by every provider and the batch engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    pub batch_size: usize,
    pub page_size: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub page_delay_ms: u64,
    pub probe_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub wfs_feature_cap: usize,
    /// Upstream endpoint per jurisdiction
    pub endpoints: BTreeMap<Jurisdiction, EndpointDescriptor>,
}

impl IngestSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn endpoint(&self, jurisdiction: Jurisdiction) -> Option<&EndpointDescriptor> {
        self.endpoints.get(&jurisdiction)
    }

    /// Same settings with every delay zeroed, for fixtures and dry runs
    pub fn without_delays(mut self) -> Self {
        self.retry_delay_ms = 0;
        self.page_delay_ms = 0;
        self
    }

    fn from_env() -> Self {
        let defaults = Self::default();
        let mut endpoints = defaults.endpoints.clone();

        for jurisdiction in Jurisdiction::ALL {
            let key = format!("INGEST_{}_URL", jurisdiction.as_str());
            if let Ok(url) = std::env::var(&key) {
                endpoints
                    .entry(jurisdiction)
                    .and_modify(|e| e.url = url.clone())
                    .or_insert_with(|| EndpointDescriptor::new(url));
            }
        }

        Self {
            batch_size: env_or("INGEST_BATCH_SIZE", defaults.batch_size),
            page_size: env_or("INGEST_PAGE_SIZE", defaults.page_size),
            retry_attempts: env_or("INGEST_RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_delay_ms: env_or("INGEST_RETRY_DELAY_MS", defaults.retry_delay_ms),
            page_delay_ms: env_or("INGEST_PAGE_DELAY_MS", defaults.page_delay_ms),
            probe_timeout_secs: env_or("INGEST_PROBE_TIMEOUT_SECS", defaults.probe_timeout_secs),
            fetch_timeout_secs: env_or("INGEST_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            wfs_feature_cap: env_or("INGEST_WFS_FEATURE_CAP", defaults.wfs_feature_cap),
            endpoints,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("INGEST_BATCH_SIZE must be greater than 0");
        }
        if self.batch_size > MAX_UPSERT_BATCH_SIZE {
            anyhow::bail!(
                "INGEST_BATCH_SIZE must be at most {} to stay under the PostgreSQL parameter limit",
                MAX_UPSERT_BATCH_SIZE
            );
        }
        if self.page_size == 0 {
            anyhow::bail!("INGEST_PAGE_SIZE must be greater than 0");
        }
        if self.retry_attempts == 0 {
            anyhow::bail!("INGEST_RETRY_ATTEMPTS must be at least 1");
        }
        if self.probe_timeout_secs == 0 || self.fetch_timeout_secs == 0 {
            anyhow::bail!("Ingest timeouts must be greater than 0");
        }
        for (jurisdiction, endpoint) in &self.endpoints {
            if endpoint.url.trim().is_empty() {
                anyhow::bail!("Endpoint URL for {} cannot be empty", jurisdiction);
            }
        }
        Ok(())
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            wfs_feature_cap: DEFAULT_WFS_FEATURE_CAP,
            endpoints: default_endpoints(),
        }
    }
}

/// Public endpoints of each regulator, mirrored by the seed migration
pub fn default_endpoints() -> BTreeMap<Jurisdiction, EndpointDescriptor> {
    Jurisdiction::ALL
        .into_iter()
        .map(|j| {
            let endpoint = match j {
                Jurisdiction::Wa => EndpointDescriptor::new(
                    "https://services.slip.wa.gov.au/public/rest/services/SLIP_Public_Services/Industry_and_Mining/MapServer/3/query",
                )
                .with_order_by("OBJECTID"),
                Jurisdiction::Nsw => EndpointDescriptor::new(
                    "https://datasets.seed.nsw.gov.au/dataset/mining-titles/resource/current_titles.csv",
                ),
                Jurisdiction::Vic => {
                    EndpointDescriptor::new("https://opendata.maps.vic.gov.au/geoserver/wfs")
                        .with_layer("open-data-platform:mintenement")
                },
                Jurisdiction::Nt => EndpointDescriptor::new(
                    "https://geoscience.nt.gov.au/downloads/MineralTitles_Current.zip",
                ),
                Jurisdiction::Qld => EndpointDescriptor::new(
                    "https://spatial-gis.information.qld.gov.au/arcgis/rest/services/Economy/MinesPermitsCurrent/MapServer/0/query",
                )
                .with_order_by("OBJECTID"),
                Jurisdiction::Tas => EndpointDescriptor::new(
                    "https://data.stategrowth.tas.gov.au/ags/rest/services/MRT/Tenements/MapServer/0/query",
                )
                .with_order_by("OBJECTID"),
            };
            (j, endpoint)
        })
        .collect()
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            ingest: IngestSettings::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        self.ingest.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            ingest: IngestSettings::default(),
        }
    }
}
