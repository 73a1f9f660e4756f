//! Data models for ingestion
//!
//! Canonical tenement records, data source configuration rows, and the
//! results handed back to callers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tenement_common::{Jurisdiction, SourceFormat};
use uuid::Uuid;

/// Canonical tenement record
///
/// `(jurisdiction, number)` is the natural key. Type and status hold the
/// normalized label, or the raw upstream value when no mapping exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenementRecord {
    pub number: String,
    pub jurisdiction: Jurisdiction,
    pub tenement_type: String,
    pub status: String,
    pub holder_name: Option<String>,
    pub application_date: Option<NaiveDate>,
    pub grant_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub anniversary_date: Option<NaiveDate>,
    pub markout_date: Option<NaiveDate>,
    pub area_ha: Option<f64>,
    pub section29_flag: bool,
    /// GeoJSON geometry as delivered upstream, never reprojected
    pub geometry: Option<serde_json::Value>,
    pub last_sync_at: DateTime<Utc>,
}

impl TenementRecord {
    /// Minimal record; optional fields start empty
    pub fn new(
        jurisdiction: Jurisdiction,
        number: impl Into<String>,
        tenement_type: impl Into<String>,
        status: impl Into<String>,
        last_sync_at: DateTime<Utc>,
    ) -> Self {
        Self {
            number: number.into(),
            jurisdiction,
            tenement_type: tenement_type.into(),
            status: status.into(),
            holder_name: None,
            application_date: None,
            grant_date: None,
            expiry_date: None,
            anniversary_date: None,
            markout_date: None,
            area_ha: None,
            section29_flag: false,
            geometry: None,
            last_sync_at,
        }
    }

    pub fn key(&self) -> TenementKey {
        TenementKey {
            jurisdiction: self.jurisdiction,
            number: self.number.clone(),
        }
    }
}

/// Natural key of a stored tenement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenementKey {
    pub jurisdiction: Jurisdiction,
    pub number: String,
}

/// Where and how to reach an upstream source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub url: String,
    /// WFS type name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    /// Stable ascending key for ArcGIS paging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

impl EndpointDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            layer: None,
            order_by: None,
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }
}

/// Sync lifecycle of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Running,
    Success,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStatus::Pending),
            "running" => Ok(SyncStatus::Running),
            "success" => Ok(SyncStatus::Success),
            "error" => Ok(SyncStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid sync status: {}", s)),
        }
    }
}

/// Liveness of an upstream endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceHealth {
    Active,
    Inactive,
    Error,
}

impl SourceHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceHealth::Active => "active",
            SourceHealth::Inactive => "inactive",
            SourceHealth::Error => "error",
        }
    }
}

impl std::fmt::Display for SourceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceHealth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SourceHealth::Active),
            "inactive" => Ok(SourceHealth::Inactive),
            "error" => Ok(SourceHealth::Error),
            _ => Err(anyhow::anyhow!("Invalid source health: {}", s)),
        }
    }
}

/// Outcome of one provider probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub status: SourceHealth,
    pub error: Option<String>,
}

impl ProviderStatus {
    pub fn active() -> Self {
        Self {
            status: SourceHealth::Active,
            error: None,
        }
    }

    pub fn inactive(reason: impl Into<String>) -> Self {
        Self {
            status: SourceHealth::Inactive,
            error: Some(reason.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SourceHealth::Error,
            error: Some(message.into()),
        }
    }
}

/// Data source configuration (maps to the data_sources table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub id: Uuid,
    pub name: String,
    pub jurisdiction: Jurisdiction,
    pub endpoint: EndpointDescriptor,
    pub format: SourceFormat,
    pub sync_status: SyncStatus,
    pub last_sync_attempt: Option<DateTime<Utc>>,
    pub last_sync_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub record_count: i64,
    pub is_enabled: bool,
    pub health_status: Option<SourceHealth>,
    pub health_error: Option<String>,
    pub last_health_check: Option<DateTime<Utc>>,
}

impl DataSourceConfig {
    /// Fresh, enabled, never-synced source
    pub fn new(
        name: impl Into<String>,
        jurisdiction: Jurisdiction,
        endpoint: EndpointDescriptor,
        format: SourceFormat,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            jurisdiction,
            endpoint,
            format,
            sync_status: SyncStatus::Pending,
            last_sync_attempt: None,
            last_sync_success: None,
            last_error: None,
            record_count: 0,
            is_enabled: true,
            health_status: None,
            health_error: None,
            last_health_check: None,
        }
    }
}

/// Result of one health probe in a status sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
    pub source_id: Uuid,
    pub name: String,
    pub jurisdiction: Jurisdiction,
    pub status: SourceHealth,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Result of one jurisdiction sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub jurisdiction: Jurisdiction,
    pub imported: usize,
    /// One entry per failed batch
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl SyncResult {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
