//! Provider adapters
//!
//! One adapter per upstream protocol, each implementing [`TenementProvider`]:
//!
//! - [`arcgis::ArcGisProvider`]: paged ArcGIS REST (WA, QLD, TAS)
//! - [`wfs::WfsProvider`]: WFS GeoJSON with sample fallback (VIC)
//! - [`zip_archive::ZipArchiveProvider`]: ZIP of CSV/TAB tables (NT)
//! - [`delimited::DelimitedProvider`]: CSV over HTTP (NSW)
//!
//! [`ProviderRegistry`] holds one adapter per jurisdiction, built once from
//! configuration and shared behind an `Arc`.

pub mod arcgis;
pub mod attributes;
pub mod delimited;
pub mod http;
pub mod sample;
pub mod tabular;
pub mod wfs;
pub mod zip_archive;

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tenement_common::{Jurisdiction, SourceFormat};

use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::ingest::models::{EndpointDescriptor, ProviderStatus, TenementRecord};

pub use arcgis::ArcGisProvider;
pub use delimited::DelimitedProvider;
pub use wfs::WfsProvider;
pub use zip_archive::ZipArchiveProvider;

/// Source adapter for one jurisdiction
#[async_trait]
pub trait TenementProvider: Send + Sync {
    fn jurisdiction(&self) -> Jurisdiction;

    /// Probe the upstream endpoint; failures are reported, never returned
    async fn check_status(&self) -> ProviderStatus;

    /// Fetch and normalize the full upstream record set
    async fn fetch_tenements(&self) -> Result<Vec<TenementRecord>>;
}

/// Protocol each regulator publishes in
pub fn default_format(jurisdiction: Jurisdiction) -> SourceFormat {
    match jurisdiction {
        Jurisdiction::Wa | Jurisdiction::Qld | Jurisdiction::Tas => SourceFormat::ArcgisRest,
        Jurisdiction::Vic => SourceFormat::Wfs,
        Jurisdiction::Nt => SourceFormat::TabInZip,
        Jurisdiction::Nsw => SourceFormat::Csv,
    }
}

/// Build an adapter for an arbitrary endpoint and format
pub fn build_provider(
    jurisdiction: Jurisdiction,
    format: SourceFormat,
    endpoint: EndpointDescriptor,
    settings: &IngestSettings,
    client: Client,
) -> Arc<dyn TenementProvider> {
    match format {
        SourceFormat::ArcgisRest => {
            Arc::new(ArcGisProvider::new(jurisdiction, endpoint, settings, client))
        },
        SourceFormat::Wfs => Arc::new(WfsProvider::new(jurisdiction, endpoint, settings, client)),
        SourceFormat::Csv => {
            Arc::new(DelimitedProvider::new(jurisdiction, endpoint, settings, client))
        },
        SourceFormat::TabInZip => {
            Arc::new(ZipArchiveProvider::new(jurisdiction, endpoint, settings, client))
        },
    }
}

/// Jurisdiction to adapter map
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Jurisdiction, Arc<dyn TenementProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One adapter per configured endpoint, in the regulator's default format
    pub fn from_settings(settings: &IngestSettings, client: Client) -> Self {
        let mut registry = Self::new();
        for jurisdiction in Jurisdiction::ALL {
            if let Some(endpoint) = settings.endpoint(jurisdiction) {
                registry = registry.with_provider(build_provider(
                    jurisdiction,
                    default_format(jurisdiction),
                    endpoint.clone(),
                    settings,
                    client.clone(),
                ));
            }
        }
        registry
    }

    /// Register (or replace) the adapter for its jurisdiction
    pub fn with_provider(mut self, provider: Arc<dyn TenementProvider>) -> Self {
        self.providers.insert(provider.jurisdiction(), provider);
        self
    }

    pub fn get(&self, jurisdiction: Jurisdiction) -> Result<Arc<dyn TenementProvider>> {
        self.providers
            .get(&jurisdiction)
            .cloned()
            .ok_or_else(|| IngestError::no_provider(jurisdiction))
    }

    pub fn jurisdictions(&self) -> Vec<Jurisdiction> {
        let mut list: Vec<_> = self.providers.keys().copied().collect();
        list.sort();
        list
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("jurisdictions", &self.jurisdictions())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_configured_jurisdiction() {
        let registry = ProviderRegistry::from_settings(&IngestSettings::default(), Client::new());
        assert_eq!(registry.len(), 6);
        for jurisdiction in Jurisdiction::ALL {
            assert_eq!(registry.get(jurisdiction).unwrap().jurisdiction(), jurisdiction);
        }
    }

    #[test]
    fn test_missing_jurisdiction_is_configuration_error() {
        let mut settings = IngestSettings::default();
        settings.endpoints.remove(&Jurisdiction::Tas);

        let registry = ProviderRegistry::from_settings(&settings, Client::new());
        let err = registry.get(Jurisdiction::Tas).err().unwrap();
        assert!(matches!(err, IngestError::Configuration(_)));
    }

    #[test]
    fn test_default_formats() {
        assert_eq!(default_format(Jurisdiction::Wa), SourceFormat::ArcgisRest);
        assert_eq!(default_format(Jurisdiction::Vic), SourceFormat::Wfs);
        assert_eq!(default_format(Jurisdiction::Nt), SourceFormat::TabInZip);
        assert_eq!(default_format(Jurisdiction::Nsw), SourceFormat::Csv);
    }
}
