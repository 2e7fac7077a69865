//! Instrument sources and the registry holding them

use std::sync::Arc;

use reqwest::Url;

use crate::config::{Config, MeterConfig};
use crate::error::SyncError;

/// A configured instrument source (meter)
///
/// Immutable for the lifetime of the process and shared read-only by both
/// syncers of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Meter identifier
    pub id: String,
    /// Base URL of the local archive API, without a trailing slash
    pub base_url: String,
    /// Archive name scoping snapshot queries
    pub archive_name: String,
}

impl Source {
    /// Create a new source
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        archive_name: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            id: id.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            archive_name: archive_name.into(),
        }
    }

    /// Build a URL below the archive API base with the given query pairs
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, SyncError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url =
            Url::parse(&raw).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

impl From<&MeterConfig> for Source {
    fn from(meter: &MeterConfig) -> Self {
        Source::new(&meter.id, &meter.local_api_url, &meter.archive_name)
    }
}

/// The set of configured sources
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<Source>>,
}

impl SourceRegistry {
    /// Create a registry from an explicit list of sources
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            sources: sources.into_iter().map(Arc::new).collect(),
        }
    }

    /// Build the registry from validated configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.meters.iter().map(Source::from).collect())
    }

    /// Iterate over all sources in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Source>> {
        self.sources.iter()
    }

    /// Look up a source by id
    pub fn get(&self, id: &str) -> Option<&Arc<Source>> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Identifiers of all sources in configuration order
    pub fn ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
