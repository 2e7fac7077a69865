//! Synchronization engine
//!
//! Moves snapshot batches and maintenance reports from each meter's local
//! archive to the remote service.
//!
//! # Components
//!
//! - [`http_client`]: HTTP client with per-call timeouts
//! - [`retry`]: fixed-delay retry executor with progress events
//! - [`window`]: batch window resolution from the newest archive page
//! - [`timestamp`]: snapshot timestamp normalisation
//! - [`snapshot`]: snapshot batch syncer
//! - [`extract`]: batch number extraction strategies for reports
//! - [`report`]: report ticket syncer
//! - [`scheduler`]: coordinator with busy-skip semantics and the periodic loop
//!
//! # Example
//!
//! ```ignore
//! use flowsync::config::Config;
//! use flowsync::sync::{build_coordinator, TimedHttpClient};
//!
//! let config = Config::from_env()?;
//! let coordinator = build_coordinator(&config, TimedHttpClient::new()?);
//! let outcome = coordinator.trigger_all().await;
//! ```

pub mod extract;
pub mod http_client;
pub mod report;
pub mod retry;
pub mod scheduler;
pub mod snapshot;
pub mod timestamp;
pub mod window;

use std::sync::Arc;

use crate::config::Config;
use crate::models::SourceRegistry;

// Re-export main types for convenience
pub use extract::{BatchIdExtractor, ExtractorChain};
pub use http_client::TimedHttpClient;
pub use report::{ReportOutcome, ReportSyncReport, ReportTicketSyncer};
pub use retry::{RetryEvent, RetryExecutor};
pub use scheduler::{SyncCoordinator, Syncable, SyncerKind, TriggerOutcome};
pub use snapshot::{BatchOutcome, SnapshotBatchSyncer, SnapshotSyncReport};
pub use window::resolve_window;

/// Build one snapshot unit per source, plus one report unit per source
/// when a ticket URL is configured
pub fn build_units(
    config: &Config,
    registry: &SourceRegistry,
    client: TimedHttpClient,
) -> Vec<Arc<dyn Syncable>> {
    let remote = client.with_bearer(&config.remote.token);
    let mut units: Vec<Arc<dyn Syncable>> = Vec::new();

    for source in registry.iter() {
        units.push(Arc::new(SnapshotBatchSyncer::new(
            source.clone(),
            config,
            client.clone(),
            remote.clone(),
        )));
    }

    for source in registry.iter() {
        if let Some(syncer) =
            ReportTicketSyncer::new(source.clone(), config, client.clone(), remote.clone())
        {
            units.push(Arc::new(syncer));
        }
    }

    units
}

/// Build a coordinator over every configured source
pub fn build_coordinator(config: &Config, client: TimedHttpClient) -> SyncCoordinator {
    let registry = SourceRegistry::from_config(config);
    let units = build_units(config, &registry, client);
    SyncCoordinator::new(units, registry.ids(), RetryExecutor::new(&config.retry))
}
