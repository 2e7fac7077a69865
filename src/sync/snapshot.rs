//! Snapshot batch syncer
//!
//! One run resolves the batch window from the newest archive page, pages
//! backwards through the archive collecting the records of the current and
//! previous batch, and uploads each batch unless the remote already holds
//! the same number of records for it.

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, TimeoutConfig};
use crate::error::SyncError;
use crate::models::{
    is_truthy, normalize_batch, records_from_page, BatchBuckets, Snapshot, Source,
};
use crate::sync::http_client::{parse_url, TimedHttpClient};
use crate::sync::scheduler::{Syncable, SyncerKind};
use crate::sync::timestamp::normalize_all;
use crate::sync::window::resolve_window;

/// What happened to one batch of the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// No local records for this batch
    Empty,
    /// Remote count matched the local count
    AlreadySynced { count: usize },
    /// Every record lacked a usable timestamp
    NoValidRecords { dropped: usize },
    /// Records were uploaded
    Uploaded { count: usize, dropped: usize },
}

/// Outcome of one batch in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub batch_number: String,
    pub outcome: BatchOutcome,
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSyncReport {
    /// Archive pages fetched
    pub pages: usize,
    /// Current batch first, then previous
    pub batches: Vec<BatchResult>,
}

#[derive(Serialize)]
struct BatchUpload<'a> {
    ship_name: &'a str,
    meter_id: &'a str,
    batch_number: &'a str,
    snapshots: &'a [Snapshot],
}

/// Syncs snapshot batches of one source to the remote service
#[derive(Debug, Clone)]
pub struct SnapshotBatchSyncer {
    source: Arc<Source>,
    ship_name: String,
    page_size: usize,
    batch_tag: String,
    probe_url: String,
    upload_url: String,
    timeouts: TimeoutConfig,
    local: TimedHttpClient,
    remote: TimedHttpClient,
}

impl SnapshotBatchSyncer {
    /// Create a syncer for `source`
    ///
    /// `local` talks to the meter's archive, `remote` must already carry
    /// the bearer token.
    pub fn new(
        source: Arc<Source>,
        config: &Config,
        local: TimedHttpClient,
        remote: TimedHttpClient,
    ) -> Self {
        Self {
            source,
            ship_name: config.ship_name.clone(),
            page_size: config.polling.page_size,
            batch_tag: config.polling.batch_tag.clone(),
            probe_url: config.remote.api_url.clone(),
            upload_url: config.remote.batch_url.clone(),
            timeouts: config.timeouts.clone(),
            local,
            remote,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Run one full sync of the batch window
    pub async fn run(&self) -> Result<SnapshotSyncReport, SyncError> {
        let (buckets, pages) = self.collect().await?;
        let window = buckets.window();
        info!(
            source = %self.source.id,
            current = window.current,
            previous = window.previous,
            current_count = buckets.get(window.current).len(),
            previous_count = buckets.get(window.previous).len(),
            pages,
            "Collected batch window"
        );

        let mut batches = Vec::with_capacity(2);
        for (batch, records) in buckets.into_batches() {
            let batch_number = batch.to_string();
            let outcome = self.sync_batch(&batch_number, &records).await?;
            batches.push(BatchResult {
                batch_number,
                outcome,
            });
        }

        Ok(SnapshotSyncReport { pages, batches })
    }

    /// Page through the archive and bucket the records of the window
    pub async fn collect(&self) -> Result<(BatchBuckets, usize), SyncError> {
        let first = self.fetch_page(None).await?;
        let window = resolve_window(&first, &self.batch_tag)?;
        debug!(
            source = %self.source.id,
            current = window.current,
            previous = window.previous,
            "Resolved batch window"
        );

        let mut buckets = BatchBuckets::new(window);
        let mut page = first;
        let mut pages = 1;

        loop {
            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            let cursor = page.last().and_then(Snapshot::uuid).map(str::to_string);

            let mut passed = false;
            for snapshot in page {
                let batch = normalize_batch(snapshot.tag_value(&self.batch_tag));
                if window.is_older(batch) {
                    passed = true;
                    break;
                }
                buckets.push(batch, snapshot);
            }

            if passed {
                debug!(source = %self.source.id, pages, "Reached records older than the window");
                break;
            }
            if page_len < self.page_size {
                break;
            }

            let Some(cursor) = cursor else {
                warn!(
                    source = %self.source.id,
                    pages,
                    "Last record of a full page has no uuid, stopping pagination"
                );
                break;
            };

            page = self.fetch_page(Some(&cursor)).await?;
            pages += 1;
        }

        Ok((buckets, pages))
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Vec<Snapshot>, SyncError> {
        let count = self.page_size.to_string();
        let mut query = vec![
            ("archive", self.source.archive_name.as_str()),
            ("ascending", "0"),
            ("count", count.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("iterator", cursor));
        }

        let url = self.source.endpoint("snapshots", &query)?;
        let page = self.local.get_json(url, self.timeouts.local()).await?;
        Ok(records_from_page(page))
    }

    async fn sync_batch(
        &self,
        batch_number: &str,
        records: &[Snapshot],
    ) -> Result<BatchOutcome, SyncError> {
        if records.is_empty() {
            warn!(source = %self.source.id, batch = batch_number, "No local records for batch, skipping");
            return Ok(BatchOutcome::Empty);
        }

        if let Some(remote_count) = self.remote_count(batch_number).await {
            if remote_count > 0 && remote_count == records.len() {
                info!(
                    source = %self.source.id,
                    batch = batch_number,
                    count = remote_count,
                    "Batch already synchronized, skipping upload"
                );
                return Ok(BatchOutcome::AlreadySynced {
                    count: remote_count,
                });
            }
            debug!(
                source = %self.source.id,
                batch = batch_number,
                remote_count,
                local_count = records.len(),
                "Remote count differs from local count"
            );
        }

        let normalized = normalize_all(records);
        if normalized.dropped > 0 {
            warn!(
                source = %self.source.id,
                batch = batch_number,
                dropped = normalized.dropped,
                "Dropped records without a valid timestamp"
            );
        }
        if normalized.snapshots.is_empty() {
            error!(
                source = %self.source.id,
                batch = batch_number,
                dropped = normalized.dropped,
                "No records with a valid timestamp, skipping batch"
            );
            return Ok(BatchOutcome::NoValidRecords {
                dropped: normalized.dropped,
            });
        }

        self.upload(batch_number, &normalized.snapshots).await?;
        info!(
            source = %self.source.id,
            batch = batch_number,
            count = normalized.snapshots.len(),
            "Uploaded batch"
        );

        Ok(BatchOutcome::Uploaded {
            count: normalized.snapshots.len(),
            dropped: normalized.dropped,
        })
    }

    /// Number of records the remote holds for `batch_number`
    ///
    /// `None` when the probe fails for any reason.
    async fn remote_count(&self, batch_number: &str) -> Option<usize> {
        let url = match self.probe_url(batch_number) {
            Ok(url) => url,
            Err(e) => {
                warn!(source = %self.source.id, error = %e, "Cannot build remote probe URL");
                return None;
            }
        };

        match self.remote.get_json(url, self.timeouts.probe()).await {
            Ok(body) => Some(count_remote_records(&body)),
            Err(e) if e.is_not_found() => {
                debug!(source = %self.source.id, batch = batch_number, "Batch not found on remote");
                None
            }
            Err(e) => {
                warn!(
                    source = %self.source.id,
                    batch = batch_number,
                    error = %e,
                    "Remote probe failed, proceeding with upload"
                );
                None
            }
        }
    }

    fn probe_url(&self, batch_number: &str) -> Result<Url, SyncError> {
        let mut url = parse_url(&self.probe_url)?;
        url.query_pairs_mut()
            .append_pair("meter_id", &self.source.id)
            .append_pair("ship_name", &self.ship_name)
            .append_pair("batch_number", batch_number);
        Ok(url)
    }

    async fn upload(&self, batch_number: &str, snapshots: &[Snapshot]) -> Result<(), SyncError> {
        let url = parse_url(&self.upload_url)?;
        let body = BatchUpload {
            ship_name: &self.ship_name,
            meter_id: &self.source.id,
            batch_number,
            snapshots,
        };

        let response = self
            .remote
            .post_json(url, &body, self.timeouts.remote())
            .await?;
        if let Ok(parsed) = serde_json::from_slice::<Value>(&response) {
            debug!(source = %self.source.id, batch = batch_number, response = %parsed, "Upload response");
        }
        Ok(())
    }
}

#[async_trait]
impl Syncable for SnapshotBatchSyncer {
    fn source_id(&self) -> String {
        self.source.id.clone()
    }

    fn kind(&self) -> SyncerKind {
        SyncerKind::Snapshot
    }

    async fn sync_once(&self) -> Result<(), SyncError> {
        let report = self.run().await?;
        let uploaded = report
            .batches
            .iter()
            .filter(|b| matches!(b.outcome, BatchOutcome::Uploaded { .. }))
            .count();
        info!(source = %self.source.id, pages = report.pages, uploaded, "Snapshot sync finished");
        Ok(())
    }
}

/// Interpret a remote probe response as a record count
///
/// Arrays count their elements, an object with a `data` array counts that
/// array and any other truthy value counts as one record.
pub fn count_remote_records(body: &Value) -> usize {
    match body {
        Value::Array(items) => items.len(),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items.len(),
            _ => 1,
        },
        other if is_truthy(other) => 1,
        _ => 0,
    }
}
