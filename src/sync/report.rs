//! Report ticket syncer
//!
//! Lists the archive's XML reports, extracts a batch number from each one
//! and submits it to the ticket endpoint as a multipart upload. A failure
//! on one report is logged and the remaining reports are still processed.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, TimeoutConfig};
use crate::error::SyncError;
use crate::models::{parse_listing, ReportDescriptor, ReportDocument, Source};
use crate::sync::extract::ExtractorChain;
use crate::sync::http_client::{parse_url, TimedHttpClient};
use crate::sync::scheduler::{Syncable, SyncerKind};

/// What happened to one listed report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Uploaded { batch_number: String },
    /// No batch number could be extracted
    Skipped,
    Failed { error: String },
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSyncReport {
    /// `(file, outcome)` in listing order
    pub reports: Vec<(String, ReportOutcome)>,
}

impl ReportSyncReport {
    pub fn count(&self, pred: impl Fn(&ReportOutcome) -> bool) -> usize {
        self.reports.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Syncs XML reports of one source to the ticket endpoint
#[derive(Debug, Clone)]
pub struct ReportTicketSyncer {
    source: Arc<Source>,
    ship_name: String,
    filter: String,
    ticket_url: String,
    timeouts: TimeoutConfig,
    local: TimedHttpClient,
    remote: TimedHttpClient,
    extractor: Arc<ExtractorChain>,
}

impl ReportTicketSyncer {
    /// Create a syncer for `source`
    ///
    /// Returns `None` when no ticket URL is configured.
    pub fn new(
        source: Arc<Source>,
        config: &Config,
        local: TimedHttpClient,
        remote: TimedHttpClient,
    ) -> Option<Self> {
        let ticket_url = config.remote.ticket_url.clone()?;
        Some(Self {
            source,
            ship_name: config.ship_name.clone(),
            filter: config.reports.filter.clone(),
            ticket_url,
            timeouts: config.timeouts.clone(),
            local,
            remote,
            extractor: Arc::new(ExtractorChain::default()),
        })
    }

    /// Replace the batch number extraction strategies
    pub fn with_extractor(mut self, extractor: ExtractorChain) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Fetch the listing and process every report in listing order
    ///
    /// Only a failed listing fails the run.
    pub async fn run(&self) -> Result<ReportSyncReport, SyncError> {
        let descriptors = self.list().await?;
        info!(
            source = %self.source.id,
            count = descriptors.len(),
            filter = %self.filter,
            "Found reports"
        );

        let mut report = ReportSyncReport::default();
        for descriptor in descriptors {
            let outcome = match self.process(&descriptor).await {
                Ok(Some(batch_number)) => ReportOutcome::Uploaded { batch_number },
                Ok(None) => ReportOutcome::Skipped,
                Err(e) => {
                    error!(
                        source = %self.source.id,
                        file = %descriptor.file,
                        error = %e,
                        "Failed to process report"
                    );
                    ReportOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.reports.push((descriptor.file, outcome));
        }

        Ok(report)
    }

    /// Fetch and parse the filtered report listing
    pub async fn list(&self) -> Result<Vec<ReportDescriptor>, SyncError> {
        let url = self
            .source
            .endpoint("reports", &[("filter", self.filter.as_str())])?;
        debug!(source = %self.source.id, url = %url, "Fetching report listing");
        let body = self.local.get_text(url, self.timeouts.local()).await?;
        parse_listing(&body)
    }

    /// Download a report and extract its batch number
    pub async fn download(&self, descriptor: &ReportDescriptor) -> Result<ReportDocument, SyncError> {
        let report_param = format!("1:{}", descriptor.file);
        let url = self.source.endpoint(
            "report",
            &[("type", "xmlstream"), ("report", report_param.as_str())],
        )?;
        debug!(source = %self.source.id, url = %url, "Downloading report");

        let body = self.local.get_bytes(url, self.timeouts.local()).await?;
        // Extraction works on a lossy decode; the raw bytes are uploaded as is
        let text = String::from_utf8_lossy(&body);
        let batch_id = self.extractor.extract(&text)?;

        Ok(ReportDocument {
            descriptor: descriptor.clone(),
            body,
            batch_id,
        })
    }

    async fn process(&self, descriptor: &ReportDescriptor) -> Result<Option<String>, SyncError> {
        info!(source = %self.source.id, file = %descriptor.file, "Processing report");
        let document = self.download(descriptor).await?;

        let Some(batch_number) = document.batch_id.clone() else {
            warn!(
                source = %self.source.id,
                file = %descriptor.file,
                "Could not extract batch number from report"
            );
            return Ok(None);
        };

        info!(
            source = %self.source.id,
            file = %descriptor.file,
            batch = %batch_number,
            "Extracted batch number"
        );
        self.upload(&document, &batch_number).await?;
        info!(
            source = %self.source.id,
            file = %descriptor.file,
            "Posted report to ticket API"
        );

        Ok(Some(batch_number))
    }

    async fn upload(&self, document: &ReportDocument, batch_number: &str) -> Result<(), SyncError> {
        let url = parse_url(&self.ticket_url)?;
        let file = Part::bytes(document.body.to_vec())
            .file_name(document.descriptor.file.clone())
            .mime_str("application/xml")
            .map_err(|e| SyncError::InvalidData(e.to_string()))?;
        let form = Form::new()
            .text("ship", self.ship_name.clone())
            .text("meter", self.source.id.clone())
            .text("batchNumber", batch_number.to_string())
            .part("file", file);

        debug!(
            source = %self.source.id,
            file = %document.descriptor.file,
            size = document.body.len(),
            "Submitting report form"
        );
        self.remote
            .post_multipart(url, form, self.timeouts.remote())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Syncable for ReportTicketSyncer {
    fn source_id(&self) -> String {
        self.source.id.clone()
    }

    fn kind(&self) -> SyncerKind {
        SyncerKind::Report
    }

    async fn sync_once(&self) -> Result<(), SyncError> {
        let report = self.run().await?;
        info!(
            source = %self.source.id,
            uploaded = report.count(|o| matches!(o, ReportOutcome::Uploaded { .. })),
            skipped = report.count(|o| matches!(o, ReportOutcome::Skipped)),
            failed = report.count(|o| matches!(o, ReportOutcome::Failed { .. })),
            "Report sync finished"
        );
        Ok(())
    }
}
