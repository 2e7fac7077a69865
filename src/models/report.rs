//! XML maintenance reports

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// One entry of the archive's report listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDescriptor {
    /// Generation time as reported by the archive
    pub time: String,
    /// File name, used to fetch the document
    pub file: String,
    /// Modification time as reported by the archive
    pub modified: String,
    /// Display text
    pub text: String,
}

/// A downloaded report and the batch identifier found in it
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub descriptor: ReportDescriptor,
    /// Raw XML bytes as served by the archive
    pub body: Bytes,
    pub batch_id: Option<String>,
}

/// Parse an XML document, accepting a DOCTYPE declaration
pub fn parse_document(xml: &str) -> Result<roxmltree::Document<'_>, SyncError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(xml, options).map_err(|e| SyncError::Xml(e.to_string()))
}

/// Parse a report listing document
///
/// The listing is a `<reports>` root with one `<report>` element per
/// report. Any other root yields no entries; entries without a `file`
/// attribute are skipped since they cannot be downloaded.
pub fn parse_listing(xml: &str) -> Result<Vec<ReportDescriptor>, SyncError> {
    let doc = parse_document(xml)?;
    let root = doc.root_element();

    if !root.has_tag_name("reports") {
        tracing::debug!(root = root.tag_name().name(), "Unexpected report listing root");
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for node in root.children().filter(|n| n.has_tag_name("report")) {
        let file = match node.attribute("file") {
            Some(file) if !file.is_empty() => file,
            _ => {
                tracing::warn!("Skipping report entry without a file attribute");
                continue;
            }
        };

        let attr = |name: &str| node.attribute(name).unwrap_or_default().to_string();
        reports.push(ReportDescriptor {
            time: attr("time"),
            file: file.to_string(),
            modified: attr("mod"),
            text: attr("text"),
        });
    }

    Ok(reports)
}
