//! Batch identifier extraction from report documents
//!
//! Report layouts differ between instruments, so extraction is an ordered
//! list of independent strategies. The first strategy that yields a usable
//! value wins.

use roxmltree::Node;

use crate::error::SyncError;
use crate::models::report::parse_document;

/// A single extraction strategy
///
/// `root` is the document's root element.
pub trait BatchIdExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Return a candidate batch identifier
    fn extract(&self, root: Node<'_, '_>) -> Option<String>;
}

/// Attribute on the `<report>` root element
#[derive(Debug, Clone)]
pub struct RootAttributeExtractor {
    names: &'static [&'static str],
}

impl Default for RootAttributeExtractor {
    fn default() -> Self {
        Self {
            names: &["batch", "batch_number"],
        }
    }
}

impl BatchIdExtractor for RootAttributeExtractor {
    fn name(&self) -> &'static str {
        "root_attribute"
    }

    fn extract(&self, root: Node<'_, '_>) -> Option<String> {
        if !root.has_tag_name("report") {
            return None;
        }
        self.names
            .iter()
            .filter_map(|name| root.attribute(*name))
            .find_map(usable)
    }
}

/// Text of a direct child element of the `<report>` root
///
/// Only plain text elements qualify; an element with attributes or nested
/// elements is not a scalar value.
#[derive(Debug, Clone)]
pub struct ChildElementExtractor {
    names: &'static [&'static str],
}

impl Default for ChildElementExtractor {
    fn default() -> Self {
        Self {
            names: &["batch", "batch_number", "batchnumber"],
        }
    }
}

impl BatchIdExtractor for ChildElementExtractor {
    fn name(&self) -> &'static str {
        "child_element"
    }

    fn extract(&self, root: Node<'_, '_>) -> Option<String> {
        if !root.has_tag_name("report") {
            return None;
        }
        self.names.iter().find_map(|name| {
            // The first element with this name is the candidate
            let child = root.children().find(|n| n.has_tag_name(*name))?;
            if child.attributes().next().is_some() || child.children().any(|n| n.is_element()) {
                return None;
            }
            usable(&text_content(child))
        })
    }
}

/// Scan of `<rows><row><cell/>...</row></rows>` tables
///
/// Looks for a cell containing `label` (case-insensitive) and takes the
/// following cell of the same row when it is all digits.
#[derive(Debug, Clone)]
pub struct TableScanExtractor {
    label: &'static str,
}

impl Default for TableScanExtractor {
    fn default() -> Self {
        Self {
            label: "batch number",
        }
    }
}

impl BatchIdExtractor for TableScanExtractor {
    fn name(&self) -> &'static str {
        "table_scan"
    }

    fn extract(&self, root: Node<'_, '_>) -> Option<String> {
        if !root.has_tag_name("report") {
            return None;
        }
        let rows = root.children().find(|n| n.has_tag_name("rows"))?;

        for row in rows.children().filter(|n| n.has_tag_name("row")) {
            let cells: Vec<String> = row
                .children()
                .filter(|n| n.has_tag_name("cell"))
                .map(cell_text)
                .collect();

            for pair in cells.windows(2) {
                if !pair[0].to_lowercase().contains(self.label) {
                    continue;
                }
                let value = pair[1].trim();
                if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
                    return Some(value.to_string());
                }
            }
        }
        None
    }
}

/// Ordered chain of extraction strategies
pub struct ExtractorChain {
    strategies: Vec<Box<dyn BatchIdExtractor>>,
}

impl ExtractorChain {
    pub fn new(strategies: Vec<Box<dyn BatchIdExtractor>>) -> Self {
        Self { strategies }
    }

    /// Parse `xml` and run the strategies in order
    ///
    /// Fails only when the document is not well-formed XML.
    pub fn extract(&self, xml: &str) -> Result<Option<String>, SyncError> {
        let doc = parse_document(xml)?;
        let root = doc.root_element();

        for strategy in &self.strategies {
            if let Some(value) = strategy.extract(root) {
                tracing::debug!(strategy = strategy.name(), batch = %value, "Extracted batch number");
                return Ok(Some(value));
            }
        }

        tracing::debug!(
            root = root.tag_name().name(),
            attributes = ?root.attributes().map(|a| a.name()).collect::<Vec<_>>(),
            "No extraction strategy matched"
        );
        Ok(None)
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(RootAttributeExtractor::default()),
            Box::new(ChildElementExtractor::default()),
            Box::new(TableScanExtractor::default()),
        ])
    }
}

impl std::fmt::Debug for ExtractorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

fn usable(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

// `text` attribute when non-empty, otherwise the element's text
fn cell_text(cell: Node<'_, '_>) -> String {
    match cell.attribute("text") {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => text_content(cell),
    }
}
