//! Domain models for flowsync
//!
//! This module contains the records and value types exchanged between the
//! local archive, the syncers and the remote service.

pub mod batch;
pub mod report;
pub mod snapshot;
pub mod source;

// Re-export commonly used types
pub use batch::{normalize_batch, BatchBuckets, BatchWindow};
pub use report::{parse_listing, ReportDescriptor, ReportDocument};
pub use snapshot::{is_truthy, records_from_page, Snapshot};
pub use source::{Source, SourceRegistry};
