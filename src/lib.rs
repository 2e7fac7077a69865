//! flowsync - relays instrument telemetry to a remote aggregation service
//!
//! Snapshot batches and XML maintenance reports are read from each meter's
//! local archive and uploaded to the remote service on a timer or on
//! demand, with retries and best-effort duplicate avoidance.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod sync;
