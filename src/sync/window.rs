//! Batch window resolution

use crate::error::SyncError;
use crate::models::{normalize_batch, BatchWindow, Snapshot};

/// Derive the batch window from the first archive page
///
/// The batch tag of the first (most recent) record becomes the current
/// batch. An empty page fails with [`SyncError::EmptyArchive`].
pub fn resolve_window(first_page: &[Snapshot], batch_tag: &str) -> Result<BatchWindow, SyncError> {
    let first = first_page.first().ok_or(SyncError::EmptyArchive)?;
    Ok(BatchWindow::new(normalize_batch(first.tag_value(batch_tag))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TAG: &str = "LM_RUN1!RUN1_BATCH_NR_PRV";

    fn snapshot(batch: serde_json::Value) -> Snapshot {
        Snapshot::new(json!({
            "uuid": "u1",
            "snapshot": { "tags": { TAG: { "v": batch } } }
        }))
    }

    #[test]
    fn test_resolves_from_first_record() {
        let page = vec![snapshot(json!(42)), snapshot(json!(40))];
        let window = resolve_window(&page, TAG).unwrap();

        assert_eq!(window.current_id(), "42");
        assert_eq!(window.previous_id(), "41");
    }

    #[test]
    fn test_truncates_fractional_batch() {
        let window = resolve_window(&[snapshot(json!(17.99))], TAG).unwrap();
        assert_eq!((window.current, window.previous), (17, 16));
    }

    #[test]
    fn test_huge_negative_batch_saturates() {
        let window = resolve_window(&[snapshot(json!(-1e300))], TAG).unwrap();
        assert_eq!(window.current, i64::MIN);
        assert_eq!(window.previous, i64::MIN);
        assert!(!window.is_older(i64::MIN));
    }

    #[test]
    fn test_missing_tag_resolves_to_zero() {
        let page = vec![Snapshot::new(json!({"uuid": "u1", "snapshot": {"tags": {}}}))];
        let window = resolve_window(&page, TAG).unwrap();

        assert_eq!(window.current_id(), "0");
        assert_eq!(window.previous_id(), "-1");
    }

    #[test]
    fn test_empty_page_fails() {
        assert_eq!(resolve_window(&[], TAG), Err(SyncError::EmptyArchive));
    }
}
