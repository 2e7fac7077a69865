//! Sync coordination and periodic scheduling
//!
//! The coordinator owns one sync unit per (source, syncer kind) pair. A
//! cycle runs every unit concurrently through the retry executor, and is
//! skipped as a whole while any unit from a previous cycle is still
//! running.

use crate::error::SyncError;
use crate::sync::retry::RetryExecutor;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Kind of syncer behind a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncerKind {
    Snapshot,
    Report,
}

impl fmt::Display for SyncerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncerKind::Snapshot => write!(f, "snapshot"),
            SyncerKind::Report => write!(f, "report"),
        }
    }
}

/// A unit of work run once per cycle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Syncable: Send + Sync {
    /// Identifier of the source this unit syncs
    fn source_id(&self) -> String;

    /// Which syncer this unit is
    fn kind(&self) -> SyncerKind;

    /// Perform a single sync attempt
    async fn sync_once(&self) -> Result<(), SyncError>;
}

/// Result of a triggered cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TriggerOutcome {
    /// A previous cycle is still running; nothing was started
    Busy,
    /// Every unit finished successfully
    Done { meters: Vec<String> },
    /// At least one unit exhausted its retries
    Error { error: String },
}

type UnitKey = (String, SyncerKind);

/// Releases an in-flight marker when dropped
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<UnitKey>>>,
    key: UnitKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.key);
    }
}

/// Runs all sync units with busy-skip semantics
pub struct SyncCoordinator {
    units: Vec<Arc<dyn Syncable>>,
    meters: Vec<String>,
    retry: RetryExecutor,
    in_flight: Arc<Mutex<HashSet<UnitKey>>>,
}

impl SyncCoordinator {
    /// Create a coordinator
    ///
    /// `meters` is reported back in [`TriggerOutcome::Done`].
    pub fn new(units: Vec<Arc<dyn Syncable>>, meters: Vec<String>, retry: RetryExecutor) -> Self {
        Self {
            units,
            meters,
            retry,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Number of registered units
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Whether any unit is currently running
    pub fn is_busy(&self) -> bool {
        !self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    // Marks every unit busy, or none if any already is
    fn try_claim(&self) -> Option<Vec<InFlightGuard>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.is_empty() {
            return None;
        }

        let guards = self
            .units
            .iter()
            .map(|unit| {
                let key = (unit.source_id(), unit.kind());
                set.insert(key.clone());
                InFlightGuard {
                    in_flight: self.in_flight.clone(),
                    key,
                }
            })
            .collect();
        Some(guards)
    }

    /// Run every unit once, concurrently
    ///
    /// Returns [`TriggerOutcome::Busy`] immediately if a previous cycle is
    /// still in flight. The units run on a spawned task that owns the
    /// in-flight guards, so dropping the returned future leaves the cycle
    /// running to completion.
    pub async fn trigger_all(&self) -> TriggerOutcome {
        let Some(guards) = self.try_claim() else {
            return TriggerOutcome::Busy;
        };

        let units = self.units.clone();
        let retry = self.retry.clone();
        let cycle = tokio::spawn(async move {
            let runs = units
                .iter()
                .zip(guards)
                .map(|(unit, guard)| run_unit(&retry, unit.as_ref(), guard));
            join_all(runs).await
        });

        let results = match cycle.await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "Sync cycle task failed");
                return TriggerOutcome::Error {
                    error: format!("Sync cycle task failed: {}", e),
                };
            }
        };

        match results.into_iter().find_map(Result::err) {
            Some(err) => TriggerOutcome::Error {
                error: err.to_string(),
            },
            None => TriggerOutcome::Done {
                meters: self.meters.clone(),
            },
        }
    }

    /// Scheduled variant of [`trigger_all`](Self::trigger_all); outcomes are logged
    pub async fn run_cycle(&self) {
        match self.trigger_all().await {
            TriggerOutcome::Busy => {
                warn!("Previous sync cycle still running, skipping this cycle")
            }
            TriggerOutcome::Done { meters } => info!(meters = ?meters, "Sync cycle completed"),
            TriggerOutcome::Error { error } => error!(error = %error, "Sync cycle failed"),
        }
    }

    /// Run a cycle now and then once per `interval` until shutdown
    ///
    /// Cycles are spawned so a long cycle never delays shutdown; ticks that
    /// land while a cycle is running are skipped by the busy check.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            units = self.units.len(),
            interval_ms = interval.as_millis() as u64,
            "Starting sync scheduler"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping sync scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("Scheduled sync cycle");
                    let coordinator = self.clone();
                    tokio::spawn(async move {
                        coordinator.run_cycle().await;
                    });
                }
            }
        }

        info!("Sync scheduler stopped");
    }
}

async fn run_unit(
    retry: &RetryExecutor,
    unit: &dyn Syncable,
    _guard: InFlightGuard,
) -> Result<(), SyncError> {
    let span = info_span!("sync", source = %unit.source_id(), syncer = %unit.kind());
    retry.execute(|| unit.sync_once()).instrument(span).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    fn retry() -> RetryExecutor {
        RetryExecutor::from_parts(2, Duration::from_secs(1))
    }

    fn mock_unit(id: &str, kind: SyncerKind) -> MockSyncable {
        let mut unit = MockSyncable::new();
        unit.expect_source_id().return_const(id.to_string());
        unit.expect_kind().return_const(kind);
        unit
    }

    /// Unit that blocks until released
    struct GatedUnit {
        gate: Arc<Notify>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Syncable for GatedUnit {
        fn source_id(&self) -> String {
            "gated".to_string()
        }

        fn kind(&self) -> SyncerKind {
            SyncerKind::Snapshot
        }

        async fn sync_once(&self) -> Result<(), SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(())
        }
    }

    #[test]
    fn test_trigger_outcome_serialization() {
        assert_eq!(
            serde_json::to_value(TriggerOutcome::Busy).unwrap(),
            serde_json::json!({"status": "busy"})
        );
        assert_eq!(
            serde_json::to_value(TriggerOutcome::Done {
                meters: vec!["M1".to_string()]
            })
            .unwrap(),
            serde_json::json!({"status": "done", "meters": ["M1"]})
        );
        assert_eq!(
            serde_json::to_value(TriggerOutcome::Error {
                error: "boom".to_string()
            })
            .unwrap(),
            serde_json::json!({"status": "error", "error": "boom"})
        );
    }

    // Test 1: All units run once and the outcome lists the meters
    #[tokio::test(start_paused = true)]
    async fn test_trigger_all_runs_every_unit() {
        let mut snapshot = mock_unit("M1", SyncerKind::Snapshot);
        snapshot.expect_sync_once().times(1).returning(|| Ok(()));
        let mut report = mock_unit("M1", SyncerKind::Report);
        report.expect_sync_once().times(1).returning(|| Ok(()));
        let mut other = mock_unit("M2", SyncerKind::Snapshot);
        other.expect_sync_once().times(1).returning(|| Ok(()));

        let coordinator = SyncCoordinator::new(
            vec![Arc::new(snapshot), Arc::new(report), Arc::new(other)],
            vec!["M1".to_string(), "M2".to_string()],
            retry(),
        );

        assert_eq!(
            coordinator.trigger_all().await,
            TriggerOutcome::Done {
                meters: vec!["M1".to_string(), "M2".to_string()]
            }
        );
        assert!(!coordinator.is_busy());
    }

    // Test 2: Units are retried and the last error is reported
    #[tokio::test(start_paused = true)]
    async fn test_trigger_all_reports_exhausted_unit() {
        let mut ok = mock_unit("M1", SyncerKind::Snapshot);
        ok.expect_sync_once().times(1).returning(|| Ok(()));
        let mut failing = mock_unit("M2", SyncerKind::Snapshot);
        failing
            .expect_sync_once()
            .times(2)
            .returning(|| Err(SyncError::NetworkTimeout));

        let coordinator = SyncCoordinator::new(
            vec![Arc::new(ok), Arc::new(failing)],
            vec!["M1".to_string(), "M2".to_string()],
            retry(),
        );

        assert_eq!(
            coordinator.trigger_all().await,
            TriggerOutcome::Error {
                error: "Network timeout".to_string()
            }
        );
        assert!(!coordinator.is_busy());
    }

    // Test 3: A trigger while a cycle is in flight is rejected as busy
    #[tokio::test]
    async fn test_trigger_while_busy() {
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicU32::new(0));
        let coordinator = Arc::new(SyncCoordinator::new(
            vec![Arc::new(GatedUnit {
                gate: gate.clone(),
                calls: calls.clone(),
            })],
            vec!["gated".to_string()],
            retry(),
        ));

        let running = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.trigger_all().await })
        };
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(coordinator.is_busy());
        assert_eq!(coordinator.trigger_all().await, TriggerOutcome::Busy);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        assert!(matches!(
            running.await.unwrap(),
            TriggerOutcome::Done { .. }
        ));

        // Released again once the cycle has finished
        assert!(!coordinator.is_busy());
        gate.notify_one();
        assert!(matches!(
            coordinator.trigger_all().await,
            TriggerOutcome::Done { .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    // Test 4: The busy check skips the whole cycle, not just the busy unit
    #[tokio::test]
    async fn test_busy_skips_all_units() {
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicU32::new(0));
        let mut idle = mock_unit("M2", SyncerKind::Snapshot);
        idle.expect_sync_once().times(1).returning(|| Ok(()));

        let coordinator = Arc::new(SyncCoordinator::new(
            vec![
                Arc::new(GatedUnit {
                    gate: gate.clone(),
                    calls: calls.clone(),
                }),
                Arc::new(idle),
            ],
            vec!["gated".to_string(), "M2".to_string()],
            retry(),
        ));

        let running = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.trigger_all().await })
        };
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        // M2 already finished but the cycle as a whole is still running
        coordinator.run_cycle().await;

        gate.notify_one();
        running.await.unwrap();
    }

    // Test 5: The scheduler runs immediately and then once per interval
    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_interval() {
        let count = Arc::new(AtomicU32::new(0));
        let mut unit = mock_unit("M1", SyncerKind::Snapshot);
        let counter = count.clone();
        unit.expect_sync_once().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let coordinator = Arc::new(SyncCoordinator::new(
            vec![Arc::new(unit)],
            vec!["M1".to_string()],
            retry(),
        ));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(coordinator.run(Duration::from_secs(100), shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        shutdown_tx.send(()).unwrap();
        assert!(handle.await.is_ok());
    }

    // Test 6: Shutdown stops the scheduler even while a cycle is running
    #[tokio::test]
    async fn test_shutdown_with_cycle_in_flight() {
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicU32::new(0));
        let coordinator = Arc::new(SyncCoordinator::new(
            vec![Arc::new(GatedUnit {
                gate,
                calls: calls.clone(),
            })],
            vec!["gated".to_string()],
            retry(),
        ));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(coordinator.clone().run(Duration::from_secs(3600), shutdown_rx));
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        shutdown_tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok());
        assert!(coordinator.is_busy());
    }

    // Test 7: Dropping a trigger future leaves its cycle running
    #[tokio::test]
    async fn test_dropped_trigger_keeps_cycle_running() {
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicU32::new(0));
        let coordinator = SyncCoordinator::new(
            vec![Arc::new(GatedUnit {
                gate: gate.clone(),
                calls: calls.clone(),
            })],
            vec!["gated".to_string()],
            retry(),
        );

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), coordinator.trigger_all()).await;
        assert!(abandoned.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(coordinator.is_busy());

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(2), async {
            while coordinator.is_busy() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_syncer_kind_display() {
        assert_eq!(SyncerKind::Snapshot.to_string(), "snapshot");
        assert_eq!(SyncerKind::Report.to_string(), "report");
    }
}
