use std::sync::Arc;
use tracing::{error, warn};

use crate::error::LedgerError;
use crate::ledger::client::LedgerQuery;
use crate::ledger::models::AccountQueueSnapshot;

/// Disagreement between the local sequence view and ledger state, classified
/// for observability. Never control flow: a usable sequence is still derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftEvent {
    /// A queued transaction sits beyond a reachable sequence — an earlier
    /// transaction is missing from the node's queue.
    Gap { expected: u32, queued: u32 },
    /// The node reported an already-applied sequence as still queued. Should
    /// be impossible; a bug indicator on the ledger side.
    Violation { expected: u32, queued: u32 },
    /// The cached next-usable and a fresh reconciliation disagree: node
    /// failover, or a sibling writer on the same account.
    Divergence { cached: u32, reconciled: u32 },
}

/// Sink for drift events, so tests can assert on them directly.
pub trait DriftObserver: Send + Sync {
    fn record(&self, event: &DriftEvent);
}

/// Production observer: structured tracing output.
pub struct LogDriftObserver;

impl DriftObserver for LogDriftObserver {
    fn record(&self, event: &DriftEvent) {
        match event {
            DriftEvent::Gap { expected, queued } => {
                warn!(expected, queued, "gap in queued sequences");
            }
            DriftEvent::Violation { expected, queued } => {
                error!(
                    expected,
                    queued, "invariant violated: queued sequence below confirmed run"
                );
            }
            DriftEvent::Divergence { cached, reconciled } => {
                warn!(
                    cached,
                    reconciled,
                    "cached sequence diverged from ledger state; \
                     another process may be using the funding account, or we \
                     reconnected to a different node"
                );
            }
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub next_usable: u32,
    pub drift: Vec<DriftEvent>,
}

/// Derives the next usable sequence from authoritative ledger state.
pub struct Reconciler {
    ledger: Arc<dyn LedgerQuery>,
    account: String,
    observer: Arc<dyn DriftObserver>,
}

impl Reconciler {
    pub fn new(
        ledger: Arc<dyn LedgerQuery>,
        account: String,
        observer: Arc<dyn DriftObserver>,
    ) -> Self {
        Self {
            ledger,
            account,
            observer,
        }
    }

    /// Fetch fresh account state and derive the next usable sequence.
    /// Idempotent for an unchanged snapshot.
    pub async fn reconcile(&self) -> Result<Reconciliation, LedgerError> {
        let snapshot = self.ledger.fetch_account_snapshot(&self.account).await?;
        Ok(self.derive(&snapshot))
    }

    /// Walk the queued sequences in ascending numeric order (fetch order is
    /// not sorted). A contiguous run starting at the confirmed sequence
    /// extends the usable range; anything else is drift.
    fn derive(&self, snapshot: &AccountQueueSnapshot) -> Reconciliation {
        let mut expected = snapshot.confirmed_sequence;
        let mut queued = snapshot.queued_sequences.clone();
        queued.sort_unstable();

        let mut drift = Vec::new();
        for seq in queued {
            if seq == expected {
                expected += 1;
            } else if seq > expected {
                drift.push(DriftEvent::Gap {
                    expected,
                    queued: seq,
                });
            } else {
                drift.push(DriftEvent::Violation {
                    expected,
                    queued: seq,
                });
            }
        }

        for event in &drift {
            self.observer.record(event);
        }

        Reconciliation {
            next_usable: expected,
            drift,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub(crate) struct RecordingObserver {
        pub events: Mutex<Vec<DriftEvent>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        pub fn drained(&self) -> Vec<DriftEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl DriftObserver for RecordingObserver {
        fn record(&self, event: &DriftEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    /// Serves a fixed snapshot and counts how often it is queried.
    pub(crate) struct FixedSnapshotLedger {
        pub snapshot: Mutex<AccountQueueSnapshot>,
        pub queries: AtomicUsize,
    }

    impl FixedSnapshotLedger {
        pub fn new(confirmed_sequence: u32, queued_sequences: Vec<u32>) -> Self {
            Self {
                snapshot: Mutex::new(AccountQueueSnapshot {
                    confirmed_sequence,
                    queued_sequences,
                }),
                queries: AtomicUsize::new(0),
            }
        }

        pub fn query_count(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LedgerQuery for FixedSnapshotLedger {
        async fn fetch_account_snapshot(
            &self,
            _account: &str,
        ) -> Result<AccountQueueSnapshot, LedgerError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.snapshot.lock().unwrap().clone())
        }
    }

    fn reconciler(ledger: Arc<FixedSnapshotLedger>, observer: Arc<RecordingObserver>) -> Reconciler {
        Reconciler::new(ledger, "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".to_string(), observer)
    }

    #[tokio::test]
    async fn contiguous_run_is_consumed_and_gap_is_not_crossed() {
        let ledger = Arc::new(FixedSnapshotLedger::new(10, vec![10, 11, 13]));
        let observer = Arc::new(RecordingObserver::new());
        let result = reconciler(ledger, observer.clone())
            .reconcile()
            .await
            .unwrap();

        assert_eq!(result.next_usable, 12);
        assert_eq!(
            observer.drained(),
            vec![DriftEvent::Gap {
                expected: 12,
                queued: 13
            }]
        );
    }

    #[tokio::test]
    async fn empty_queue_yields_confirmed_sequence() {
        let ledger = Arc::new(FixedSnapshotLedger::new(10, vec![]));
        let observer = Arc::new(RecordingObserver::new());
        let result = reconciler(ledger, observer.clone())
            .reconcile()
            .await
            .unwrap();

        assert_eq!(result.next_usable, 10);
        assert!(observer.drained().is_empty());
    }

    #[tokio::test]
    async fn queue_is_walked_in_numeric_order_not_fetch_order() {
        let ledger = Arc::new(FixedSnapshotLedger::new(10, vec![13, 10, 11]));
        let observer = Arc::new(RecordingObserver::new());
        let result = reconciler(ledger, observer)
            .reconcile()
            .await
            .unwrap();

        assert_eq!(result.next_usable, 12);
    }

    #[tokio::test]
    async fn queued_sequence_below_confirmed_is_a_violation() {
        let ledger = Arc::new(FixedSnapshotLedger::new(10, vec![9, 10]));
        let observer = Arc::new(RecordingObserver::new());
        let result = reconciler(ledger, observer.clone())
            .reconcile()
            .await
            .unwrap();

        // 9 never advances the run; 10 still does.
        assert_eq!(result.next_usable, 11);
        assert_eq!(
            observer.drained(),
            vec![DriftEvent::Violation {
                expected: 10,
                queued: 9
            }]
        );
    }

    #[tokio::test]
    async fn reconcile_is_idempotent_for_unchanged_state() {
        let ledger = Arc::new(FixedSnapshotLedger::new(7, vec![7, 8]));
        let observer = Arc::new(RecordingObserver::new());
        let reconciler = reconciler(ledger, observer);

        let first = reconciler.reconcile().await.unwrap();
        let second = reconciler.reconcile().await.unwrap();
        assert_eq!(first.next_usable, 9);
        assert_eq!(first.next_usable, second.next_usable);
    }
}
