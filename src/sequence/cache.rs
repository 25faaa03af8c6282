use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::LedgerError;
use crate::sequence::reconciler::{DriftEvent, DriftObserver, Reconciler};

/// Where an allocated sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationSource {
    Cache,
    Reconciled,
}

/// One sequence number, handed out exactly once.
#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub sequence: u32,
    pub source: AllocationSource,
}

/// Process-wide optimistic view of the funding account's next usable
/// sequence. Absent at startup; populated lazily; invalidated whenever a
/// submission outcome proves it stale.
///
/// All reads and writes go through one async lock. The lock is held across
/// the reconciliation fetch on the miss path, so callers arriving while a
/// reconciliation is in flight queue behind that single external query and
/// drain from its result — they never issue their own.
pub struct SequenceAllocator {
    next_usable: Mutex<Option<u32>>,
    reconciler: Reconciler,
    observer: Arc<dyn DriftObserver>,
}

impl SequenceAllocator {
    pub fn new(reconciler: Reconciler, observer: Arc<dyn DriftObserver>) -> Self {
        Self {
            next_usable: Mutex::new(None),
            reconciler,
            observer,
        }
    }

    /// Hand out the next sequence. Cache hits consume and advance without
    /// suspending; a miss blocks on one shared reconciliation. A failed
    /// reconciliation leaves the cache absent.
    pub async fn allocate(&self) -> Result<Allocation, LedgerError> {
        let mut next = self.next_usable.lock().await;

        if let Some(sequence) = *next {
            *next = Some(sequence + 1);
            return Ok(Allocation {
                sequence,
                source: AllocationSource::Cache,
            });
        }

        let reconciled = self.reconciler.reconcile().await?;
        let sequence = reconciled.next_usable;
        *next = Some(sequence + 1);
        debug!(sequence, "sequence cache populated from ledger");

        Ok(Allocation {
            sequence,
            source: AllocationSource::Reconciled,
        })
    }

    /// Drop the cached value; the next `allocate` reconciles fresh.
    pub async fn invalidate(&self) {
        let mut next = self.next_usable.lock().await;
        if let Some(sequence) = next.take() {
            debug!(sequence, "sequence cache invalidated");
        }
    }

    /// The external source of truth always wins over local optimism: a
    /// populated cache that disagrees with `reconciled_next` is reset to it.
    pub async fn observe_disagreement(&self, reconciled_next: u32) {
        let mut next = self.next_usable.lock().await;
        if let Some(cached) = *next {
            if cached != reconciled_next {
                self.observer.record(&DriftEvent::Divergence {
                    cached,
                    reconciled: reconciled_next,
                });
                *next = Some(reconciled_next);
            }
        }
    }

    /// Re-derive from ledger state without consuming a sequence. Warms an
    /// absent cache; corrects a populated one that drifted. The fetch runs
    /// outside the state lock so cache hits stay free of network I/O.
    pub async fn refresh(&self) -> Result<(), LedgerError> {
        let reconciled = self.reconciler.reconcile().await?;

        {
            let mut next = self.next_usable.lock().await;
            if next.is_none() {
                *next = Some(reconciled.next_usable);
                return Ok(());
            }
        }

        self.observe_disagreement(reconciled.next_usable).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::client::LedgerQuery;
    use crate::ledger::models::AccountQueueSnapshot;
    use crate::sequence::reconciler::tests::{FixedSnapshotLedger, RecordingObserver};
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ACCOUNT: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

    fn allocator(ledger: Arc<FixedSnapshotLedger>) -> Arc<SequenceAllocator> {
        let observer = Arc::new(RecordingObserver::new());
        allocator_with_observer(ledger, observer)
    }

    fn allocator_with_observer(
        ledger: Arc<FixedSnapshotLedger>,
        observer: Arc<RecordingObserver>,
    ) -> Arc<SequenceAllocator> {
        let reconciler = Reconciler::new(ledger, ACCOUNT.to_string(), observer.clone());
        Arc::new(SequenceAllocator::new(reconciler, observer))
    }

    #[tokio::test]
    async fn first_allocation_reconciles_then_cache_serves() {
        let ledger = Arc::new(FixedSnapshotLedger::new(5, vec![]));
        let allocator = allocator(ledger.clone());

        let first = allocator.allocate().await.unwrap();
        assert_eq!(first.sequence, 5);
        assert_eq!(first.source, AllocationSource::Reconciled);

        let second = allocator.allocate().await.unwrap();
        assert_eq!(second.sequence, 6);
        assert_eq!(second.source, AllocationSource::Cache);

        assert_eq!(ledger.query_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_allocations_are_distinct_and_gapless() {
        let ledger = Arc::new(FixedSnapshotLedger::new(100, vec![]));
        let allocator = allocator(ledger.clone());

        let tasks = (0..32).map(|_| {
            let allocator = allocator.clone();
            tokio::spawn(async move { allocator.allocate().await.unwrap().sequence })
        });
        let sequences: BTreeSet<u32> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let expected: BTreeSet<u32> = (100..132).collect();
        assert_eq!(sequences, expected);
        assert_eq!(ledger.query_count(), 1);
    }

    /// Holds every fetch until released, so a burst of callers provably
    /// overlaps one in-flight reconciliation.
    struct SlowLedger {
        inner: FixedSnapshotLedger,
        delay: Duration,
    }

    #[async_trait]
    impl LedgerQuery for SlowLedger {
        async fn fetch_account_snapshot(
            &self,
            account: &str,
        ) -> Result<AccountQueueSnapshot, LedgerError> {
            tokio::time::sleep(self.delay).await;
            self.inner.fetch_account_snapshot(account).await
        }
    }

    #[tokio::test]
    async fn burst_during_reconciliation_shares_one_query() {
        let ledger = Arc::new(SlowLedger {
            inner: FixedSnapshotLedger::new(50, vec![]),
            delay: Duration::from_millis(50),
        });
        let observer = Arc::new(RecordingObserver::new());
        let reconciler = Reconciler::new(ledger.clone(), ACCOUNT.to_string(), observer.clone());
        let allocator = Arc::new(SequenceAllocator::new(reconciler, observer));

        let tasks = (0..16).map(|_| {
            let allocator = allocator.clone();
            tokio::spawn(async move { allocator.allocate().await.unwrap().sequence })
        });
        let sequences: BTreeSet<u32> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(sequences, (50..66).collect::<BTreeSet<u32>>());
        assert_eq!(ledger.inner.query_count(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_fresh_reconciliation() {
        let ledger = Arc::new(FixedSnapshotLedger::new(20, vec![]));
        let allocator = allocator(ledger.clone());

        assert_eq!(allocator.allocate().await.unwrap().sequence, 20);
        allocator.invalidate().await;

        let next = allocator.allocate().await.unwrap();
        assert_eq!(next.source, AllocationSource::Reconciled);
        assert_eq!(ledger.query_count(), 2);
    }

    #[tokio::test]
    async fn failed_reconciliation_leaves_cache_absent() {
        struct FailingLedger {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl LedgerQuery for FailingLedger {
            async fn fetch_account_snapshot(
                &self,
                _account: &str,
            ) -> Result<AccountQueueSnapshot, LedgerError> {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                if call == 0 {
                    Err(LedgerError::Connectivity("refused".to_string()))
                } else {
                    Ok(AccountQueueSnapshot {
                        confirmed_sequence: 30,
                        queued_sequences: vec![],
                    })
                }
            }
        }

        let ledger = Arc::new(FailingLedger {
            calls: AtomicUsize::new(0),
        });
        let observer = Arc::new(RecordingObserver::new());
        let reconciler = Reconciler::new(ledger, ACCOUNT.to_string(), observer.clone());
        let allocator = SequenceAllocator::new(reconciler, observer);

        assert!(allocator.allocate().await.is_err());

        let recovered = allocator.allocate().await.unwrap();
        assert_eq!(recovered.sequence, 30);
        assert_eq!(recovered.source, AllocationSource::Reconciled);
    }

    #[tokio::test]
    async fn refresh_resets_diverged_cache_and_records_divergence() {
        let ledger = Arc::new(FixedSnapshotLedger::new(10, vec![]));
        let observer = Arc::new(RecordingObserver::new());
        let allocator = allocator_with_observer(ledger.clone(), observer.clone());

        // Populate the cache (next usable becomes 11), then move the ledger.
        assert_eq!(allocator.allocate().await.unwrap().sequence, 10);
        ledger.snapshot.lock().unwrap().confirmed_sequence = 40;

        allocator.refresh().await.unwrap();
        assert_eq!(
            observer.drained(),
            vec![DriftEvent::Divergence {
                cached: 11,
                reconciled: 40
            }]
        );

        // The reconciled value is consumed next, without another fetch.
        let next = allocator.allocate().await.unwrap();
        assert_eq!(next.sequence, 40);
        assert_eq!(next.source, AllocationSource::Cache);
    }

    #[tokio::test]
    async fn refresh_warms_an_absent_cache() {
        let ledger = Arc::new(FixedSnapshotLedger::new(15, vec![15]));
        let allocator = allocator(ledger.clone());

        allocator.refresh().await.unwrap();
        let allocation = allocator.allocate().await.unwrap();
        assert_eq!(allocation.sequence, 16);
        assert_eq!(allocation.source, AllocationSource::Cache);
        assert_eq!(ledger.query_count(), 1);
    }

    #[tokio::test]
    async fn matching_refresh_leaves_cache_untouched() {
        let ledger = Arc::new(FixedSnapshotLedger::new(10, vec![]));
        let observer = Arc::new(RecordingObserver::new());
        let allocator = allocator_with_observer(ledger.clone(), observer.clone());

        assert_eq!(allocator.allocate().await.unwrap().sequence, 10);
        ledger.snapshot.lock().unwrap().confirmed_sequence = 11;

        allocator.refresh().await.unwrap();
        assert!(observer.drained().is_empty());
        assert_eq!(allocator.allocate().await.unwrap().sequence, 11);
    }
}
