use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, FundingError, SequenceError};
use crate::ledger::client::LedgerSubmit;
use crate::ledger::models::{PaymentIntent, SubmissionOutcome};
use crate::sequence::cache::SequenceAllocator;

/// What one funding submission did: which sequence it consumed, and how the
/// node classified it.
#[derive(Debug, Clone)]
pub struct FundingReceipt {
    pub sequence: u32,
    pub outcome: SubmissionOutcome,
}

/// Allocates a sequence, submits one payment, and feeds the outcome back into
/// the sequence cache. Safe to call concurrently from any number of requests.
pub struct FundingService {
    allocator: Arc<SequenceAllocator>,
    ledger: Arc<dyn LedgerSubmit>,
}

impl FundingService {
    pub fn new(allocator: Arc<SequenceAllocator>, ledger: Arc<dyn LedgerSubmit>) -> Self {
        Self { allocator, ledger }
    }

    pub async fn send(&self, intent: PaymentIntent) -> AppResult<FundingReceipt> {
        let allocation = self.allocator.allocate().await.map_err(AppError::Ledger)?;
        let sequence = allocation.sequence;

        let outcome = match self.ledger.submit_payment(&intent, sequence).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Connectivity lost mid-flight: unknowable whether the node
                // consumed the sequence.
                self.allocator.invalidate().await;
                return Err(AppError::Ledger(err));
            }
        };

        match outcome {
            SubmissionOutcome::Applied | SubmissionOutcome::Queued => {
                info!(sequence, destination = %intent.destination, ?outcome, "payment accepted");
                Ok(FundingReceipt { sequence, outcome })
            }
            SubmissionOutcome::AlreadyApplied | SubmissionOutcome::NotYetReachable => {
                // The allocated sequence collided with reality; typically a
                // node failover or a sibling process on the same account.
                warn!(sequence, ?outcome, "allocated sequence was stale");
                self.allocator.invalidate().await;

                let allocator = self.allocator.clone();
                tokio::spawn(async move {
                    if let Err(err) = allocator.refresh().await {
                        warn!(error = %err, "corrective reconciliation failed");
                    }
                });

                Err(SequenceError::Stale { sequence }.into())
            }
            SubmissionOutcome::PathFailure => {
                warn!(sequence, destination = %intent.destination, "trust line not set");
                self.allocator.invalidate().await;
                Err(FundingError::TrustLineMissing.into())
            }
            SubmissionOutcome::Failed { code } => {
                warn!(sequence, code = %code, "unrecognized submission failure");
                self.allocator.invalidate().await;
                Err(FundingError::Submission { code }.into())
            }
        }
    }
}
