use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::address::Destination;
use crate::error::{AppError, AppResult, FundingError, LedgerError};
use crate::funding::service::FundingService;
use crate::ledger::client::{LedgerQuery, RippledClient};
use crate::ledger::models::{IssuedAmount, PaymentAmount, PaymentIntent, SubmissionOutcome};

/// Destination for one funding request. Generated accounts carry their master
/// seed back to the caller — the faucet keeps nothing.
#[derive(Debug, Clone)]
pub struct ResolvedAccount {
    pub destination: Destination,
    pub seed: Option<String>,
}

/// Resolves caller-supplied destinations and bootstraps brand-new accounts:
/// propose a keypair, activate it with an XRP payment from the funding
/// account (which flows through the sequence allocator like any other
/// payment), then set the trust line the IOU payment needs.
pub struct AccountFactory {
    client: Arc<RippledClient>,
    funding: Arc<FundingService>,
    activation_drops: String,
    trust_limit: String,
    activation_timeout: Duration,
}

impl AccountFactory {
    pub fn new(
        client: Arc<RippledClient>,
        funding: Arc<FundingService>,
        activation_drops: String,
        trust_limit: String,
        activation_timeout: Duration,
    ) -> Self {
        Self {
            client,
            funding,
            activation_drops,
            trust_limit,
            activation_timeout,
        }
    }

    pub async fn resolve_or_generate(
        &self,
        requested: Option<&str>,
        currency: &str,
    ) -> AppResult<ResolvedAccount> {
        match requested {
            Some(destination) => Ok(ResolvedAccount {
                destination: Destination::resolve(destination)?,
                seed: None,
            }),
            None => self.generate(currency).await,
        }
    }

    async fn generate(&self, currency: &str) -> AppResult<ResolvedAccount> {
        let account = self.client.wallet_propose().await.map_err(AppError::Ledger)?;
        info!(address = %account.address, "generated new account");

        let receipt = self
            .funding
            .send(PaymentIntent {
                destination: account.address.clone(),
                destination_tag: None,
                amount: PaymentAmount::Drops(self.activation_drops.clone()),
                memos: None,
            })
            .await?;
        debug!(
            sequence = receipt.sequence,
            address = %account.address,
            "activation payment submitted"
        );

        self.wait_until_active(&account.address).await?;

        let sequence = self
            .client
            .fetch_account_snapshot(&account.address)
            .await
            .map_err(AppError::Ledger)?
            .confirmed_sequence;

        let outcome = self
            .client
            .submit_trust_set(
                &account.address,
                &account.master_seed,
                IssuedAmount {
                    currency: currency.to_string(),
                    issuer: self.client.funding_address().to_string(),
                    value: self.trust_limit.clone(),
                },
                sequence,
            )
            .await
            .map_err(AppError::Ledger)?;

        if !outcome.consumed_sequence() {
            let code = match outcome {
                SubmissionOutcome::Failed { code } => code,
                other => format!("{:?}", other),
            };
            return Err(FundingError::Submission { code }.into());
        }
        info!(address = %account.address, currency, "trust line set");

        let destination = Destination::from_classic(&account.address)?;
        Ok(ResolvedAccount {
            destination,
            seed: Some(account.master_seed),
        })
    }

    /// A queued activation payment only lands at the next ledger close; the
    /// trust line cannot be set before the account exists.
    async fn wait_until_active(&self, address: &str) -> AppResult<()> {
        let start = Instant::now();
        loop {
            match self.client.fetch_account_snapshot(address).await {
                Ok(_) => return Ok(()),
                Err(LedgerError::UnknownAccount(_)) if start.elapsed() < self.activation_timeout => {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Err(LedgerError::UnknownAccount(_)) => {
                    return Err(AppError::Ledger(LedgerError::UnknownAccount(
                        address.to_string(),
                    )))
                }
                Err(err) => return Err(AppError::Ledger(err)),
            }
        }
    }
}
