use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

use crate::error::{AppError, LedgerError};
use crate::ledger::models::{
    AccountQueueSnapshot, GeneratedAccount, IssuedAmount, PaymentIntent, SubmissionOutcome,
};

/// Ledger query collaborator: authoritative account state, queue included.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    async fn fetch_account_snapshot(
        &self,
        account: &str,
    ) -> Result<AccountQueueSnapshot, LedgerError>;
}

/// Ledger submission collaborator. Signing happens on the node (sign-and-submit
/// mode); the core never constructs or signs transactions itself. Transport
/// failure is the `Err` arm — the caller cannot know whether the sequence was
/// consumed.
#[async_trait]
pub trait LedgerSubmit: Send + Sync {
    async fn submit_payment(
        &self,
        intent: &PaymentIntent,
        sequence: u32,
    ) -> Result<SubmissionOutcome, LedgerError>;
}

/// JSON-RPC client for a rippled node.
pub struct RippledClient {
    http: reqwest::Client,
    url: String,
    funding_address: String,
    funding_secret: String,
}

impl RippledClient {
    pub fn new(
        url: String,
        funding_address: String,
        funding_secret: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url,
            funding_address,
            funding_secret,
        })
    }

    pub fn funding_address(&self) -> &str {
        &self.funding_address
    }

    /// One JSON-RPC call. Returns the `result` object after surfacing rippled
    /// error members and logging any `warning` the node attaches.
    async fn rpc(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let account_hint = params
            .get("account")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let body = json!({
            "method": method,
            "params": [params],
        });

        let response = self.http.post(&self.url).json(&body).send().await?;
        let payload: Value = response.json().await?;

        if let Some(warning) = payload.get("warning").and_then(Value::as_str) {
            warn!(method, warning, "ledger node returned a warning");
        }

        let result = payload
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Protocol(format!("{}: no result member", method)))?;

        if let Some(warning) = result.get("warning").and_then(Value::as_str) {
            warn!(method, warning, "ledger node returned a warning");
        }

        if result.get("status").and_then(Value::as_str) == Some("error") {
            let code = result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            if code == "actNotFound" {
                return Err(LedgerError::UnknownAccount(account_hint));
            }
            return Err(LedgerError::Protocol(format!("{}: {}", method, code)));
        }

        Ok(result)
    }

    /// Current AccountRoot.Flags for an account.
    pub async fn fetch_account_flags(&self, account: &str) -> Result<u32, LedgerError> {
        let result = self
            .rpc(
                "account_info",
                json!({
                    "account": account,
                    "strict": true,
                    "ledger_index": "current",
                }),
            )
            .await?;

        result
            .pointer("/account_data/Flags")
            .and_then(Value::as_u64)
            .map(|f| f as u32)
            .ok_or_else(|| LedgerError::Protocol("account_info: no Flags".to_string()))
    }

    /// Propose a brand-new account keypair. The account does not exist on the
    /// ledger until something funds it past the base reserve.
    pub async fn wallet_propose(&self) -> Result<GeneratedAccount, LedgerError> {
        let result = self.rpc("wallet_propose", json!({})).await?;

        let address = result
            .get("account_id")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::Protocol("wallet_propose: no account_id".to_string()))?
            .to_string();
        let master_seed = result
            .get("master_seed")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::Protocol("wallet_propose: no master_seed".to_string()))?
            .to_string();

        Ok(GeneratedAccount {
            address,
            master_seed,
        })
    }

    /// TrustSet submitted on behalf of `account` (its own secret, its own
    /// sequence) — used to bootstrap generated accounts.
    pub async fn submit_trust_set(
        &self,
        account: &str,
        secret: &str,
        limit: IssuedAmount,
        sequence: u32,
    ) -> Result<SubmissionOutcome, LedgerError> {
        let tx_json = json!({
            "TransactionType": "TrustSet",
            "Account": account,
            "LimitAmount": limit,
            "Sequence": sequence,
        });
        self.sign_and_submit(secret, tx_json).await
    }

    /// AccountSet on the funding account (startup flag bootstrap).
    pub async fn submit_account_set(
        &self,
        set_flag: u32,
        sequence: u32,
    ) -> Result<SubmissionOutcome, LedgerError> {
        let tx_json = json!({
            "TransactionType": "AccountSet",
            "Account": &self.funding_address,
            "SetFlag": set_flag,
            "Sequence": sequence,
        });
        self.sign_and_submit(&self.funding_secret, tx_json).await
    }

    async fn sign_and_submit(
        &self,
        secret: &str,
        tx_json: Value,
    ) -> Result<SubmissionOutcome, LedgerError> {
        let result = self
            .rpc(
                "submit",
                json!({
                    "secret": secret,
                    "tx_json": tx_json,
                }),
            )
            .await?;

        let code = result
            .get("engine_result")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::Protocol("submit: no engine_result".to_string()))?;

        Ok(SubmissionOutcome::from_engine_result(code))
    }
}

#[async_trait]
impl LedgerQuery for RippledClient {
    async fn fetch_account_snapshot(
        &self,
        account: &str,
    ) -> Result<AccountQueueSnapshot, LedgerError> {
        let result = self
            .rpc(
                "account_info",
                json!({
                    "account": account,
                    "strict": true,
                    "ledger_index": "current",
                    "queue": true,
                }),
            )
            .await?;

        let confirmed_sequence = result
            .pointer("/account_data/Sequence")
            .and_then(Value::as_u64)
            .map(|s| s as u32)
            .ok_or_else(|| LedgerError::Protocol("account_info: no Sequence".to_string()))?;

        let queued_sequences = result
            .pointer("/queue_data/transactions")
            .and_then(Value::as_array)
            .map(|txs| {
                txs.iter()
                    .filter_map(|tx| tx.get("seq").and_then(Value::as_u64))
                    .map(|s| s as u32)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AccountQueueSnapshot {
            confirmed_sequence,
            queued_sequences,
        })
    }
}

#[async_trait]
impl LedgerSubmit for RippledClient {
    async fn submit_payment(
        &self,
        intent: &PaymentIntent,
        sequence: u32,
    ) -> Result<SubmissionOutcome, LedgerError> {
        let mut tx_json = json!({
            "TransactionType": "Payment",
            "Account": &self.funding_address,
            "Destination": &intent.destination,
            "Amount": &intent.amount,
            "Sequence": sequence,
        });

        if let Some(tag) = intent.destination_tag {
            tx_json["DestinationTag"] = json!(tag);
        }
        if let Some(memos) = &intent.memos {
            tx_json["Memos"] = json!(memos);
        }

        self.sign_and_submit(&self.funding_secret, tx_json).await
    }
}
