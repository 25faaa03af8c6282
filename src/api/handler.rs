use axum::{extract::State, Json};
use rand::distr::{Alphanumeric, SampleString};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

use super::models::{AccountView, FundRequest, FundResponse, HealthResponse};
use crate::{
    config::{Config, MAX_AMOUNT},
    currency::validate_currency,
    error::{AppError, AppResult},
    funding::{AccountFactory, FundingService},
    ledger::models::{IssuedAmount, PaymentAmount, PaymentIntent},
    stats::ThroughputStats,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub funding: Arc<FundingService>,
    pub accounts: Arc<AccountFactory>,
    pub stats: Arc<ThroughputStats>,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Fund a destination with issued currency.
/// POST /accounts
pub async fn fund_account(
    State(state): State<AppState>,
    Json(request): Json<FundRequest>,
) -> AppResult<Json<FundResponse>> {
    state.stats.record_request();

    let req_id = Alphanumeric.sample_string(&mut rand::rng(), 5);
    let span = info_span!("fund", req = %req_id);

    async move {
        let currency = request
            .currency
            .as_deref()
            .ok_or_else(|| AppError::InvalidCurrency("currency is required".to_string()))?;
        validate_currency(currency)?;
        let amount = validate_amount(request.amount.as_deref(), &state.config.default_amount)?;

        let generated = request.destination.is_none();
        let resolved = state
            .accounts
            .resolve_or_generate(request.destination.as_deref(), currency)
            .await?;
        info!(
            destination = %resolved.destination.x_address,
            amount,
            currency,
            "funding destination"
        );

        let receipt = state
            .funding
            .send(PaymentIntent {
                destination: resolved.destination.classic_address.clone(),
                destination_tag: resolved.destination.tag,
                amount: PaymentAmount::Issued(IssuedAmount {
                    currency: currency.to_string(),
                    issuer: state.config.funding_address.clone(),
                    value: amount.to_string(),
                }),
                memos: request.memos.clone(),
            })
            .await?;

        info!(sequence = receipt.sequence, outcome = ?receipt.outcome, "funded");
        state.stats.record_funded();

        Ok(Json(FundResponse {
            account: AccountView::new(&resolved.destination, resolved.seed),
            amount,
            balance: generated.then_some(amount),
        }))
    }
    .instrument(span)
    .await
}

/// Whole units only; fractional or out-of-range amounts are rejected.
fn validate_amount(raw: Option<&str>, default_amount: &str) -> Result<u64, AppError> {
    let value = raw.unwrap_or(default_amount);
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::InvalidAmount("Must be an integer".to_string()));
    }
    let parsed: u64 = value
        .parse()
        .map_err(|_| AppError::InvalidAmount("Must be an integer".to_string()))?;
    if parsed > MAX_AMOUNT {
        return Err(AppError::InvalidAmount(format!(
            "Must be at most {}",
            MAX_AMOUNT
        )));
    }
    Ok(parsed)
}
