use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Funding error: {0}")]
    Funding(#[from] FundingError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Sequence-cache errors
#[derive(Error, Debug)]
pub enum SequenceError {
    /// The cached next-sequence collided with ledger reality. The cache has
    /// already been invalidated; the request is safe to retry.
    #[error("cached sequence {sequence} was stale")]
    Stale { sequence: u32 },
}

/// Errors at the ledger-node boundary
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger node unreachable: {0}")]
    Connectivity(String),

    #[error("account not found on ledger: {0}")]
    UnknownAccount(String),

    #[error("malformed ledger response: {0}")]
    Protocol(String),
}

/// Submission failures that are terminal for a single request
#[derive(Error, Debug)]
pub enum FundingError {
    #[error("destination has no trust line for the requested currency")]
    TrustLineMissing,

    #[error("submission rejected with {code}")]
    Submission { code: String },
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Sequence(SequenceError::Stale { sequence }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SEQUENCE_STALE",
                "Failed to fund account. Try again later".to_string(),
                Some(serde_json::json!({ "sequence": sequence })),
            ),
            AppError::Funding(FundingError::TrustLineMissing) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "TRUST_LINE_NOT_SET",
                "Trust line not set".to_string(),
                None,
            ),
            AppError::Funding(FundingError::Submission { code }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "FUNDING_FAILED",
                "Failed to fund account".to_string(),
                Some(serde_json::json!({ "engine_result": code })),
            ),
            AppError::Ledger(LedgerError::Connectivity(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "LEDGER_UNREACHABLE",
                "Unable to fund account. Server load is too high. Try again later".to_string(),
                None,
            ),
            AppError::Ledger(LedgerError::UnknownAccount(account)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ACCOUNT_NOT_FOUND",
                format!("Account not found: {}", account),
                None,
            ),
            AppError::InvalidDestination(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_DESTINATION",
                "Invalid destination".to_string(),
                Some(serde_json::json!({ "detail": msg })),
            ),
            AppError::InvalidCurrency(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_CURRENCY",
                "Invalid currency".to_string(),
                Some(serde_json::json!({ "detail": msg })),
            ),
            AppError::InvalidAmount(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_AMOUNT",
                "Invalid amount".to_string(),
                Some(serde_json::json!({ "detail": msg })),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(error: reqwest::Error) -> Self {
        LedgerError::Connectivity(error.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("{:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
