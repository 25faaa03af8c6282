use serde::Deserialize;
use std::time::Duration;

/// Largest single dispensation, also used as the trust-line limit for
/// generated accounts.
pub const MAX_AMOUNT: u64 = 1_000_000;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub bind_address: String,
    pub rippled_url: String,
    pub funding_address: String,
    pub funding_secret: String,
    pub default_amount: String,
    pub request_timeout_secs: u64,
    pub new_account_drops: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            rippled_url: std::env::var("RIPPLED_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5005".to_string()),
            funding_address: std::env::var("FUNDING_ADDRESS")
                .map_err(|_| config::ConfigError::NotFound("FUNDING_ADDRESS".to_string()))?,
            funding_secret: std::env::var("FUNDING_SECRET")
                .map_err(|_| config::ConfigError::NotFound("FUNDING_SECRET".to_string()))?,
            default_amount: std::env::var("AMOUNT").unwrap_or_else(|_| "1000".to_string()),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            new_account_drops: std::env::var("NEW_ACCOUNT_XRP")
                .unwrap_or_else(|_| "20000000".to_string()),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
