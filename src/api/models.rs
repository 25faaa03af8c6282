use serde::{Deserialize, Serialize};

use crate::address::Destination;

// ========== REQUEST MODELS ==========

/// Body of `POST /accounts`.
#[derive(Debug, Deserialize)]
pub struct FundRequest {
    /// Classic address or test-network X-address. Absent: generate a new
    /// account and bootstrap its trust line.
    pub destination: Option<String>,
    pub currency: Option<String>,
    /// Whole-unit amount as a decimal string; fractions are not dispensed.
    pub amount: Option<String>,
    /// Raw memo objects, passed through to the transaction unchanged.
    pub memos: Option<Vec<serde_json::Value>>,
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub x_address: String,
    pub classic_address: String,
    /// Alias kept for callers that read `address`.
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<u32>,
    /// Master seed of a generated account; the faucet keeps no copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

impl AccountView {
    pub fn new(destination: &Destination, seed: Option<String>) -> Self {
        Self {
            x_address: destination.x_address.clone(),
            classic_address: destination.classic_address.clone(),
            address: destination.classic_address.clone(),
            tag: destination.tag,
            seed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FundResponse {
    pub account: AccountView,
    pub amount: u64,
    /// Present only when the faucet generated the account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_view_uses_wire_casing_and_omits_empty_fields() {
        let destination = Destination {
            classic_address: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".to_string(),
            x_address: "TVacixsWrqyWCr98eTYP7FSzE9NwupESR4TrnijN7fccNiS".to_string(),
            tag: None,
        };
        let view = AccountView::new(&destination, None);
        let wire = serde_json::to_value(&view).unwrap();

        assert_eq!(wire["classicAddress"], wire["address"]);
        assert!(wire.get("tag").is_none());
        assert!(wire.get("seed").is_none());
        assert!(wire.get("xAddress").is_some());
    }
}
