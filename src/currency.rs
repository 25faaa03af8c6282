//! Currency-code representation checks.
//!
//! The ledger accepts either a three-character code or the 160-bit hex form
//! (40 uppercase hex digits). The native asset is not an issued currency and
//! is never dispensed by this faucet.

use crate::error::AppError;

fn is_hex_representation(input: &str) -> bool {
    input.len() == 40
        && input
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

pub fn is_valid_representation(input: &str) -> bool {
    input.chars().count() == 3 || is_hex_representation(input)
}

/// Full request-level validation: present, representable, and not the native
/// asset.
pub fn validate_currency(input: &str) -> Result<(), AppError> {
    if !is_valid_representation(input) {
        return Err(AppError::InvalidCurrency(format!(
            "Unsupported currency representation: {}",
            input
        )));
    }
    if input.eq_ignore_ascii_case("XRP") {
        return Err(AppError::InvalidCurrency("Not a faucet of XRP".to_string()));
    }
    Ok(())
}
