//! Classic and X-address handling for the test network.
//!
//! Both forms are base58check with the ledger's alphabet. A classic address
//! wraps a 20-byte account id behind a zero version byte; an X-address packs
//! a network prefix, the account id, and an optional 32-bit destination tag
//! into one payload.

use crate::error::AppError;

const CLASSIC_VERSION: u8 = 0x00;
// Network prefixes for X-addresses. This faucet serves an altnet, so it only
// renders and accepts test-network X-addresses.
const XADDRESS_PREFIX_TEST: [u8; 2] = [0x04, 0x93];
const XADDRESS_PREFIX_MAIN: [u8; 2] = [0x05, 0x44];

/// A validated destination in both renderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub classic_address: String,
    pub x_address: String,
    pub tag: Option<u32>,
}

impl Destination {
    /// Accepts either rendering: a test-network X-address (classic address
    /// and tag recovered from it) or a classic address (X-address derived).
    pub fn resolve(input: &str) -> Result<Self, AppError> {
        if input.starts_with('T') {
            let (account_id, tag) = decode_x_address(input)?;
            Ok(Self {
                classic_address: encode_classic_address(&account_id),
                x_address: input.to_string(),
                tag,
            })
        } else {
            let account_id = decode_classic_address(input)?;
            Ok(Self {
                classic_address: input.to_string(),
                x_address: encode_x_address(&account_id, None),
                tag: None,
            })
        }
    }

    /// Rendering for a freshly generated classic address.
    pub fn from_classic(address: &str) -> Result<Self, AppError> {
        Self::resolve(address)
    }
}

pub fn decode_classic_address(address: &str) -> Result<[u8; 20], AppError> {
    let bytes = bs58::decode(address)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .map_err(|_| AppError::InvalidDestination(address.to_string()))?;

    if bytes.len() != 21 || bytes[0] != CLASSIC_VERSION {
        return Err(AppError::InvalidDestination(address.to_string()));
    }

    let mut account_id = [0u8; 20];
    account_id.copy_from_slice(&bytes[1..]);
    Ok(account_id)
}

pub fn encode_classic_address(account_id: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(CLASSIC_VERSION);
    payload.extend_from_slice(account_id);
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

pub fn encode_x_address(account_id: &[u8; 20], tag: Option<u32>) -> String {
    let mut payload = Vec::with_capacity(31);
    payload.extend_from_slice(&XADDRESS_PREFIX_TEST);
    payload.extend_from_slice(account_id);
    match tag {
        Some(tag) => {
            payload.push(0x01);
            payload.extend_from_slice(&u64::from(tag).to_le_bytes());
        }
        None => {
            payload.push(0x00);
            payload.extend_from_slice(&0u64.to_le_bytes());
        }
    }
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

pub fn decode_x_address(address: &str) -> Result<([u8; 20], Option<u32>), AppError> {
    let bytes = bs58::decode(address)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .map_err(|_| AppError::InvalidDestination(address.to_string()))?;

    if bytes.len() != 31 {
        return Err(AppError::InvalidDestination(address.to_string()));
    }
    if bytes[..2] == XADDRESS_PREFIX_MAIN {
        return Err(AppError::InvalidDestination(format!(
            "{}: main-network address on a test network",
            address
        )));
    }
    if bytes[..2] != XADDRESS_PREFIX_TEST {
        return Err(AppError::InvalidDestination(address.to_string()));
    }

    let mut account_id = [0u8; 20];
    account_id.copy_from_slice(&bytes[2..22]);

    let flag = bytes[22];
    let raw_tag = u64::from_le_bytes(bytes[23..31].try_into().expect("8 tag bytes"));
    let tag = match flag {
        0x00 if raw_tag == 0 => None,
        0x01 if raw_tag <= u64::from(u32::MAX) => Some(raw_tag as u32),
        _ => return Err(AppError::InvalidDestination(address.to_string())),
    };

    Ok((account_id, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The all-zero account id has a fixed, well-known classic rendering.
    const ACCOUNT_ZERO: &str = "rrrrrrrrrrrrrrrrrrrrrhoLvTp";
    const GENESIS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

    #[test]
    fn account_zero_encodes_to_known_address() {
        assert_eq!(encode_classic_address(&[0u8; 20]), ACCOUNT_ZERO);
    }

    #[test]
    fn classic_address_round_trips() {
        let account_id = decode_classic_address(GENESIS).unwrap();
        assert_eq!(encode_classic_address(&account_id), GENESIS);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut corrupted = GENESIS.to_string();
        corrupted.pop();
        corrupted.push('1');
        assert!(decode_classic_address(&corrupted).is_err());
    }

    #[test]
    fn x_address_round_trips_with_tag() {
        let account_id = decode_classic_address(GENESIS).unwrap();
        let x_address = encode_x_address(&account_id, Some(13_371_337));
        assert!(x_address.starts_with('T'));

        let (decoded_id, tag) = decode_x_address(&x_address).unwrap();
        assert_eq!(decoded_id, account_id);
        assert_eq!(tag, Some(13_371_337));
    }

    #[test]
    fn x_address_round_trips_without_tag() {
        let account_id = decode_classic_address(GENESIS).unwrap();
        let x_address = encode_x_address(&account_id, None);
        let (decoded_id, tag) = decode_x_address(&x_address).unwrap();
        assert_eq!(decoded_id, account_id);
        assert_eq!(tag, None);
    }

    #[test]
    fn classic_address_is_not_an_x_address() {
        assert!(decode_x_address(GENESIS).is_err());
    }

    #[test]
    fn resolve_derives_the_missing_rendering() {
        let from_classic = Destination::resolve(GENESIS).unwrap();
        assert_eq!(from_classic.classic_address, GENESIS);
        assert!(from_classic.x_address.starts_with('T'));
        assert_eq!(from_classic.tag, None);

        let from_x = Destination::resolve(&from_classic.x_address).unwrap();
        assert_eq!(from_x.classic_address, GENESIS);
        assert_eq!(from_x.tag, None);
    }

    #[test]
    fn resolve_rejects_garbage() {
        assert!(Destination::resolve("not-an-address").is_err());
        assert!(Destination::resolve("").is_err());
    }
}
