// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bech32 account addresses.
//!
//! An Initia account controlled by an Ethereum-style key uses the same
//! 20 address bytes as the EVM address, re-encoded as bech32.

use alloy::primitives::Address;
use bech32::{FromBase32, ToBase32, Variant};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("bech32 encoding failed: {0}")]
    Encode(String),

    #[error("invalid bech32 address `{address}`: {reason}")]
    Invalid { address: String, reason: String },

    #[error("address `{address}` has prefix `{actual}`, expected `{expected}`")]
    WrongPrefix {
        address: String,
        expected: String,
        actual: String,
    },
}

/// Encode an EVM address under `prefix`.
pub fn bech32_from_evm(address: &Address, prefix: &str) -> Result<String, AddressError> {
    bech32::encode(prefix, address.as_slice().to_base32(), Variant::Bech32)
        .map_err(|e| AddressError::Encode(e.to_string()))
}

/// Decode a bech32 account address and check its prefix.
///
/// Returns the raw address bytes: 20 for user accounts, 32 for module
/// accounts.
pub fn decode_account(address: &str, prefix: &str) -> Result<Vec<u8>, AddressError> {
    let invalid = |reason: String| AddressError::Invalid {
        address: address.to_string(),
        reason,
    };

    let (hrp, data, variant) = bech32::decode(address).map_err(|e| invalid(e.to_string()))?;
    if variant != Variant::Bech32 {
        return Err(invalid("bech32m encoding is not used for accounts".to_string()));
    }
    if hrp != prefix {
        return Err(AddressError::WrongPrefix {
            address: address.to_string(),
            expected: prefix.to_string(),
            actual: hrp,
        });
    }

    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| invalid(e.to_string()))?;
    match bytes.len() {
        20 | 32 => Ok(bytes),
        n => Err(invalid(format!("{n}-byte payload"))),
    }
}
