// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cryptographic helpers.
//!
//! This module provides functionality for:
//! - Splitting and re-encoding signatures returned by the remote signer
//! - Recovering and compressing the vault's secp256k1 public key
//! - Signing remote-signer API requests with the local P-256 key

pub mod pubkey;
pub mod request_key;
pub mod signature;

pub use pubkey::{
    address_of, compress_point, recover_and_compress, recover_checked, recover_for_address,
    CompressedPublicKey, RecoveryError,
};
pub use request_key::{RequestKeyError, RequestSigningKey};
pub use signature::{
    compact, split, with_recovery, ChainProfile, RawSignatureBlob, ReconstructedSignature,
    RecoveryPolicy, SignatureError, COMPACT_SIGNATURE_LEN, EVM_PERSONAL_MESSAGE,
    INITIA_ETH_SECP256K1, RECOVERABLE_SIGNATURE_LEN,
};
