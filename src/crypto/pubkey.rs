// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 public-key recovery from EIP-191 personal-message signatures.
//!
//! The custodial vault never exposes its public key, so it is recovered from
//! a signature over a known message and compressed to the 33-byte SEC1 form
//! that Cosmos-style account public keys carry.

use alloy::primitives::{eip191_hash_message, Address};
use base64ct::{Base64, Encoding};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use tracing::debug;

use super::signature::{RawSignatureBlob, SignatureError, COMPACT_SIGNATURE_LEN};

/// Length of an uncompressed SEC1 point (`0x04 ‖ x ‖ y`).
pub const UNCOMPRESSED_KEY_LEN: usize = 65;

/// Length of a compressed SEC1 point (`0x02|0x03 ‖ x`).
pub const COMPRESSED_KEY_LEN: usize = 33;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("signature carries no recovery id; supply one or an expected address")]
    MissingRecoveryId,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid curve point: {0}")]
    InvalidPoint(String),

    #[error("no recovery candidate matched expected address {expected}")]
    NoCandidateMatched { expected: Address },

    #[error("recovered address {recovered} does not match expected {expected}")]
    AddressMismatch { expected: Address, recovered: Address },

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// A 33-byte compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressedPublicKey([u8; COMPRESSED_KEY_LEN]);

impl CompressedPublicKey {
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_KEY_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.0)
    }

    pub fn to_hex(&self) -> String {
        alloy::hex::encode(self.0)
    }
}

impl std::fmt::Debug for CompressedPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompressedPublicKey(0x{})", self.to_hex())
    }
}

/// Compress an uncompressed SEC1 point: `0x02` for even y, `0x03` for odd y.
///
/// Only the encoding is checked here; use [`recover_and_compress`] for keys
/// that must lie on the curve.
pub fn compress_point(uncompressed: &[u8]) -> Result<CompressedPublicKey, RecoveryError> {
    if uncompressed.len() != UNCOMPRESSED_KEY_LEN || uncompressed[0] != 0x04 {
        return Err(RecoveryError::InvalidPoint(format!(
            "expected {UNCOMPRESSED_KEY_LEN}-byte 0x04-prefixed point, got {} bytes",
            uncompressed.len()
        )));
    }

    let x = &uncompressed[1..33];
    let y = &uncompressed[33..65];

    let mut out = [0u8; COMPRESSED_KEY_LEN];
    out[0] = if y[31] & 1 == 0 { 0x02 } else { 0x03 };
    out[1..].copy_from_slice(x);
    Ok(CompressedPublicKey(out))
}

/// Recover the uncompressed key that signed `message` (EIP-191 hashed).
pub fn recover_uncompressed(
    message: &[u8],
    blob: &RawSignatureBlob,
) -> Result<[u8; UNCOMPRESSED_KEY_LEN], RecoveryError> {
    recover_with_id(message, &blob.compact(), blob.recovery_id()?)
}

/// Recover the signer of an EIP-191 personal message and compress its key.
///
/// `signature` must be the 65-byte `r ‖ s ‖ v` form. A 64-byte signature has
/// no recovery id and is refused; use [`recover_for_address`] instead.
pub fn recover_and_compress(
    message: &[u8],
    signature: &[u8],
) -> Result<CompressedPublicKey, RecoveryError> {
    if signature.len() == COMPACT_SIGNATURE_LEN {
        return Err(RecoveryError::MissingRecoveryId);
    }

    let blob = RawSignatureBlob::from_bytes(signature)?;
    let uncompressed = recover_uncompressed(message, &blob)?;
    compress_point(&uncompressed)
}

/// Recover from a compact `r ‖ s` signature by trying both parities and
/// keeping the candidate whose address equals `expected`.
pub fn recover_for_address(
    message: &[u8],
    compact: &[u8; COMPACT_SIGNATURE_LEN],
    expected: Address,
) -> Result<CompressedPublicKey, RecoveryError> {
    for id in [0u8, 1u8] {
        let Ok(uncompressed) = recover_with_id(message, compact, id) else {
            continue;
        };
        if address_of(&uncompressed) == expected {
            return compress_point(&uncompressed);
        }
    }
    Err(RecoveryError::NoCandidateMatched { expected })
}

/// Recover and check the result against a known address.
///
/// A `v` outside `0/1/27/28` (for example EIP-155 style) is not trusted as a
/// parity; both candidates are tried and the address decides.
pub fn recover_checked(
    message: &[u8],
    blob: &RawSignatureBlob,
    expected: Address,
) -> Result<CompressedPublicKey, RecoveryError> {
    let Ok(id) = blob.recovery_id() else {
        debug!(v = blob.v(), "Unrecognised recovery byte, matching by address");
        return recover_for_address(message, &blob.compact(), expected);
    };
    let uncompressed = recover_with_id(message, &blob.compact(), id)?;
    let recovered = address_of(&uncompressed);
    if recovered != expected {
        return Err(RecoveryError::AddressMismatch {
            expected,
            recovered,
        });
    }
    compress_point(&uncompressed)
}

/// EVM address of an uncompressed SEC1 point.
pub fn address_of(uncompressed: &[u8; UNCOMPRESSED_KEY_LEN]) -> Address {
    Address::from_raw_public_key(&uncompressed[1..])
}

fn recover_with_id(
    message: &[u8],
    compact: &[u8; COMPACT_SIGNATURE_LEN],
    id: u8,
) -> Result<[u8; UNCOMPRESSED_KEY_LEN], RecoveryError> {
    let hash = eip191_hash_message(message);

    let mut signature = Signature::from_slice(compact)
        .map_err(|e| RecoveryError::InvalidSignature(e.to_string()))?;
    let mut recovery_id =
        RecoveryId::from_byte(id).ok_or(RecoveryError::Signature(SignatureError::InvalidRecoveryByte(id)))?;

    // k256 only verifies low-s signatures; flipping s flips the y parity.
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recovery_id)
        .map_err(|e| RecoveryError::InvalidPoint(e.to_string()))?;

    let point = key.to_encoded_point(false);
    let mut out = [0u8; UNCOMPRESSED_KEY_LEN];
    out.copy_from_slice(point.as_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signature::with_recovery;
    use k256::ecdsa::SigningKey;

    const MESSAGE: &[u8] = b"Initia public key derivation";

    fn test_key() -> SigningKey {
        SigningKey::from_slice(&[0x42u8; 32]).unwrap()
    }

    fn sign_personal(key: &SigningKey, message: &[u8], v_offset: u8) -> [u8; 65] {
        let hash = eip191_hash_message(message);
        let (sig, recid) = key.sign_prehash_recoverable(hash.as_slice()).unwrap();
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        with_recovery(&r, &s, recid.to_byte() + v_offset)
    }

    fn expected_compressed(key: &SigningKey) -> Vec<u8> {
        key.verifying_key().to_encoded_point(true).as_bytes().to_vec()
    }

    fn expected_address(key: &SigningKey) -> Address {
        let point = key.verifying_key().to_encoded_point(false);
        Address::from_raw_public_key(&point.as_bytes()[1..])
    }

    #[test]
    fn recovers_compressed_key_with_ethereum_v() {
        let key = test_key();
        let sig = sign_personal(&key, MESSAGE, 27);

        let recovered = recover_and_compress(MESSAGE, &sig).unwrap();
        assert_eq!(recovered.as_bytes().to_vec(), expected_compressed(&key));
    }

    #[test]
    fn recovers_compressed_key_with_raw_recovery_id() {
        let key = test_key();
        let sig = sign_personal(&key, MESSAGE, 0);

        let recovered = recover_and_compress(MESSAGE, &sig).unwrap();
        assert_eq!(recovered.as_bytes().to_vec(), expected_compressed(&key));
    }

    #[test]
    fn derivation_is_stable_across_calls() {
        let key = test_key();
        let first = recover_and_compress(MESSAGE, &sign_personal(&key, MESSAGE, 27)).unwrap();
        let second = recover_and_compress(MESSAGE, &sign_personal(&key, MESSAGE, 27)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn compact_signature_requires_recovery_id() {
        let key = test_key();
        let sig = sign_personal(&key, MESSAGE, 27);
        let err = recover_and_compress(MESSAGE, &sig[..64]).unwrap_err();
        assert_eq!(err, RecoveryError::MissingRecoveryId);
    }

    #[test]
    fn compact_signature_recovers_against_known_address() {
        let key = test_key();
        let sig = sign_personal(&key, MESSAGE, 27);
        let mut compact = [0u8; 64];
        compact.copy_from_slice(&sig[..64]);

        let recovered = recover_for_address(MESSAGE, &compact, expected_address(&key)).unwrap();
        assert_eq!(recovered.as_bytes().to_vec(), expected_compressed(&key));

        let err = recover_for_address(MESSAGE, &compact, Address::ZERO).unwrap_err();
        assert!(matches!(err, RecoveryError::NoCandidateMatched { .. }));
    }

    #[test]
    fn checked_recovery_rejects_other_signer() {
        let key = test_key();
        let blob = RawSignatureBlob::from_bytes(&sign_personal(&key, MESSAGE, 27)).unwrap();

        assert!(recover_checked(MESSAGE, &blob, expected_address(&key)).is_ok());
        let err = recover_checked(MESSAGE, &blob, Address::ZERO).unwrap_err();
        assert!(matches!(err, RecoveryError::AddressMismatch { .. }));
    }

    #[test]
    fn checked_recovery_accepts_eip155_style_v() {
        let key = test_key();
        let blob = RawSignatureBlob::from_bytes(&sign_personal(&key, MESSAGE, 37)).unwrap();
        assert!(blob.recovery_id().is_err());

        let recovered = recover_checked(MESSAGE, &blob, expected_address(&key)).unwrap();
        assert_eq!(recovered.as_bytes().to_vec(), expected_compressed(&key));

        let err = recover_checked(MESSAGE, &blob, Address::ZERO).unwrap_err();
        assert!(matches!(err, RecoveryError::NoCandidateMatched { .. }));
    }

    #[test]
    fn zero_signature_is_fatal() {
        let err = recover_and_compress(MESSAGE, &[0u8; 65]).unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidSignature(_)));
    }

    #[test]
    fn compression_prefix_follows_y_parity() {
        let mut point = [0u8; 65];
        point[0] = 0x04;
        point[1..33].copy_from_slice(&[0xAB; 32]);

        point[64] = 0x10;
        let even = compress_point(&point).unwrap();
        assert_eq!(even.as_bytes()[0], 0x02);
        assert_eq!(&even.as_bytes()[1..], &[0xAB; 32]);

        point[64] = 0x11;
        let odd = compress_point(&point).unwrap();
        assert_eq!(odd.as_bytes()[0], 0x03);

        assert_eq!(compress_point(&point).unwrap(), odd);
    }

    #[test]
    fn compression_rejects_bad_encoding() {
        assert!(compress_point(&[0x04; 64]).is_err());
        let mut point = [0u8; 65];
        point[0] = 0x02;
        assert!(compress_point(&point).is_err());
    }
}
