// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature decoding and chain-specific reassembly.
//!
//! The remote signer returns a 65-byte `r ‖ s ‖ v` blob. Whether `v` is kept
//! is decided per target chain through a [`ChainProfile`]: chains that verify
//! against a known public key take the 64-byte compact form, chains that
//! recover the signer from the signature need the recovery byte.

use base64ct::{Base64, Encoding};
use tracing::debug;

/// Length of a recoverable `r ‖ s ‖ v` signature.
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// Length of a compact `r ‖ s` signature.
pub const COMPACT_SIGNATURE_LEN: usize = 64;

/// Errors while decoding signer output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("signature is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("invalid recovery byte {0:#04x}")]
    InvalidRecoveryByte(u8),
}

/// What a target chain does with the recovery byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// The chain verifies `(r, s)` against a public key carried in the tx.
    Discard,
    /// The chain recovers the signer; `v` must be present and valid.
    Preserve,
}

/// Signature conventions for one target chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainProfile {
    pub name: &'static str,
    pub recovery: RecoveryPolicy,
}

/// Initia / Cosmos SDK accounts with an `ethsecp256k1` key signed under EIP-191.
pub const INITIA_ETH_SECP256K1: ChainProfile = ChainProfile {
    name: "initia-ethsecp256k1",
    recovery: RecoveryPolicy::Discard,
};

/// EVM personal messages (`eth_sign` / `personal_sign`).
pub const EVM_PERSONAL_MESSAGE: ChainProfile = ChainProfile {
    name: "evm-personal-message",
    recovery: RecoveryPolicy::Preserve,
};

/// A 65-byte signature as returned by the remote signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignatureBlob {
    r: [u8; 32],
    s: [u8; 32],
    v: u8,
}

impl RawSignatureBlob {
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Decode a 65-byte blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let (r, s, v) = split(bytes)?;
        Ok(Self { r, s, v })
    }

    /// Decode a base64-encoded 65-byte blob.
    pub fn from_base64(encoded: &str) -> Result<Self, SignatureError> {
        let bytes = Base64::decode_vec(encoded.trim())
            .map_err(|e| SignatureError::InvalidBase64(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    pub fn v(&self) -> u8 {
        self.v
    }

    pub fn split(&self) -> ([u8; 32], [u8; 32], u8) {
        (self.r, self.s, self.v)
    }

    pub fn to_bytes(&self) -> [u8; RECOVERABLE_SIGNATURE_LEN] {
        with_recovery(&self.r, &self.s, self.v)
    }

    pub fn compact(&self) -> [u8; COMPACT_SIGNATURE_LEN] {
        compact(&self.r, &self.s)
    }

    /// Normalized recovery id (0 or 1). Accepts both `0/1` and `27/28`.
    pub fn recovery_id(&self) -> Result<u8, SignatureError> {
        match self.v {
            0 | 1 => Ok(self.v),
            27 | 28 => Ok(self.v - 27),
            other => Err(SignatureError::InvalidRecoveryByte(other)),
        }
    }

    /// Re-encode for `profile`.
    pub fn reconstruct(&self, profile: &ChainProfile) -> Result<ReconstructedSignature, SignatureError> {
        match profile.recovery {
            RecoveryPolicy::Discard => {
                debug!(profile = profile.name, v = self.v, "Discarding recovery byte");
                Ok(ReconstructedSignature::Compact(self.compact()))
            }
            RecoveryPolicy::Preserve => {
                self.recovery_id()?;
                Ok(ReconstructedSignature::Recoverable(self.to_bytes()))
            }
        }
    }
}

/// The chain-native signature encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructedSignature {
    Compact([u8; COMPACT_SIGNATURE_LEN]),
    Recoverable([u8; RECOVERABLE_SIGNATURE_LEN]),
}

impl ReconstructedSignature {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ReconstructedSignature::Compact(bytes) => bytes,
            ReconstructedSignature::Recoverable(bytes) => bytes,
        }
    }

    pub fn to_base64(&self) -> String {
        Base64::encode_string(self.as_bytes())
    }
}

/// Split a 65-byte blob into `(r, s, v)`.
pub fn split(blob: &[u8]) -> Result<([u8; 32], [u8; 32], u8), SignatureError> {
    if blob.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength {
            expected: RECOVERABLE_SIGNATURE_LEN,
            actual: blob.len(),
        });
    }

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&blob[..32]);
    s.copy_from_slice(&blob[32..64]);
    Ok((r, s, blob[64]))
}

/// `r ‖ s`.
pub fn compact(r: &[u8; 32], s: &[u8; 32]) -> [u8; COMPACT_SIGNATURE_LEN] {
    let mut out = [0u8; COMPACT_SIGNATURE_LEN];
    out[..32].copy_from_slice(r);
    out[32..].copy_from_slice(s);
    out
}

/// `r ‖ s ‖ v`.
pub fn with_recovery(r: &[u8; 32], s: &[u8; 32], v: u8) -> [u8; RECOVERABLE_SIGNATURE_LEN] {
    let mut out = [0u8; RECOVERABLE_SIGNATURE_LEN];
    out[..32].copy_from_slice(r);
    out[32..64].copy_from_slice(s);
    out[64] = v;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn all_zero_blob_splits_into_zero_parts() {
        let blob = [0u8; 65];
        let (r, s, v) = split(&blob).unwrap();
        assert_eq!(r, [0u8; 32]);
        assert_eq!(s, [0u8; 32]);
        assert_eq!(v, 0);
        assert_eq!(compact(&r, &s), [0u8; 64]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = RawSignatureBlob::from_bytes(&[1u8; 64]).unwrap_err();
        assert_eq!(
            err,
            SignatureError::InvalidLength {
                expected: 65,
                actual: 64
            }
        );
    }

    #[test]
    fn base64_blob_decodes() {
        let mut bytes = [7u8; 65];
        bytes[64] = 28;
        let encoded = Base64::encode_string(&bytes);

        let blob = RawSignatureBlob::from_base64(&encoded).unwrap();
        assert_eq!(blob.v(), 28);
        assert_eq!(blob.recovery_id().unwrap(), 1);
        assert_eq!(blob.to_bytes(), bytes);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = RawSignatureBlob::from_base64("not base64!").unwrap_err();
        assert!(matches!(err, SignatureError::InvalidBase64(_)));
    }

    #[test]
    fn discard_profile_emits_compact_form() {
        let blob = RawSignatureBlob::new([1u8; 32], [2u8; 32], 27);
        let sig = blob.reconstruct(&INITIA_ETH_SECP256K1).unwrap();

        assert_eq!(sig.as_bytes().len(), 64);
        assert_eq!(&sig.as_bytes()[..32], &[1u8; 32]);
        assert_eq!(&sig.as_bytes()[32..], &[2u8; 32]);
    }

    #[test]
    fn preserve_profile_keeps_recovery_byte() {
        let blob = RawSignatureBlob::new([1u8; 32], [2u8; 32], 28);
        let sig = blob.reconstruct(&EVM_PERSONAL_MESSAGE).unwrap();
        assert_eq!(sig.as_bytes().len(), 65);
        assert_eq!(sig.as_bytes()[64], 28);
    }

    #[test]
    fn preserve_profile_rejects_invalid_recovery_byte() {
        let blob = RawSignatureBlob::new([1u8; 32], [2u8; 32], 5);
        let err = blob.reconstruct(&EVM_PERSONAL_MESSAGE).unwrap_err();
        assert_eq!(err, SignatureError::InvalidRecoveryByte(5));

        // the same byte is irrelevant where the chain drops it
        assert!(blob.reconstruct(&INITIA_ETH_SECP256K1).is_ok());
    }

    proptest! {
        #[test]
        fn compact_is_prefix_of_blob(bytes in prop::collection::vec(any::<u8>(), 65)) {
            let (r, s, v) = split(&bytes).unwrap();
            let out = compact(&r, &s);
            prop_assert_eq!(out.len(), 64);
            prop_assert_eq!(&out[..], &bytes[..64]);
            prop_assert_eq!(&with_recovery(&r, &s, v)[..], &bytes[..]);
        }
    }
}
