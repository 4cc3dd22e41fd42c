// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crate-level error taxonomy.
//!
//! Every stage before broadcast fails through [`PipelineError`]. Anything
//! after broadcast is reported as a [`BroadcastOutcome`] value instead, so
//! the caller always keeps the transaction hash.
//!
//! [`BroadcastOutcome`]: crate::broadcast::BroadcastOutcome

use crate::broadcast::ChainClientError;
use crate::canonical::CanonicalError;
use crate::chain::initia::{AddressError, AssemblyError};
use crate::config::ConfigError;
use crate::crypto::{RecoveryError, SignatureError};
use crate::signer::{EnvelopeError, RemoteSignerError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("canonicalization failed: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("sign request invalid: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Signer(#[from] RemoteSignerError),

    #[error("signature decoding failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("public key recovery failed: {0}")]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("transaction assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Chain(#[from] ChainClientError),

    #[error("interrupted before broadcast; nothing was submitted")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_component_errors() {
        let err: PipelineError = SignatureError::InvalidLength {
            expected: 65,
            actual: 64,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "signature decoding failed: malformed signature length: expected 65 bytes, got 64"
        );

        let err: PipelineError = ConfigError::Missing("SIGNER_VAULT_ID".to_string()).into();
        assert!(matches!(err, PipelineError::Config(_)));
        assert_eq!(
            err.to_string(),
            "missing required configuration: SIGNER_VAULT_ID"
        );

        let err: PipelineError = RemoteSignerError::NoSignatures {
            state: "signed".to_string(),
        }
        .into();
        assert!(matches!(err, PipelineError::Signer(_)));
        assert!(err.to_string().contains("no signatures returned"));
    }
}
