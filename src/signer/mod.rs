// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote custodial signer integration.
//!
//! - `envelope` - Typed sign-request bodies and their validation
//! - `client` - Authenticated submission and result parsing

pub mod client;
pub mod envelope;

use std::future::Future;

pub use client::{
    auth_payload, map_signer_state, parse_sign_response, RemoteSignerClient, RemoteSignerError,
    SignResult, SignedRequest, SignerState,
};
pub use envelope::{
    EnvelopeBodyError, EnvelopeError, PushMode, SignRequest, SignRequestEnvelope,
    SolanaSignatureSlot, WaitForState,
};

/// Something that turns a sign-request envelope into signatures.
///
/// Implemented by [`RemoteSignerClient`]; the orchestrator is generic over it.
pub trait MessageSigner: Send + Sync {
    fn submit(
        &self,
        envelope: &SignRequestEnvelope,
    ) -> impl Future<Output = Result<SignResult, RemoteSignerError>> + Send;
}
