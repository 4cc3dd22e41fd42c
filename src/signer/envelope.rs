// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-request envelopes for the remote signer.
//!
//! Each supported request kind is a fixed-schema variant of [`SignRequest`].
//! Envelopes are validated before they are canonicalized, so a structurally
//! invalid request is never serialized or signed.

use base64ct::{Base64, Encoding};
use serde::Serialize;

use crate::canonical::{canonicalize_value, CanonicalBytes, CanonicalError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("chain `{chain}` does not belong to the {expected} family")]
    ChainMismatch { chain: String, expected: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerType {
    ApiSigner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignMode {
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushMode {
    Auto,
    Manual,
}

/// State the create-and-wait endpoint blocks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitForState {
    Signed,
    Mined,
}

/// Complete request body sent to the remote signer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignRequestEnvelope {
    pub vault_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub signer_type: SignerType,
    pub sign_mode: SignMode,
    #[serde(flatten)]
    pub request: SignRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_state: Option<WaitForState>,
}

/// Transaction-type discriminator and its details.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum SignRequest {
    EvmMessage(EvmMessageDetails),
    EvmTransaction(EvmTransactionDetails),
    SolanaTransaction(SolanaTransactionDetails),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvmMessageKind {
    PersonalMessageType,
}

/// EIP-191 personal message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvmMessageDetails {
    #[serde(rename = "type")]
    pub kind: EvmMessageKind,
    pub chain: String,
    pub raw_data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvmTransactionKind {
    EvmRawTransaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GasPriceType {
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvmGas {
    pub gas_limit: String,
    #[serde(rename = "type")]
    pub kind: GasPriceType,
    pub priority_level: PriorityLevel,
}

/// Native-value EVM transfer executed by the vault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvmTransactionDetails {
    #[serde(rename = "type")]
    pub kind: EvmTransactionKind,
    pub use_secure_node: bool,
    pub gas: EvmGas,
    pub fail_on_prediction_failure: bool,
    pub skip_prediction: bool,
    pub push_mode: PushMode,
    /// Vault paying gas on behalf of the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funder: Option<String>,
    pub chain: String,
    pub to: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolanaTransactionKind {
    SolanaSerializedTransactionMessage,
}

/// One signature slot of a partially signed Solana message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolanaSignatureSlot {
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolanaTransactionDetails {
    #[serde(rename = "type")]
    pub kind: SolanaTransactionKind,
    pub push_mode: PushMode,
    /// Base64 serialized transaction message.
    pub data: String,
    pub chain: String,
    /// Slot 0 is the vault's own signature and must stay empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<SolanaSignatureSlot>>,
}

impl SignRequestEnvelope {
    fn api_signer(vault_id: impl Into<String>, request: SignRequest) -> Self {
        Self {
            vault_id: vault_id.into(),
            note: None,
            signer_type: SignerType::ApiSigner,
            sign_mode: SignMode::Auto,
            request,
            wait_for_state: None,
        }
    }

    /// EIP-191 personal message over the given text.
    pub fn evm_personal_message(
        vault_id: impl Into<String>,
        chain: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::api_signer(
            vault_id,
            SignRequest::EvmMessage(EvmMessageDetails {
                kind: EvmMessageKind::PersonalMessageType,
                chain: chain.into(),
                raw_data: message.into(),
            }),
        )
    }

    /// Native-value EVM transfer with default gas and prediction settings.
    pub fn evm_transfer(
        vault_id: impl Into<String>,
        chain: impl Into<String>,
        to: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::api_signer(
            vault_id,
            SignRequest::EvmTransaction(EvmTransactionDetails {
                kind: EvmTransactionKind::EvmRawTransaction,
                use_secure_node: false,
                gas: EvmGas {
                    gas_limit: "21000".to_string(),
                    kind: GasPriceType::Priority,
                    priority_level: PriorityLevel::Medium,
                },
                fail_on_prediction_failure: true,
                skip_prediction: false,
                push_mode: PushMode::Auto,
                funder: None,
                chain: chain.into(),
                to: to.into(),
                value: value.into(),
            }),
        )
    }

    /// Serialized Solana message, optionally carrying co-signer signatures.
    pub fn solana_message(
        vault_id: impl Into<String>,
        chain: impl Into<String>,
        message_base64: impl Into<String>,
        signatures: Option<Vec<SolanaSignatureSlot>>,
    ) -> Self {
        let mut envelope = Self::api_signer(
            vault_id,
            SignRequest::SolanaTransaction(SolanaTransactionDetails {
                kind: SolanaTransactionKind::SolanaSerializedTransactionMessage,
                push_mode: PushMode::Auto,
                data: message_base64.into(),
                chain: chain.into(),
                signatures,
            }),
        );
        envelope.wait_for_state = Some(WaitForState::Signed);
        envelope
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_wait_for_state(mut self, state: WaitForState) -> Self {
        self.wait_for_state = Some(state);
        self
    }

    pub fn chain(&self) -> &str {
        match &self.request {
            SignRequest::EvmMessage(d) => &d.chain,
            SignRequest::EvmTransaction(d) => &d.chain,
            SignRequest::SolanaTransaction(d) => &d.chain,
        }
    }

    /// Discriminator as sent on the wire.
    pub fn request_type(&self) -> &'static str {
        match &self.request {
            SignRequest::EvmMessage(_) => "evm_message",
            SignRequest::EvmTransaction(_) => "evm_transaction",
            SignRequest::SolanaTransaction(_) => "solana_transaction",
        }
    }

    /// Check the envelope against its variant's schema.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.vault_id.trim().is_empty() {
            return Err(EnvelopeError::MissingField("vault_id"));
        }

        match &self.request {
            SignRequest::EvmMessage(details) => {
                ensure_evm_chain(&details.chain)?;
                if details.raw_data.is_empty() {
                    return Err(EnvelopeError::MissingField("raw_data"));
                }
            }
            SignRequest::EvmTransaction(details) => {
                ensure_evm_chain(&details.chain)?;
                ensure_evm_address("to", &details.to)?;
                ensure_decimal("value", &details.value)?;
                ensure_decimal("gas_limit", &details.gas.gas_limit)?;
                if let Some(funder) = &details.funder {
                    if funder.trim().is_empty() {
                        return Err(EnvelopeError::MissingField("funder"));
                    }
                }
            }
            SignRequest::SolanaTransaction(details) => {
                if details.chain.trim().is_empty() {
                    return Err(EnvelopeError::MissingField("chain"));
                }
                if !details.chain.starts_with("solana_") {
                    return Err(EnvelopeError::ChainMismatch {
                        chain: details.chain.clone(),
                        expected: "solana",
                    });
                }
                if details.data.is_empty() {
                    return Err(EnvelopeError::MissingField("data"));
                }
                Base64::decode_vec(&details.data).map_err(|e| EnvelopeError::InvalidField {
                    field: "data",
                    reason: e.to_string(),
                })?;
                if let Some(slots) = &details.signatures {
                    match slots.first() {
                        Some(SolanaSignatureSlot { data: None }) => {}
                        _ => {
                            return Err(EnvelopeError::InvalidField {
                                field: "signatures",
                                reason: "first slot is reserved for the vault and must be null"
                                    .to_string(),
                            })
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Validate, then render the wire body.
    pub fn to_canonical_body(&self) -> Result<CanonicalBytes, EnvelopeBodyError> {
        self.validate()?;
        Ok(canonicalize_value(self)?)
    }
}

/// Failure to produce a request body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeBodyError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

fn ensure_evm_chain(chain: &str) -> Result<(), EnvelopeError> {
    if chain.trim().is_empty() {
        return Err(EnvelopeError::MissingField("chain"));
    }
    if chain.starts_with("solana_") {
        return Err(EnvelopeError::ChainMismatch {
            chain: chain.to_string(),
            expected: "evm",
        });
    }
    Ok(())
}

fn ensure_evm_address(field: &'static str, value: &str) -> Result<(), EnvelopeError> {
    let valid = value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(EnvelopeError::InvalidField {
            field,
            reason: "expected 0x followed by 40 hex characters".to_string(),
        })
    }
}

fn ensure_decimal(field: &'static str, value: &str) -> Result<(), EnvelopeError> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(EnvelopeError::InvalidField {
            field,
            reason: "expected an unsigned decimal integer".to_string(),
        })
    }
}
