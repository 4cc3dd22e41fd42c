// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Assembly
//!
//! Builds a bank transfer, its Amino sign document, and the final protobuf
//! `TxRaw` once the vault signature is back.
//!
//! ## Wire layout
//!
//! ```text
//! TxRaw { body_bytes, auth_info_bytes, signatures: [r ‖ s] }
//!   TxBody   { messages: [Any(MsgSend)], memo }
//!   AuthInfo { signer_infos: [SignerInfo { Any(PubKey), Single(EIP_191), sequence }],
//!              fee: { amount, gas_limit } }
//! ```

use base64ct::{Base64, Encoding};
use prost::Message;
use sha2::{Digest, Sha256};

use super::address::{decode_account, AddressError};
use super::amino::{AminoCoin, AminoFee, AminoMsg, AminoMsgSend, AminoSignDoc};
use super::types::{NetworkConfig, ETH_PUBKEY_TYPE_URL, MSG_SEND_TYPE_URL, SIGN_MODE_EIP_191};
use crate::broadcast::AccountInfo;
use crate::crypto::{CompressedPublicKey, ReconstructedSignature, COMPACT_SIGNATURE_LEN};

// =============================================================================
// Protobuf messages
// =============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Coin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct MsgSend {
    #[prost(string, tag = "1")]
    pub from_address: String,
    #[prost(string, tag = "2")]
    pub to_address: String,
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<Coin>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EthPubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TxBody {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    #[prost(string, tag = "2")]
    pub memo: String,
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ModeInfoSingle {
    #[prost(int32, tag = "1")]
    pub mode: i32,
}

/// `ModeInfo` with only the `single` arm of its oneof.
#[derive(Clone, PartialEq, Message)]
pub struct ModeInfo {
    #[prost(message, optional, tag = "1")]
    pub single: Option<ModeInfoSingle>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignerInfo {
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfo>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct Fee {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<Coin>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthInfo {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfo>,
    #[prost(message, optional, tag = "2")]
    pub fee: Option<Fee>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TxRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

// =============================================================================
// Transfer building
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("invalid amount `{field}`: `{value}` is not a positive integer")]
    InvalidAmount { field: &'static str, value: String },

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("expected a {COMPACT_SIGNATURE_LEN}-byte compact signature, got {actual} bytes")]
    SignatureForm { actual: usize },
}

/// What to transfer, in base denomination units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub gas_limit: u64,
    pub fee_amount: String,
    pub memo: String,
}

/// A transfer bound to an account sequence, waiting for its signature.
#[derive(Debug, Clone)]
pub struct UnsignedTransfer {
    chain_id: String,
    denom: String,
    account: AccountInfo,
    public_key: CompressedPublicKey,
    request: TransferRequest,
}

/// A fully assembled transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub tx_bytes: Vec<u8>,
    /// Upper-case hex SHA-256 of `tx_bytes`.
    pub tx_hash: String,
}

impl SignedTx {
    pub fn from_raw(raw: &TxRaw) -> Self {
        let tx_bytes = raw.encode_to_vec();
        let tx_hash = alloy::hex::encode_upper(Sha256::digest(&tx_bytes));
        Self { tx_bytes, tx_hash }
    }

    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.tx_bytes)
    }
}

fn positive_integer(field: &'static str, value: &str) -> Result<(), AssemblyError> {
    let valid = !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && value.bytes().any(|b| b != b'0');
    if valid {
        Ok(())
    } else {
        Err(AssemblyError::InvalidAmount {
            field,
            value: value.to_string(),
        })
    }
}

impl UnsignedTransfer {
    pub fn new(
        network: &NetworkConfig,
        request: TransferRequest,
        account: AccountInfo,
        public_key: CompressedPublicKey,
    ) -> Result<Self, AssemblyError> {
        positive_integer("amount", &request.amount)?;
        positive_integer("fee_amount", &request.fee_amount)?;
        decode_account(&request.from_address, network.address_prefix)?;
        decode_account(&request.to_address, network.address_prefix)?;

        Ok(Self {
            chain_id: network.chain_id.to_string(),
            denom: network.denom.to_string(),
            account,
            public_key,
            request,
        })
    }

    pub fn request(&self) -> &TransferRequest {
        &self.request
    }

    pub fn account(&self) -> AccountInfo {
        self.account
    }

    fn amino_coin(&self, amount: &str) -> AminoCoin {
        AminoCoin {
            amount: amount.to_string(),
            denom: self.denom.clone(),
        }
    }

    fn coin(&self, amount: &str) -> Coin {
        Coin {
            denom: self.denom.clone(),
            amount: amount.to_string(),
        }
    }

    /// The Amino document the vault signs.
    pub fn sign_doc(&self) -> AminoSignDoc {
        AminoSignDoc {
            account_number: self.account.account_number.to_string(),
            chain_id: self.chain_id.clone(),
            fee: AminoFee {
                amount: vec![self.amino_coin(&self.request.fee_amount)],
                gas: self.request.gas_limit.to_string(),
            },
            memo: self.request.memo.clone(),
            msgs: vec![AminoMsg::Send(AminoMsgSend {
                amount: vec![self.amino_coin(&self.request.amount)],
                from_address: self.request.from_address.clone(),
                to_address: self.request.to_address.clone(),
            })],
            sequence: self.account.sequence.to_string(),
        }
    }

    pub fn body(&self) -> TxBody {
        let msg = MsgSend {
            from_address: self.request.from_address.clone(),
            to_address: self.request.to_address.clone(),
            amount: vec![self.coin(&self.request.amount)],
        };
        TxBody {
            messages: vec![Any {
                type_url: MSG_SEND_TYPE_URL.to_string(),
                value: msg.encode_to_vec(),
            }],
            memo: self.request.memo.clone(),
            timeout_height: 0,
        }
    }

    pub fn auth_info(&self) -> AuthInfo {
        let public_key = EthPubKey {
            key: self.public_key.as_bytes().to_vec(),
        };
        AuthInfo {
            signer_infos: vec![SignerInfo {
                public_key: Some(Any {
                    type_url: ETH_PUBKEY_TYPE_URL.to_string(),
                    value: public_key.encode_to_vec(),
                }),
                mode_info: Some(ModeInfo {
                    single: Some(ModeInfoSingle {
                        mode: SIGN_MODE_EIP_191,
                    }),
                }),
                sequence: self.account.sequence,
            }],
            fee: Some(Fee {
                amount: vec![self.coin(&self.request.fee_amount)],
                gas_limit: self.request.gas_limit,
            }),
        }
    }

    /// Attach the signature. Only the 64-byte `r ‖ s` form is accepted.
    pub fn assemble(&self, signature: &ReconstructedSignature) -> Result<SignedTx, AssemblyError> {
        let ReconstructedSignature::Compact(compact) = signature else {
            return Err(AssemblyError::SignatureForm {
                actual: signature.as_bytes().len(),
            });
        };

        let raw = TxRaw {
            body_bytes: self.body().encode_to_vec(),
            auth_info_bytes: self.auth_info().encode_to_vec(),
            signatures: vec![compact.to_vec()],
        };
        Ok(SignedTx::from_raw(&raw))
    }
}
