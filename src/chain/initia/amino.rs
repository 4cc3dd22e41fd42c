// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Amino JSON sign documents.
//!
//! The vault signs the canonical JSON of this document as an EIP-191
//! personal message. Integers are carried as decimal strings.

use serde::Serialize;

use super::types::MSG_SEND_AMINO_TYPE;
use crate::canonical::{canonicalize, CanonicalBytes, CanonicalError, Document};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AminoCoin {
    pub amount: String,
    pub denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AminoFee {
    pub amount: Vec<AminoCoin>,
    pub gas: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AminoMsgSend {
    pub amount: Vec<AminoCoin>,
    pub from_address: String,
    pub to_address: String,
}

/// A message in its Amino `{type, value}` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AminoMsg {
    Send(AminoMsgSend),
}

impl AminoMsg {
    pub fn amino_type(&self) -> &'static str {
        match self {
            AminoMsg::Send(_) => MSG_SEND_AMINO_TYPE,
        }
    }
}

impl Serialize for AminoMsg {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("AminoMsg", 2)?;
        state.serialize_field("type", self.amino_type())?;
        match self {
            AminoMsg::Send(value) => state.serialize_field("value", value)?,
        }
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AminoSignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: AminoFee,
    pub memo: String,
    pub msgs: Vec<AminoMsg>,
    pub sequence: String,
}

impl AminoSignDoc {
    pub fn to_document(&self) -> Result<Document, CanonicalError> {
        Document::from_serialize(self)
    }

    /// Canonical bytes, computed once and signed as-is.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalError> {
        canonicalize(&self.to_document()?)
    }
}
