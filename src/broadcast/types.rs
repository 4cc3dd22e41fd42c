// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain collaborator contracts used by the confirmer and orchestrator.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Errors from a chain REST/RPC collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid REST URL: {0}")]
    InvalidUrl(String),

    #[error("Chain request failed: {0}")]
    Transport(String),

    #[error("Chain response was invalid: {0}")]
    InvalidResponse(String),
}

/// Result of submitting a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    /// Hash assigned by the node; absent when the node refused the tx.
    pub txhash: Option<String>,
    /// CheckTx result code; non-zero means the tx failed pre-checks.
    pub code: u32,
    pub raw_log: Option<String>,
}

/// Inclusion status of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    /// Block height; zero when the node knows the tx but has not included it.
    pub height: u64,
    pub code: u32,
    pub raw_log: Option<String>,
}

/// Account number and sequence for the signing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Broadcast and status lookup on a target chain.
pub trait ChainClient: Send + Sync {
    type SignedTx: Send + Sync;

    /// Hash the chain will assign to `tx`, when it can be computed locally.
    fn local_tx_hash(tx: &Self::SignedTx) -> Option<String>;

    /// Submit a signed transaction.
    fn broadcast(
        &self,
        tx: &Self::SignedTx,
    ) -> impl Future<Output = Result<BroadcastResponse, ChainClientError>> + Send;

    /// Look up a transaction by hash. `Ok(None)` means not found yet.
    fn tx_info(
        &self,
        tx_hash: &str,
    ) -> impl Future<Output = Result<Option<TxInfo>, ChainClientError>> + Send;
}

/// Account number / sequence lookup. Sequence management stays with the chain.
pub trait AccountSequence: Send + Sync {
    fn account_info(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<AccountInfo, ChainClientError>> + Send;
}
