// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Broadcast outcomes and the per-poll verdict.

use serde::Serialize;

use super::types::{BroadcastResponse, TxInfo};

/// State of a broadcast transaction.
///
/// Every state except `Pending` is terminal. `TimedOut` is not a failure:
/// the transaction may still be included and must be checked later by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum BroadcastOutcome {
    Pending {
        tx_hash: String,
        attempts: u32,
    },
    ConfirmedSuccess {
        tx_hash: String,
        height: u64,
    },
    ConfirmedFailure {
        tx_hash: String,
        height: u64,
        code: u32,
        raw_log: Option<String>,
    },
    TimedOut {
        tx_hash: String,
        attempts: u32,
    },
    SubmissionRejected {
        tx_hash: Option<String>,
        code: Option<u32>,
        raw_log: Option<String>,
    },
}

impl BroadcastOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BroadcastOutcome::Pending { .. })
    }

    /// Only an on-chain zero result code counts as success.
    pub fn is_success(&self) -> bool {
        matches!(self, BroadcastOutcome::ConfirmedSuccess { .. })
    }

    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            BroadcastOutcome::Pending { tx_hash, .. }
            | BroadcastOutcome::ConfirmedSuccess { tx_hash, .. }
            | BroadcastOutcome::ConfirmedFailure { tx_hash, .. }
            | BroadcastOutcome::TimedOut { tx_hash, .. } => Some(tx_hash),
            BroadcastOutcome::SubmissionRejected { tx_hash, .. } => tx_hash.as_deref(),
        }
    }

    pub fn raw_log(&self) -> Option<&str> {
        match self {
            BroadcastOutcome::ConfirmedFailure { raw_log, .. }
            | BroadcastOutcome::SubmissionRejected { raw_log, .. } => raw_log.as_deref(),
            _ => None,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            BroadcastOutcome::Pending { .. } => "pending",
            BroadcastOutcome::ConfirmedSuccess { .. } => "confirmed-success",
            BroadcastOutcome::ConfirmedFailure { .. } => "confirmed-failure",
            BroadcastOutcome::TimedOut { .. } => "timed-out",
            BroadcastOutcome::SubmissionRejected { .. } => "submission-rejected",
        }
    }
}

/// Classify a submission response.
///
/// Returns the accepted hash, or the rejection outcome when the node gave no
/// hash or a non-zero CheckTx code.
pub fn classify_submission(response: &BroadcastResponse) -> Result<String, BroadcastOutcome> {
    let hash = response
        .txhash
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty());

    match hash {
        Some(hash) if response.code == 0 => Ok(hash.to_string()),
        hash => Err(BroadcastOutcome::SubmissionRejected {
            tx_hash: hash.map(str::to_string),
            code: Some(response.code),
            raw_log: response.raw_log.clone(),
        }),
    }
}

/// Verdict of one status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollVerdict {
    Pending,
    Success { height: u64 },
    Failure { height: u64, code: u32, raw_log: Option<String> },
}

/// Classify one status query result.
pub fn classify_poll(info: Option<&TxInfo>) -> PollVerdict {
    match info {
        Some(info) if info.height > 0 => {
            if info.code == 0 {
                PollVerdict::Success {
                    height: info.height,
                }
            } else {
                PollVerdict::Failure {
                    height: info.height,
                    code: info.code,
                    raw_log: info.raw_log.clone(),
                }
            }
        }
        _ => PollVerdict::Pending,
    }
}
