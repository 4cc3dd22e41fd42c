// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Broadcast and bounded confirmation.
//!
//! - `types` - Chain collaborator traits and wire-neutral responses
//! - `outcome` - Outcome state machine and classification
//! - `confirmer` - Broadcast once, then poll with a bounded budget

pub mod confirmer;
pub mod outcome;
pub mod types;

pub use confirmer::{
    BroadcastConfirmer, ConfirmPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
pub use outcome::{classify_poll, classify_submission, BroadcastOutcome, PollVerdict};
pub use types::{AccountInfo, AccountSequence, BroadcastResponse, ChainClient, ChainClientError, TxInfo};
