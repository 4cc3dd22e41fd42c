// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial Broadcast - Remote-Signed Transaction Pipeline
//!
//! Builds canonical signing documents, obtains detached signatures from a
//! custodial remote signer over an authenticated API, reassembles them into
//! chain-native transactions, and broadcasts them with bounded confirmation
//! polling.
//!
//! ## Modules
//!
//! - `canonical` - Canonical JSON sign documents
//! - `crypto` - Signature codec, public key recovery, request-signing key
//! - `signer` - Remote signer envelopes and client
//! - `broadcast` - Broadcast-and-confirm state machine
//! - `chain` - Target chain integrations (Initia)
//! - `orchestrator` - End-to-end transfer pipeline
//! - `config` - Environment configuration

pub mod broadcast;
pub mod canonical;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod orchestrator;
pub mod signer;
