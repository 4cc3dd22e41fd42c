// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Initia (Cosmos SDK) integration.
//!
//! This module provides functionality for:
//! - Network constants and explorer links
//! - Bech32 account addresses derived from the vault's EVM address
//! - Amino sign documents signed under EIP-191
//! - Protobuf transaction assembly and hashing
//! - Account lookup, broadcast and status queries over REST

pub mod address;
pub mod amino;
pub mod rest;
pub mod tx;
pub mod types;

pub use address::{bech32_from_evm, decode_account, AddressError};
pub use amino::{AminoCoin, AminoFee, AminoMsg, AminoMsgSend, AminoSignDoc};
pub use rest::InitiaRestClient;
pub use tx::{AssemblyError, SignedTx, TransferRequest, UnsignedTransfer};
pub use types::*;
