// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Initia network constants.

/// Initia network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Cosmos chain ID, part of every sign document
    pub chain_id: &'static str,
    /// Default LCD/REST endpoint
    pub rest_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    /// Bech32 human-readable prefix for account addresses
    pub address_prefix: &'static str,
    /// Base denomination used for transfers and fees
    pub denom: &'static str,
}

/// Initia mainnet configuration.
pub const INITIA_MAINNET: NetworkConfig = NetworkConfig {
    name: "Initia Mainnet",
    chain_id: "interwoven-1",
    rest_url: "https://rest.initia.xyz",
    explorer_url: "https://scan.initia.xyz",
    address_prefix: "init",
    denom: "uinit",
};

/// Initia testnet configuration.
pub const INITIA_TESTNET: NetworkConfig = NetworkConfig {
    name: "Initia Testnet",
    chain_id: "initiation-2",
    rest_url: "https://rest.testnet.initia.xyz",
    explorer_url: "https://scan.testnet.initia.xyz",
    address_prefix: "init",
    denom: "uinit",
};

pub const NETWORK_MAINNET: &str = "mainnet";
pub const NETWORK_TESTNET: &str = "testnet";

/// Type URL of the bank send message.
pub const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";

/// Amino type of the bank send message.
pub const MSG_SEND_AMINO_TYPE: &str = "cosmos-sdk/MsgSend";

/// Type URL of an Ethereum-style secp256k1 account public key.
pub const ETH_PUBKEY_TYPE_URL: &str = "/initia.crypto.v1beta1.ethsecp256k1.PubKey";

/// Protobuf value of `SIGN_MODE_EIP_191`.
pub const SIGN_MODE_EIP_191: i32 = 191;

impl NetworkConfig {
    /// Explorer link for manual follow-up on a transaction.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

/// Resolve a network by name. Defaults to mainnet.
pub fn network_by_name(raw: Option<&str>) -> Result<&'static NetworkConfig, String> {
    let value = raw.unwrap_or(NETWORK_MAINNET).trim().to_ascii_lowercase();
    match value.as_str() {
        NETWORK_MAINNET => Ok(&INITIA_MAINNET),
        NETWORK_TESTNET => Ok(&INITIA_TESTNET),
        other => Err(format!(
            "Unknown network `{other}`; expected `{NETWORK_MAINNET}` or `{NETWORK_TESTNET}`."
        )),
    }
}
