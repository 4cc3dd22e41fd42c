// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Every loader
//! has a `from_lookup` twin taking a lookup closure, so tests never touch the
//! process environment. Blank values count as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SIGNER_API_BASE_URL` | Remote signer base URL | `https://api.fordefi.com` |
//! | `SIGNER_API_PATH` | Create-and-wait path (also the signed path) | `/api/v1/transactions/create-and-wait` |
//! | `SIGNER_API_USER_TOKEN` | Bearer token for the remote signer | Required |
//! | `SIGNER_REQUEST_KEY_PEM` | Inline PEM request-signing key (`\n` escapes allowed) | Optional |
//! | `SIGNER_REQUEST_KEY_PATH` | PEM file, used when no inline PEM is set | `./fordefi_secret/private.pem` |
//! | `SIGNER_HTTP_TIMEOUT_SECS` | Transport timeout for signer calls | None |
//! | `SIGNER_VAULT_ID` | Custodial EVM vault id | Required |
//! | `SIGNER_VAULT_ADDRESS` | Vault EVM address (`0x…`) | Required |
//! | `SIGNER_EVM_CHAIN` | Chain tag for message signing requests | `evm_8453` |
//! | `INITIA_NETWORK` | `mainnet` or `testnet` | `mainnet` |
//! | `INITIA_REST_URL` | REST endpoint override | Network default |
//! | `TRANSFER_DESTINATION` | Recipient bech32 address | Required |
//! | `TRANSFER_AMOUNT` | Amount in base denomination | Required |
//! | `TRANSFER_GAS_LIMIT` | Gas limit | `200000` |
//! | `TRANSFER_FEE_AMOUNT` | Fee in base denomination | `200000` |
//! | `TRANSFER_MEMO` | Memo | Empty |
//! | `CONFIRM_MAX_ATTEMPTS` | Status queries before timing out | `20` |
//! | `CONFIRM_POLL_INTERVAL_MS` | Delay before each status query | `3000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::fmt;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use crate::broadcast::ConfirmPolicy;
use crate::chain::initia::{decode_account, network_by_name, NetworkConfig};

/// Remote signer base URL.
pub const SIGNER_API_BASE_URL_ENV: &str = "SIGNER_API_BASE_URL";
/// Create-and-wait path; also the path covered by the request signature.
pub const SIGNER_API_PATH_ENV: &str = "SIGNER_API_PATH";
/// Bearer token for the remote signer API.
pub const SIGNER_API_USER_TOKEN_ENV: &str = "SIGNER_API_USER_TOKEN";
/// Inline PEM request key (`\n` escapes allowed).
pub const SIGNER_REQUEST_KEY_PEM_ENV: &str = "SIGNER_REQUEST_KEY_PEM";
/// PEM request key file, used when no inline PEM is set.
pub const SIGNER_REQUEST_KEY_PATH_ENV: &str = "SIGNER_REQUEST_KEY_PATH";
/// Optional transport timeout for signer requests, in seconds.
pub const SIGNER_HTTP_TIMEOUT_SECS_ENV: &str = "SIGNER_HTTP_TIMEOUT_SECS";
/// Custodial vault id.
pub const SIGNER_VAULT_ID_ENV: &str = "SIGNER_VAULT_ID";
/// EVM address of the vault (`0x…`).
pub const SIGNER_VAULT_ADDRESS_ENV: &str = "SIGNER_VAULT_ADDRESS";
/// Chain tag sent with message signing requests.
pub const SIGNER_EVM_CHAIN_ENV: &str = "SIGNER_EVM_CHAIN";
/// `mainnet` or `testnet`.
pub const INITIA_NETWORK_ENV: &str = "INITIA_NETWORK";
/// REST endpoint override.
pub const INITIA_REST_URL_ENV: &str = "INITIA_REST_URL";
/// Recipient bech32 address.
pub const TRANSFER_DESTINATION_ENV: &str = "TRANSFER_DESTINATION";
/// Amount in the base denom.
pub const TRANSFER_AMOUNT_ENV: &str = "TRANSFER_AMOUNT";
/// Gas limit.
pub const TRANSFER_GAS_LIMIT_ENV: &str = "TRANSFER_GAS_LIMIT";
/// Fee in the base denom.
pub const TRANSFER_FEE_AMOUNT_ENV: &str = "TRANSFER_FEE_AMOUNT";
/// Transaction memo.
pub const TRANSFER_MEMO_ENV: &str = "TRANSFER_MEMO";
/// Number of status queries before timing out.
pub const CONFIRM_MAX_ATTEMPTS_ENV: &str = "CONFIRM_MAX_ATTEMPTS";
/// Delay before each status query, in milliseconds.
pub const CONFIRM_POLL_INTERVAL_MS_ENV: &str = "CONFIRM_POLL_INTERVAL_MS";

/// Logging format switch, read by the binary.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_SIGNER_API_BASE_URL: &str = "https://api.fordefi.com";
pub const DEFAULT_SIGNER_API_PATH: &str = "/api/v1/transactions/create-and-wait";
pub const DEFAULT_REQUEST_KEY_PATH: &str = "./fordefi_secret/private.pem";
/// The chain only scopes the signing request; the signed bytes do not depend on it.
pub const DEFAULT_EVM_CHAIN: &str = "evm_8453";
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;
pub const DEFAULT_FEE_AMOUNT: &str = "200000";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("invalid {name}: {reason}")]
    Invalid { name: String, reason: String },
}

impl ConfigError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Remote signer connection and vault identity.
#[derive(Clone)]
pub struct SignerConfig {
    pub api_base_url: String,
    pub api_path: String,
    pub api_user_token: String,
    pub request_key_pem: String,
    pub http_timeout: Option<Duration>,
    pub vault_id: String,
    pub vault_address: Address,
    pub evm_chain: String,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_path", &self.api_path)
            .field("api_user_token", &"<redacted>")
            .field("request_key_pem", &"<redacted>")
            .field("http_timeout", &self.http_timeout)
            .field("vault_id", &self.vault_id)
            .field("vault_address", &self.vault_address)
            .field("evm_chain", &self.evm_chain)
            .finish()
    }
}

impl SignerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup: Lookup<'_> = &lookup;

        let api_path = env_or_default(lookup, SIGNER_API_PATH_ENV, DEFAULT_SIGNER_API_PATH);
        if !api_path.starts_with('/') {
            return Err(ConfigError::invalid(SIGNER_API_PATH_ENV, "must start with `/`"));
        }

        let vault_address = env_required(lookup, SIGNER_VAULT_ADDRESS_ENV)?;
        let vault_address = Address::from_str(&vault_address)
            .map_err(|e| ConfigError::invalid(SIGNER_VAULT_ADDRESS_ENV, e.to_string()))?;

        let http_timeout = env_optional(lookup, SIGNER_HTTP_TIMEOUT_SECS_ENV)
            .map(|raw| parse_value::<u64>(SIGNER_HTTP_TIMEOUT_SECS_ENV, &raw))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            api_base_url: env_or_default(lookup, SIGNER_API_BASE_URL_ENV, DEFAULT_SIGNER_API_BASE_URL),
            api_path,
            api_user_token: env_required(lookup, SIGNER_API_USER_TOKEN_ENV)?,
            request_key_pem: load_request_key_pem(lookup)?,
            http_timeout,
            vault_id: env_required(lookup, SIGNER_VAULT_ID_ENV)?,
            vault_address,
            evm_chain: env_or_default(lookup, SIGNER_EVM_CHAIN_ENV, DEFAULT_EVM_CHAIN),
        })
    }
}

/// The bank transfer to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub destination: String,
    pub amount: String,
    pub gas_limit: u64,
    pub fee_amount: String,
    pub memo: String,
}

impl TransferConfig {
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        network: &NetworkConfig,
    ) -> Result<Self, ConfigError> {
        let lookup: Lookup<'_> = &lookup;

        let destination = env_required(lookup, TRANSFER_DESTINATION_ENV)?;
        decode_account(&destination, network.address_prefix)
            .map_err(|e| ConfigError::invalid(TRANSFER_DESTINATION_ENV, e.to_string()))?;

        let amount = env_required(lookup, TRANSFER_AMOUNT_ENV)?;
        positive_amount(TRANSFER_AMOUNT_ENV, &amount)?;
        let fee_amount = env_or_default(lookup, TRANSFER_FEE_AMOUNT_ENV, DEFAULT_FEE_AMOUNT);
        positive_amount(TRANSFER_FEE_AMOUNT_ENV, &fee_amount)?;

        Ok(Self {
            destination,
            amount,
            gas_limit: env_parsed(lookup, TRANSFER_GAS_LIMIT_ENV, DEFAULT_GAS_LIMIT)?,
            fee_amount,
            memo: memo(lookup)?,
        })
    }
}

/// Characters the chain's amino JSON encoder writes as `\uXXXX` escapes.
/// A memo containing them would sign different bytes than the chain checks.
const AMINO_ESCAPED_CHARS: [char; 5] = ['<', '>', '&', '\u{2028}', '\u{2029}'];

fn memo(lookup: Lookup<'_>) -> Result<String, ConfigError> {
    let memo = lookup(TRANSFER_MEMO_ENV).unwrap_or_default();
    if let Some(c) = memo.chars().find(|c| AMINO_ESCAPED_CHARS.contains(c)) {
        return Err(ConfigError::invalid(
            TRANSFER_MEMO_ENV,
            format!("character {c:?} is not supported in memos"),
        ));
    }
    Ok(memo)
}

/// Load the confirmation policy. Zero attempts is rejected.
pub fn confirm_policy_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfirmPolicy, ConfigError> {
    let lookup: Lookup<'_> = &lookup;
    let defaults = ConfirmPolicy::default();

    let max_attempts = env_parsed(lookup, CONFIRM_MAX_ATTEMPTS_ENV, defaults.max_attempts)?;
    if max_attempts == 0 {
        return Err(ConfigError::invalid(CONFIRM_MAX_ATTEMPTS_ENV, "must be at least 1"));
    }
    let default_interval_ms = u64::try_from(defaults.poll_interval.as_millis()).unwrap_or(u64::MAX);
    let interval_ms = env_parsed(lookup, CONFIRM_POLL_INTERVAL_MS_ENV, default_interval_ms)?;

    Ok(ConfirmPolicy {
        max_attempts,
        poll_interval: Duration::from_millis(interval_ms),
    })
}

/// Everything one run of the binary needs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub signer: SignerConfig,
    pub network: &'static NetworkConfig,
    pub rest_url: String,
    pub transfer: TransferConfig,
    pub confirm: ConfirmPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let network = network_by_name(env_optional(&lookup, INITIA_NETWORK_ENV).as_deref())
            .map_err(|reason| ConfigError::invalid(INITIA_NETWORK_ENV, reason))?;

        Ok(Self {
            signer: SignerConfig::from_lookup(&lookup)?,
            network,
            rest_url: env_or_default(&lookup, INITIA_REST_URL_ENV, network.rest_url),
            transfer: TransferConfig::from_lookup(&lookup, network)?,
            confirm: confirm_policy_from_lookup(&lookup)?,
        })
    }
}

fn env_optional(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_required(lookup: Lookup<'_>, name: &str) -> Result<String, ConfigError> {
    env_optional(lookup, name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

fn env_or_default(lookup: Lookup<'_>, name: &str, default: &str) -> String {
    env_optional(lookup, name).unwrap_or_else(|| default.to_string())
}

fn env_parsed<T>(lookup: Lookup<'_>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env_optional(lookup, name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ConfigError::invalid(name, format!("`{raw}`: {e}")))
}

fn positive_amount(name: &str, raw: &str) -> Result<(), ConfigError> {
    match raw.parse::<u128>() {
        Ok(value) if value > 0 => Ok(()),
        _ => Err(ConfigError::invalid(
            name,
            format!("`{raw}` is not a positive integer amount"),
        )),
    }
}

fn load_request_key_pem(lookup: Lookup<'_>) -> Result<String, ConfigError> {
    if let Some(pem) = env_optional(lookup, SIGNER_REQUEST_KEY_PEM_ENV) {
        return Ok(pem.replace("\\n", "\n"));
    }

    let path = env_or_default(lookup, SIGNER_REQUEST_KEY_PATH_ENV, DEFAULT_REQUEST_KEY_PATH);
    let pem = fs::read_to_string(&path).map_err(|e| {
        ConfigError::Missing(format!(
            "{SIGNER_REQUEST_KEY_PEM_ENV} or a readable {SIGNER_REQUEST_KEY_PATH_ENV} ({path}: {e})"
        ))
    })?;
    let trimmed = pem.trim().to_string();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(
            SIGNER_REQUEST_KEY_PATH_ENV,
            format!("points to an empty file: {path}"),
        ));
    }
    Ok(trimmed)
}
