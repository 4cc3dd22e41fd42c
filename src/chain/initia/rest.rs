// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Initia LCD/REST collaborator.
//!
//! Endpoints:
//!
//! - `GET  /cosmos/auth/v1beta1/accounts/{address}` for account number and sequence
//! - `POST /cosmos/tx/v1beta1/txs` with `BROADCAST_MODE_SYNC`
//! - `GET  /cosmos/tx/v1beta1/txs/{hash}`, where 404 means not found yet

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::tx::SignedTx;
use super::types::NetworkConfig;
use crate::broadcast::{
    AccountInfo, AccountSequence, BroadcastResponse, ChainClient, ChainClientError, TxInfo,
};

const ACCOUNTS_PATH: &str = "/cosmos/auth/v1beta1/accounts";
const TXS_PATH: &str = "/cosmos/tx/v1beta1/txs";

/// Per-request timeout for REST calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// REST client for one Initia node.
#[derive(Debug, Clone)]
pub struct InitiaRestClient {
    rest_url: String,
    http: Client,
}

impl InitiaRestClient {
    pub fn new(rest_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ChainClientError> {
        let rest_url = rest_url.into();
        url::Url::parse(&rest_url).map_err(|e| ChainClientError::InvalidUrl(e.to_string()))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ChainClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            rest_url: rest_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Client for the network's default endpoint.
    pub fn for_network(network: &NetworkConfig) -> Result<Self, ChainClientError> {
        Self::new(network.rest_url, Some(DEFAULT_REQUEST_TIMEOUT))
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    /// GET a JSON document. `Ok(None)` on 404.
    async fn get_json(&self, path: &str) -> Result<Option<Value>, ChainClientError> {
        let response = self
            .http
            .get(format!("{}{}", self.rest_url, path))
            .send()
            .await
            .map_err(|e| ChainClientError::Transport(format!("GET {path} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainClientError::Transport(format!(
                "GET {path} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| ChainClientError::InvalidResponse(format!("GET {path} invalid JSON: {e}")))
    }
}

impl ChainClient for InitiaRestClient {
    type SignedTx = SignedTx;

    fn local_tx_hash(tx: &SignedTx) -> Option<String> {
        Some(tx.tx_hash.clone())
    }

    async fn broadcast(&self, tx: &SignedTx) -> Result<BroadcastResponse, ChainClientError> {
        debug!(tx_hash = %tx.tx_hash, bytes = tx.tx_bytes.len(), "Broadcasting transaction");

        let payload = json!({
            "tx_bytes": tx.to_base64(),
            "mode": "BROADCAST_MODE_SYNC",
        });
        let response = self
            .http
            .post(format!("{}{}", self.rest_url, TXS_PATH))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChainClientError::Transport(format!("POST {TXS_PATH} failed: {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            ChainClientError::InvalidResponse(format!(
                "POST {TXS_PATH} returned {status} with invalid JSON: {e}"
            ))
        })?;

        // Undecodable txs come back as a non-2xx gateway error body.
        if !status.is_success() {
            return Ok(parse_gateway_error(&body));
        }
        parse_broadcast_response(&body)
    }

    async fn tx_info(&self, tx_hash: &str) -> Result<Option<TxInfo>, ChainClientError> {
        match self.get_json(&format!("{TXS_PATH}/{tx_hash}")).await? {
            Some(body) => parse_tx_response(&body).map(Some),
            None => Ok(None),
        }
    }
}

impl AccountSequence for InitiaRestClient {
    async fn account_info(&self, address: &str) -> Result<AccountInfo, ChainClientError> {
        let path = format!("{ACCOUNTS_PATH}/{address}");
        match self.get_json(&path).await? {
            Some(body) => parse_account_response(&body),
            None => Err(ChainClientError::InvalidResponse(format!(
                "account {address} not found; it must be funded before it can sign"
            ))),
        }
    }
}

/// Read an integer that the gateway may render as a string or a number.
fn u64_field(value: &Value, field: &str) -> Result<u64, ChainClientError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
            ChainClientError::InvalidResponse(format!("`{field}` is not an unsigned integer"))
        }),
        Some(Value::String(s)) => s.parse().map_err(|_| {
            ChainClientError::InvalidResponse(format!("`{field}` is not an unsigned integer: {s}"))
        }),
        Some(other) => Err(ChainClientError::InvalidResponse(format!(
            "`{field}` has unexpected type: {other}"
        ))),
    }
}

fn u32_field(value: &Value, field: &str) -> Result<u32, ChainClientError> {
    let raw = u64_field(value, field)?;
    u32::try_from(raw)
        .map_err(|_| ChainClientError::InvalidResponse(format!("`{field}` out of range: {raw}")))
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse an auth account response. Vesting accounts nest a `base_account`.
pub fn parse_account_response(body: &Value) -> Result<AccountInfo, ChainClientError> {
    let account = body
        .get("account")
        .ok_or_else(|| ChainClientError::InvalidResponse("missing `account`".to_string()))?;
    let base = account
        .get("base_account")
        .or_else(|| account.get("base_vesting_account").and_then(|v| v.get("base_account")))
        .unwrap_or(account);

    if base.get("account_number").is_none() {
        return Err(ChainClientError::InvalidResponse(
            "account has no `account_number`".to_string(),
        ));
    }

    Ok(AccountInfo {
        account_number: u64_field(base, "account_number")?,
        sequence: u64_field(base, "sequence")?,
    })
}

/// Parse a successful broadcast response.
pub fn parse_broadcast_response(body: &Value) -> Result<BroadcastResponse, ChainClientError> {
    let tx_response = body
        .get("tx_response")
        .ok_or_else(|| ChainClientError::InvalidResponse("missing `tx_response`".to_string()))?;

    Ok(BroadcastResponse {
        txhash: string_field(tx_response, "txhash"),
        code: u32_field(tx_response, "code")?,
        raw_log: string_field(tx_response, "raw_log"),
    })
}

/// Turn a gateway error body into a hash-less rejection.
pub fn parse_gateway_error(body: &Value) -> BroadcastResponse {
    let code = u32_field(body, "code").ok().filter(|c| *c != 0).unwrap_or(1);
    BroadcastResponse {
        txhash: None,
        code,
        raw_log: string_field(body, "message").or_else(|| Some(body.to_string())),
    }
}

/// Parse a transaction lookup response.
pub fn parse_tx_response(body: &Value) -> Result<TxInfo, ChainClientError> {
    let tx_response = body
        .get("tx_response")
        .ok_or_else(|| ChainClientError::InvalidResponse("missing `tx_response`".to_string()))?;

    Ok(TxInfo {
        height: u64_field(tx_response, "height")?,
        code: u32_field(tx_response, "code")?,
        raw_log: string_field(tx_response, "raw_log"),
    })
}
