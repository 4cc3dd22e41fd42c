// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote custodial signer client.
//!
//! ## Request authentication
//!
//! Every request carries a detached signature over
//! `path | timestamp_millis | body`, produced with the local request key and
//! sent in `x-signature` next to `x-timestamp`. The body bytes that are signed
//! are exactly the bytes that are sent.
//!
//! ## Semantics
//!
//! The create-and-wait endpoint blocks until the vault has signed (which may
//! include policy or human approval). No local timeout is set unless one is
//! configured for the transport, and nothing is retried: a non-2xx response
//! or a response without signatures fails the attempt.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::envelope::{EnvelopeBodyError, SignRequestEnvelope};
use super::MessageSigner;
use crate::canonical::CanonicalBytes;
use crate::config::SignerConfig;
use crate::crypto::{RawSignatureBlob, RequestKeyError, RequestSigningKey, SignatureError};

#[derive(Debug, thiserror::Error)]
pub enum RemoteSignerError {
    #[error("remote signer configuration invalid: {0}")]
    Config(String),

    #[error(transparent)]
    RequestKey(#[from] RequestKeyError),

    #[error(transparent)]
    Body(#[from] EnvelopeBodyError),

    #[error("remote signer request failed: {0}")]
    Request(String),

    #[error("remote signer returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("remote signer response was invalid: {0}")]
    InvalidResponse(String),

    #[error("remote signer rejected the request (state `{state}`)")]
    Rejected { state: String },

    #[error("no signatures returned (state `{state}`)")]
    NoSignatures { state: String },

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// Coarse state of a remote signing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerState {
    Signed,
    Pending,
    Failed,
}

pub fn map_signer_state(raw_state: &str) -> SignerState {
    let state = raw_state.trim().to_ascii_lowercase();
    match state.as_str() {
        "signed" | "pushed_to_blockchain" | "mined" | "completed" => SignerState::Signed,
        "aborted" | "cancelled" | "error_signing" | "stuck" => SignerState::Failed,
        _ => SignerState::Pending,
    }
}

/// Parsed remote signer result. `signatures` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignResult {
    pub transaction_id: Option<String>,
    pub state: SignerState,
    pub raw_state: Option<String>,
    pub signatures: Vec<RawSignatureBlob>,
}

impl SignResult {
    pub fn first_signature(&self) -> Option<&RawSignatureBlob> {
        self.signatures.first()
    }
}

#[derive(Debug, Deserialize)]
struct SignResponseBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    signatures: Option<Vec<String>>,
}

/// A request ready to be sent: body, timestamp and request signature.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub path: String,
    pub timestamp_millis: i64,
    pub body: CanonicalBytes,
    pub signature: String,
}

/// Bytes covered by the request signature.
pub fn auth_payload(path: &str, timestamp_millis: i64, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(path.len() + body.len() + 24);
    payload.extend_from_slice(path.as_bytes());
    payload.push(b'|');
    payload.extend_from_slice(timestamp_millis.to_string().as_bytes());
    payload.push(b'|');
    payload.extend_from_slice(body);
    payload
}

/// Parse a remote signer response body.
pub fn parse_sign_response(body: &[u8]) -> Result<SignResult, RemoteSignerError> {
    let response: SignResponseBody = serde_json::from_slice(body)
        .map_err(|e| RemoteSignerError::InvalidResponse(format!("invalid JSON: {e}")))?;

    let raw_state = response.state;
    let state = raw_state
        .as_deref()
        .map(map_signer_state)
        .unwrap_or(SignerState::Pending);
    let state_label = raw_state.clone().unwrap_or_else(|| "unknown".to_string());

    if state == SignerState::Failed {
        return Err(RemoteSignerError::Rejected { state: state_label });
    }

    let encoded = response.signatures.unwrap_or_default();
    if encoded.is_empty() {
        return Err(RemoteSignerError::NoSignatures { state: state_label });
    }

    let signatures = encoded
        .iter()
        .map(|sig| RawSignatureBlob::from_base64(sig))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SignResult {
        transaction_id: response.id,
        state,
        raw_state,
        signatures,
    })
}

/// HTTP client for the remote signer's create-and-wait endpoint.
#[derive(Debug, Clone)]
pub struct RemoteSignerClient {
    api_base_url: String,
    path: String,
    api_user_token: String,
    request_key: RequestSigningKey,
    http: Client,
}

impl RemoteSignerClient {
    pub fn new(
        api_base_url: impl Into<String>,
        path: impl Into<String>,
        api_user_token: impl Into<String>,
        request_key: RequestSigningKey,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteSignerError> {
        let api_base_url = api_base_url.into();
        url::Url::parse(&api_base_url)
            .map_err(|e| RemoteSignerError::Config(format!("invalid base URL: {e}")))?;

        let path = path.into();
        if !path.starts_with('/') {
            return Err(RemoteSignerError::Config(format!(
                "path must start with `/`: {path}"
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RemoteSignerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url,
            path,
            api_user_token: api_user_token.into(),
            request_key,
            http,
        })
    }

    pub fn from_config(config: &SignerConfig) -> Result<Self, RemoteSignerError> {
        let request_key = RequestSigningKey::from_pem(config.request_key_pem.as_bytes())?;
        Self::new(
            config.api_base_url.clone(),
            config.api_path.clone(),
            config.api_user_token.clone(),
            request_key,
            config.http_timeout,
        )
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Build the body and request signature for `envelope` at a given time.
    pub fn prepare_at(
        &self,
        envelope: &SignRequestEnvelope,
        timestamp_millis: i64,
    ) -> Result<SignedRequest, RemoteSignerError> {
        let body = envelope.to_canonical_body()?;
        let payload = auth_payload(&self.path, timestamp_millis, body.as_bytes());
        let signature = self.request_key.sign_base64(&payload);

        Ok(SignedRequest {
            path: self.path.clone(),
            timestamp_millis,
            body,
            signature,
        })
    }

    /// Build the body and request signature with a fresh timestamp.
    pub fn prepare(&self, envelope: &SignRequestEnvelope) -> Result<SignedRequest, RemoteSignerError> {
        self.prepare_at(envelope, chrono::Utc::now().timestamp_millis())
    }

    /// Send a prepared request and wait for the signer's result.
    pub async fn send(&self, request: &SignedRequest) -> Result<SignResult, RemoteSignerError> {
        info!(
            path = %request.path,
            timestamp = request.timestamp_millis,
            "Submitting sign request to remote signer"
        );

        let response = self
            .http
            .post(format!(
                "{}{}",
                self.api_base_url.trim_end_matches('/'),
                request.path
            ))
            .header("Authorization", format!("Bearer {}", self.api_user_token))
            .header("x-signature", &request.signature)
            .header("x-timestamp", request.timestamp_millis.to_string())
            .header("Content-Type", "application/json")
            .body(request.body.as_bytes().to_vec())
            .send()
            .await
            .map_err(|e| RemoteSignerError::Request(format!("POST {} failed: {e}", request.path)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteSignerError::Request(format!("reading response failed: {e}")))?;

        if !status.is_success() {
            return Err(RemoteSignerError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let result = parse_sign_response(&body)?;
        info!(
            transaction_id = ?result.transaction_id,
            state = ?result.raw_state,
            signatures = result.signatures.len(),
            "Remote signer returned signatures"
        );
        Ok(result)
    }
}

impl MessageSigner for RemoteSignerClient {
    async fn submit(&self, envelope: &SignRequestEnvelope) -> Result<SignResult, RemoteSignerError> {
        let request = self.prepare(envelope)?;
        self.send(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use base64::Engine;
    use p256::ecdsa::{signature::Verifier, Signature};
    use p256::pkcs8::LineEnding;
    use serde_json::{json, Value};

    const PATH: &str = "/api/v1/transactions/create-and-wait";

    fn request_key() -> RequestSigningKey {
        let secret = p256::SecretKey::from_slice(&[0x21u8; 32]).unwrap();
        let pem = secret.to_sec1_pem(LineEnding::LF).unwrap();
        RequestSigningKey::from_pem(pem.as_bytes()).unwrap()
    }

    fn sig_b64(v: u8) -> String {
        let mut bytes = [3u8; 65];
        bytes[64] = v;
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn envelope() -> SignRequestEnvelope {
        SignRequestEnvelope::evm_personal_message("vault-1", "evm_8453", "hello")
    }

    #[derive(Clone, Default)]
    struct Captured {
        headers: Arc<Mutex<Option<HeaderMap>>>,
        body: Arc<Mutex<Option<String>>>,
    }

    async fn spawn_signer(status: StatusCode, reply: Value) -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route(
                PATH,
                post(
                    |State((captured, status, reply)): State<(Captured, StatusCode, Value)>,
                     headers: HeaderMap,
                     body: String| async move {
                        *captured.headers.lock().unwrap() = Some(headers);
                        *captured.body.lock().unwrap() = Some(body);
                        (status, Json(reply))
                    },
                ),
            )
            .with_state((captured.clone(), status, reply));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    fn client(base_url: &str) -> RemoteSignerClient {
        RemoteSignerClient::new(base_url, PATH, "token-123", request_key(), None).unwrap()
    }

    #[test]
    fn auth_payload_joins_path_timestamp_and_body() {
        let payload = auth_payload("/p", 1_700_000_000_123, br#"{"a":1}"#);
        assert_eq!(payload, br#"/p|1700000000123|{"a":1}"#.to_vec());
    }

    #[test]
    fn prepared_signature_covers_payload() {
        let client = client("http://localhost:1");
        let request = client.prepare_at(&envelope(), 1_700_000_000_000).unwrap();

        let der = base64::engine::general_purpose::STANDARD
            .decode(&request.signature)
            .unwrap();
        let signature = Signature::from_der(&der).unwrap();
        let payload = auth_payload(PATH, 1_700_000_000_000, request.body.as_bytes());

        assert!(request_key().verifying_key().verify(&payload, &signature).is_ok());
    }

    #[test]
    fn invalid_envelope_fails_before_signing() {
        let client = client("http://localhost:1");
        let bad = SignRequestEnvelope::evm_personal_message("", "evm_1", "x");
        assert!(matches!(
            client.prepare(&bad),
            Err(RemoteSignerError::Body(_))
        ));
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(RemoteSignerClient::new("not a url", PATH, "t", request_key(), None).is_err());
        assert!(RemoteSignerClient::new("https://x.test", "no-slash", "t", request_key(), None)
            .is_err());
    }

    #[test]
    fn state_mapping_is_stable() {
        assert_eq!(map_signer_state("SIGNED"), SignerState::Signed);
        assert_eq!(map_signer_state("completed"), SignerState::Signed);
        assert_eq!(map_signer_state("aborted"), SignerState::Failed);
        assert_eq!(map_signer_state("error_signing"), SignerState::Failed);
        assert_eq!(map_signer_state("waiting_for_approval"), SignerState::Pending);
    }

    #[test]
    fn parses_signatures() {
        let body = json!({"id": "tx-1", "state": "signed", "signatures": [sig_b64(27)]});
        let result = parse_sign_response(body.to_string().as_bytes()).unwrap();

        assert_eq!(result.transaction_id.as_deref(), Some("tx-1"));
        assert_eq!(result.state, SignerState::Signed);
        assert_eq!(result.first_signature().unwrap().v(), 27);
    }

    #[test]
    fn empty_signature_list_is_an_error() {
        let body = json!({"id": "tx-1", "state": "signed", "signatures": []});
        let err = parse_sign_response(body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, RemoteSignerError::NoSignatures { .. }));
        assert!(err.to_string().contains("no signatures returned"));

        let missing = json!({"id": "tx-1", "state": "waiting_for_approval"});
        assert!(matches!(
            parse_sign_response(missing.to_string().as_bytes()),
            Err(RemoteSignerError::NoSignatures { .. })
        ));
    }

    #[test]
    fn failed_state_is_rejected() {
        let body = json!({"state": "aborted", "signatures": [sig_b64(0)]});
        assert!(matches!(
            parse_sign_response(body.to_string().as_bytes()),
            Err(RemoteSignerError::Rejected { .. })
        ));
    }

    #[test]
    fn malformed_signature_length_is_an_error() {
        let short = base64::engine::general_purpose::STANDARD.encode([1u8; 64]);
        let body = json!({"state": "signed", "signatures": [short]});
        assert!(matches!(
            parse_sign_response(body.to_string().as_bytes()),
            Err(RemoteSignerError::Signature(SignatureError::InvalidLength { .. }))
        ));
    }

    #[tokio::test]
    async fn submit_sends_authenticated_request() {
        let reply = json!({"id": "tx-9", "state": "signed", "signatures": [sig_b64(28)]});
        let (base_url, captured) = spawn_signer(StatusCode::OK, reply).await;
        let client = client(&base_url);

        let result = client.submit(&envelope()).await.unwrap();
        assert_eq!(result.signatures.len(), 1);

        let headers = captured.headers.lock().unwrap().clone().unwrap();
        let body = captured.body.lock().unwrap().clone().unwrap();

        assert_eq!(headers["authorization"], "Bearer token-123");
        assert_eq!(headers["content-type"], "application/json");
        let timestamp: i64 = headers["x-timestamp"].to_str().unwrap().parse().unwrap();
        let der = base64::engine::general_purpose::STANDARD
            .decode(headers["x-signature"].to_str().unwrap())
            .unwrap();
        let signature = Signature::from_der(&der).unwrap();

        let expected_body = envelope().to_canonical_body().unwrap();
        assert_eq!(body.as_bytes(), expected_body.as_bytes());

        let payload = auth_payload(PATH, timestamp, body.as_bytes());
        assert!(request_key().verifying_key().verify(&payload, &signature).is_ok());
    }

    #[tokio::test]
    async fn non_success_status_is_terminal() {
        let (base_url, _) =
            spawn_signer(StatusCode::UNAUTHORIZED, json!({"title": "bad signature"})).await;
        let err = client(&base_url).submit(&envelope()).await.unwrap_err();

        match err {
            RemoteSignerError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad signature"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_signatures_surface_as_error() {
        let (base_url, _) =
            spawn_signer(StatusCode::OK, json!({"state": "signed", "signatures": []})).await;
        let err = client(&base_url).submit(&envelope()).await.unwrap_err();
        assert!(matches!(err, RemoteSignerError::NoSignatures { .. }));
    }
}
