// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-authentication key for the remote signer API.
//!
//! This key only authenticates API requests. It never signs transactions;
//! the custodial vault key stays with the remote signer.
//!
//! Keys are P-256 PEM files, either SEC1 (`EC PRIVATE KEY`, as produced by
//! `openssl ecparam -genkey -name prime256v1`) or PKCS#8 (`PRIVATE KEY`).

use std::path::Path;

use base64ct::{Base64, Encoding};
use p256::{
    ecdsa::{signature::Signer, Signature, SigningKey, VerifyingKey},
    SecretKey,
};

#[derive(Debug, thiserror::Error)]
pub enum RequestKeyError {
    #[error("failed to read request key {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("invalid request key: {0}")]
    InvalidKey(String),
}

/// Local P-256 key signing remote-signer requests.
#[derive(Clone)]
pub struct RequestSigningKey {
    key: SigningKey,
}

impl RequestSigningKey {
    /// Parse a PEM-encoded P-256 private key.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, RequestKeyError> {
        let pem_str = std::str::from_utf8(pem_bytes)
            .map_err(|e| RequestKeyError::InvalidKey(format!("Invalid UTF-8: {e}")))?;

        let pem = pem::parse(pem_str.trim())
            .map_err(|e| RequestKeyError::InvalidKey(format!("Invalid PEM: {e}")))?;

        let secret_key = match pem.tag() {
            "EC PRIVATE KEY" => SecretKey::from_sec1_der(pem.contents())
                .map_err(|e| RequestKeyError::InvalidKey(format!("Invalid SEC1 key: {e}")))?,
            "PRIVATE KEY" => parse_pkcs8_to_secret_key(pem.contents())
                .map_err(|e| RequestKeyError::InvalidKey(format!("Invalid PKCS#8 key: {e}")))?,
            other => {
                return Err(RequestKeyError::InvalidKey(format!(
                    "Unsupported PEM block `{other}`"
                )))
            }
        };

        Ok(Self {
            key: SigningKey::from(secret_key),
        })
    }

    /// Read and parse a PEM key file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, RequestKeyError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| RequestKeyError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_pem(&bytes)
    }

    /// ECDSA-P256-SHA256 over `payload`, DER-encoded, base64.
    pub fn sign_base64(&self, payload: &[u8]) -> String {
        let signature: Signature = self.key.sign(payload);
        Base64::encode_string(signature.to_der().as_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.key.verifying_key()
    }
}

impl std::fmt::Debug for RequestSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigningKey").finish_non_exhaustive()
    }
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use p256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Verifier;
    use p256::pkcs8::{EncodePrivateKey, LineEnding};
    use std::io::Write;

    fn secret() -> SecretKey {
        SecretKey::from_slice(&[0x11u8; 32]).unwrap()
    }

    fn verify(key: &RequestSigningKey, payload: &[u8], sig_b64: &str) -> bool {
        let der = Base64::decode_vec(sig_b64).unwrap();
        let sig = Signature::from_der(&der).unwrap();
        key.verifying_key().verify(payload, &sig).is_ok()
    }

    #[test]
    fn parses_sec1_pem_and_signs() {
        let pem = secret().to_sec1_pem(LineEnding::LF).unwrap();
        let key = RequestSigningKey::from_pem(pem.as_bytes()).unwrap();

        let payload = b"/api/v1/transactions/create-and-wait|1700000000000|{}";
        let sig = key.sign_base64(payload);
        assert!(verify(&key, payload, &sig));
        assert!(!verify(&key, b"tampered", &sig));
    }

    #[test]
    fn parses_pkcs8_pem() {
        let pem = secret().to_pkcs8_pem(LineEnding::LF).unwrap();
        let key = RequestSigningKey::from_pem(pem.as_bytes()).unwrap();

        let from_sec1 =
            RequestSigningKey::from_pem(secret().to_sec1_pem(LineEnding::LF).unwrap().as_bytes())
                .unwrap();
        assert_eq!(key.verifying_key(), from_sec1.verifying_key());
    }

    #[test]
    fn reads_key_from_file() {
        let pem = secret().to_sec1_pem(LineEnding::LF).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();

        let key = RequestSigningKey::from_pem_file(file.path()).unwrap();
        let sig = key.sign_base64(b"payload");
        assert!(verify(&key, b"payload", &sig));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = RequestSigningKey::from_pem_file("/nonexistent/private.pem").unwrap_err();
        assert!(matches!(err, RequestKeyError::Unreadable { .. }));
    }

    #[test]
    fn rejects_garbage_and_foreign_blocks() {
        assert!(RequestSigningKey::from_pem(b"not a pem").is_err());

        let cert = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        let err = RequestSigningKey::from_pem(cert.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("CERTIFICATE"));
    }
}
