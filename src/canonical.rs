// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Canonical Sign Documents
//!
//! Signing documents are built as an explicit, immutable value tree
//! ([`Document`]) and rendered to a single byte-exact JSON form
//! ([`CanonicalBytes`]). The remote signer signs exactly these bytes, so two
//! semantically equal documents must always render identically.
//!
//! ## Rules
//!
//! - Map keys are sorted lexicographically (by UTF-8 bytes) at every level.
//! - Sequences keep their order.
//! - Output is compact JSON: no whitespace, `JSON.stringify`-style string
//!   escaping, integers in plain decimal, floats in shortest round-trip form.
//! - Duplicate keys and non-finite floats are structural errors.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A nested signing document.
///
/// Maps keep their insertion order until [`Document::sorted`] or
/// [`canonicalize`] is applied; neither mutates the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Seq(Vec<Document>),
    Map(Vec<(String, Document)>),
}

/// Errors raised while canonicalizing a document. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonicalError {
    #[error("duplicate key at {path}")]
    DuplicateKey { path: String },

    #[error("non-finite number at {path}")]
    NonFiniteNumber { path: String },

    #[error("document is not serializable: {0}")]
    Serialize(String),
}

impl Document {
    /// Build a map from `(key, value)` pairs, keeping their order.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Document)>,
    {
        Document::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a sequence.
    pub fn seq<I: IntoIterator<Item = Document>>(items: I) -> Self {
        Document::Seq(items.into_iter().collect())
    }

    /// Convert any serializable value into a document.
    ///
    /// Goes through `serde_json::Value`, so struct field order is irrelevant
    /// once the result is canonicalized.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, CanonicalError> {
        let value =
            serde_json::to_value(value).map_err(|e| CanonicalError::Serialize(e.to_string()))?;
        Ok(Document::from(value))
    }

    /// Return a copy of this document with every map's keys sorted.
    pub fn sorted(&self) -> Result<Document, CanonicalError> {
        self.sorted_at("$")
    }

    fn sorted_at(&self, path: &str) -> Result<Document, CanonicalError> {
        match self {
            Document::Float(f) if !f.is_finite() => Err(CanonicalError::NonFiniteNumber {
                path: path.to_string(),
            }),
            Document::Seq(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| item.sorted_at(&format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Document::Seq),
            Document::Map(entries) => {
                let mut sorted = entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.sorted_at(&format!("{path}.{k}"))?)))
                    .collect::<Result<Vec<_>, CanonicalError>>()?;
                sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

                if let Some(pair) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
                    return Err(CanonicalError::DuplicateKey {
                        path: format!("{path}.{}", pair[0].0),
                    });
                }

                Ok(Document::Map(sorted))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn write_json(&self, out: &mut Vec<u8>) -> Result<(), CanonicalError> {
        match self {
            Document::Null => out.extend_from_slice(b"null"),
            Document::Bool(true) => out.extend_from_slice(b"true"),
            Document::Bool(false) => out.extend_from_slice(b"false"),
            Document::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
            Document::Uint(u) => out.extend_from_slice(u.to_string().as_bytes()),
            Document::Float(f) => write_scalar(out, f)?,
            Document::String(s) => write_scalar(out, s.as_str())?,
            Document::Seq(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    item.write_json(out)?;
                }
                out.push(b']');
            }
            Document::Map(entries) => {
                out.push(b'{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    write_scalar(out, key.as_str())?;
                    out.push(b':');
                    value.write_json(out)?;
                }
                out.push(b'}');
            }
        }
        Ok(())
    }
}

fn write_scalar<T: Serialize + ?Sized>(out: &mut Vec<u8>, value: &T) -> Result<(), CanonicalError> {
    serde_json::to_writer(out, value).map_err(|e| CanonicalError::Serialize(e.to_string()))
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Document::Null,
            Value::Bool(b) => Document::Bool(b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Document::Uint(u)
                } else if let Some(i) = n.as_i64() {
                    Document::Int(i)
                } else {
                    Document::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Document::String(s),
            Value::Array(items) => Document::Seq(items.into_iter().map(Document::from).collect()),
            Value::Object(map) => {
                Document::Map(map.into_iter().map(|(k, v)| (k, Document::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document::String(value.to_string())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Document::String(value)
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Document::Bool(value)
    }
}

impl From<u64> for Document {
    fn from(value: u64) -> Self {
        Document::Uint(value)
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Document::Int(value)
    }
}

/// The canonical byte rendering of a [`Document`].
///
/// Immutable once produced; clones share the same buffer so the exact bytes
/// that were sent for signing can be reused for later verification.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Arc<[u8]>);

impl CanonicalBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The bytes as UTF-8 text. Canonical output is always valid JSON text.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CanonicalBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CanonicalBytes").field(&self.as_str()).finish()
    }
}

impl fmt::Display for CanonicalBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a document to its canonical bytes.
pub fn canonicalize(doc: &Document) -> Result<CanonicalBytes, CanonicalError> {
    let sorted = doc.sorted()?;
    let mut out = Vec::new();
    sorted.write_json(&mut out)?;
    Ok(CanonicalBytes(out.into()))
}

/// Serialize a value and canonicalize it in one step.
pub fn canonicalize_value<T: Serialize + ?Sized>(value: &T) -> Result<CanonicalBytes, CanonicalError> {
    canonicalize(&Document::from_serialize(value)?)
}
