// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::registry::ParamValue;

/// Hex SHA-256 identifying one producer invocation's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn builder(annotator: &str, version: &str) -> CacheKeyBuilder {
        CacheKeyBuilder::new(annotator, version)
    }

    /// Accept an already computed key, e.g. a cache file stem.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == 64 && raw.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First two hex digits, used to shard the on-disk layout.
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accumulates the identity of an invocation: annotator name and version,
/// the ordered `(input name, checksum)` list and the parameter values.
///
/// Fields are length-prefixed before hashing so that no two different
/// identities serialize to the same byte stream.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    hasher: Sha256,
}

impl CacheKeyBuilder {
    pub fn new(annotator: &str, version: &str) -> Self {
        let mut builder = Self { hasher: Sha256::new() };
        builder.field(b"annograph-cache-v1");
        builder.field(annotator.as_bytes());
        builder.field(version.as_bytes());
        builder
    }

    /// Inputs must be added in a stable order (declaration order).
    pub fn input(mut self, name: &str, checksum: &str) -> Self {
        self.field(b"input");
        self.field(name.as_bytes());
        self.field(checksum.as_bytes());
        self
    }

    pub fn parameters(mut self, parameters: &BTreeMap<String, ParamValue>) -> Self {
        for (name, value) in parameters {
            self.field(b"param");
            self.field(name.as_bytes());
            // Tag the type so `1` and `"1"` hash differently.
            let tagged = match value {
                ParamValue::Bool(b) => format!("b:{}", b),
                ParamValue::Int(i) => format!("i:{}", i),
                ParamValue::Float(x) => format!("f:{:?}", x),
                ParamValue::Str(s) => format!("s:{}", s),
            };
            self.field(tagged.as_bytes());
        }
        self
    }

    pub fn build(self) -> CacheKey {
        CacheKey(hex::encode(self.hasher.finalize()))
    }

    fn field(&mut self, bytes: &[u8]) {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, ParamValue)]) -> BTreeMap<String, ParamValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn key(version: &str, checksum: &str, parameters: &[(&str, ParamValue)]) -> CacheKey {
        CacheKey::builder("postag", version)
            .input("text", "t1")
            .input("tokens", checksum)
            .parameters(&params(parameters))
            .build()
    }

    #[test]
    fn identical_identity_gives_identical_key() {
        let a = key("1", "c1", &[("model", "suffix".into())]);
        let b = key("1", "c1", &[("model", "suffix".into())]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(CacheKey::parse(a.as_str()), Some(a));
    }

    #[test]
    fn every_component_changes_the_key() {
        let base = key("1", "c1", &[("model", "suffix".into())]);
        let variants = [
            key("2", "c1", &[("model", "suffix".into())]),
            key("1", "c2", &[("model", "suffix".into())]),
            key("1", "c1", &[("model", "lexicon".into())]),
            key("1", "c1", &[]),
            CacheKey::builder("tagger", "1")
                .input("text", "t1")
                .input("tokens", "c1")
                .parameters(&params(&[("model", "suffix".into())]))
                .build(),
        ];
        for variant in variants {
            assert_ne!(base, variant);
        }
    }

    #[test]
    fn parameter_types_are_distinguished() {
        assert_ne!(key("1", "c", &[("n", ParamValue::Int(1))]), key("1", "c", &[("n", "1".into())]));
    }

    #[test]
    fn field_boundaries_cannot_be_shifted() {
        let a = CacheKey::builder("ab", "c").build();
        let b = CacheKey::builder("a", "bc").build();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_non_keys() {
        let non_hex = "g".repeat(64);
        let upper = "A".repeat(64);
        for raw in ["", "abc", non_hex.as_str(), upper.as_str()] {
            assert_eq!(CacheKey::parse(raw), None, "{}", raw);
        }
    }
}
