// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::CacheKey;
use crate::corpus::{sha256_hex, AnnotationLayer};
use crate::errors::CacheError;

const FORMAT_VERSION: u32 = 1;

/// On-disk envelope. The payload is kept as the exact JSON text that was
/// checksummed so verification does not depend on re-serialization.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    format: u32,
    key: CacheKey,
    checksum: String,
    payload: String,
}

/// The output layers of one producer invocation plus the checksum of their
/// serialized form.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: CacheKey,
    checksum: String,
    payload: String,
    layers: Vec<Arc<AnnotationLayer>>,
}

impl CacheEntry {
    pub fn from_layers(key: CacheKey, layers: Vec<AnnotationLayer>) -> Result<Self, CacheError> {
        let payload = serde_json::to_string(&layers).map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        Ok(Self {
            checksum: sha256_hex(payload.as_bytes()),
            key,
            payload,
            layers: layers.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn layers(&self) -> &[Arc<AnnotationLayer>] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&Arc<AnnotationLayer>> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        let stored = StoredEntry {
            format: FORMAT_VERSION,
            key: self.key.clone(),
            checksum: self.checksum.clone(),
            payload: self.payload.clone(),
        };
        serde_json::to_vec_pretty(&stored).map_err(|source| CacheError::Encode {
            key: self.key.to_string(),
            source,
        })
    }

    /// Decode and verify stored bytes. When `expected` is given the embedded
    /// key must match it. Any failure is a [`CacheError::Corruption`].
    pub fn decode(bytes: &[u8], expected: Option<&CacheKey>) -> Result<Self, CacheError> {
        let label = expected.map(CacheKey::to_string).unwrap_or_else(|| "<unknown>".into());
        let corrupt = |reason: String| CacheError::Corruption {
            key: label.clone(),
            reason,
        };

        let stored: StoredEntry =
            serde_json::from_slice(bytes).map_err(|e| corrupt(format!("undecodable envelope: {}", e)))?;

        if stored.format != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported format version {}", stored.format)));
        }
        if let Some(expected) = expected {
            if &stored.key != expected {
                return Err(corrupt(format!("entry belongs to key {}", stored.key)));
            }
        }

        let actual = sha256_hex(stored.payload.as_bytes());
        if actual != stored.checksum {
            return Err(corrupt(format!(
                "checksum mismatch: stored {}, computed {}",
                stored.checksum, actual
            )));
        }

        let layers: Vec<AnnotationLayer> =
            serde_json::from_str(&stored.payload).map_err(|e| corrupt(format!("undecodable layers: {}", e)))?;

        Ok(Self {
            key: stored.key,
            checksum: stored.checksum,
            payload: stored.payload,
            layers: layers.into_iter().map(Arc::new).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Span;

    fn sample() -> CacheEntry {
        let mut tokens = AnnotationLayer::new("tokens");
        tokens.push_attr(Span::new(0, 5), "word", "hello");
        let key = CacheKey::builder("tokenize", "1").input("text", "abc").build();
        CacheEntry::from_layers(key, vec![tokens]).unwrap()
    }

    #[test]
    fn decoded_entry_matches_encoded_one() {
        let entry = sample();
        let decoded = CacheEntry::decode(&entry.encode().unwrap(), Some(entry.key())).unwrap();

        assert_eq!(decoded.checksum(), entry.checksum());
        assert_eq!(decoded.layers().len(), 1);
        assert_eq!(*decoded.layer("tokens").unwrap(), *entry.layer("tokens").unwrap());
    }

    #[test]
    fn tampered_payload_is_corruption() {
        let entry = sample();
        let text = String::from_utf8(entry.encode().unwrap()).unwrap();
        let tampered = text.replace("hello", "jello");

        let err = CacheEntry::decode(tampered.as_bytes(), Some(entry.key())).unwrap_err();
        assert_eq!(err.kind(), "CacheCorruptionError");
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn garbage_and_foreign_keys_are_corruption() {
        let entry = sample();
        let other = CacheKey::builder("other", "1").build();

        let cases: Vec<(Vec<u8>, Option<&CacheKey>)> = vec![
            (b"not json".to_vec(), Some(entry.key())),
            (Vec::new(), None),
            (entry.encode().unwrap(), Some(&other)),
        ];
        for (bytes, expected) in cases {
            let err = CacheEntry::decode(&bytes, expected).unwrap_err();
            assert!(matches!(err, CacheError::Corruption { .. }), "{:?}", err);
        }
    }
}
