// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Documents, spans and annotation layers.
//!
//! A [`Document`] owns its committed layers behind a `RwLock`. The task graph
//! guarantees at most one writer per (document, layer), so the lock only has
//! to make map access safe; it never orders producers against each other.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::errors::CorpusError;

/// Half-open byte range `[start, end)` into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The covered text, or `None` if the span is out of bounds or splits a
    /// UTF-8 character.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

/// One span plus its attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub span: Span,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// A named, ordered sequence of annotations over one document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationLayer {
    name: String,
    annotations: Vec<Annotation>,
}

impl AnnotationLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, span: Span, attributes: BTreeMap<String, String>) {
        self.annotations.push(Annotation { span, attributes });
    }

    /// Append a span with a single attribute.
    pub fn push_attr(&mut self, span: Span, key: &str, value: impl Into<String>) {
        self.push(span, BTreeMap::from([(key.to_string(), value.into())]));
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Values of one attribute across all annotations, in order.
    pub fn attribute_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = Option<&'a str>> + 'a {
        self.annotations
            .iter()
            .map(move |a| a.attributes.get(key).map(String::as_str))
    }

    /// Stable sort by span start, then end.
    pub fn sort(&mut self) {
        self.annotations.sort_by_key(|a| a.span);
    }

    /// Check that every span lies within `text` on character boundaries and
    /// that spans are ordered by start offset.
    pub fn validate(&self, text: &str) -> Result<(), String> {
        let mut previous_start = 0;
        for (i, annotation) in self.annotations.iter().enumerate() {
            let span = annotation.span;
            if span.start > span.end {
                return Err(format!("annotation {} has start {} after end {}", i, span.start, span.end));
            }
            if span.slice(text).is_none() {
                return Err(format!(
                    "annotation {} span {}..{} is outside the text or splits a character (text length {})",
                    i,
                    span.start,
                    span.end,
                    text.len()
                ));
            }
            if span.start < previous_start {
                return Err(format!(
                    "annotation {} starts at {} before the previous annotation at {}",
                    i, span.start, previous_start
                ));
            }
            previous_start = span.start;
        }
        Ok(())
    }

    /// SHA-256 over the canonical JSON form of the layer.
    pub fn checksum(&self) -> String {
        // Attribute maps are BTreeMaps, so the JSON form is deterministic.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        sha256_hex(&bytes)
    }
}

/// A layer that has been fully produced and made visible on a document.
#[derive(Debug, Clone)]
pub struct CommittedLayer {
    pub layer: Arc<AnnotationLayer>,
    pub checksum: String,
}

/// One unit of text plus its committed annotation layers.
///
/// Layers attached with [`Document::with_layer`] are source layers. Layers
/// committed while a run executes are derived and never count as available
/// inputs for later runs.
#[derive(Debug)]
pub struct Document {
    id: String,
    text: Arc<str>,
    text_checksum: String,
    layers: RwLock<BTreeMap<String, CommittedLayer>>,
    sources: BTreeSet<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text: String = text.into();
        let text_checksum = sha256_hex(text.as_bytes());
        Self {
            id: id.into(),
            text: Arc::from(text),
            text_checksum,
            layers: RwLock::new(BTreeMap::new()),
            sources: BTreeSet::new(),
        }
    }

    /// Attach a source layer at load time.
    pub fn with_layer(mut self, layer: AnnotationLayer) -> Result<Self, CorpusError> {
        let committed = self.commit(layer)?;
        self.sources.insert(committed.layer.name().to_string());
        Ok(self)
    }

    /// Same text and source layers, without any derived layer.
    pub fn fork(&self) -> Self {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        let sources: BTreeMap<String, CommittedLayer> = layers
            .iter()
            .filter(|(name, _)| self.sources.contains(*name))
            .map(|(name, committed)| (name.clone(), committed.clone()))
            .collect();
        Self {
            id: self.id.clone(),
            text: Arc::clone(&self.text),
            text_checksum: self.text_checksum.clone(),
            layers: RwLock::new(sources),
            sources: self.sources.clone(),
        }
    }

    pub fn has_source_layer(&self, name: &str) -> bool {
        self.sources.contains(name)
    }

    pub fn source_layer_names(&self) -> &BTreeSet<String> {
        &self.sources
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn text_checksum(&self) -> &str {
        &self.text_checksum
    }

    pub fn layer(&self, name: &str) -> Option<Arc<AnnotationLayer>> {
        self.committed(name).map(|c| c.layer)
    }

    pub fn committed(&self, name: &str) -> Option<CommittedLayer> {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn layer_names(&self) -> Vec<String> {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Validate and commit a freshly produced layer.
    pub fn commit(&self, layer: AnnotationLayer) -> Result<CommittedLayer, CorpusError> {
        layer.validate(&self.text).map_err(|reason| CorpusError::InvalidLayer {
            document_id: self.id.clone(),
            layer: layer.name().to_string(),
            reason,
        })?;
        let checksum = layer.checksum();
        Ok(self.commit_shared(Arc::new(layer), checksum))
    }

    /// Commit an already validated layer (e.g. decoded from the cache).
    ///
    /// A layer that is already present is kept; committed layers are immutable.
    pub fn commit_shared(&self, layer: Arc<AnnotationLayer>, checksum: String) -> CommittedLayer {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        layers
            .entry(layer.name().to_string())
            .or_insert(CommittedLayer { layer, checksum })
            .clone()
    }
}

/// A named collection of documents.
#[derive(Debug, Default)]
pub struct Corpus {
    name: String,
    root: Option<PathBuf>,
    documents: Vec<Arc<Document>>,
    index: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_documents<I>(name: impl Into<String>, documents: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut corpus = Self::new(name);
        for document in documents {
            corpus.add_document(document)?;
        }
        Ok(corpus)
    }

    /// Root directory against which raw file inputs are resolved.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn add_document(&mut self, document: Document) -> Result<(), CorpusError> {
        if self.index.contains_key(document.id()) {
            return Err(CorpusError::DuplicateDocument(document.id().to_string()));
        }
        self.index.insert(document.id().to_string(), self.documents.len());
        self.documents.push(Arc::new(document));
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn document(&self, id: &str) -> Option<&Arc<Document>> {
        self.index.get(id).map(|&i| &self.documents[i])
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Source layer names present on every document. Such layers need no producer.
    pub fn available_layers(&self) -> BTreeSet<String> {
        let mut documents = self.documents.iter();
        let Some(first) = documents.next() else {
            return BTreeSet::new();
        };
        let mut available = first.source_layer_names().clone();
        for document in documents {
            available.retain(|name| document.has_source_layer(name));
        }
        available
    }

    /// A copy holding only source layers, for a run to commit into.
    pub fn fork(&self) -> Self {
        Self {
            name: self.name.clone(),
            root: self.root.clone(),
            documents: self.documents.iter().map(|d| Arc::new(d.fork())).collect(),
            index: self.index.clone(),
        }
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
