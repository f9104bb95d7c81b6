// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution of a single task: gather inputs, derive the cache key, fetch or
//! compute the entry, validate the produced layers and commit them to the
//! document.
//!
//! Executors only decide ordering and concurrency. Everything that touches
//! annotators, the cache or documents goes through [`TaskRunner::run`].

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::corpus::{sha256_hex, AnnotationLayer};
use crate::errors::ExecutionError;
use crate::graph::{DependencyGraph, TaskId, TaskNode};
use crate::observability::messages::engine::TaskStarted;
use crate::observability::messages::StructuredLog;
use crate::registry::InputRef;
use crate::traits::{AnnotatorInput, LayerSet};

/// Result of running one task. `Ok(true)` means the output came from the
/// cache without invoking the producer.
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: TaskId,
    pub result: Result<bool, ExecutionError>,
    pub duration: Duration,
}

/// Shared by every worker of a run.
#[derive(Clone)]
pub struct TaskRunner {
    graph: Arc<DependencyGraph>,
    cache: Arc<CacheStore>,
}

impl TaskRunner {
    pub fn new(graph: Arc<DependencyGraph>, cache: Arc<CacheStore>) -> Self {
        Self { graph, cache }
    }

    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    pub async fn run(&self, id: TaskId) -> TaskOutcome {
        let started = Instant::now();
        let result = self.execute(self.graph.node(id)).await;
        TaskOutcome {
            task: id,
            result,
            duration: started.elapsed(),
        }
    }

    async fn execute(&self, node: &TaskNode) -> Result<bool, ExecutionError> {
        let spec = node.annotator.spec();
        TaskStarted {
            annotator: node.annotator_name(),
            document_id: node.document_id(),
        }
        .log();

        // === INPUTS AND CACHE KEY ===
        let mut key = CacheKey::builder(&spec.name, &spec.version).input("text", node.document.text_checksum());
        let mut layers = BTreeMap::new();
        for input in &spec.inputs {
            match input {
                InputRef::Annotation(name) => {
                    let committed = node.document.committed(name).ok_or_else(|| ExecutionError::InputUnavailable {
                        context: node.context(),
                        input: name.clone(),
                    })?;
                    key = key.input(name, &committed.checksum);
                    layers.insert(name.clone(), committed.layer);
                }
                InputRef::File(relative) => {
                    let unavailable = || ExecutionError::InputUnavailable {
                        context: node.context(),
                        input: input.key(),
                    };
                    let path = node.files.get(relative).ok_or_else(unavailable)?;
                    let bytes = tokio::fs::read(path).await.map_err(|_| unavailable())?;
                    key = key.input(&input.key(), &sha256_hex(&bytes));
                }
            }
        }
        let key = key.parameters(&node.parameters).build();

        let input = AnnotatorInput {
            document_id: node.document_id().to_string(),
            text: node.document.shared_text(),
            layers,
            files: node.files.clone(),
            parameters: node.parameters.clone(),
        };

        // === FETCH OR COMPUTE ===
        let (entry, source) = self
            .cache
            .compute_or_fetch(&key, || compute(node, key.clone(), input))
            .await?;

        // === COMMIT ===
        // Every declared output must be present before any of them becomes visible.
        let mut outputs = Vec::with_capacity(spec.outputs.len());
        for output in &spec.outputs {
            let layer = entry.layer(output).ok_or_else(|| ExecutionError::Cache {
                context: node.context(),
                message: format!("entry {} has no layer '{}'", entry.key(), output),
            })?;
            outputs.push(Arc::clone(layer));
        }
        for layer in outputs {
            let checksum = layer.checksum();
            node.document.commit_shared(layer, checksum);
        }

        Ok(source.is_cache_hit())
    }
}

async fn compute(node: &TaskNode, key: CacheKey, input: AnnotatorInput) -> Result<CacheEntry, ExecutionError> {
    let annotator = Arc::clone(&node.annotator);
    let text = Arc::clone(&input.text);

    let produced = tokio::task::spawn_blocking(move || annotator.annotate(input))
        .await
        .map_err(|join_error| ExecutionError::AnnotatorPanicked {
            context: node.context(),
            message: if join_error.is_panic() {
                panic_message(join_error.into_panic())
            } else {
                join_error.to_string()
            },
        })?
        .map_err(|error| ExecutionError::AnnotatorFailed {
            context: node.context(),
            message: error.to_string(),
        })?;

    let layers = validate_output(node, &text, produced).map_err(|reason| ExecutionError::InvalidOutput {
        context: node.context(),
        reason,
    })?;

    CacheEntry::from_layers(key, layers).map_err(|error| ExecutionError::Cache {
        context: node.context(),
        message: error.to_string(),
    })
}

/// Checks that the producer returned exactly its declared outputs, each one
/// well formed against the document text. Returns them in declaration order.
fn validate_output(node: &TaskNode, text: &str, mut produced: LayerSet) -> Result<Vec<AnnotationLayer>, String> {
    let declared: BTreeSet<&str> = node.annotator.spec().outputs.iter().map(String::as_str).collect();
    if let Some(extra) = produced.keys().find(|name| !declared.contains(name.as_str())) {
        return Err(format!("produced undeclared layer '{}'", extra));
    }

    let mut layers = Vec::with_capacity(declared.len());
    for output in &node.annotator.spec().outputs {
        let layer = produced
            .remove(output)
            .ok_or_else(|| format!("missing declared output '{}'", output))?;
        if layer.name() != output {
            return Err(format!("layer returned for '{}' is named '{}'", output, layer.name()));
        }
        layer.validate(text).map_err(|reason| format!("layer '{}': {}", output, reason))?;
        layers.push(layer);
    }
    Ok(layers)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "annotator panicked".to_string()),
    }
}
