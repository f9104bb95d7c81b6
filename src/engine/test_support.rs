// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Small registries and fixtures shared by the executor tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::CacheStore;
use crate::corpus::{AnnotationLayer, Corpus, Document, Span};
use crate::engine::task_runner::TaskRunner;
use crate::errors::AnnotatorError;
use crate::graph::{GraphBuilder, RunRequest};
use crate::registry::{AnnotatorRegistry, AnnotatorSpec, ProducerSelection};
use crate::traits::{Annotator, AnnotatorInput, FnAnnotator, LayerSet};

pub type CallLog = Arc<Mutex<Vec<String>>>;

/// One annotation per output covering the first character of the text.
pub fn marker_layers(spec: &AnnotatorSpec, input: &AnnotatorInput) -> LayerSet {
    let end = input.text.chars().next().map_or(0, char::len_utf8);
    spec.outputs
        .iter()
        .map(|name| {
            let mut layer = AnnotationLayer::new(name.clone());
            layer.push_attr(Span::new(0, end), "by", spec.name.clone());
            (name.clone(), layer)
        })
        .collect()
}

/// Annotator that appends `name@document` to `log` and emits marker layers.
pub fn logging_annotator(spec: AnnotatorSpec, log: &CallLog) -> Arc<dyn Annotator> {
    let log = Arc::clone(log);
    let declared = spec.clone();
    Arc::new(FnAnnotator::new(spec, move |input| {
        log.lock().unwrap().push(format!("{}@{}", declared.name, input.document_id));
        Ok(marker_layers(&declared, &input))
    }))
}

pub fn failing_annotator(spec: AnnotatorSpec) -> Arc<dyn Annotator> {
    Arc::new(FnAnnotator::new(spec, |input| {
        Err(AnnotatorError::Failed(format!("cannot annotate {}", input.document_id)))
    }))
}

/// `a -> b -> c`, each consuming the previous output.
pub fn chain_registry() -> (AnnotatorRegistry, CallLog) {
    let log = CallLog::default();
    let mut registry = AnnotatorRegistry::new();
    for spec in [
        AnnotatorSpec::new("a", "1").output("a"),
        AnnotatorSpec::new("b", "1").input("a").output("b"),
        AnnotatorSpec::new("c", "1").input("b").output("c"),
    ] {
        registry.register(logging_annotator(spec, &log)).unwrap();
    }
    (registry, log)
}

/// `fails -> after_fails` next to an independent `good`.
pub fn two_branch_registry() -> AnnotatorRegistry {
    let log = CallLog::default();
    let mut registry = AnnotatorRegistry::new();
    registry
        .register(failing_annotator(AnnotatorSpec::new("fails", "1").output("bad")))
        .unwrap();
    registry
        .register(logging_annotator(
            AnnotatorSpec::new("after_fails", "1").input("bad").output("bad_out"),
            &log,
        ))
        .unwrap();
    registry
        .register(logging_annotator(AnnotatorSpec::new("good", "1").output("good_out"), &log))
        .unwrap();
    registry
}

pub fn corpus(documents: &[(&str, &str)]) -> Arc<Corpus> {
    Arc::new(
        Corpus::from_documents("test", documents.iter().map(|(id, text)| Document::new(*id, *text))).unwrap(),
    )
}

pub fn runner_for<S: AsRef<str>>(registry: &AnnotatorRegistry, outputs: &[S], documents: &[(&str, &str)]) -> TaskRunner {
    let request = RunRequest::new(corpus(documents), outputs.iter().map(|o| o.as_ref().to_string()));
    let graph = GraphBuilder::new(registry, &ProducerSelection::default())
        .build(&request)
        .unwrap();
    TaskRunner::new(Arc::new(graph), Arc::new(CacheStore::in_memory()))
}

/// Tracks how many annotators are inside `annotate` at once.
#[derive(Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn outputs(&self, width: usize) -> Vec<String> {
        (0..width).map(|i| format!("out{}", i)).collect()
    }

    /// `width` independent annotators that each hold for a few milliseconds.
    pub fn wide_registry(&self, width: usize) -> AnnotatorRegistry {
        let mut registry = AnnotatorRegistry::new();
        for i in 0..width {
            let spec = AnnotatorSpec::new(format!("w{}", i), "1").output(format!("out{}", i));
            let declared = spec.clone();
            let probe = self.clone();
            registry
                .register(Arc::new(FnAnnotator::new(spec, move |input| {
                    let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
                    probe.peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(15));
                    probe.current.fetch_sub(1, Ordering::SeqCst);
                    Ok(marker_layers(&declared, &input))
                })))
                .unwrap();
        }
        registry
    }
}
