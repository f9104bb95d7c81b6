// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end runs of the built-in pipeline through both executors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::annotators::builtin_annotators;
use crate::cache::{CacheStore, MemoryCacheBackend};
use crate::corpus::{Corpus, Document};
use crate::engine::test_support::{corpus, failing_annotator, marker_layers};
use crate::engine::{Engine, LevelByLevelExecutor, RunResult, TaskStatus, WorkQueueExecutor};
use crate::errors::{AnnotatorError, ExecutionError, FailureStrategy};
use crate::graph::RunRequest;
use crate::registry::{AnnotatorRegistry, AnnotatorSpec};
use crate::traits::{Annotator, AnnotatorInput, DagExecutor, FnAnnotator, LayerSet};

/// Wraps an annotator and counts its invocations.
struct Counting {
    inner: Arc<dyn Annotator>,
    calls: Arc<AtomicUsize>,
}

impl Annotator for Counting {
    fn spec(&self) -> &AnnotatorSpec {
        self.inner.spec()
    }

    fn annotate(&self, input: AnnotatorInput) -> Result<LayerSet, AnnotatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.annotate(input)
    }
}

struct Pipeline {
    registry: Arc<AnnotatorRegistry>,
    calls: Vec<(String, Arc<AtomicUsize>)>,
}

impl Pipeline {
    fn builtin() -> Self {
        let mut registry = AnnotatorRegistry::new();
        let mut calls = Vec::new();
        for inner in builtin_annotators() {
            let counter = Arc::new(AtomicUsize::new(0));
            calls.push((inner.spec().name.clone(), Arc::clone(&counter)));
            registry.register(Arc::new(Counting { inner, calls: counter })).unwrap();
        }
        Self {
            registry: Arc::new(registry),
            calls,
        }
    }

    fn calls(&self, name: &str) -> usize {
        self.calls
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.load(Ordering::SeqCst))
            .unwrap()
    }

    fn engine(&self, cache: &Arc<CacheStore>, executor: Box<dyn DagExecutor>) -> Engine {
        Engine::new(Arc::clone(&self.registry), Arc::clone(cache)).with_executor(executor)
    }
}

fn executors() -> Vec<Box<dyn DagExecutor>> {
    vec![Box::new(WorkQueueExecutor::new(4)), Box::new(LevelByLevelExecutor::new(4))]
}

fn demo_corpus() -> Arc<Corpus> {
    corpus(&[
        ("d1", "The cat sat on the mat."),
        ("d2", "A dog was running quickly."),
        ("d3", "The old tree."),
    ])
}

fn content(result: &RunResult, document_id: &str) -> String {
    result.layer(document_id, "output").unwrap().annotations()[0].attributes["content"].clone()
}

#[tokio::test]
async fn test_pipeline_runs_tokenize_postag_export() {
    for executor in executors() {
        let pipeline = Pipeline::builtin();
        let cache = Arc::new(CacheStore::in_memory());
        let engine = pipeline.engine(&cache, executor);

        let result = engine
            .run(RunRequest::new(demo_corpus(), ["output"]))
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.invocations(), 9);
        assert_eq!(content(&result, "d1"), "The/DET cat/NOUN sat/NOUN on/ADP the/DET mat/NOUN ./PUNCT");
        for doc in ["d1", "d2", "d3"] {
            assert_eq!(result.status(doc, "output"), Some(TaskStatus::Completed { cache_hit: false }));
        }
        assert_eq!(pipeline.calls("freq_list"), 0);
    }
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let pipeline = Pipeline::builtin();
    let cache = Arc::new(CacheStore::in_memory());
    let engine = pipeline.engine(&cache, Box::new(WorkQueueExecutor::new(4)));

    let first = engine.run(RunRequest::new(demo_corpus(), ["output"])).await.unwrap();
    let calls_after_first: usize = ["tokenize", "postag", "export"].iter().map(|n| pipeline.calls(n)).sum();
    assert_eq!(calls_after_first, 9);

    // Fresh corpus with the same texts: every layer must come from the cache.
    let second = engine.run(RunRequest::new(demo_corpus(), ["output"])).await.unwrap();
    let calls_after_second: usize = ["tokenize", "postag", "export"].iter().map(|n| pipeline.calls(n)).sum();

    assert_eq!(calls_after_second, 9);
    assert_eq!(second.invocations(), 0);
    assert_eq!(second.cache_stats().hits, 9);
    assert_eq!(second.status("d2", "output"), Some(TaskStatus::Completed { cache_hit: true }));
    for doc in ["d1", "d2", "d3"] {
        for layer in ["tokens", "pos", "output"] {
            let a = serde_json::to_vec(&*first.layer(doc, layer).unwrap()).unwrap();
            let b = serde_json::to_vec(&*second.layer(doc, layer).unwrap()).unwrap();
            assert_eq!(a, b, "{} {}", doc, layer);
        }
    }
}

#[tokio::test]
async fn test_parameter_change_invalidates_dependents_only() {
    let pipeline = Pipeline::builtin();
    let cache = Arc::new(CacheStore::in_memory());
    let engine = pipeline.engine(&cache, Box::new(WorkQueueExecutor::new(2)));

    engine.run(RunRequest::new(demo_corpus(), ["output"])).await.unwrap();
    let request = RunRequest::new(demo_corpus(), ["output"]).with_parameter("postag.model", "lexicon");
    let result = engine.run(request).await.unwrap().into_result().unwrap();

    let status = |annotator: &str| -> Vec<TaskStatus> {
        result.records().iter().filter(|r| r.annotator == annotator).map(|r| r.status).collect()
    };
    assert_eq!(status("tokenize"), vec![TaskStatus::Completed { cache_hit: true }; 3]);
    assert_eq!(status("postag"), vec![TaskStatus::Completed { cache_hit: false }; 3]);
    assert_eq!(status("export"), vec![TaskStatus::Completed { cache_hit: false }; 3]);
    assert_eq!(pipeline.calls("tokenize"), 3);
    assert_eq!(pipeline.calls("postag"), 6);
    assert_eq!(content(&result, "d2"), "A/DET dog/NOUN was/AUX running/X quickly/ADV ./PUNCT");
}

#[tokio::test]
async fn test_reused_corpus_recomputes_after_parameter_change() {
    let pipeline = Pipeline::builtin();
    let cache = Arc::new(CacheStore::in_memory());
    let engine = pipeline.engine(&cache, Box::new(WorkQueueExecutor::new(2)));
    let shared = demo_corpus();

    let first = engine.run(RunRequest::new(Arc::clone(&shared), ["pos"])).await.unwrap();
    assert!(first.layer("d2", "pos").is_some());
    assert!(!shared.document("d2").unwrap().has_layer("pos"));

    let request = RunRequest::new(Arc::clone(&shared), ["pos"]).with_parameter("postag.model", "lexicon");
    let reused = engine.run(request).await.unwrap().into_result().unwrap();

    assert_eq!(reused.records().len(), 6);
    assert_eq!(reused.status("d2", "pos"), Some(TaskStatus::Completed { cache_hit: false }));
    assert_eq!(pipeline.calls("postag"), 6);

    let fresh = engine
        .run(RunRequest::new(demo_corpus(), ["pos"]).with_parameter("postag.model", "lexicon"))
        .await
        .unwrap();
    let json = |result: &RunResult| serde_json::to_vec(&*result.layer("d2", "pos").unwrap()).unwrap();
    assert_eq!(json(&reused), json(&fresh));
    assert_ne!(json(&first), json(&reused));
}

#[tokio::test]
async fn test_document_override_affects_one_document() {
    let pipeline = Pipeline::builtin();
    let cache = Arc::new(CacheStore::in_memory());
    let engine = pipeline.engine(&cache, Box::new(LevelByLevelExecutor::new(2)));

    engine.run(RunRequest::new(demo_corpus(), ["pos"])).await.unwrap();
    let request = RunRequest::new(demo_corpus(), ["pos"]).with_document_parameter("d1", "postag.model", "lexicon");
    let result = engine.run(request).await.unwrap();

    let postag: Vec<_> = result.records().iter().filter(|r| r.annotator == "postag").collect();
    for record in postag {
        let expected_hit = record.document_id != "d1";
        assert_eq!(record.status, TaskStatus::Completed { cache_hit: expected_hit }, "{}", record.document_id);
    }
}

#[tokio::test]
async fn test_identical_texts_share_one_computation() {
    let pipeline = Pipeline::builtin();
    let cache = Arc::new(CacheStore::in_memory());
    let engine = pipeline.engine(&cache, Box::new(WorkQueueExecutor::new(8)));
    let documents: Vec<(String, &str)> = (0..8).map(|i| (format!("copy{}", i), "Same words here.")).collect();
    let corpus = Arc::new(
        Corpus::from_documents("copies", documents.iter().map(|(id, text)| Document::new(id.as_str(), *text))).unwrap(),
    );

    let result = engine.run(RunRequest::new(corpus, ["tokens"])).await.unwrap();

    assert!(result.is_success());
    assert_eq!(pipeline.calls("tokenize"), 1);
    assert_eq!(result.cache_stats().computations, 1);
}

#[tokio::test]
async fn test_continue_on_error_skips_dependents_and_aggregates() {
    for executor in executors() {
        let mut registry = AnnotatorRegistry::new();
        for annotator in builtin_annotators() {
            if annotator.spec().name != "postag" {
                registry.register(annotator).unwrap();
            }
        }
        registry
            .register(failing_annotator(AnnotatorSpec::new("postag", "broken").input("tokens").output("pos")))
            .unwrap();

        let engine = Engine::new(Arc::new(registry), Arc::new(CacheStore::in_memory()))
            .with_executor(executor)
            .with_failure_strategy(FailureStrategy::ContinueOnError);
        let result = engine
            .run(RunRequest::new(demo_corpus(), ["output", "tokens"]))
            .await
            .unwrap();

        assert_eq!(result.status("d1", "tokens"), Some(TaskStatus::Completed { cache_hit: false }));
        assert_eq!(result.status("d1", "output"), Some(TaskStatus::Skipped));
        assert_eq!(result.count(TaskStatus::Failed), 3);
        assert_eq!(result.errors().len(), 3);

        match result.into_result().unwrap_err() {
            crate::errors::EngineError::Execution(ExecutionError::MultipleFailed { failures }) => {
                assert_eq!(failures.len(), 3);
                assert!(failures.iter().all(|f| f.kind() == "AnnotatorExecutionError"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_fail_fast_reports_first_error_with_context() {
    let mut registry = AnnotatorRegistry::new();
    registry
        .register(failing_annotator(AnnotatorSpec::new("tokenize", "broken").output("tokens")))
        .unwrap();
    for annotator in builtin_annotators().into_iter().skip(1) {
        registry.register(annotator).unwrap();
    }

    let engine = Engine::new(Arc::new(registry), Arc::new(CacheStore::in_memory()))
        .with_executor(Box::new(WorkQueueExecutor::new(1)));
    let result = engine
        .run(RunRequest::new(demo_corpus(), ["pos"]).with_parameter("postag.model", "lexicon"))
        .await
        .unwrap();

    // With one worker nothing else starts after the first failure.
    assert_eq!(result.count(TaskStatus::Failed), 1);
    assert_eq!(result.invocations(), 0);
    assert!(result.records().iter().all(|r| r.status != TaskStatus::Completed { cache_hit: false }));
    assert_eq!(result.count(TaskStatus::Skipped), 1);
    assert_eq!(result.count(TaskStatus::Cancelled), 4);

    let error = result.error().unwrap();
    let context = error.context().unwrap();
    assert_eq!(context.annotator, "tokenize");
    assert_eq!(context.version, "broken");
    assert_eq!(context.document_id, "d1");
}

#[tokio::test]
async fn test_invalid_output_is_rejected_and_not_cached() {
    let mut registry = AnnotatorRegistry::new();
    let spec = AnnotatorSpec::new("liar", "1").output("claimed");
    registry
        .register(Arc::new(FnAnnotator::new(spec, |_| {
            let mut layer = crate::corpus::AnnotationLayer::new("other");
            layer.push_attr(crate::corpus::Span::new(0, 1), "x", "y");
            Ok(LayerSet::from([("other".to_string(), layer)]))
        })))
        .unwrap();

    let backend = Arc::new(MemoryCacheBackend::new());
    let cache = Arc::new(CacheStore::new(backend.clone()));
    let engine = Engine::new(Arc::new(registry), Arc::clone(&cache));
    let result = engine.run(RunRequest::new(corpus(&[("d", "text")]), ["claimed"])).await.unwrap();

    let error = result.error().unwrap();
    assert!(matches!(error, ExecutionError::InvalidOutput { .. }));
    assert_eq!(error.kind(), "AnnotatorExecutionError");
    assert!(!result.corpus().document("d").unwrap().has_layer("claimed"));
    let stats = cache.stats();
    assert_eq!((stats.computations, stats.misses), (1, 0));
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_panicking_annotator_becomes_task_error() {
    let mut registry = AnnotatorRegistry::new();
    registry
        .register(Arc::new(FnAnnotator::new(AnnotatorSpec::new("boom", "1").output("x"), |_| {
            panic!("annotator exploded")
        })))
        .unwrap();

    let engine = Engine::new(Arc::new(registry), Arc::new(CacheStore::in_memory()));
    let result = engine.run(RunRequest::new(corpus(&[("d", "text")]), ["x"])).await.unwrap();

    match result.error().unwrap() {
        ExecutionError::AnnotatorPanicked { message, .. } => assert!(message.contains("annotator exploded")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_before_run_starts_nothing() {
    let pipeline = Pipeline::builtin();
    let cache = Arc::new(CacheStore::in_memory());
    let token = CancellationToken::new();
    let engine = pipeline
        .engine(&cache, Box::new(WorkQueueExecutor::new(2)))
        .with_cancellation(token.clone());
    token.cancel();

    let result = engine.run(RunRequest::new(demo_corpus(), ["output"])).await.unwrap();

    assert!(result.was_cancelled());
    assert!(!result.is_success());
    assert_eq!(result.count(TaskStatus::Cancelled), 9);
    assert_eq!(result.status("d3", "output"), Some(TaskStatus::Cancelled));
    assert!(result.error().is_none());
}

#[tokio::test]
async fn test_cancellation_mid_run_keeps_completed_entries() {
    let mut registry = AnnotatorRegistry::new();
    let token = CancellationToken::new();
    let cancel_from_task = token.clone();
    let spec = AnnotatorSpec::new("first", "1").output("first");
    let declared = spec.clone();
    registry
        .register(Arc::new(FnAnnotator::new(spec, move |input| {
            cancel_from_task.cancel();
            Ok(marker_layers(&declared, &input))
        })))
        .unwrap();
    let spec = AnnotatorSpec::new("second", "1").input("first").output("second");
    let declared = spec.clone();
    registry
        .register(Arc::new(FnAnnotator::new(spec, move |input| Ok(marker_layers(&declared, &input)))))
        .unwrap();

    let cache = Arc::new(CacheStore::in_memory());
    let engine = Engine::new(Arc::new(registry), Arc::clone(&cache))
        .with_executor(Box::new(WorkQueueExecutor::new(1)))
        .with_cancellation(token);
    let result = engine.run(RunRequest::new(corpus(&[("d", "text")]), ["second"])).await.unwrap();

    let statuses: Vec<_> = result.records().iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![TaskStatus::Completed { cache_hit: false }, TaskStatus::Cancelled]);
    assert_eq!(cache.stats().computations, 1);
}

#[tokio::test]
async fn test_resolution_errors_abort_before_execution() {
    let pipeline = Pipeline::builtin();
    let cache = Arc::new(CacheStore::in_memory());
    let engine = pipeline.engine(&cache, Box::new(WorkQueueExecutor::new(2)));

    let err = engine
        .run(RunRequest::new(demo_corpus(), ["output", "sentiment"]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "MissingProducerError");
    assert_eq!(pipeline.calls("tokenize"), 0);
    assert_eq!(cache.stats(), Default::default());
}
