// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resolution of requested outputs into a validated task graph.
//!
//! Resolution is a pure planning phase: it reads the registry and the corpus
//! but never runs an annotator or touches the cache. It proceeds in phases:
//!
//! 1. **Registry cycle check** - the whole producer graph is checked, so a
//!    cyclic registry is rejected whatever outputs are requested.
//! 2. **Backward resolution** - starting from the requested outputs, every
//!    input that is not already available on the corpus is mapped to exactly
//!    one producer (preference first, then the tie-break policy).
//! 3. **Parameters** - `default <- global override <- document override`,
//!    validated against each annotator's schema.
//! 4. **File inputs** - raw files are resolved against the corpus root.
//! 5. **Expansion** - the producer plan is instantiated per document.
//! 6. **Verification** - Kahn's algorithm over the finished arena.
//!
//! Errors from phases 2-4 are accumulated and reported together.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::ResolutionError;
use crate::graph::cycle::find_cycle;
use crate::graph::request::{split_override_key, ParameterOverrides, RunRequest};
use crate::graph::{DependencyGraph, TaskId};
use crate::observability::messages::resolution::{PlanResolved, ProducerSelected, ResolutionFailed};
use crate::observability::messages::StructuredLog;
use crate::registry::{AnnotatorRegistry, AnnotatorSpec, ParamValue, ProducerSelection};

type Parameters = BTreeMap<String, ParamValue>;

/// Producers selected for a request, in dependency order.
#[derive(Debug, Default)]
struct ProducerPlan {
    /// Registry indices, every producer after the producers it depends on.
    order: Vec<usize>,
    /// output name -> selected producer
    producer_for: HashMap<String, usize>,
}

/// Parameters resolved for one planned annotator.
#[derive(Debug, Default)]
struct ResolvedParameters {
    global: Parameters,
    per_document: BTreeMap<String, Parameters>,
}

impl ResolvedParameters {
    fn for_document(&self, document_id: &str) -> &Parameters {
        self.per_document.get(document_id).unwrap_or(&self.global)
    }
}

/// Builds [`DependencyGraph`]s from [`RunRequest`]s against one registry.
pub struct GraphBuilder<'a> {
    registry: &'a AnnotatorRegistry,
    selection: &'a ProducerSelection,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(registry: &'a AnnotatorRegistry, selection: &'a ProducerSelection) -> Self {
        Self { registry, selection }
    }

    pub fn build(&self, request: &RunRequest) -> Result<DependencyGraph, Vec<ResolutionError>> {
        let result = self.build_inner(request);
        if let Err(errors) = &result {
            ResolutionFailed { errors }.log();
        }
        result
    }

    fn build_inner(&self, request: &RunRequest) -> Result<DependencyGraph, Vec<ResolutionError>> {
        // === PHASE 1: REGISTRY CYCLE CHECK ===
        self.check_registry_acyclic().map_err(|e| vec![e])?;

        let mut errors = Vec::new();

        // === PHASE 2: BACKWARD RESOLUTION ===
        let available = request.corpus.available_layers();
        let plan = self.resolve_producers(&request.outputs, &available, &mut errors);

        // === PHASE 3: PARAMETERS ===
        self.validate_overrides(request, &mut errors);
        let mut parameters: HashMap<usize, ResolvedParameters> = HashMap::new();
        for &index in &plan.order {
            let spec = self.registry.annotator(index).spec();
            if let Some(resolved) = resolve_annotator_parameters(spec, request, &mut errors) {
                parameters.insert(index, resolved);
            }
        }

        // === PHASE 4: FILE INPUTS ===
        let root = request.corpus.root().unwrap_or_else(|| Path::new("."));
        let mut files: HashMap<usize, BTreeMap<String, PathBuf>> = HashMap::new();
        for &index in &plan.order {
            let spec = self.registry.annotator(index).spec();
            let mut resolved = BTreeMap::new();
            for relative in spec.file_inputs() {
                let path = root.join(relative);
                if path.is_file() {
                    resolved.insert(relative.to_string(), path);
                } else {
                    errors.push(ResolutionError::MissingInputFile {
                        annotator: spec.name.clone(),
                        path,
                    });
                }
            }
            files.insert(index, resolved);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // === PHASE 5: EXPANSION ===
        let mut graph = DependencyGraph::new(Arc::clone(&request.corpus), request.outputs.clone());
        for document in request.corpus.documents() {
            let mut task_for: HashMap<usize, TaskId> = HashMap::new();
            for &index in &plan.order {
                let annotator = self.registry.annotator(index);
                let spec = annotator.spec();

                // Outputs already loaded as source layers need no task here.
                if spec.outputs.iter().all(|output| document.has_source_layer(output)) {
                    continue;
                }

                let dependencies: Vec<TaskId> = spec
                    .annotation_inputs()
                    .filter_map(|input| plan.producer_for.get(input))
                    .filter_map(|producer| task_for.get(producer).copied())
                    .collect();

                let task_parameters = parameters
                    .get(&index)
                    .map(|p| p.for_document(document.id()).clone())
                    .unwrap_or_default();
                let task_files = files.get(&index).cloned().unwrap_or_default();

                let id = graph.add_task(
                    Arc::clone(annotator),
                    Arc::clone(document),
                    task_parameters,
                    task_files,
                    dependencies,
                );
                task_for.insert(index, id);
            }
        }

        // === PHASE 6: VERIFICATION ===
        graph.topological_order().map_err(|e| vec![e])?;

        PlanResolved {
            annotators: &graph.annotator_plan(),
            documents: request.corpus.len(),
            tasks: graph.len(),
        }
        .log();

        Ok(graph)
    }

    /// Check the producer graph of the whole registry for cycles. An edge
    /// runs from a consumer to the producer selected for each of its inputs,
    /// or to every candidate when no single producer can be selected.
    fn check_registry_acyclic(&self) -> Result<(), ResolutionError> {
        let adjacency: Vec<Vec<usize>> = self
            .registry
            .specs()
            .map(|spec| {
                spec.annotation_inputs()
                    .flat_map(|input| match self.registry.select_producer(input, self.selection) {
                        Ok(selected) => selected.into_iter().collect::<Vec<_>>(),
                        Err(_) => self.registry.candidates(input).to_vec(),
                    })
                    .collect()
            })
            .collect();

        match find_cycle(&adjacency) {
            Some(cycle) => Err(ResolutionError::CyclicDependency {
                cycle: cycle
                    .into_iter()
                    .map(|i| self.registry.annotator(i).name().to_string())
                    .collect(),
            }),
            None => Ok(()),
        }
    }

    fn resolve_producers(
        &self,
        outputs: &[String],
        available: &BTreeSet<String>,
        errors: &mut Vec<ResolutionError>,
    ) -> ProducerPlan {
        let mut plan = ProducerPlan::default();
        let mut selected: HashSet<usize> = HashSet::new();
        let mut seen: HashSet<String> = HashSet::new();
        // (needed output, annotator that needs it)
        let mut pending: VecDeque<(String, Option<usize>)> =
            outputs.iter().map(|o| (o.clone(), None)).collect();

        while let Some((output, required_by)) = pending.pop_front() {
            if available.contains(&output) || !seen.insert(output.clone()) {
                continue;
            }

            match self.registry.select_producer(&output, self.selection) {
                Ok(Some(index)) => {
                    let spec = self.registry.annotator(index).spec();
                    ProducerSelected {
                        output: &output,
                        annotator: &spec.name,
                        candidates: self.registry.resolve_producer(&output).len(),
                    }
                    .log();

                    plan.producer_for.insert(output, index);
                    if selected.insert(index) {
                        pending.extend(spec.annotation_inputs().map(|input| (input.to_string(), Some(index))));
                    }
                }
                Ok(None) => errors.push(ResolutionError::MissingProducer {
                    input: output,
                    required_by: required_by.map(|i| self.registry.annotator(i).name().to_string()),
                }),
                Err(e) => errors.push(e),
            }
        }

        plan.order = self.order_producers(&selected, &plan.producer_for);
        plan
    }

    /// Kahn's algorithm over the selected producers, breaking ties by
    /// registration order so plans are deterministic.
    fn order_producers(&self, selected: &HashSet<usize>, producer_for: &HashMap<String, usize>) -> Vec<usize> {
        let mut dependencies: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        for &index in selected {
            let deps = self
                .registry
                .annotator(index)
                .spec()
                .annotation_inputs()
                .filter_map(|input| producer_for.get(input).copied())
                .filter(|&producer| producer != index)
                .collect();
            dependencies.insert(index, deps);
        }

        let mut order = Vec::with_capacity(selected.len());
        let mut ready: BTreeSet<usize> = dependencies
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(&index, _)| index)
            .collect();

        while let Some(index) = ready.pop_first() {
            order.push(index);
            dependencies.remove(&index);
            for (&candidate, deps) in dependencies.iter_mut() {
                if deps.remove(&index) && deps.is_empty() {
                    ready.insert(candidate);
                }
            }
        }

        order
    }

    /// Every override must name a registered annotator, one of its
    /// parameters and a value that fits the schema; per-document overrides
    /// must name a document of the corpus.
    fn validate_overrides(&self, request: &RunRequest, errors: &mut Vec<ResolutionError>) {
        self.validate_override_set(&request.parameters, None, errors);
        for (document_id, overrides) in &request.document_parameters {
            if request.corpus.document(document_id).is_none() {
                errors.push(ResolutionError::ConfigValidation {
                    annotator: String::new(),
                    parameter: String::new(),
                    document_id: Some(document_id.clone()),
                    reason: "unknown document".into(),
                });
                continue;
            }
            self.validate_override_set(overrides, Some(document_id), errors);
        }
    }

    fn validate_override_set(
        &self,
        overrides: &ParameterOverrides,
        document_id: Option<&String>,
        errors: &mut Vec<ResolutionError>,
    ) {
        for (key, value) in overrides {
            let invalid = |annotator: &str, parameter: &str, reason: String| ResolutionError::ConfigValidation {
                annotator: annotator.to_string(),
                parameter: parameter.to_string(),
                document_id: document_id.cloned(),
                reason,
            };

            let Some((annotator, parameter)) = split_override_key(key) else {
                errors.push(invalid(key, "", "expected a key of the form 'annotator.parameter'".into()));
                continue;
            };
            let Some(registered) = self.registry.get(annotator) else {
                errors.push(invalid(annotator, parameter, "unknown annotator".into()));
                continue;
            };
            let Some(param_spec) = registered.spec().params.get(parameter) else {
                errors.push(invalid(annotator, parameter, "unknown parameter".into()));
                continue;
            };
            if let Err(reason) = param_spec.check(value) {
                errors.push(invalid(annotator, parameter, reason));
            }
        }
    }
}

/// Resolve one annotator's parameters globally and for every document that
/// overrides any of them. Returns `None` when the global resolution fails,
/// so missing required values are reported once rather than per document.
fn resolve_annotator_parameters(
    spec: &AnnotatorSpec,
    request: &RunRequest,
    errors: &mut Vec<ResolutionError>,
) -> Option<ResolvedParameters> {
    let global = match resolve_parameters(spec, &request.parameters, None) {
        Ok(global) => global,
        Err(problems) => {
            errors.extend(problems.into_iter().map(|(parameter, reason)| ResolutionError::ConfigValidation {
                annotator: spec.name.clone(),
                parameter,
                document_id: None,
                reason,
            }));
            return None;
        }
    };

    let prefix = format!("{}.", spec.name);
    let mut per_document = BTreeMap::new();
    for (document_id, overrides) in &request.document_parameters {
        if !overrides.keys().any(|key| key.starts_with(&prefix)) {
            continue;
        }
        match resolve_parameters(spec, &request.parameters, Some(overrides)) {
            Ok(params) => {
                per_document.insert(document_id.clone(), params);
            }
            Err(problems) => {
                errors.extend(problems.into_iter().map(|(parameter, reason)| {
                    ResolutionError::ConfigValidation {
                        annotator: spec.name.clone(),
                        parameter,
                        document_id: Some(document_id.clone()),
                        reason,
                    }
                }));
            }
        }
    }

    Some(ResolvedParameters { global, per_document })
}

/// `default <- global <- document`, each value checked and coerced.
fn resolve_parameters(
    spec: &AnnotatorSpec,
    global: &ParameterOverrides,
    document: Option<&ParameterOverrides>,
) -> Result<Parameters, Vec<(String, String)>> {
    let mut resolved = Parameters::new();
    let mut problems = Vec::new();

    for (name, param_spec) in &spec.params {
        let key = format!("{}.{}", spec.name, name);
        let value = document
            .and_then(|overrides| overrides.get(&key))
            .or_else(|| global.get(&key))
            .or(param_spec.default.as_ref());

        match value {
            None => problems.push((name.clone(), "missing required value".to_string())),
            Some(value) => match param_spec.check(value) {
                Ok(coerced) => {
                    resolved.insert(name.clone(), coerced);
                }
                Err(reason) => problems.push((name.clone(), reason)),
            },
        }
    }

    if problems.is_empty() {
        Ok(resolved)
    } else {
        Err(problems)
    }
}
