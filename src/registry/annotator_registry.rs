// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::errors::{RegistryError, ResolutionError};
use crate::registry::AnnotatorSpec;
use crate::traits::Annotator;

/// Policy applied when several producers can satisfy the same output and no
/// preference is configured for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The earliest registered candidate wins.
    #[default]
    RegistrationOrder,
    /// Multiple candidates without a preference are an error.
    Strict,
}

/// Tie-break policy plus explicit `output -> annotator` preferences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProducerSelection {
    pub tie_break: TieBreak,
    pub preferences: BTreeMap<String, String>,
}

impl ProducerSelection {
    pub fn new(tie_break: TieBreak) -> Self {
        Self {
            tie_break,
            preferences: BTreeMap::new(),
        }
    }

    pub fn prefer(mut self, output: impl Into<String>, annotator: impl Into<String>) -> Self {
        self.preferences.insert(output.into(), annotator.into());
        self
    }
}

/// Static catalog of available annotators.
///
/// The registry is populated before any graph is built and is then shared
/// immutably (behind an `Arc`) by the graph builder and the executor.
#[derive(Clone, Default)]
pub struct AnnotatorRegistry {
    annotators: Vec<Arc<dyn Annotator>>,
    by_name: HashMap<String, usize>,
    // output name -> annotator indices, in registration order
    producers: HashMap<String, Vec<usize>>,
}

impl AnnotatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in demo annotators.
    pub fn with_builtin_annotators() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::annotators::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Register an annotator. Fails if any of its outputs already has a producer.
    pub fn register(&mut self, annotator: Arc<dyn Annotator>) -> Result<(), RegistryError> {
        self.insert(annotator, false)
    }

    /// Register an annotator that may share outputs with already registered
    /// producers. Both remain available; the graph builder picks one per output.
    pub fn register_override(&mut self, annotator: Arc<dyn Annotator>) -> Result<(), RegistryError> {
        self.insert(annotator, true)
    }

    fn insert(&mut self, annotator: Arc<dyn Annotator>, allow_shared_outputs: bool) -> Result<(), RegistryError> {
        let spec = annotator.spec();

        if self.by_name.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateAnnotator {
                name: spec.name.clone(),
            });
        }

        if spec.outputs.is_empty() {
            return Err(RegistryError::NoOutputs {
                name: spec.name.clone(),
            });
        }

        validate_param_schema(spec)?;

        if !allow_shared_outputs {
            for output in &spec.outputs {
                if let Some(existing) = self.producers.get(output).and_then(|ids| ids.first()) {
                    return Err(RegistryError::DuplicateProducer {
                        output: output.clone(),
                        existing: self.annotators[*existing].spec().name.clone(),
                        candidate: spec.name.clone(),
                    });
                }
            }
        }

        let index = self.annotators.len();
        self.by_name.insert(spec.name.clone(), index);
        for output in &spec.outputs {
            self.producers.entry(output.clone()).or_default().push(index);
        }
        self.annotators.push(annotator);
        Ok(())
    }

    /// All annotators capable of producing `output`, in registration order.
    pub fn resolve_producer(&self, output: &str) -> Vec<&Arc<dyn Annotator>> {
        self.producers
            .get(output)
            .map(|ids| ids.iter().map(|&i| &self.annotators[i]).collect())
            .unwrap_or_default()
    }

    /// Pick exactly one producer for `output`, applying the configured
    /// preference first and the tie-break policy second.
    ///
    /// Returns `Ok(None)` when nothing produces `output`.
    pub fn select_producer(
        &self,
        output: &str,
        selection: &ProducerSelection,
    ) -> Result<Option<usize>, ResolutionError> {
        let candidates = match self.producers.get(output) {
            Some(ids) if !ids.is_empty() => ids,
            _ => return Ok(None),
        };

        if let Some(preferred) = selection.preferences.get(output) {
            return candidates
                .iter()
                .copied()
                .find(|&i| &self.annotators[i].spec().name == preferred)
                .map(Some)
                .ok_or_else(|| ResolutionError::InvalidPreference {
                    output: output.to_string(),
                    annotator: preferred.clone(),
                });
        }

        match (candidates.as_slice(), selection.tie_break) {
            ([], _) => Ok(None),
            ([single], _) => Ok(Some(*single)),
            ([first, ..], TieBreak::RegistrationOrder) => Ok(Some(*first)),
            (many, TieBreak::Strict) => Err(ResolutionError::AmbiguousProducer {
                output: output.to_string(),
                candidates: many
                    .iter()
                    .map(|&i| self.annotators[i].spec().name.clone())
                    .collect(),
            }),
        }
    }

    /// Registration indices of every producer of `output`.
    pub fn candidates(&self, output: &str) -> &[usize] {
        self.producers.get(output).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Annotator>> {
        self.by_name.get(name).map(|&i| &self.annotators[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Annotator at a registration index.
    pub fn annotator(&self, index: usize) -> &Arc<dyn Annotator> {
        &self.annotators[index]
    }

    pub fn annotators(&self) -> impl Iterator<Item = &Arc<dyn Annotator>> {
        self.annotators.iter()
    }

    pub fn specs(&self) -> impl Iterator<Item = &AnnotatorSpec> {
        self.annotators.iter().map(|a| a.spec())
    }

    pub fn produces(&self, output: &str) -> bool {
        self.producers.contains_key(output)
    }

    pub fn len(&self) -> usize {
        self.annotators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotators.is_empty()
    }
}

fn validate_param_schema(spec: &AnnotatorSpec) -> Result<(), RegistryError> {
    for (parameter, param_spec) in &spec.params {
        let invalid = |reason: String| RegistryError::InvalidParameterSchema {
            name: spec.name.clone(),
            parameter: parameter.clone(),
            reason,
        };

        if let Some(default) = &param_spec.default {
            param_spec
                .check(default)
                .map_err(|reason| invalid(format!("default {}", reason)))?;
        }
        for allowed in &param_spec.allowed {
            if param_spec.kind.coerce(allowed).is_none() {
                return Err(invalid(format!(
                    "allowed value '{}' is not a {}",
                    allowed, param_spec.kind
                )));
            }
        }
    }
    Ok(())
}

impl fmt::Debug for AnnotatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatorRegistry")
            .field("annotator_count", &self.annotators.len())
            .field(
                "annotators",
                &self.annotators.iter().map(|a| &a.spec().name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
