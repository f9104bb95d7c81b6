// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in annotators used by the CLI and the demo configuration.
//!
//! | annotator   | inputs                          | outputs          | parameters                       |
//! |-------------|---------------------------------|------------------|----------------------------------|
//! | `tokenize`  | text                            | `tokens`         |                                  |
//! | `postag`    | `tokens`                        | `pos`            | `model` (`suffix` \| `lexicon`)  |
//! | `export`    | `tokens`, `pos`                 | `output`         | `delimiter` (default `/`)        |
//! | `freq_list` | `tokens`, `pos`                 | `stats.frequency`| `cutoff`, `lowercase`            |
//! | `gloss`     | `tokens`, file `glossary.tsv`   | `gloss`          |                                  |

pub mod export;
pub mod freq_list;
pub mod gloss;
pub mod postag;
pub mod tokenize;

use std::sync::Arc;

use crate::errors::RegistryError;
use crate::registry::AnnotatorRegistry;
use crate::traits::Annotator;

pub use export::Exporter;
pub use freq_list::FrequencyList;
pub use gloss::Glosser;
pub use postag::{PosTagger, TaggerModel};
pub use tokenize::Tokenizer;

pub fn builtin_annotators() -> Vec<Arc<dyn Annotator>> {
    vec![
        Arc::new(Tokenizer::new()),
        Arc::new(PosTagger::new()),
        Arc::new(Exporter::new()),
        Arc::new(FrequencyList::new()),
        Arc::new(Glosser::new()),
    ]
}

pub fn register_builtin(registry: &mut AnnotatorRegistry) -> Result<(), RegistryError> {
    for annotator in builtin_annotators() {
        registry.register(annotator)?;
    }
    Ok(())
}

/// Builds the input an annotator would receive from the engine, with
/// parameter defaults applied.
#[cfg(test)]
pub(crate) fn input_for(
    annotator: &dyn Annotator,
    text: &str,
    layers: Vec<crate::corpus::AnnotationLayer>,
    overrides: &[(&str, crate::registry::ParamValue)],
) -> crate::traits::AnnotatorInput {
    let mut parameters: std::collections::BTreeMap<_, _> = annotator
        .spec()
        .params
        .iter()
        .filter_map(|(name, spec)| spec.default.clone().map(|v| (name.clone(), v)))
        .collect();
    for (name, value) in overrides {
        parameters.insert(name.to_string(), value.clone());
    }
    crate::traits::AnnotatorInput {
        document_id: "doc".to_string(),
        text: Arc::from(text),
        layers: layers
            .into_iter()
            .map(|layer| (layer.name().to_string(), Arc::new(layer)))
            .collect(),
        files: Default::default(),
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_without_conflicts() {
        let registry = AnnotatorRegistry::with_builtin_annotators().unwrap();
        assert_eq!(registry.len(), 5);
        for output in ["tokens", "pos", "output", "stats.frequency", "gloss"] {
            assert_eq!(registry.resolve_producer(output).len(), 1, "{}", output);
        }
    }

    #[test]
    fn registering_twice_is_rejected() {
        let mut registry = AnnotatorRegistry::with_builtin_annotators().unwrap();
        let err = register_builtin(&mut registry).unwrap_err();
        assert_eq!(err.kind(), "DuplicateProducerError");
    }
}
