// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::corpus::{AnnotationLayer, Span};
use crate::errors::AnnotatorError;
use crate::registry::{AnnotatorSpec, ParamSpec};
use crate::traits::{Annotator, AnnotatorInput, LayerSet};

/// Frequency list of (word, tag) pairs.
///
/// One annotation per distinct pair, placed on the pair's first occurrence,
/// with `word`, `pos` and `count` attributes. `cutoff` is the minimum count
/// a pair needs to be listed.
pub struct FrequencyList {
    spec: AnnotatorSpec,
}

impl FrequencyList {
    pub fn new() -> Self {
        Self {
            spec: AnnotatorSpec::new("freq_list", "1.0")
                .describe("Word/tag frequency counts")
                .input("tokens")
                .input("pos")
                .output("stats.frequency")
                .param("cutoff", ParamSpec::integer(0))
                .param("lowercase", ParamSpec::boolean(true)),
        }
    }
}

impl Default for FrequencyList {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator for FrequencyList {
    fn spec(&self) -> &AnnotatorSpec {
        &self.spec
    }

    fn annotate(&self, input: AnnotatorInput) -> Result<LayerSet, AnnotatorError> {
        let cutoff = input.int_param("cutoff")?;
        let lowercase = input.bool_param("lowercase")?;
        let tokens = input.layer("tokens")?;
        let pos = input.layer("pos")?;

        // (word, tag) -> (first span, count)
        let mut counts: BTreeMap<(String, String), (Span, i64)> = BTreeMap::new();
        for (token, tag) in tokens.iter().zip(pos.iter()) {
            let word = token.span.slice(&input.text).unwrap_or_default();
            let word = if lowercase { word.to_lowercase() } else { word.to_string() };
            let tag = tag.attributes.get("pos").cloned().unwrap_or_default();
            counts
                .entry((word, tag))
                .and_modify(|(_, count)| *count += 1)
                .or_insert((token.span, 1));
        }

        let mut entries: Vec<_> = counts.into_iter().filter(|(_, (_, count))| *count >= cutoff).collect();
        entries.sort_by_key(|(_, (span, _))| *span);

        let mut layer = AnnotationLayer::new("stats.frequency");
        for ((word, tag), (span, count)) in entries {
            let attributes = BTreeMap::from([
                ("word".to_string(), word),
                ("pos".to_string(), tag),
                ("count".to_string(), count.to_string()),
            ]);
            layer.push(span, attributes);
        }
        Ok(LayerSet::from([("stats.frequency".to_string(), layer)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotators::input_for;
    use crate::annotators::postag::PosTagger;
    use crate::annotators::tokenize::Tokenizer;
    use crate::registry::ParamValue;

    fn frequencies(text: &str, overrides: &[(&str, ParamValue)]) -> Vec<(String, String)> {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.annotate(input_for(&tokenizer, text, vec![], &[])).unwrap().remove("tokens").unwrap();
        let tagger = PosTagger::new();
        let pos = tagger
            .annotate(input_for(&tagger, text, vec![tokens.clone()], &[]))
            .unwrap()
            .remove("pos")
            .unwrap();

        let freq = FrequencyList::new();
        let out = freq.annotate(input_for(&freq, text, vec![tokens, pos], overrides)).unwrap();
        let layer = &out["stats.frequency"];
        assert!(layer.validate(text).is_ok());
        layer
            .iter()
            .map(|a| (a.attributes["word"].clone(), a.attributes["count"].clone()))
            .collect()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected.iter().map(|(w, c)| (w.to_string(), c.to_string())).collect()
    }

    #[test]
    fn counts_in_first_occurrence_order() {
        assert_eq!(
            frequencies("The cat saw the cat.", &[]),
            pairs(&[("the", "2"), ("cat", "2"), ("saw", "1"), (".", "1")])
        );
    }

    #[test]
    fn lowercase_can_be_disabled() {
        assert_eq!(
            frequencies("The the", &[("lowercase", ParamValue::Bool(false))]),
            pairs(&[("The", "1"), ("the", "1")])
        );
    }

    #[test]
    fn cutoff_is_the_minimum_count() {
        let text = "a cat, a dog, a bird";
        assert_eq!(
            frequencies(text, &[("cutoff", ParamValue::Int(2))]),
            pairs(&[("a", "3"), (",", "2")])
        );
        assert_eq!(frequencies(text, &[("cutoff", ParamValue::Int(3))]), pairs(&[("a", "3")]));
        assert_eq!(frequencies(text, &[("cutoff", ParamValue::Int(1))]).len(), 6);
    }
}
