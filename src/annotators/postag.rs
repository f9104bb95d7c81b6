// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::str::FromStr;

use crate::corpus::AnnotationLayer;
use crate::errors::AnnotatorError;
use crate::registry::{AnnotatorSpec, ParamSpec};
use crate::traits::{Annotator, AnnotatorInput, LayerSet};

/// Function words shared by both models.
const CLOSED_CLASS: &[(&str, &str)] = &[
    ("a", "DET"),
    ("an", "DET"),
    ("the", "DET"),
    ("this", "DET"),
    ("that", "DET"),
    ("these", "DET"),
    ("and", "CCONJ"),
    ("or", "CCONJ"),
    ("but", "CCONJ"),
    ("i", "PRON"),
    ("you", "PRON"),
    ("he", "PRON"),
    ("she", "PRON"),
    ("it", "PRON"),
    ("we", "PRON"),
    ("they", "PRON"),
    ("at", "ADP"),
    ("by", "ADP"),
    ("from", "ADP"),
    ("in", "ADP"),
    ("of", "ADP"),
    ("on", "ADP"),
    ("to", "ADP"),
    ("with", "ADP"),
    ("am", "AUX"),
    ("are", "AUX"),
    ("be", "AUX"),
    ("has", "AUX"),
    ("have", "AUX"),
    ("is", "AUX"),
    ("was", "AUX"),
    ("were", "AUX"),
    ("not", "PART"),
];

/// Content words known to the lexicon model.
const LEXICON: &[(&str, &str)] = &[
    ("bird", "NOUN"),
    ("cat", "NOUN"),
    ("dog", "NOUN"),
    ("garden", "NOUN"),
    ("house", "NOUN"),
    ("mat", "NOUN"),
    ("river", "NOUN"),
    ("tree", "NOUN"),
    ("barked", "VERB"),
    ("flew", "VERB"),
    ("ran", "VERB"),
    ("sat", "VERB"),
    ("saw", "VERB"),
    ("sings", "VERB"),
    ("big", "ADJ"),
    ("green", "ADJ"),
    ("old", "ADJ"),
    ("small", "ADJ"),
    ("quickly", "ADV"),
    ("slowly", "ADV"),
    ("very", "ADV"),
];

/// Checked in order; the first suffix that matches wins.
const SUFFIXES: &[(&str, &str)] = &[
    ("ly", "ADV"),
    ("ing", "VERB"),
    ("ed", "VERB"),
    ("ous", "ADJ"),
    ("ful", "ADJ"),
    ("able", "ADJ"),
    ("ive", "ADJ"),
    ("tion", "NOUN"),
    ("ness", "NOUN"),
    ("ment", "NOUN"),
];

/// Tag used by the lexicon model for words it does not know.
pub const UNKNOWN_TAG: &str = "X";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggerModel {
    /// Closed-class lookup, then suffix heuristics, then `NOUN`.
    Suffix,
    /// Closed-class and content-word lookup; anything else is `X`.
    Lexicon,
}

impl FromStr for TaggerModel {
    type Err = AnnotatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suffix" => Ok(TaggerModel::Suffix),
            "lexicon" => Ok(TaggerModel::Lexicon),
            other => Err(AnnotatorError::InvalidParameter {
                name: "model".to_string(),
                reason: format!("unknown model '{}'", other),
            }),
        }
    }
}

impl TaggerModel {
    pub fn tag(&self, word: &str) -> &'static str {
        if word.chars().all(|c| !c.is_alphanumeric()) {
            return "PUNCT";
        }
        if word.chars().all(|c| c.is_ascii_digit()) {
            return "NUM";
        }

        let lower = word.to_lowercase();
        if let Some(tag) = lookup(CLOSED_CLASS, &lower) {
            return tag;
        }
        match self {
            TaggerModel::Lexicon => lookup(LEXICON, &lower).unwrap_or(UNKNOWN_TAG),
            TaggerModel::Suffix => SUFFIXES
                .iter()
                .find(|(suffix, _)| lower.len() > suffix.len() + 1 && lower.ends_with(suffix))
                .map(|(_, tag)| *tag)
                .unwrap_or("NOUN"),
        }
    }
}

fn lookup(table: &[(&str, &'static str)], word: &str) -> Option<&'static str> {
    table.iter().find(|(w, _)| *w == word).map(|(_, tag)| *tag)
}

/// Part-of-speech tags (universal tag set) for each token.
pub struct PosTagger {
    spec: AnnotatorSpec,
}

impl PosTagger {
    pub fn new() -> Self {
        Self {
            spec: AnnotatorSpec::new("postag", "1.0")
                .describe("Part-of-speech tags, one per token")
                .input("tokens")
                .output("pos")
                .param("model", ParamSpec::string("suffix").allowed(["suffix", "lexicon"])),
        }
    }
}

impl Default for PosTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator for PosTagger {
    fn spec(&self) -> &AnnotatorSpec {
        &self.spec
    }

    fn annotate(&self, input: AnnotatorInput) -> Result<LayerSet, AnnotatorError> {
        let model: TaggerModel = input.str_param("model")?.parse()?;
        let tokens = input.layer("tokens")?;

        let mut pos = AnnotationLayer::new("pos");
        for token in tokens.iter() {
            let word = token
                .span
                .slice(&input.text)
                .ok_or_else(|| AnnotatorError::failed(format!("token {:?} is outside the text", token.span)))?;
            pos.push_attr(token.span, "pos", model.tag(word));
        }
        Ok(LayerSet::from([("pos".to_string(), pos)]))
    }
}
