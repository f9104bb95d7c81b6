// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fs;

use crate::corpus::AnnotationLayer;
use crate::errors::AnnotatorError;
use crate::registry::AnnotatorSpec;
use crate::traits::{Annotator, AnnotatorInput, LayerSet};

/// Glossary file, resolved against the corpus directory.
pub const GLOSSARY_FILE: &str = "glossary.tsv";

/// Attaches glosses from a tab-separated `word<TAB>gloss` file to matching
/// tokens (case-insensitive). Blank lines and lines starting with `#` are
/// ignored.
pub struct Glosser {
    spec: AnnotatorSpec,
}

impl Glosser {
    pub fn new() -> Self {
        Self {
            spec: AnnotatorSpec::new("gloss", "1.0")
                .describe("Glossary lookups for tokens")
                .input("tokens")
                .file_input(GLOSSARY_FILE)
                .output("gloss"),
        }
    }
}

impl Default for Glosser {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator for Glosser {
    fn spec(&self) -> &AnnotatorSpec {
        &self.spec
    }

    fn annotate(&self, input: AnnotatorInput) -> Result<LayerSet, AnnotatorError> {
        let path = input.file(GLOSSARY_FILE)?;
        let content = fs::read_to_string(path).map_err(|e| AnnotatorError::InputFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let glossary = parse_glossary(&content).map_err(|reason| AnnotatorError::InputFile {
            path: path.display().to_string(),
            reason,
        })?;

        let mut layer = AnnotationLayer::new("gloss");
        for token in input.layer("tokens")?.iter() {
            let word = token.span.slice(&input.text).unwrap_or_default().to_lowercase();
            if let Some(gloss) = glossary.get(&word) {
                layer.push_attr(token.span, "gloss", gloss.as_str());
            }
        }
        Ok(LayerSet::from([("gloss".to_string(), layer)]))
    }
}

fn parse_glossary(content: &str) -> Result<HashMap<String, String>, String> {
    let mut glossary = HashMap::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let (word, gloss) = line
            .split_once('\t')
            .ok_or_else(|| format!("line {}: expected word<TAB>gloss", number + 1))?;
        glossary.insert(word.trim().to_lowercase(), gloss.trim().to_string());
    }
    Ok(glossary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotators::input_for;
    use crate::corpus::Span;

    fn tokens(text: &str) -> AnnotationLayer {
        let mut layer = AnnotationLayer::new("tokens");
        for span in crate::annotators::tokenize::token_spans(text) {
            layer.push_attr(span, "word", span.slice(text).unwrap());
        }
        layer
    }

    #[test]
    fn glosses_known_tokens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(GLOSSARY_FILE);
        fs::write(&path, "# demo glossary\nkatze\tcat\n\nHund\tdog\n").unwrap();

        let glosser = Glosser::new();
        let text = "Die Katze und der Hund";
        let mut input = input_for(&glosser, text, vec![tokens(text)], &[]);
        input.files.insert(GLOSSARY_FILE.to_string(), path);

        let out = glosser.annotate(input).unwrap();
        let glossed: Vec<_> = out["gloss"].iter().map(|a| (a.span, a.attributes["gloss"].as_str())).collect();
        assert_eq!(glossed, vec![(Span::new(4, 9), "cat"), (Span::new(18, 22), "dog")]);
    }

    #[test]
    fn malformed_glossary_is_an_input_file_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(GLOSSARY_FILE);
        fs::write(&path, "katze cat\n").unwrap();

        let glosser = Glosser::new();
        let mut input = input_for(&glosser, "Katze", vec![tokens("Katze")], &[]);
        input.files.insert(GLOSSARY_FILE.to_string(), path);

        let err = glosser.annotate(input).unwrap_err();
        assert!(matches!(err, AnnotatorError::InputFile { ref reason, .. } if reason.contains("line 1")));
    }
}
