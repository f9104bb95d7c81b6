// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Loads a corpus from a directory of plain-text documents.
//!
//! Every `<id>.txt` file becomes a document with id `<id>`. An optional
//! `<id>.layers.json` next to it holds source layers (a JSON array of
//! annotation layers) that are committed at load time.

use std::fs;
use std::path::{Path, PathBuf};

use crate::corpus::{AnnotationLayer, Corpus, Document};
use crate::errors::CorpusError;

const TEXT_EXTENSION: &str = "txt";
const SOURCE_LAYERS_SUFFIX: &str = ".layers.json";

pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Corpus, CorpusError> {
    let root = path.as_ref();
    if !root.is_dir() {
        return Err(CorpusError::NotADirectory(root.to_path_buf()));
    }

    let io_error = |source| CorpusError::Io {
        path: root.to_path_buf(),
        source,
    };

    let mut text_files: Vec<PathBuf> = fs::read_dir(root)
        .map_err(io_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == TEXT_EXTENSION))
        .collect();
    // directory order is platform dependent
    text_files.sort();

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus".to_string());
    let mut corpus = Corpus::new(name).with_root(root);

    for text_path in text_files {
        let Some(id) = text_path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let text = fs::read_to_string(&text_path).map_err(|source| CorpusError::Io {
            path: text_path.clone(),
            source,
        })?;

        let mut document = Document::new(id.clone(), text);
        let layers_path = root.join(format!("{}{}", id, SOURCE_LAYERS_SUFFIX));
        if layers_path.is_file() {
            for layer in read_source_layers(&layers_path)? {
                document = document.with_layer(layer)?;
            }
        }

        tracing::debug!(document_id = %id, path = %text_path.display(), "Loaded document");
        corpus.add_document(document)?;
    }

    Ok(corpus)
}

fn read_source_layers(path: &Path) -> Result<Vec<AnnotationLayer>, CorpusError> {
    let content = fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CorpusError::SourceLayers {
        path: path.to_path_buf(),
        source,
    })
}
