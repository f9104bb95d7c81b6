// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_CACHE_DIR, TOML_EXTENSION};
use crate::errors::{ConfigError, FailureStrategy};
use crate::graph::ParameterOverrides;
use crate::registry::{ProducerSelection, TieBreak};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for an annotation run.
///
/// Loaded from YAML, or TOML when the file ends in `.toml`. Everything except
/// `request.outputs` has a default.
///
/// # Example
/// ```yaml
/// strategy: work_queue
/// failure_strategy: fail_fast
/// executor_options:
///   max_concurrency: 4
/// cache:
///   backend: filesystem
///   directory: .annograph/cache
/// tie_break: registration_order
/// preferences:
///   pos: postag
/// request:
///   outputs: [output]
///   corpus: corpus/demo
///   parameters:
///     postag.model: suffix
///   document_parameters:
///     doc1:
///       postag.model: lexicon
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub tie_break: TieBreak,
    /// output -> annotator that must produce it
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
    #[serde(default)]
    pub request: RequestConfig,
}

impl EngineConfig {
    pub fn producer_selection(&self) -> ProducerSelection {
        ProducerSelection {
            tie_break: self.tie_break,
            preferences: self.preferences.clone(),
        }
    }
}

/// Scheduling strategy.
///
/// # Variants
/// * `WorkQueue` - dependency counting with a priority queue of ready tasks
/// * `Level` - topological levels executed one after another
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    WorkQueue,
    Level,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutorOptions {
    /// Maximum number of tasks in flight (defaults to available parallelism)
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    #[default]
    Filesystem,
    /// Entries live for the lifetime of the process only
    Memory,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            directory: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

/// What to compute. The CLI can override every field.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Directory of `.txt` documents
    pub corpus: Option<PathBuf>,
    /// `annotator.parameter` -> value
    #[serde(default)]
    pub parameters: ParameterOverrides,
    /// document id -> `annotator.parameter` -> value
    #[serde(default)]
    pub document_parameters: BTreeMap<String, ParameterOverrides>,
}

/// Load a config from a YAML or TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().is_some_and(|ext| ext == TOML_EXTENSION) {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load a config and check the settings that can be validated without a
/// registry or corpus.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Collects every problem instead of stopping at the first one.
pub fn validate_config(cfg: &EngineConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    if cfg.request.outputs.is_empty() {
        problems.push("request.outputs must name at least one output".to_string());
    }
    for output in &cfg.request.outputs {
        if output.trim().is_empty() {
            problems.push("request.outputs contains an empty name".to_string());
        }
    }
    if cfg.executor_options.max_concurrency == Some(0) {
        problems.push("executor_options.max_concurrency must be at least 1".to_string());
    }
    if cfg.cache.backend == CacheBackendKind::Filesystem && cfg.cache.directory.as_os_str().is_empty() {
        problems.push("cache.directory must not be empty".to_string());
    }
    for (output, annotator) in &cfg.preferences {
        if annotator.trim().is_empty() {
            problems.push(format!("preferences.{} names no annotator", output));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParamValue;

    #[test]
    fn parse_full_config() {
        let yaml = r#"
strategy: level
failure_strategy: continue_on_error
executor_options:
  max_concurrency: 3
cache:
  backend: memory
tie_break: strict
preferences:
  pos: postag
request:
  outputs: [output]
  corpus: corpus/demo
  parameters:
    postag.model: lexicon
    export.delimiter: "_"
  document_parameters:
    doc1:
      freq_list.cutoff: 2
"#;

        let cfg: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.strategy, Strategy::Level);
        assert_eq!(cfg.failure_strategy, FailureStrategy::ContinueOnError);
        assert_eq!(cfg.executor_options.max_concurrency, Some(3));
        assert_eq!(cfg.cache.backend, CacheBackendKind::Memory);
        assert_eq!(cfg.cache.directory, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(cfg.tie_break, TieBreak::Strict);
        assert_eq!(cfg.request.corpus, Some(PathBuf::from("corpus/demo")));
        assert_eq!(cfg.request.parameters["postag.model"], ParamValue::from("lexicon"));
        assert_eq!(cfg.request.document_parameters["doc1"]["freq_list.cutoff"], ParamValue::Int(2));

        let selection = cfg.producer_selection();
        assert_eq!(selection.preferences["pos"], "postag");
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: EngineConfig = serde_yaml::from_str("request:\n  outputs: [pos]\n").unwrap();
        assert_eq!(cfg.strategy, Strategy::WorkQueue);
        assert_eq!(cfg.failure_strategy, FailureStrategy::FailFast);
        assert_eq!(cfg.executor_options.max_concurrency, None);
        assert_eq!(cfg.cache, CacheConfig::default());
        assert_eq!(cfg.tie_break, TieBreak::RegistrationOrder);
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<EngineConfig, _> = serde_yaml::from_str("strategy: work_queue\nstages: []\n");
        assert!(result.is_err());

        let result: Result<EngineConfig, _> = serde_yaml::from_str("strategy: reactive\n");
        assert!(result.is_err());
    }

    #[test]
    fn validation_collects_every_problem() {
        let cfg: EngineConfig = serde_yaml::from_str(
            "executor_options:\n  max_concurrency: 0\npreferences:\n  pos: ''\n",
        )
        .unwrap();

        let err = validate_config(&cfg).unwrap_err();
        assert_eq!(err.kind(), "ConfigValidationError");
        match err {
            ConfigError::Invalid(problems) => {
                assert_eq!(problems.len(), 3);
                assert!(problems[0].contains("request.outputs"));
                assert!(problems[1].contains("max_concurrency"));
                assert!(problems[2].contains("preferences.pos"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn toml_files_are_parsed_as_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
strategy = "level"

[executor_options]
max_concurrency = 2

[request]
outputs = ["pos"]

[request.parameters]
"postag.model" = "lexicon"
"#,
        )
        .unwrap();

        let cfg = load_and_validate_config(&path).unwrap();
        assert_eq!(cfg.strategy, Strategy::Level);
        assert_eq!(cfg.executor_options.max_concurrency, Some(2));
        assert_eq!(cfg.request.parameters["postag.model"], ParamValue::from("lexicon"));
    }

    #[test]
    fn invalid_yaml_reports_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "strategy: [unclosed").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }
}
