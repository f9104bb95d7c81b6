// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use annograph::cache::CacheEntry;
use annograph::config::{load_config, validate_config, RuntimeBuilder};
use annograph::corpus::load_corpus;
use annograph::engine::{RunResult, TaskStatus};
use annograph::errors::{CacheError, ConfigError, EngineError};
use annograph::registry::{AnnotatorRegistry, InputRef, ParamValue};

/// Compute linguistic annotation layers over a corpus, reusing cached results.
#[derive(Debug, Parser)]
#[command(name = "annograph", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve and execute the request described by a config file
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Corpus directory (overrides `request.corpus`)
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Requested output layer; repeatable (overrides `request.outputs`)
        #[arg(short, long = "output")]
        outputs: Vec<String>,
        /// Global parameter override, `annotator.parameter=value`; repeatable
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
        /// Write every requested layer as JSON into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// List the registered annotators
    Annotators,
    /// Print a cache entry file and verify its checksum
    Inspect { entry: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Run {
            config,
            corpus,
            outputs,
            overrides,
            export_dir,
        } => run(&config, corpus, outputs, &overrides, export_dir.as_deref()).await,
        Command::Annotators => list_annotators(),
        Command::Inspect { entry } => inspect(&entry),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

/// Prints the taxonomy kind next to the error and its context.
fn report(error: &anyhow::Error) {
    let kind = if let Some(e) = error.downcast_ref::<EngineError>() {
        Some(e.kind())
    } else if let Some(e) = error.downcast_ref::<ConfigError>() {
        Some(e.kind())
    } else {
        error.downcast_ref::<CacheError>().map(CacheError::kind)
    };

    match kind {
        Some(kind) => eprintln!("error[{}]: {:#}", kind, error),
        None => eprintln!("error: {:#}", error),
    }
}

async fn run(
    config_path: &Path,
    corpus_override: Option<PathBuf>,
    outputs: Vec<String>,
    overrides: &[String],
    export_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if !outputs.is_empty() {
        config.request.outputs = outputs;
    }
    validate_config(&config)?;
    for raw in overrides {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("--set expects annotator.parameter=value, got '{}'", raw))?;
        config
            .request
            .parameters
            .insert(key.trim().to_string(), ParamValue::parse_loose(value.trim()));
    }

    let corpus_path = corpus_override
        .or_else(|| config.request.corpus.clone())
        .context("no corpus given: pass --corpus or set request.corpus")?;
    let corpus = Arc::new(load_corpus(&corpus_path).map_err(EngineError::from)?);

    let registry = Arc::new(AnnotatorRegistry::with_builtin_annotators().map_err(EngineError::from)?);
    let engine = RuntimeBuilder::from_config(&config, registry);

    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; waiting for running tasks to finish");
            token.cancel();
        }
    });

    println!(
        "Annotating {} documents from {} ({} executor)",
        corpus.len(),
        corpus_path.display(),
        engine.executor_name()
    );
    let started = Instant::now();
    let result = engine
        .run(RuntimeBuilder::run_request(&config.request, corpus))
        .await?;

    print_summary(&result, started.elapsed().as_secs_f64());
    if let Some(dir) = export_dir {
        export_layers(&result, dir)?;
    }

    if result.was_cancelled() {
        bail!("run cancelled before all tasks started");
    }
    result.into_result()?;
    Ok(())
}

fn print_summary(result: &RunResult, seconds: f64) {
    println!();
    for (document_id, outputs) in result.outputs() {
        let statuses: Vec<String> = outputs
            .iter()
            .map(|(output, status)| format!("{}: {}", output, status))
            .collect();
        println!("  {:<24} {}", document_id, statuses.join(", "));
    }

    let stats = result.cache_stats();
    println!();
    println!(
        "{} tasks in {:.2}s: {} computed, {} from cache, {} failed, {} skipped, {} cancelled",
        result.records().len(),
        seconds,
        result.invocations(),
        result.count(TaskStatus::Completed { cache_hit: true }),
        result.count(TaskStatus::Failed),
        result.count(TaskStatus::Skipped),
        result.count(TaskStatus::Cancelled),
    );
    println!(
        "cache: {} hits, {} misses, {} joined, {} corrupt entries replaced, {} write failures",
        stats.hits, stats.misses, stats.joined, stats.corruptions, stats.write_failures
    );
}

/// One `<document>.<layer>.json` file per requested layer.
fn export_layers(result: &RunResult, dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = 0;
    for (document_id, outputs) in result.outputs() {
        for (output, status) in outputs {
            if !status.is_completed() {
                continue;
            }
            let Some(layer) = result.layer(document_id, output) else {
                continue;
            };
            let path = dir.join(format!("{}.{}.json", document_id, output));
            let json = serde_json::to_vec_pretty(&*layer)?;
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            written += 1;
        }
    }
    println!("exported {} layers to {}", written, dir.display());
    Ok(())
}

fn list_annotators() -> anyhow::Result<()> {
    let registry = AnnotatorRegistry::with_builtin_annotators().map_err(EngineError::from)?;
    for spec in registry.specs() {
        let inputs: Vec<String> = spec
            .inputs
            .iter()
            .map(|input| match input {
                InputRef::Annotation(name) => name.clone(),
                InputRef::File(_) => input.key(),
            })
            .collect();
        let inputs = if inputs.is_empty() { "text".to_string() } else { inputs.join(", ") };
        println!("{} v{}: {} -> {}", spec.name, spec.version, inputs, spec.outputs.join(", "));
        if !spec.description.is_empty() {
            println!("    {}", spec.description);
        }
        for (name, param) in &spec.params {
            let default = param
                .default
                .as_ref()
                .map(|v| format!(" = {}", v))
                .unwrap_or_else(|| " (required)".to_string());
            println!("    --set {}.{}=<{}>{}", spec.name, name, param.kind, default);
        }
    }
    Ok(())
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let entry = CacheEntry::decode(&bytes, None)?;

    println!("key:      {}", entry.key());
    println!("checksum: {} (verified)", entry.checksum());
    for layer in entry.layers() {
        println!();
        println!("layer '{}' ({} annotations)", layer.name(), layer.len());
        for annotation in layer.iter() {
            let attributes: Vec<String> = annotation
                .attributes
                .iter()
                .map(|(k, v)| format!("{}={:?}", k, v))
                .collect();
            println!(
                "  {:>6}..{:<6} {}",
                annotation.span.start,
                annotation.span.end,
                attributes.join(" ")
            );
        }
    }
    Ok(())
}
