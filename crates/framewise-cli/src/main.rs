//! Framewise command-line interface
//!
//! Trains the classifier cascade on the synthetic base corpus, classifies
//! structural models from JSON, records user overrides and retrains from
//! them, optionally one stage at a time.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use framewise_classifiers::{
    ArtifactStore, BuildingClassification, CascadeTrainer, ClassificationService, ClassifierConfig,
    FileArtifactStore, LiveModel, MemberClassification, ModelSet, SampleCorpus, StageId,
};
use framewise_core::{IntegrityValidator, ModelValidator, StructuralModel};
use framewise_feedback::{OverrideRequest, OverrideStore, RetrainRequest, RetrainingOrchestrator};
use framewise_telemetry::PredictionMonitor;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "framewise")]
#[command(about = "Building and member classification for structural analysis models", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "framewise.yaml")]
    config: String,

    /// Artifact directory (overrides config)
    #[arg(long, global = true, env = "FRAMEWISE_ARTIFACTS_DIR")]
    artifacts_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train every stage on the synthetic base corpus and save the artifacts
    Train {
        /// Corpus seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Models per building archetype (overrides config)
        #[arg(long)]
        per_kind: Option<usize>,

        /// Use small ensembles
        #[arg(long)]
        quick: bool,
    },

    /// Classify a structural model read from JSON
    Classify {
        /// Structural model file
        model: PathBuf,

        /// Also classify member roles
        #[arg(long)]
        members: bool,

        /// Restrict member classification to these ids
        #[arg(long = "member", value_name = "ID")]
        member_ids: Vec<String>,

        /// Write the logged predictions as JSON lines
        #[arg(long, value_name = "PATH")]
        snapshot: Option<PathBuf>,
    },

    /// Check a structural model for integrity errors and advisories
    Validate {
        /// Structural model file
        model: PathBuf,
    },

    /// Show the classes, features and scores of the saved models
    Info {
        /// List every selected feature of one stage by importance instead
        #[arg(long, value_name = "STAGE", value_parser = parse_stage)]
        importance: Option<StageId>,
    },

    /// Record a user override read from JSON
    Override {
        /// Override request file
        request: PathBuf,
    },

    /// Retrain from the recorded overrides
    Retrain {
        /// Retrain even below the override threshold
        #[arg(long)]
        force: bool,

        /// Retrain only this stage and its dependents (repeatable)
        #[arg(long = "stage", value_name = "STAGE", value_parser = parse_stage)]
        stages: Vec<StageId>,

        /// Train on the base corpus only and leave overrides pending
        #[arg(long)]
        no_overrides: bool,
    },
}

fn parse_stage(name: &str) -> std::result::Result<StageId, String> {
    StageId::parse(name).ok_or_else(|| {
        let known: Vec<&str> = StageId::TRAINING_ORDER.iter().map(|s| s.as_str()).collect();
        format!("unknown stage '{name}', expected one of {}", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = AppConfig::load(&cli.config, &cli)?;
    info!(artifacts_dir = %config.artifacts_dir.display(), "framewise starting");

    match &cli.command {
        Command::Train {
            seed,
            per_kind,
            quick,
        } => train(&config, *seed, *per_kind, *quick).await,
        Command::Classify {
            model,
            members,
            member_ids,
            snapshot,
        } => classify(&config, model, *members, member_ids, snapshot.as_deref()).await,
        Command::Validate { model } => validate(model),
        Command::Info { importance } => show_info(&config, *importance).await,
        Command::Override { request } => record_override(&config, request),
        Command::Retrain {
            force,
            stages,
            no_overrides,
        } => retrain(&config, *force, stages, *no_overrides).await,
    }
}

/// Initialize tracing subscriber
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("framewise=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framewise=info"))
    };

    // stdout carries command output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_model(path: &Path) -> Result<StructuralModel> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model {}", path.display()))?;
    Ok(StructuralModel::from_json(&text)?)
}

async fn load_models(store: &FileArtifactStore) -> Result<ModelSet> {
    store.load().await?.with_context(|| {
        format!(
            "no trained models in {}; run `framewise train` first",
            store.dir().display()
        )
    })
}

async fn train(config: &AppConfig, seed: Option<u64>, per_kind: Option<usize>, quick: bool) -> Result<()> {
    let seed = seed.unwrap_or(config.corpus.seed);
    let per_kind = per_kind.unwrap_or(config.corpus.per_kind);
    let classifier = if quick {
        ClassifierConfig::quick()
    } else {
        config.classifier.clone()
    };

    let store = FileArtifactStore::new(&config.artifacts_dir);
    let previous = store.metadata().await?.map(|m| m.version).unwrap_or(0);

    info!(seed, per_kind, quick, "training cascade");
    let corpus = SampleCorpus::new(seed, per_kind).corpus();
    let mut set = tokio::task::spawn_blocking(move || CascadeTrainer::new(classifier).train(&corpus)).await??;
    set.version = previous + 1;
    store.save(&set).await?;

    println!("Saved model set v{} to {}", set.version, store.dir().display());
    for artifact in set.stages() {
        let perf = &artifact.performance;
        println!(
            "  {:<14} classes={:<2} accuracy={:.3} f1={:.3} cv={:.3}±{:.3} (train {}, test {})",
            artifact.stage.as_str(),
            artifact.classes().len(),
            perf.accuracy,
            perf.f1_weighted,
            perf.cv_mean,
            perf.cv_std,
            perf.train_samples,
            perf.test_samples,
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ClassifyOutput {
    building: BuildingClassification,
    #[serde(skip_serializing_if = "Option::is_none")]
    members: Option<MemberClassification>,
}

async fn classify(
    config: &AppConfig,
    model_path: &Path,
    members: bool,
    member_ids: &[String],
    snapshot: Option<&Path>,
) -> Result<()> {
    let model = read_model(model_path)?;
    let set = load_models(&FileArtifactStore::new(&config.artifacts_dir)).await?;

    let monitor = Arc::new(PredictionMonitor::new(config.monitor.clone()));
    let service = ClassificationService::new(Arc::new(LiveModel::with_model(set)))
        .with_monitor(Arc::clone(&monitor))
        .with_alternatives_top_k(config.classifier.alternatives_top_k);

    let output = if !member_ids.is_empty() {
        ClassifyOutput {
            building: service.classify_building(&model)?,
            members: Some(service.classify_members(&model, Some(member_ids))?),
        }
    } else if members {
        let combined = service.classify_model(&model)?;
        ClassifyOutput {
            building: combined.building,
            members: Some(combined.members),
        }
    } else {
        ClassifyOutput {
            building: service.classify_building(&model)?,
            members: None,
        }
    };
    print_json(&output)?;

    if let Some(path) = snapshot {
        let written = monitor.save_snapshot(path)?;
        info!(path = %path.display(), written, "wrote prediction snapshot");
    }
    Ok(())
}

fn validate(model_path: &Path) -> Result<()> {
    let model = read_model(model_path)?;
    let outcome = IntegrityValidator::default().validate(&model);
    print_json(&outcome)?;
    if !outcome.is_valid {
        anyhow::bail!("model {} has {} integrity error(s)", model.id, outcome.errors.len());
    }
    Ok(())
}

async fn show_info(config: &AppConfig, importance: Option<StageId>) -> Result<()> {
    let set = load_models(&FileArtifactStore::new(&config.artifacts_dir)).await?;
    let service = ClassificationService::new(Arc::new(LiveModel::with_model(set)));
    match importance {
        Some(stage) => {
            for (name, score) in service.feature_importance(stage)? {
                println!("{score:>8.4}  {name}");
            }
            Ok(())
        }
        None => print_json(&service.model_info()?),
    }
}

fn record_override(config: &AppConfig, request_path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(request_path)
        .with_context(|| format!("Failed to read override {}", request_path.display()))?;
    let request: OverrideRequest = serde_json::from_str(&text)?;

    let path = config.overrides_path();
    let store = OverrideStore::load(&path, config.feedback.clone())?;
    let receipt = store.submit(request);
    store.save(&path)?;
    print_json(&receipt)
}

async fn retrain(config: &AppConfig, force: bool, stages: &[StageId], no_overrides: bool) -> Result<()> {
    let mut request = if stages.is_empty() {
        RetrainRequest::default()
    } else {
        RetrainRequest::stages(stages.iter().copied())
    };
    if no_overrides {
        request = request.without_overrides();
    }

    let path = config.overrides_path();
    let overrides = Arc::new(OverrideStore::load(&path, config.feedback.clone())?);
    if !force && request.include_overrides && !overrides.ready_for_retraining() {
        println!(
            "{} unprocessed override(s); retraining needs {} (use --force to retrain anyway)",
            overrides.unprocessed_count(),
            config.feedback.retrain_threshold
        );
        return Ok(());
    }

    let store = Arc::new(FileArtifactStore::new(&config.artifacts_dir));
    let live = Arc::new(match store.load().await? {
        Some(set) => LiveModel::with_model(set),
        None => LiveModel::new(),
    });
    let corpus = SampleCorpus::new(config.corpus.seed, config.corpus.per_kind).corpus();

    let orchestrator = RetrainingOrchestrator::new(
        config.classifier.clone(),
        config.feedback.clone(),
        corpus,
        Arc::clone(&overrides),
        live,
        store,
    );
    let status = orchestrator.start(request)?.wait().await?;

    // processed flags changed only on success
    if let Err(e) = overrides.save(&path) {
        warn!(error = %e, path = %path.display(), "failed to persist override log");
    }
    print_json(&status)?;
    if let Some(error) = status.error {
        anyhow::bail!("retraining failed: {error}");
    }
    Ok(())
}
