//! Application configuration

use framewise_classifiers::ClassifierConfig;
use framewise_feedback::FeedbackConfig;
use framewise_telemetry::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const OVERRIDES_FILE: &str = "overrides.json";

/// Top-level configuration of the `framewise` binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding stage artifacts and the override log
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Override log; defaults to `overrides.json` in the artifacts directory
    #[serde(default)]
    pub overrides_file: Option<PathBuf>,

    /// Base corpus generated for training and retraining
    #[serde(default)]
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,
}

/// Synthetic base corpus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Models generated per building archetype
    #[serde(default = "default_per_kind")]
    pub per_kind: usize,
}

impl AppConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config: Self = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(dir) = &cli.artifacts_dir {
            config.artifacts_dir = dir.clone();
        }

        config.classifier.validate()?;
        config.monitor.validate()?;
        config.feedback.validate()?;
        if config.corpus.per_kind == 0 {
            anyhow::bail!("corpus.per_kind must be at least 1");
        }

        Ok(config)
    }

    pub fn overrides_path(&self) -> PathBuf {
        self.overrides_file
            .clone()
            .unwrap_or_else(|| self.artifacts_dir.join(OVERRIDES_FILE))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            overrides_file: None,
            corpus: CorpusConfig::default(),
            classifier: ClassifierConfig::default(),
            monitor: MonitorConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            per_kind: default_per_kind(),
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("framewise"))
        .unwrap_or_else(|| PathBuf::from("./artifacts"))
}

fn default_seed() -> u64 {
    42
}

fn default_per_kind() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;
    use framewise_classifiers::StageId;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let cli = Cli::parse_from(["framewise", "info"]);
        let config = AppConfig::load("/nonexistent/framewise.yaml", &cli).unwrap();
        assert_eq!(config.corpus, CorpusConfig::default());
        assert_eq!(config.feedback.retrain_threshold, 10);
        assert!(config.overrides_path().ends_with("overrides.json"));
    }

    #[test]
    fn test_file_and_cli_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "artifacts_dir: /srv/models\ncorpus:\n  per_kind: 3\nfeedback:\n  retrain_threshold: 5"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from(["framewise", "info"]);
        let config = AppConfig::load(&path, &cli).unwrap();
        assert_eq!(config.artifacts_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.corpus.per_kind, 3);
        assert_eq!(config.corpus.seed, 42);
        assert_eq!(config.feedback.retrain_threshold, 5);

        let cli = Cli::parse_from(["framewise", "--artifacts-dir", "/tmp/fw", "info"]);
        let config = AppConfig::load(&path, &cli).unwrap();
        assert_eq!(config.artifacts_dir, PathBuf::from("/tmp/fw"));
        assert_eq!(config.overrides_path(), PathBuf::from("/tmp/fw/overrides.json"));
    }

    #[test]
    fn test_invalid_sections_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "feedback:\n  retrain_threshold: 0").unwrap();
        let cli = Cli::parse_from(["framewise", "info"]);
        assert!(AppConfig::load(file.path().to_str().unwrap(), &cli).is_err());
    }

    #[test]
    fn test_stage_arguments_parsed() {
        let cli = Cli::parse_from([
            "framewise",
            "retrain",
            "--stage",
            "frame_system",
            "--stage",
            "member_role",
            "--no-overrides",
        ]);
        match cli.command {
            crate::Command::Retrain {
                force,
                stages,
                no_overrides,
            } => {
                assert!(!force);
                assert!(no_overrides);
                assert_eq!(stages, vec![StageId::FrameSystem, StageId::MemberRole]);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from(["framewise", "info", "--importance", "building_type"]);
        assert!(matches!(
            cli.command,
            crate::Command::Info {
                importance: Some(StageId::BuildingType)
            }
        ));
        assert!(Cli::try_parse_from(["framewise", "info", "--importance", "roof"]).is_err());
    }
}
