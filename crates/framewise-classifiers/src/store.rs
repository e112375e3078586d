//! Artifact persistence
//!
//! A model set is stored as one JSON document per stage plus a
//! `metadata.json` summary. Every file is written under a temporary name and
//! renamed into place; metadata is written last, so a reader never finds
//! metadata that points at missing stage files.

use crate::artifact::{ModelSet, StageArtifact};
use crate::stage::StageId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use framewise_core::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const METADATA_FILE: &str = "metadata.json";

/// Evaluation summary of one persisted stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: StageId,
    pub file: String,
    pub classes: Vec<String>,
    pub accuracy: f64,
    pub f1_weighted: f64,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub train_samples: usize,
    pub test_samples: usize,
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    pub schema_version: u32,
    pub stages: Vec<StageSummary>,
}

impl ModelMetadata {
    pub fn from_set(set: &ModelSet) -> Self {
        Self {
            version: set.version,
            trained_at: set.trained_at,
            schema_version: set.schema_version,
            stages: set
                .stages()
                .map(|artifact| StageSummary {
                    stage: artifact.stage,
                    file: stage_file(artifact.stage),
                    classes: artifact.classes().to_vec(),
                    accuracy: artifact.performance.accuracy,
                    f1_weighted: artifact.performance.f1_weighted,
                    cv_mean: artifact.performance.cv_mean,
                    cv_std: artifact.performance.cv_std,
                    train_samples: artifact.performance.train_samples,
                    test_samples: artifact.performance.test_samples,
                })
                .collect(),
        }
    }
}

fn stage_file(stage: StageId) -> String {
    format!("{}.json", stage.as_str())
}

/// Load/save contract for trained model sets
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist a complete model set
    async fn save(&self, set: &ModelSet) -> Result<()>;

    /// Load the last saved set; `None` when nothing has been saved
    async fn load(&self) -> Result<Option<ModelSet>>;
}

/// Directory-backed artifact store
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read only the metadata summary
    pub async fn metadata(&self) -> Result<Option<ModelMetadata>> {
        let path = self.dir.join(METADATA_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        debug!(path = %target.display(), "wrote artifact file");
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn save(&self, set: &ModelSet) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        for artifact in set.stages() {
            self.write_atomic(&stage_file(artifact.stage), serde_json::to_vec(artifact)?)
                .await?;
        }
        let metadata = ModelMetadata::from_set(set);
        self.write_atomic(METADATA_FILE, serde_json::to_vec_pretty(&metadata)?)
            .await?;

        info!(
            dir = %self.dir.display(),
            version = set.version,
            stages = metadata.stages.len(),
            "saved model artifacts"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<ModelSet>> {
        let Some(metadata) = self.metadata().await? else {
            return Ok(None);
        };
        if metadata.schema_version != framewise_features::SCHEMA_VERSION {
            return Err(Error::config(format!(
                "artifacts in {} use feature schema {}, this build expects {}",
                self.dir.display(),
                metadata.schema_version,
                framewise_features::SCHEMA_VERSION
            )));
        }

        let mut set = ModelSet::new(metadata.trained_at);
        set.version = metadata.version;
        for summary in &metadata.stages {
            let bytes = tokio::fs::read(self.dir.join(&summary.file)).await?;
            let artifact: StageArtifact = serde_json::from_slice(&bytes)?;
            if artifact.stage != summary.stage {
                return Err(Error::config(format!(
                    "{} holds stage '{}', metadata expects '{}'",
                    summary.file, artifact.stage, summary.stage
                )));
            }
            artifact.check()?;
            set.insert_stage(artifact);
        }

        info!(
            dir = %self.dir.display(),
            version = set.version,
            stages = metadata.stages.len(),
            "loaded model artifacts"
        );
        Ok(Some(set))
    }
}

/// In-memory store, for embedding and tests
#[derive(Default)]
pub struct MemoryArtifactStore {
    saved: Mutex<Option<ModelSet>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn save(&self, set: &ModelSet) -> Result<()> {
        *self.saved.lock() = Some(set.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<ModelSet>> {
        Ok(self.saved.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_directory_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path().join("never-written"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_set_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let mut set = ModelSet::new(Utc::now());
        set.version = 3;
        store.save(&set).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.version, 3);
        assert_eq!(loaded.trained_at, set.trained_at);
        assert!(!dir.path().join(".metadata.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_schema_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let metadata = ModelMetadata {
            version: 1,
            trained_at: Utc::now(),
            schema_version: framewise_features::SCHEMA_VERSION + 1,
            stages: Vec::new(),
        };
        std::fs::write(dir.path().join(METADATA_FILE), serde_json::to_vec(&metadata).unwrap()).unwrap();
        assert!(store.load().await.is_err());
    }
}
