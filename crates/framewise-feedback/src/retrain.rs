//! Retraining orchestrator
//!
//! Runs at most one retraining job at a time in the background:
//!
//! `Idle -> PreparingData -> TrainingModels -> SavingModels -> Completed`,
//! with `Error` reachable from every in-progress state.
//!
//! A job retrains the requested stages and every stage that depends on them,
//! from the base corpus plus rows synthesized from unprocessed overrides.
//! Live stages outside that set are carried into the new set unchanged. The
//! job saves the artifacts, publishes the new set to the live model and only
//! then marks its overrides processed. A failed job leaves the overrides
//! unprocessed and the live model untouched.
//!
//! Training runs on a blocking thread that cannot be cancelled. When it
//! exceeds the configured timeout the job reports `Error` right away, but
//! [`RetrainingOrchestrator::is_running`] stays true and new jobs are
//! refused until that thread has returned.

use crate::config::FeedbackConfig;
use crate::overrides::OverrideStore;
use crate::synthesis::synthesize_rows;
use chrono::{DateTime, Utc};
use framewise_classifiers::{
    ArtifactStore, CascadeTrainer, ClassifierConfig, LiveModel, ModelSet, StageId, TrainingCorpus,
};
use framewise_core::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrainState {
    Idle,
    PreparingData,
    TrainingModels,
    SavingModels,
    Completed,
    Error,
}

impl RetrainState {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::PreparingData | Self::TrainingModels | Self::SavingModels)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// What a job retrains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrainRequest {
    /// Stages to retrain; their dependents are retrained too
    pub stages: Vec<StageId>,
    /// Add rows from unprocessed overrides and mark them processed
    pub include_overrides: bool,
}

impl Default for RetrainRequest {
    fn default() -> Self {
        Self {
            stages: StageId::TRAINING_ORDER.to_vec(),
            include_overrides: true,
        }
    }
}

impl RetrainRequest {
    pub fn stages(stages: impl IntoIterator<Item = StageId>) -> Self {
        Self {
            stages: stages.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn without_overrides(mut self) -> Self {
        self.include_overrides = false;
        self
    }
}

/// Override consumed by a job without contributing a training row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOverride {
    pub id: Uuid,
    pub reason: String,
}

/// Polled status of the current or last job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainStatus {
    pub state: RetrainState,
    /// 0 to 100
    pub progress: u8,
    pub current_stage: String,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Stages this job retrains
    pub stages: Vec<StageId>,
    pub overrides_used: usize,
    pub rows_synthesized: usize,
    /// Overrides marked processed on success although they produced no row
    pub skipped_overrides: Vec<SkippedOverride>,
    /// Version published by the last successful job
    pub model_version: Option<u64>,
}

impl RetrainStatus {
    fn idle() -> Self {
        Self {
            state: RetrainState::Idle,
            progress: 0,
            current_stage: "Idle".to_string(),
            error: None,
            started_at: None,
            finished_at: None,
            stages: Vec::new(),
            overrides_used: 0,
            rows_synthesized: 0,
            skipped_overrides: Vec::new(),
            model_version: None,
        }
    }
}

/// Completion handle of a started job
#[derive(Debug)]
pub struct RetrainHandle {
    join: JoinHandle<RetrainStatus>,
}

impl RetrainHandle {
    /// Wait for the job and return its terminal status
    pub async fn wait(self) -> Result<RetrainStatus> {
        self.join
            .await
            .map_err(|e| Error::internal(format!("retraining task failed: {e}")))
    }
}

/// Starts and tracks retraining jobs
#[derive(Clone)]
pub struct RetrainingOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    classifier_config: ClassifierConfig,
    feedback_config: FeedbackConfig,
    base_corpus: Arc<TrainingCorpus>,
    overrides: Arc<OverrideStore>,
    live: Arc<LiveModel>,
    store: Arc<dyn ArtifactStore>,
    running: AtomicBool,
    status: RwLock<RetrainStatus>,
}

/// Releases the in-progress flag when the job ends, however it ends
struct RunningGuard(Arc<OrchestratorInner>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

impl RetrainingOrchestrator {
    pub fn new(
        classifier_config: ClassifierConfig,
        feedback_config: FeedbackConfig,
        base_corpus: TrainingCorpus,
        overrides: Arc<OverrideStore>,
        live: Arc<LiveModel>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                classifier_config,
                feedback_config,
                base_corpus: Arc::new(base_corpus),
                overrides,
                live,
                store,
                running: AtomicBool::new(false),
                status: RwLock::new(RetrainStatus::idle()),
            }),
        }
    }

    pub fn status(&self) -> RetrainStatus {
        self.inner.status.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Start a job in the background.
    ///
    /// Fails with [`Error::RetrainInProgress`] while another job runs, and
    /// with an input error when the request names no stage. Must be called
    /// from within a Tokio runtime.
    pub fn start(&self, request: RetrainRequest) -> Result<RetrainHandle> {
        if request.stages.is_empty() {
            return Err(Error::input("retraining needs at least one stage"));
        }
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::RetrainInProgress);
        }
        let guard = RunningGuard(Arc::clone(&self.inner));

        let stages = StageId::with_dependents(&request.stages);
        *self.inner.status.write() = RetrainStatus {
            state: RetrainState::PreparingData,
            current_stage: "Preparing data".to_string(),
            started_at: Some(Utc::now()),
            stages: stages.clone(),
            ..RetrainStatus::idle()
        };
        info!(
            stages = ?stages,
            include_overrides = request.include_overrides,
            "retraining started"
        );

        let inner = Arc::clone(&self.inner);
        let join = tokio::spawn(async move { inner.run(stages, request.include_overrides, guard).await });
        Ok(RetrainHandle { join })
    }

    /// Start a full job when enough overrides are waiting and none is running
    pub fn maybe_start_on_threshold(&self) -> Result<Option<RetrainHandle>> {
        if !self.inner.overrides.ready_for_retraining() {
            return Ok(None);
        }
        match self.start(RetrainRequest::default()) {
            Ok(handle) => Ok(Some(handle)),
            Err(Error::RetrainInProgress) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl OrchestratorInner {
    fn update(&self, state: RetrainState, progress: u8, current_stage: &str) {
        let mut status = self.status.write();
        status.state = state;
        status.progress = progress;
        status.current_stage = current_stage.to_string();
        info!(state = ?state, progress, current_stage, "retraining progress");
    }

    async fn run(&self, stages: Vec<StageId>, include_overrides: bool, guard: RunningGuard) -> RetrainStatus {
        let mut guard = Some(guard);
        match self.execute(&stages, include_overrides, &mut guard).await {
            Ok(version) => {
                {
                    let mut status = self.status.write();
                    status.state = RetrainState::Completed;
                    status.progress = 100;
                    status.current_stage = "Retraining completed".to_string();
                    status.finished_at = Some(Utc::now());
                    status.model_version = Some(version);
                }
                metrics::counter!("framewise_retrain_runs_total", "outcome" => "completed").increment(1);
                info!(version, "retraining completed");
            }
            Err(e) => {
                {
                    let mut status = self.status.write();
                    status.state = RetrainState::Error;
                    status.error = Some(e.to_string());
                    status.finished_at = Some(Utc::now());
                }
                metrics::counter!("framewise_retrain_runs_total", "outcome" => "error").increment(1);
                error!(error = %e, "retraining failed; live model unchanged");
            }
        }
        self.status.read().clone()
    }

    async fn execute(
        &self,
        stages: &[StageId],
        include_overrides: bool,
        guard: &mut Option<RunningGuard>,
    ) -> Result<u64> {
        self.update(RetrainState::PreparingData, 10, "Processing overrides");
        let mut corpus = (*self.base_corpus).clone();
        let mut consumed: Vec<Uuid> = Vec::new();
        if include_overrides {
            // overrides aimed at stages this job leaves alone wait for a later job
            let pending: Vec<_> = self
                .overrides
                .unprocessed()
                .into_iter()
                .filter(|r| r.correction_type.target_stage().map_or(true, |s| stages.contains(&s)))
                .collect();
            consumed = pending.iter().map(|r| r.id).collect();
            let synthesis = synthesize_rows(&pending);
            {
                let mut status = self.status.write();
                status.overrides_used = synthesis.used.len();
                status.rows_synthesized = synthesis.rows();
                status.skipped_overrides = synthesis
                    .skipped
                    .iter()
                    .map(|(id, reason)| SkippedOverride {
                        id: *id,
                        reason: reason.clone(),
                    })
                    .collect();
            }
            info!(
                pending = pending.len(),
                used = synthesis.used.len(),
                skipped = synthesis.skipped.len(),
                "prepared override rows"
            );
            corpus.extend(synthesis.corpus);
        }

        self.update(RetrainState::TrainingModels, 30, "Training models");
        let config = self.classifier_config.clone();
        let base = self.live.current();
        let requested = stages.to_vec();
        let mut training = tokio::task::spawn_blocking(move || {
            let trainer = CascadeTrainer::new(config);
            match base {
                Some(base) => trainer.train_onto(&base, &corpus, &requested),
                None => trainer.train_stages(&corpus, &requested),
            }
        });
        let joined = match self.feedback_config.training_timeout() {
            Some(limit) => match tokio::time::timeout(limit, &mut training).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        timeout_ms = limit.as_millis() as u64,
                        "training timed out; new jobs wait for the training thread to return"
                    );
                    let guard = guard.take();
                    tokio::spawn(async move {
                        let _ = training.await;
                        drop(guard);
                        info!("timed-out training thread returned");
                    });
                    return Err(Error::Timeout);
                }
            },
            None => training.await,
        };
        let mut set: ModelSet = joined.map_err(|e| Error::training(format!("training task failed: {e}")))??;

        self.update(RetrainState::SavingModels, 80, "Saving models");
        set.version = self.live.version() + 1;
        self.store.save(&set).await?;

        let version = self.live.publish(set);
        let processed = self.overrides.mark_processed(&consumed);
        info!(version, processed, "published retrained models");
        Ok(version)
    }
}
