//! Cascade training
//!
//! Stages are trained in dependency order. The building-type stage consumes
//! the global feature vector plus one `frame_system_prob_<CLASS>` feature per
//! frame-system class, produced by the already-trained frame-system stage.

use crate::artifact::{ModelSet, StageArtifact};
use crate::config::{ClassifierConfig, EvaluationConfig, StageConfig};
use crate::corpus::TrainingCorpus;
use crate::ensemble::SoftVotingEnsemble;
use crate::evaluation::{
    accuracy, classification_report, mean_std, stratified_kfold, stratified_split, weighted_f1,
    ModelPerformance,
};
use crate::preprocess::{to_matrix, LabelEncoder, Preprocessor};
use crate::stage::{StageId, FRAME_PROBABILITY_PREFIX};
use chrono::Utc;
use framewise_core::{Error, FeatureVector, Result};
use std::time::Instant;
use tracing::{info, warn};

/// Names of the features the frame-system stage contributes
pub fn frame_probability_names(frame: &StageArtifact) -> Vec<String> {
    frame
        .classes()
        .iter()
        .map(|c| format!("{FRAME_PROBABILITY_PREFIX}{c}"))
        .collect()
}

/// Global features extended with the frame-system probability vector
pub fn augment_with_frame_probabilities(features: &FeatureVector, frame: &StageArtifact) -> Result<FeatureVector> {
    let probabilities = frame.probabilities(features)?;
    Ok(with_frame_probabilities(features, frame, probabilities))
}

fn with_frame_probabilities(features: &FeatureVector, frame: &StageArtifact, probabilities: Vec<f64>) -> FeatureVector {
    let mut augmented = features.clone();
    for (name, p) in frame_probability_names(frame).into_iter().zip(probabilities) {
        augmented.insert(name, p);
    }
    augmented
}

/// Trains every stage of the cascade
pub struct CascadeTrainer {
    config: ClassifierConfig,
}

impl CascadeTrainer {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Train all stages
    pub fn train(&self, corpus: &TrainingCorpus) -> Result<ModelSet> {
        self.train_stages(corpus, &StageId::TRAINING_ORDER)
    }

    /// Train a subset of stages, still in dependency order
    pub fn train_stages(&self, corpus: &TrainingCorpus, stages: &[StageId]) -> Result<ModelSet> {
        let mut set = ModelSet::new(Utc::now());
        self.train_into(&mut set, corpus, stages)?;
        Ok(set)
    }

    /// Retrain `stages` and their dependents on top of `base`.
    ///
    /// Stages of `base` outside that set are carried over unchanged, so a
    /// building_type retrain alone reuses the frame_system artifact it was
    /// given.
    pub fn train_onto(&self, base: &ModelSet, corpus: &TrainingCorpus, stages: &[StageId]) -> Result<ModelSet> {
        let stages = StageId::with_dependents(stages);
        let mut set = ModelSet::new(Utc::now());
        for artifact in base.stages().filter(|a| !stages.contains(&a.stage)) {
            set.insert_stage(artifact.clone());
        }
        self.train_into(&mut set, corpus, &stages)?;
        Ok(set)
    }

    fn train_into(&self, set: &mut ModelSet, corpus: &TrainingCorpus, stages: &[StageId]) -> Result<()> {
        let started = Instant::now();

        for stage in StageId::TRAINING_ORDER.into_iter().filter(|s| stages.contains(s)) {
            let labeled = corpus.rows(stage);
            let mut names: Vec<String> = stage.schema().names().iter().map(|n| n.to_string()).collect();

            let artifact = if stage.dependencies().contains(&StageId::FrameSystem) {
                let frame = set.stage(StageId::FrameSystem).map_err(|_| {
                    Error::training(format!("{stage} requires a trained frame_system stage"))
                })?;
                names.extend(frame_probability_names(frame));
                let rows: Vec<FeatureVector> = labeled
                    .rows
                    .iter()
                    .map(|r| with_frame_probabilities(r, frame, frame.probabilities_imputed(r)))
                    .collect();
                train_stage(stage, &rows, &labeled.labels, names, self.config.stage(stage), &self.config.evaluation)?
            } else {
                train_stage(
                    stage,
                    &labeled.rows,
                    &labeled.labels,
                    names,
                    self.config.stage(stage),
                    &self.config.evaluation,
                )?
            };
            set.insert_stage(artifact);
        }

        info!(
            stages = stages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cascade training complete"
        );
        Ok(())
    }
}

/// Fit preprocessing and the ensemble of one stage, with hold-out and CV evaluation
pub fn train_stage(
    stage: StageId,
    rows: &[FeatureVector],
    labels: &[String],
    feature_names: Vec<String>,
    config: &StageConfig,
    evaluation: &EvaluationConfig,
) -> Result<StageArtifact> {
    if rows.is_empty() || rows.len() != labels.len() {
        return Err(Error::training(format!(
            "{stage}: need matching non-empty rows and labels (rows={}, labels={})",
            rows.len(),
            labels.len()
        )));
    }

    let encoder = LabelEncoder::fit(labels);
    if encoder.len() < 2 {
        return Err(Error::training(format!(
            "{stage}: at least two classes are required, found {}",
            encoder.len()
        )));
    }
    let n_classes = encoder.len();
    let y = encoder
        .encode_all(labels)
        .ok_or_else(|| Error::internal("label encoder rejected a training label"))?;
    let x = to_matrix(rows, &feature_names);

    let (train_idx, test_idx) = stratified_split(&y, evaluation.test_size, evaluation.seed);
    let test_idx = if test_idx.is_empty() {
        warn!(%stage, rows = rows.len(), "hold-out split is empty; evaluating on training rows");
        train_idx.clone()
    } else {
        test_idx
    };

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|i| x[*i].clone()).collect();
    let y_train: Vec<usize> = train_idx.iter().map(|i| y[*i]).collect();

    let preprocessor = Preprocessor::fit(feature_names, &x_train, &y_train, encoder, config.top_k_features);
    let xt_train: Vec<Vec<f64>> = x_train.iter().map(|r| preprocessor.transform_row(r)).collect();
    let ensemble = SoftVotingEnsemble::fit(&xt_train, &y_train, n_classes, config, evaluation.seed);

    let y_test: Vec<usize> = test_idx.iter().map(|i| y[*i]).collect();
    let predicted: Vec<usize> = test_idx
        .iter()
        .map(|i| ensemble.predict(&preprocessor.transform_row(&x[*i])).0)
        .collect();
    let classes = preprocessor.encoder().classes().to_vec();
    let per_class = classification_report(&y_test, &predicted, &classes);

    let mut cv_scores = Vec::new();
    for (fold_train, fold_val) in stratified_kfold(&y_train, evaluation.cv_folds, evaluation.seed) {
        let fx: Vec<Vec<f64>> = fold_train.iter().map(|i| xt_train[*i].clone()).collect();
        let fy: Vec<usize> = fold_train.iter().map(|i| y_train[*i]).collect();
        let model = SoftVotingEnsemble::fit(&fx, &fy, n_classes, config, evaluation.seed);
        let truth: Vec<usize> = fold_val.iter().map(|i| y_train[*i]).collect();
        let guess: Vec<usize> = fold_val.iter().map(|i| model.predict(&xt_train[*i]).0).collect();
        cv_scores.push(weighted_f1(&classification_report(&truth, &guess, &classes)));
    }
    let (cv_mean, cv_std) = mean_std(&cv_scores);

    let mut feature_importance: Vec<(String, f64)> = preprocessor
        .selected_features()
        .into_iter()
        .map(str::to_string)
        .zip(ensemble.feature_importances().iter().copied())
        .collect();
    feature_importance.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let performance = ModelPerformance {
        accuracy: accuracy(&y_test, &predicted),
        f1_weighted: weighted_f1(&per_class),
        cv_mean,
        cv_std,
        cv_scores,
        per_class,
        feature_importance,
        train_samples: train_idx.len(),
        test_samples: y_test.len(),
    };

    info!(
        %stage,
        classes = n_classes,
        train = performance.train_samples,
        test = performance.test_samples,
        accuracy = performance.accuracy,
        f1 = performance.f1_weighted,
        cv_mean = performance.cv_mean,
        cv_std = performance.cv_std,
        "trained stage"
    );

    Ok(StageArtifact {
        stage,
        preprocessor,
        ensemble,
        performance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::LabeledRows;

    fn rows(n: usize) -> LabeledRows {
        let mut rows = LabeledRows::default();
        for i in 0..n {
            let mut f = FeatureVector::new();
            let class = i % 2;
            f.insert("building_height".into(), class as f64 * 50.0 + (i % 5) as f64);
            f.insert("building_length".into(), (i % 7) as f64);
            rows.push(f, if class == 0 { "LOW" } else { "HIGH" });
        }
        rows
    }

    #[test]
    fn test_single_class_rejected() {
        let mut r = LabeledRows::default();
        r.push(FeatureVector::new(), "ONLY");
        r.push(FeatureVector::new(), "ONLY");
        let cfg = ClassifierConfig::quick();
        let err = train_stage(
            StageId::FrameSystem,
            &r.rows,
            &r.labels,
            vec!["building_height".into()],
            &cfg.frame_system,
            &cfg.evaluation,
        )
        .unwrap_err();
        assert!(err.to_string().contains("two classes"));
    }

    #[test]
    fn test_train_stage_reports_performance() {
        let r = rows(40);
        let cfg = ClassifierConfig::quick();
        let artifact = train_stage(
            StageId::FrameSystem,
            &r.rows,
            &r.labels,
            vec!["building_height".into(), "building_length".into()],
            &cfg.frame_system,
            &cfg.evaluation,
        )
        .unwrap();
        assert_eq!(artifact.classes(), &["HIGH", "LOW"]);
        assert_eq!(artifact.performance.train_samples + artifact.performance.test_samples, 40);
        assert_eq!(artifact.performance.accuracy, 1.0);
        assert_eq!(artifact.performance.cv_scores.len(), 3);
        assert_eq!(artifact.performance.feature_importance.len(), 2);
    }

    #[test]
    fn test_building_stage_requires_frame_stage() {
        let mut corpus = TrainingCorpus::default();
        corpus.building_type = rows(20);
        let trainer = CascadeTrainer::new(ClassifierConfig::quick());
        let err = trainer
            .train_stages(&corpus, &[StageId::BuildingType])
            .unwrap_err();
        assert!(err.to_string().contains("frame_system"));
    }

    #[test]
    fn test_train_onto_keeps_other_stages_and_retrains_dependents() {
        let mut corpus = TrainingCorpus::default();
        corpus.frame_system = rows(30);
        corpus.building_type = rows(30);
        let trainer = CascadeTrainer::new(ClassifierConfig::quick());
        let base = trainer
            .train_stages(&corpus, &[StageId::FrameSystem, StageId::BuildingType])
            .unwrap();

        // building_type alone reuses the frame stage it was given
        let retrained = trainer.train_onto(&base, &corpus, &[StageId::BuildingType]).unwrap();
        assert_eq!(
            retrained.stage(StageId::FrameSystem).unwrap(),
            base.stage(StageId::FrameSystem).unwrap()
        );
        assert!(retrained.has_stage(StageId::BuildingType));

        // frame_system pulls building_type along
        corpus.building_type = LabeledRows::default();
        let err = trainer.train_onto(&base, &corpus, &[StageId::FrameSystem]).unwrap_err();
        assert!(err.to_string().contains("building_type"), "{err}");
    }

    #[test]
    fn test_augmentation_adds_one_feature_per_frame_class() {
        let mut corpus = TrainingCorpus::default();
        corpus.frame_system = rows(30);
        let trainer = CascadeTrainer::new(ClassifierConfig::quick());
        let set = trainer.train_stages(&corpus, &[StageId::FrameSystem]).unwrap();
        let frame = set.stage(StageId::FrameSystem).unwrap();

        let base = corpus.frame_system.rows[0].clone();
        let augmented = with_frame_probabilities(&base, frame, frame.probabilities_imputed(&base));
        assert_eq!(augmented.len(), base.len() + 2);
        let total: f64 = frame_probability_names(frame).iter().map(|n| augmented[n]).sum();
        assert!((total - 1.0).abs() < 1e-9);

        // the public path refuses rows lacking trained inputs
        assert!(augment_with_frame_probabilities(&base, frame).unwrap_err().is_input_error());
    }
}
