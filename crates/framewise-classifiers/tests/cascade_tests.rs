//! End-to-end tests: train the cascade on the sample corpus, then classify

use framewise_classifiers::{
    augment_with_frame_probabilities, ArtifactStore, CascadeTrainer, ClassificationService,
    ClassifierConfig, FileArtifactStore, LiveModel, ModelSet, SampleCorpus, SampleKind, StageId,
    FRAME_PROBABILITY_PREFIX, STAGE_INFO_IMPORTANCE,
};
use framewise_core::{Member, StructuralModel};
use framewise_features::extract_global_features;
use framewise_telemetry::{PredictionMonitor, Window};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, OnceLock};

fn trained() -> &'static ModelSet {
    static SET: OnceLock<ModelSet> = OnceLock::new();
    SET.get_or_init(|| {
        let corpus = SampleCorpus::new(42, 3).corpus();
        CascadeTrainer::new(ClassifierConfig::quick())
            .train(&corpus)
            .expect("cascade trains on the sample corpus")
    })
}

fn service() -> ClassificationService {
    ClassificationService::new(Arc::new(LiveModel::with_model(trained().clone())))
}

fn sample(kind: SampleKind, seed: u64) -> StructuralModel {
    kind.generate(format!("sample-{seed}"), &mut StdRng::seed_from_u64(seed))
}

#[test]
fn test_cascade_trains_every_stage() {
    let set = trained();
    for stage in StageId::TRAINING_ORDER {
        assert!(set.has_stage(stage), "missing {stage}");
    }

    let frame = set.stage(StageId::FrameSystem).unwrap();
    assert_eq!(frame.classes(), &["BRACED", "CANTILEVER", "DUAL", "MOMENT", "TRUSS"]);

    let building = set.stage(StageId::BuildingType).unwrap();
    assert_eq!(building.classes().len(), SampleKind::ALL.len());
    let appended: Vec<&String> = building
        .input_features()
        .iter()
        .filter(|n| n.starts_with(FRAME_PROBABILITY_PREFIX))
        .collect();
    assert_eq!(appended.len(), frame.classes().len());

    let perf = &building.performance;
    assert!(perf.accuracy >= 0.0 && perf.accuracy <= 1.0);
    assert!(!perf.feature_importance.is_empty());
}

#[test]
fn test_classification_is_deterministic() {
    let service = service();
    let model = sample(SampleKind::SingleGableHangar, 1001);

    let first = service.classify_building(&model).unwrap();
    let second = service.classify_building(&model).unwrap();
    assert_eq!(first, second);

    let members_first = service.classify_members(&model, None).unwrap();
    let members_second = service.classify_members(&model, None).unwrap();
    assert_eq!(members_first, members_second);
    assert_eq!(members_first.tags.len(), model.members.len());
}

#[test]
fn test_building_result_shape() {
    let service = service().with_alternatives_top_k(3);
    let model = sample(SampleKind::IndustrialWarehouse, 77);
    let result = service.classify_building(&model).unwrap();

    assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    assert_eq!(result.alternatives.len(), 3);
    assert!(result.alternatives.iter().all(|a| a.label != result.building_type));
    assert!(result.alternatives.iter().all(|a| a.probability <= result.confidence));
    assert!(result
        .alternatives
        .windows(2)
        .all(|w| w[0].probability >= w[1].probability));
    assert!(result.seismic.is_some());
    assert!(!result.reasoning.is_empty() && result.reasoning.len() <= 10);
    assert_eq!(result.model_version, trained().version);
}

#[test]
fn test_missing_frame_stage_is_not_ready() {
    let mut set = trained().clone();
    set.remove_stage(StageId::FrameSystem);
    let service = ClassificationService::new(Arc::new(LiveModel::with_model(set)));
    let model = sample(SampleKind::TrussSingleGable, 5);

    let err = service.classify_building(&model).unwrap_err();
    assert!(err.is_not_ready());
    assert!(err.to_string().contains("frame_system"));

    // member roles do not depend on the frame system
    assert!(service.classify_members(&model, None).is_ok());
}

#[test]
fn test_building_stage_requires_frame_probabilities() {
    let set = trained();
    let model = sample(SampleKind::TrussSingleGable, 31);
    let features = extract_global_features(&model);
    let building = set.stage(StageId::BuildingType).unwrap();

    // plain building features lack the frame_system_prob_* inputs
    let err = building.predict(&features).unwrap_err();
    assert!(err.is_not_ready(), "unexpected error: {err}");
    assert!(err.to_string().contains("frame_system"));
    assert!(building.probabilities(&features).unwrap_err().is_not_ready());

    let frame = set.stage(StageId::FrameSystem).unwrap();
    let augmented = augment_with_frame_probabilities(&features, frame).unwrap();
    let prediction = building.predict(&augmented).unwrap();
    assert!(building.classes().contains(&prediction.label));
}

#[test]
fn test_stage_rejects_incomplete_features() {
    let set = trained();
    let mut features = extract_global_features(&sample(SampleKind::SportsFacility, 8));
    let frame = set.stage(StageId::FrameSystem).unwrap();
    assert!(frame.predict(&features).is_ok());

    features.remove("building_height");
    let err = frame.predict(&features).unwrap_err();
    assert!(err.is_input_error());
    assert!(err.to_string().contains("building_height"));

    // non-finite values of present features are imputed
    let mut features = extract_global_features(&sample(SampleKind::SportsFacility, 8));
    features.insert("building_height".to_string(), f64::NAN);
    assert!(frame.predict(&features).is_ok());
}

#[test]
fn test_classify_model_matches_separate_calls() {
    let service = service();
    let model = sample(SampleKind::IndustrialWarehouse, 404);

    let combined = service.classify_model(&model).unwrap();
    assert_eq!(combined.building, service.classify_building(&model).unwrap());
    assert_eq!(combined.members, service.classify_members(&model, None).unwrap());
    assert_eq!(combined.building.model_version, combined.members.model_version);
    assert_eq!(combined.members.tags.len(), model.members.len());
}

#[test]
fn test_classify_model_needs_every_stage() {
    let mut set = trained().clone();
    set.remove_stage(StageId::MemberRole);
    let service = ClassificationService::new(Arc::new(LiveModel::with_model(set)));
    let model = sample(SampleKind::CarShedCanopy, 6);

    assert!(service.classify_building(&model).is_ok());
    let err = service.classify_model(&model).unwrap_err();
    assert!(err.is_not_ready());
    assert!(err.to_string().contains("member_role"));
}

#[test]
fn test_feature_importance_ranked() {
    let service = service();
    for stage in StageId::TRAINING_ORDER {
        let ranked = service.feature_importance(stage).unwrap();
        assert!(!ranked.is_empty());
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1), "{stage} not sorted");
        let inputs = trained().stage(stage).unwrap().input_features();
        assert!(ranked.iter().all(|(name, _)| inputs.contains(name)));
    }

    let info = service.model_info().unwrap();
    for stage in &info.stages {
        assert!(!stage.feature_importance.is_empty());
        assert!(stage.feature_importance.len() <= STAGE_INFO_IMPORTANCE);
        let full = service.feature_importance(stage.stage).unwrap();
        assert_eq!(stage.feature_importance[..], full[..stage.feature_importance.len()]);
    }

    let empty = ClassificationService::new(Arc::new(LiveModel::new()));
    assert!(empty.feature_importance(StageId::MemberRole).unwrap_err().is_not_ready());
}

#[test]
fn test_dangling_member_is_skipped_not_fatal() {
    let service = service();
    let mut model = sample(SampleKind::SingleGableHangar, 12);
    let first_node = model.nodes[0].id.clone();
    model.members.push(Member::new("dangling", first_node, "no-such-node").with_type("BEAM"));

    let result = service.classify_members(&model, None).unwrap();
    assert!(!result.tags.contains_key("dangling"));
    assert_eq!(result.skipped, vec!["dangling".to_string()]);
    assert_eq!(result.tags.len(), model.members.len() - 1);
    assert!(result.warnings.iter().any(|w| w.contains("no-such-node")));
}

#[test]
fn test_member_subset_and_unknown_ids() {
    let service = service();
    let model = sample(SampleKind::CarShedCanopy, 3);
    let ids = vec![model.members[0].id.clone(), "unknown".to_string()];

    let result = service.classify_members(&model, Some(&ids)).unwrap();
    assert_eq!(result.tags.len(), 1);
    assert!(result.tags.contains_key(&model.members[0].id));
    assert_eq!(result.skipped, vec!["unknown".to_string()]);
}

#[test]
fn test_monitor_receives_predictions() {
    let monitor = Arc::new(PredictionMonitor::default());
    let service = service().with_monitor(Arc::clone(&monitor));
    let model = sample(SampleKind::SymmetricMultiStory, 9);

    service.classify_building(&model).unwrap();
    assert_eq!(monitor.records("building_type", Window::All).len(), 1);
    assert_eq!(monitor.records("frame_system", Window::All).len(), 1);

    service.classify_members(&model, None).unwrap();
    assert_eq!(monitor.records("member_role", Window::All).len(), model.members.len());
}

#[test]
fn test_model_info_lists_stages() {
    let info = service().model_info().unwrap();
    let stages: Vec<StageId> = info.stages.iter().map(|s| s.stage).collect();
    assert_eq!(stages, StageId::TRAINING_ORDER.to_vec());
    assert!(info.stages.iter().all(|s| s.selected_features.len() <= s.input_features.len()));
}

#[tokio::test]
async fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path());
    let live = LiveModel::new();
    live.publish(trained().clone());
    let published = live.current().unwrap();
    store.save(&published).await.unwrap();

    let metadata = store.metadata().await.unwrap().unwrap();
    assert_eq!(metadata.version, 1);
    assert_eq!(metadata.stages.len(), 3);

    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded.version, 1);

    let model = sample(SampleKind::SportsFacility, 21);
    let before = ClassificationService::new(Arc::new(LiveModel::with_model((*published).clone())))
        .classify_building(&model)
        .unwrap();
    let after = ClassificationService::new(Arc::new(LiveModel::with_model(loaded)))
        .classify_building(&model)
        .unwrap();
    assert_eq!(before.building_type, after.building_type);
    assert!((before.confidence - after.confidence).abs() < 1e-9);
}

#[tokio::test]
async fn test_corrupt_stage_file_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path());
    store.save(trained()).await.unwrap();

    let path = dir.path().join("frame_system.json");
    let mut artifact: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    artifact["ensemble"]["forest"]["trees"][0]["nodes"] = serde_json::json!([
        { "Split": { "feature": 0, "threshold": 0.0, "left": 5, "right": 6 } }
    ]);
    std::fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();

    let err = store.load().await.unwrap_err();
    assert!(err.to_string().contains("frame_system artifact is corrupt"), "{err}");
    assert!(err.to_string().contains("invalid child 5"), "{err}");
}
