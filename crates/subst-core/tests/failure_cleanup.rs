
use std::fs;

use serde_json::json;
use subst_core::{ErrorClass, PackageStore, PipelineEventKind, SubstitutionDraft, SubstitutionEngine, SubstitutionError,
                 SubstitutionRequest};
use test_support::{BrokenLookupStore, DirectoryHijackingEngine, FailingEngine, FailingStore, Fixture, RecordingEngine, USER};

fn berlin_request() -> SubstitutionRequest {
    SubstitutionRequest::new("B1", "O1", &[("BerlinMit.csv", "BerlinOhne.csv")]).unwrap()
}

async fn berlin_fixture() -> Fixture {
    let fx = Fixture::new();
    fx.publish_berlin_base("B1").await;
    fx.publish_berlin_overlay("O1").await;
    fx
}

fn cleanup_event(events: &[subst_core::PipelineEvent]) -> Option<(bool, bool)> {
    events.iter().find_map(|e| match e.kind {
                     PipelineEventKind::CleanupPerformed { removed_dir, record_removed } => {
                         Some((removed_dir, record_removed))
                     }
                     _ => None,
                 })
}

#[tokio::test]
async fn unknown_base_fails_before_touching_filesystem() {
    let fx = Fixture::new();
    fx.publish_berlin_overlay("O1").await;
    let mut engine = fx.engine(RecordingEngine::default());

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(&err, SubstitutionError::InvalidBase { id } if id == "B1"));
    assert_eq!(err.to_string(), "base ID is invalid");
    assert_eq!(err.status_code(), 400);
    assert!(!fx.package_dir("N1").exists());
    assert!(cleanup_event(&engine.events("N1")).is_none());
}

#[tokio::test]
async fn unknown_overlay_is_rejected() {
    let fx = Fixture::new();
    fx.publish_berlin_base("B1").await;
    let mut engine = fx.engine(RecordingEngine::default());

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::InvalidOverlay { .. }));
    assert_eq!(err.to_string(), "overlay ID is invalid");
    assert!(!fx.package_dir("N1").exists());
}

#[tokio::test]
async fn store_lookup_errors_count_as_not_found() {
    let fx = Fixture::new();
    let mut engine = SubstitutionEngine::new(fx.config(), BrokenLookupStore, RecordingEngine::default());
    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::InvalidBase { .. }));
}

#[tokio::test]
async fn empty_substitution_files_fail_before_any_directory() {
    let fx = berlin_fixture().await;
    let mut engine = fx.engine(RecordingEngine::default());

    let draft = SubstitutionDraft::new("B1", "O1", vec![]);
    let err = engine.substitute(draft, USER, Some("N1".into())).await.unwrap_err();
    assert_eq!(err.to_string(), "substitution files missing");
    assert_eq!(err.status_code(), 400);
    assert!(!fx.package_dir("N1").exists());
    assert!(engine.events("N1").is_empty());

    let absent: SubstitutionDraft = serde_json::from_value(json!({ "base": "B1", "overlay": "O1" })).unwrap();
    let err = engine.substitute(absent, USER, Some("N1".into())).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::SubstitutionFilesMissing));
}

#[tokio::test]
async fn missing_base_file_removes_directory_and_copies_nothing() {
    let fx = berlin_fixture().await;
    let recorder = RecordingEngine::default();
    let mut engine = fx.engine(recorder.clone());

    let req = SubstitutionRequest::new("B1", "O1", &[("NotThere.csv", "BerlinOhne.csv")]).unwrap();
    let err = engine.run("N1", USER, req).await.unwrap_err();
    assert!(err.to_string().starts_with("base file does not exist"));
    assert_eq!(err.class(), ErrorClass::UserInput);
    assert!(!fx.package_dir("N1").exists());
    assert!(recorder.builds().is_empty());
    assert!(fx.store.find_by_id("N1").await.unwrap().is_none());
    assert_eq!(cleanup_event(&engine.events("N1")), Some((true, false)));
}

#[tokio::test]
async fn missing_overlay_file_is_reported_with_normalized_path() {
    let fx = berlin_fixture().await;
    let mut engine = fx.engine(RecordingEngine::default());

    let req = SubstitutionRequest::new("B1", "O1", &[("BerlinMit.csv", "/Missing.csv")]).unwrap();
    let err = engine.run("N1", USER, req).await.unwrap_err();
    assert!(matches!(&err, SubstitutionError::OverlayFileNotFound { path } if path == "Missing.csv"));
    assert_eq!(err.status_code(), 400);
    assert!(!fx.package_dir("N1").exists());
}

#[tokio::test]
async fn rejected_build_undoes_directory_and_record() {
    let fx = berlin_fixture().await;
    let mut engine = fx.engine(FailingEngine::Rejects);

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::ImageBuildFailed(_)));
    assert_eq!(err.status_code(), 400);
    assert!(!fx.package_dir("N1").exists());
    assert!(fx.store.find_by_id("N1").await.unwrap().is_none());
    assert_eq!(cleanup_event(&engine.events("N1")), Some((true, true)));
}

#[tokio::test]
async fn unavailable_engine_is_a_server_error() {
    let fx = berlin_fixture().await;
    let mut engine = fx.engine(FailingEngine::Unavailable);

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unavailable);
    assert_eq!(err.status_code(), 500);
    assert!(!fx.package_dir("N1").exists());
}

#[tokio::test]
async fn base_without_dockerfile_fails_the_build() {
    let fx = Fixture::new();
    fx.publish("B1", &[("erc.yml", "id: b\n"), ("BerlinMit.csv", "x")], json!({})).await;
    fx.publish_berlin_overlay("O1").await;
    let mut engine = fx.engine(RecordingEngine::default());

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::ImageBuildFailed(subst_core::EngineError::MissingContextFile(_))));
    assert!(!fx.package_dir("N1").exists());
}

#[tokio::test]
async fn failed_save_is_internal_and_leaves_nothing_behind() {
    let fx = berlin_fixture().await;
    let store = FailingStore { inner: fx.store.clone() };
    let recorder = RecordingEngine::default();
    let mut engine = SubstitutionEngine::new(fx.config(), store, recorder.clone());

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::PersistenceFailed(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.to_string(), "internal error: store unavailable: connection refused");
    assert!(!fx.package_dir("N1").exists());
    assert!(recorder.builds().is_empty());
    assert_eq!(cleanup_event(&engine.events("N1")), Some((true, false)));
}

#[tokio::test]
async fn missing_manifest_fails_rewrite() {
    let fx = Fixture::new();
    fx.publish("B1", &[("Dockerfile", "FROM x\n"), ("BerlinMit.csv", "x")], json!({})).await;
    fx.publish_berlin_overlay("O1").await;
    let mut engine = fx.engine(RecordingEngine::default());

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::ManifestWriteFailed { .. }));
    assert_eq!(err.status_code(), 400);
    assert!(!fx.package_dir("N1").exists());
    assert!(fx.store.find_by_id("N1").await.unwrap().is_none());
}

#[tokio::test]
async fn existing_package_directory_is_never_removed() {
    let fx = berlin_fixture().await;
    let keep = fx.data_dir("N1").join("keep.txt");
    fs::create_dir_all(keep.parent().unwrap()).unwrap();
    fs::write(&keep, "published").unwrap();
    let mut engine = fx.engine(RecordingEngine::default());

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::DirectoryCreateFailed { .. }));
    assert_eq!(fs::read_to_string(&keep).unwrap(), "published");
    assert_eq!(cleanup_event(&engine.events("N1")), Some((false, false)));
}

#[tokio::test]
async fn duplicate_identifier_keeps_existing_record() {
    let fx = berlin_fixture().await;
    fx.store
      .insert(subst_core::PackageRecord { id: "N1".into(),
                                          owner: "someone".into(),
                                          metadata: json!({ "title": "existing" }) })
      .await;
    let mut engine = fx.engine(RecordingEngine::default());

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::PersistenceFailed(subst_core::StoreError::Conflict(_))));
    let kept = fx.store.find_by_id("N1").await.unwrap().unwrap();
    assert_eq!(kept.owner, "someone");
    assert!(!fx.package_dir("N1").exists());
}

#[tokio::test]
async fn identifiers_must_be_single_path_segments() {
    let fx = berlin_fixture().await;
    let mut engine = fx.engine(RecordingEngine::default());
    let err = engine.run("../escape", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::PathEscapesPackage { .. }));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn container_run_failures_are_reported_separately() {
    let fx = berlin_fixture().await;
    let mut engine = fx.engine(RecordingEngine::default());
    let out = engine.run("N1", USER, berlin_request()).await.unwrap();

    let failing = SubstitutionEngine::new(fx.config(), fx.store.clone(), FailingEngine::Unavailable);
    let err = failing.run_substituted(&out).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::ContainerRunFailed(_)));
    assert_eq!(err.status_code(), 500);
    // El paquete sustituido no se toca
    assert!(fx.package_dir("N1").exists());
}

#[tokio::test]
async fn cleanup_failure_is_logged_and_original_error_returned() {
    let fx = berlin_fixture().await;
    let mut engine = fx.engine(DirectoryHijackingEngine);

    let err = engine.run("N1", USER, berlin_request()).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::ImageBuildFailed(subst_core::EngineError::BuildRejected { .. })));
    assert_eq!(err.status_code(), 400);
    // El directorio no se pudo borrar; el registro sí
    assert!(fx.package_dir("N1").is_file());
    assert!(fx.store.find_by_id("N1").await.unwrap().is_none());
    assert_eq!(cleanup_event(&engine.events("N1")), Some((false, true)));
}
