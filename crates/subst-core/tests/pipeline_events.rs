
use subst_core::{PipelineEventKind, PipelineStage, SubstitutionError, SubstitutionRequest};
use test_support::{FailingEngine, Fixture, RecordingEngine, USER};

#[tokio::test]
async fn successful_run_emits_every_stage_in_order() {
    let fx = Fixture::new();
    fx.publish_berlin_base("B1").await;
    fx.publish_berlin_overlay("O1").await;
    let mut engine = fx.engine(RecordingEngine::default());

    let req = SubstitutionRequest::new("B1", "O1", &[("BerlinMit.csv", "BerlinOhne.csv")]).unwrap();
    let out = engine.run("N1", USER, req).await.unwrap();
    let events = engine.events("N1");

    assert_eq!(events.len(), 2 + 2 * PipelineStage::ORDER.len());
    assert!(events.iter().enumerate().all(|(i, e)| e.seq == i as u64 && e.run_id == "N1"));
    assert!(matches!(&events[0].kind,
                     PipelineEventKind::PipelineInitialized { base_id, entry_count: 1, .. } if base_id == "B1"));

    for (i, stage) in PipelineStage::ORDER.iter().enumerate() {
        assert_eq!(events[1 + 2 * i].kind, PipelineEventKind::StageStarted { stage: *stage });
        assert_eq!(events[2 + 2 * i].kind, PipelineEventKind::StageFinished { stage: *stage });
    }
    match &events.last().unwrap().kind {
        PipelineEventKind::PipelineCompleted { fingerprint } => {
            assert_eq!(fingerprint, &out.fingerprint);
            assert_eq!(fingerprint.len(), 64);
        }
        other => panic!("unexpected last event {other:?}"),
    }
}

#[tokio::test]
async fn failure_stops_at_failing_stage_then_cleans_up() {
    let fx = Fixture::new();
    fx.publish_berlin_base("B1").await;
    fx.publish_berlin_overlay("O1").await;
    let mut engine = fx.engine(FailingEngine::Rejects);

    let req = SubstitutionRequest::new("B1", "O1", &[("BerlinMit.csv", "BerlinOhne.csv")]).unwrap();
    let err = engine.run("N1", USER, req).await.unwrap_err();
    assert!(matches!(err, SubstitutionError::ImageBuildFailed(_)));

    let kinds: Vec<PipelineEventKind> = engine.events("N1").into_iter().map(|e| e.kind).collect();
    let failed_at = kinds.iter()
                         .position(|k| matches!(k, PipelineEventKind::StageFailed { .. }))
                         .expect("StageFailed present");
    assert_eq!(kinds[failed_at - 1], PipelineEventKind::StageStarted { stage: PipelineStage::BuildImage });
    assert!(matches!(&kinds[failed_at],
                     PipelineEventKind::StageFailed { stage: PipelineStage::BuildImage, class: subst_core::ErrorClass::Operational, .. }));
    assert_eq!(kinds[failed_at + 1],
               PipelineEventKind::CleanupPerformed { removed_dir: true,
                                                     record_removed: true });
    assert_eq!(kinds.len(), failed_at + 2);
    assert!(!kinds.iter().any(|k| matches!(k, PipelineEventKind::PipelineCompleted { .. })));
}

#[tokio::test]
async fn fingerprint_depends_on_resolved_substitution() {
    let fx = Fixture::new();
    fx.publish_berlin_base("B1").await;
    fx.publish_berlin_overlay("O1").await;
    let mut engine = fx.engine(RecordingEngine::default());

    let plain = SubstitutionRequest::new("B1", "O1", &[("main.Rmd", "BerlinOhne.csv")]).unwrap();
    let renamed = SubstitutionRequest::new("B1", "O1", &[("main.Rmd", "main.Rmd")]).unwrap();
    let a = engine.run("N1", USER, plain).await.unwrap();
    let b = engine.run("N2", USER, renamed).await.unwrap();
    assert_ne!(a.fingerprint, b.fingerprint);
}
