use containment_core::policy::DeferReason;
use containment_core::reconciler::{Outcome, Reconciler};
use containment_core::store::IntentStore;
use containment_core::types::IntentId;
use containment_operator::settings::OperatorSettings;
use containment_operator::{Controller, FileIntentStore, ManifestExecutor};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn demos() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

#[test]
fn test_demo_settings_load() {
    let settings = OperatorSettings::load(Some(demos().join("operator.toml").as_path())).unwrap();
    assert_eq!(settings.controller.workers, 4);
    assert_eq!(settings.reconciler.low_confidence_recheck_secs, None);
}

#[tokio::test]
async fn test_demo_intents_reconcile() {
    let intents = tempfile::tempdir().unwrap();
    let manifests = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(demos().join("intents")).unwrap() {
        let path = entry.unwrap().path();
        std::fs::copy(&path, intents.path().join(path.file_name().unwrap())).unwrap();
    }

    let settings = OperatorSettings::load(Some(demos().join("operator.toml").as_path())).unwrap();
    let store = Arc::new(FileIntentStore::open(intents.path()).unwrap());
    let scanned = store.scan().await.unwrap();
    assert!(scanned.iter().all(|(_, doc)| doc.is_ok()));

    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(ManifestExecutor::new(manifests.path())),
        settings.reconciler,
    );
    let controller = Controller::new(reconciler, settings.controller);
    let results = controller.run_once(store.list().await.unwrap(), 3).await;

    let outcomes: Vec<(String, Outcome)> = results
        .into_iter()
        .map(|r| (r.id.name, r.result.unwrap().outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("alert-7781".to_owned(), Outcome::Applied("evict_pod".into())),
            ("alert-7790".to_owned(), Outcome::Deferred(DeferReason::AwaitingApproval)),
            ("alert-7802".to_owned(), Outcome::Applied("blackhole_traffic_dryrun".into())),
            ("alert-7815".to_owned(), Outcome::Deferred(DeferReason::ConfidenceTooLow)),
        ]
    );
    assert!(manifests.path().join("eviction.prod.svc-42.json").is_file());

    let evicted = store
        .get(&IntentId::new("security", "alert-7781"))
        .await
        .unwrap()
        .unwrap();
    assert!(evicted.status.is_terminal());
}
