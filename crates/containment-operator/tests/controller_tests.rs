use containment_core::action::SuggestedAction;
use containment_core::config::ReconcilerConfig;
use containment_core::policy::DeferReason;
use containment_core::reconciler::{Outcome, Reconciler};
use containment_core::store::IntentStore;
use containment_core::types::{IntentId, IntentState};
use containment_operator::file_store::DocumentFormat;
use containment_operator::settings::ControllerSettings;
use containment_operator::{Controller, FileIntentStore, ManifestExecutor, Watcher};
use containment_test_utils::IntentBuilder;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    _dirs: (TempDir, TempDir),
    manifests: std::path::PathBuf,
    store: Arc<FileIntentStore>,
    controller: Controller,
}

fn harness() -> Harness {
    let intents = tempfile::tempdir().unwrap();
    let manifests = tempfile::tempdir().unwrap();
    let store = Arc::new(FileIntentStore::open(intents.path()).unwrap());
    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(ManifestExecutor::new(manifests.path())),
        ReconcilerConfig::default(),
    );
    let controller = Controller::new(
        reconciler,
        ControllerSettings {
            workers: 2,
            ..ControllerSettings::default()
        },
    );
    Harness {
        manifests: manifests.path().to_path_buf(),
        _dirs: (intents, manifests),
        store,
        controller,
    }
}

#[tokio::test]
async fn test_run_once_reconciles_every_intent() {
    let h = harness();
    let isolate = h
        .store
        .put(
            IntentBuilder::new("isolate")
                .action(SuggestedAction::IsolateNetwork)
                .build(),
            DocumentFormat::Yaml,
        )
        .await
        .unwrap();
    let unapproved = h
        .store
        .put(IntentBuilder::new("unapproved").approval_token(None).build(), DocumentFormat::Yaml)
        .await
        .unwrap();
    let simulated = h
        .store
        .put(
            IntentBuilder::new("simulated")
                .action(SuggestedAction::BlackholeTraffic)
                .dry_run(true)
                .approval_token(None)
                .build(),
            DocumentFormat::Json,
        )
        .await
        .unwrap();

    let ids = h.store.list().await.unwrap();
    let results = h.controller.run_once(ids, 3).await;
    let outcomes: Vec<(IntentId, Outcome)> = results
        .into_iter()
        .map(|r| (r.id, r.result.unwrap().outcome))
        .collect();

    assert_eq!(
        outcomes,
        vec![
            (isolate.clone(), Outcome::Applied("isolate_pod".into())),
            (simulated.clone(), Outcome::Applied("blackhole_traffic_dryrun".into())),
            (unapproved.clone(), Outcome::Deferred(DeferReason::AwaitingApproval)),
        ]
    );

    assert!(h.manifests.join("networkpolicy.prod.isolate-svc-42.json").is_file());
    assert!(!h.manifests.join("virtualservice.prod.blackhole-svc-42.json").exists());

    let status = h.store.get(&isolate).await.unwrap().unwrap().status;
    assert_eq!(status.state, Some(IntentState::Applied));
    assert_eq!(status.applied_action, "isolate_pod");
    assert!(status.last_update.is_some());
}

#[tokio::test]
async fn test_second_isolation_of_same_workload_fails() {
    let h = harness();
    for name in ["first", "second"] {
        h.store
            .put(
                IntentBuilder::new(name)
                    .action(SuggestedAction::IsolateNetwork)
                    .build(),
                DocumentFormat::Yaml,
            )
            .await
            .unwrap();
    }

    let ids = h.store.list().await.unwrap();
    h.controller.run_once(ids, 3).await;

    let second = h
        .store
        .get(&IntentId::new("sec", "second"))
        .await
        .unwrap()
        .unwrap()
        .status;
    assert_eq!(second.state, Some(IntentState::Failed));
    assert_eq!(
        second.result,
        "error: networkpolicy prod/isolate-svc-42 already exists"
    );
}

#[tokio::test]
async fn test_run_processes_queue_until_shutdown() {
    let h = harness();
    let id = h
        .store
        .put(IntentBuilder::new("live").build(), DocumentFormat::Yaml)
        .await
        .unwrap();
    h.controller.queue().add(id.clone());

    let store = h.store.clone();
    let watched = id.clone();
    let shutdown = async move {
        loop {
            let applied = store
                .get(&watched)
                .await
                .ok()
                .flatten()
                .is_some_and(|intent| intent.status.is_terminal());
            if applied {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(10), h.controller.run(shutdown))
        .await
        .expect("controller stops after shutdown");

    let status = h.store.get(&id).await.unwrap().unwrap().status;
    assert_eq!(status.applied_action, "evict_pod");
    assert!(h.manifests.join("eviction.prod.svc-42.json").is_file());
    assert!(h.controller.queue().is_shutting_down());
}

#[tokio::test]
async fn test_watcher_enqueues_new_and_changed_specs_only() {
    let h = harness();
    let queue = h.controller.queue();
    let mut watcher = Watcher::new(h.store.clone(), queue.clone(), Duration::from_secs(2));

    let id = h
        .store
        .put(IntentBuilder::new("a").approval_token(None).build(), DocumentFormat::Yaml)
        .await
        .unwrap();
    assert_eq!(watcher.poll_once().await.unwrap(), 1);
    assert_eq!(watcher.poll_once().await.unwrap(), 0);

    // Status-only writes are not spec changes
    let ids = vec![id.clone()];
    h.controller.run_once(ids, 1).await;
    assert_eq!(watcher.poll_once().await.unwrap(), 0);

    // Granting approval is
    h.store
        .put(
            IntentBuilder::new("a").approval_token(Some("tok-1")).build(),
            DocumentFormat::Yaml,
        )
        .await
        .unwrap();
    assert_eq!(watcher.poll_once().await.unwrap(), 1);
    assert_eq!(queue.len(), 1);
}
