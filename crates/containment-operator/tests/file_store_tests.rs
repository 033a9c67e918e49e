use containment_core::error::StoreError;
use containment_core::store::IntentStore;
use containment_core::types::{ContainmentStatus, IntentId, IntentState};
use containment_operator::file_store::{DocumentFormat, FileIntentStore};
use containment_test_utils::{fixed_time, IntentBuilder};
use pretty_assertions::assert_eq;

fn pending(result: &str) -> ContainmentStatus {
    ContainmentStatus {
        state: Some(IntentState::Pending),
        result: result.into(),
        last_update: Some(fixed_time()),
        ..ContainmentStatus::default()
    }
}

#[tokio::test]
async fn test_yaml_round_trip_preserves_spec() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileIntentStore::open(dir.path()).unwrap();
    let intent = IntentBuilder::new("alert-7781").build();

    let id = store.put(intent.clone(), DocumentFormat::Yaml).await.unwrap();
    assert!(dir.path().join("sec.alert-7781.yaml").is_file());

    let loaded = store.get(&id).await.unwrap().unwrap();
    assert_eq!(loaded.spec, intent.spec);
    assert_eq!(loaded.status, ContainmentStatus::default());
    assert_eq!(loaded.version(), 0);
}

#[tokio::test]
async fn test_status_write_bumps_version_and_keeps_format() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileIntentStore::open(dir.path()).unwrap();
    let id = store
        .put(IntentBuilder::new("a").build(), DocumentFormat::Json)
        .await
        .unwrap();

    let v1 = store.update_status(&id, 0, pending("awaiting_approval")).await.unwrap();
    let v2 = store.update_status(&id, v1, pending("awaiting_approval")).await.unwrap();
    assert_eq!((v1, v2), (1, 2));

    let raw = std::fs::read_to_string(dir.path().join("sec.a.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["metadata"]["resourceVersion"], serde_json::json!(2));
    assert_eq!(doc["status"]["result"], serde_json::json!("awaiting_approval"));
    assert_eq!(doc["spec"]["alertID"], serde_json::json!("prod/svc-42"));
    assert!(!dir.path().join("sec.a.yaml").exists());
}

#[tokio::test]
async fn test_stale_write_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileIntentStore::open(dir.path()).unwrap();
    let id = store
        .put(IntentBuilder::new("a").build(), DocumentFormat::Yaml)
        .await
        .unwrap();
    store.update_status(&id, 0, pending("awaiting_approval")).await.unwrap();

    let err = store
        .update_status(&id, 0, pending("confidence_too_low"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::Conflict {
            id: id.clone(),
            expected: 0,
            found: 1
        }
    );
    let status = store.get(&id).await.unwrap().unwrap().status;
    assert_eq!(status.result, "awaiting_approval");
}

#[tokio::test]
async fn test_put_over_existing_bumps_version() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileIntentStore::open(dir.path()).unwrap();
    let id = store
        .put(IntentBuilder::new("a").approval_token(None).build(), DocumentFormat::Yaml)
        .await
        .unwrap();
    store.put(IntentBuilder::new("a").build(), DocumentFormat::Json).await.unwrap();

    let loaded = store.get(&id).await.unwrap().unwrap();
    assert_eq!(loaded.version(), 1);
    assert!(loaded.spec.has_approval());
    assert!(!dir.path().join("sec.a.yaml").exists());
}

#[tokio::test]
async fn test_missing_intent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileIntentStore::open(dir.path()).unwrap();
    let id = IntentId::new("sec", "gone");

    assert_eq!(store.get(&id).await.unwrap(), None);
    assert_eq!(
        store.update_status(&id, 0, pending("x")).await,
        Err(StoreError::NotFound(id))
    );
}

#[tokio::test]
async fn test_list_and_scan() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileIntentStore::open(dir.path()).unwrap();
    store.put(IntentBuilder::new("b").build(), DocumentFormat::Yaml).await.unwrap();
    store.put(IntentBuilder::new("a").build(), DocumentFormat::Json).await.unwrap();
    std::fs::write(dir.path().join("sec.broken.yaml"), "spec: [").unwrap();
    std::fs::write(dir.path().join("README.md"), "# intents").unwrap();

    let ids = store.list().await.unwrap();
    assert_eq!(
        ids,
        vec![
            IntentId::new("sec", "a"),
            IntentId::new("sec", "b"),
            IntentId::new("sec", "broken"),
        ]
    );

    let scanned = store.scan().await.unwrap();
    assert_eq!(scanned.len(), 3);
    let broken: Vec<_> = scanned.iter().filter(|(_, doc)| doc.is_err()).collect();
    assert_eq!(broken.len(), 1);
    assert!(broken[0].0.ends_with("sec.broken.yaml"));
    assert!(matches!(broken[0].1, Err(StoreError::Codec(_))));
}

#[tokio::test]
async fn test_hand_written_document_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("security.alert-7781.yaml"),
        r"
metadata:
  name: alert-7781
  namespace: security
spec:
  alertID: prod/svc-42
  confidence: 0.92
  suggestedAction: isolate_pod
  dryRun: false
  explanation: beaconing to known C2
",
    )
    .unwrap();
    let store = FileIntentStore::open(dir.path()).unwrap();

    let intent = store
        .get(&IntentId::new("security", "alert-7781"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intent.spec.suggested_action.as_str(), "isolate_pod");
    assert!(!intent.spec.has_approval());
    assert_eq!(intent.status.state, None);
}
