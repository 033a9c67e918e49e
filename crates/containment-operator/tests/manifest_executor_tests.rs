use containment_core::error::ExecutorErrorKind;
use containment_core::executor::ActionExecutor;
use containment_core::target::Target;
use containment_operator::ManifestExecutor;
use serde_json::{json, Value};

fn read(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_isolate_writes_network_policy() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ManifestExecutor::new(dir.path().join("out"));

    executor.isolate(&Target::new("prod", "svc-42")).await.unwrap();

    let doc = read(&dir.path().join("out/networkpolicy.prod.isolate-svc-42.json"));
    assert_eq!(doc["kind"], json!("NetworkPolicy"));
    assert_eq!(doc["metadata"]["namespace"], json!("prod"));
    assert_eq!(doc["spec"]["podSelector"]["matchLabels"]["app"], json!("svc-42"));
}

#[tokio::test]
async fn test_reisolation_is_terminal_already_exists() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ManifestExecutor::new(dir.path());
    let target = Target::new("prod", "svc-42");

    executor.isolate(&target).await.unwrap();
    let err = executor.isolate(&target).await.unwrap_err();

    assert_eq!(err.kind, ExecutorErrorKind::Terminal);
    assert_eq!(err.to_string(), "networkpolicy prod/isolate-svc-42 already exists");
}

#[tokio::test]
async fn test_blackhole_collision_and_eviction_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ManifestExecutor::new(dir.path());
    let target = Target::new("payments", "api");

    executor.blackhole(&target).await.unwrap();
    assert!(executor.blackhole(&target).await.unwrap_err().to_string().ends_with("already exists"));

    executor.evict(&target).await.unwrap();
    executor.evict(&target).await.unwrap();
    let doc = read(&dir.path().join("eviction.payments.api.json"));
    assert_eq!(doc["deleteOptions"]["gracePeriodSeconds"], json!(30));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unwritable_directory_is_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let executor = ManifestExecutor::new(blocker.join("out"));

    let err = executor.evict(&Target::new("prod", "svc-42")).await.unwrap_err();
    assert!(err.is_retryable());
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_create_leaves_nothing_and_retry_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    std::fs::write(&out, "").unwrap();
    let executor = ManifestExecutor::new(&out);
    let target = Target::new("prod", "svc-42");

    let err = executor.isolate(&target).await.unwrap_err();
    assert!(err.is_retryable());

    std::fs::remove_file(&out).unwrap();
    executor.isolate(&target).await.unwrap();

    let names: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["networkpolicy.prod.isolate-svc-42.json".to_owned()]);
}

#[tokio::test]
async fn test_stale_temp_file_does_not_block_create() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".manifest-stale"), "{\"partial\":").unwrap();
    let executor = ManifestExecutor::new(dir.path());

    executor.blackhole(&Target::new("payments", "api")).await.unwrap();

    let doc = read(&dir.path().join("virtualservice.payments.blackhole-api.json"));
    assert_eq!(doc["kind"], json!("VirtualService"));
}
