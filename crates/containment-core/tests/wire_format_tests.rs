use containment_core::action::{ActionRequest, SuggestedAction};
use containment_core::types::{ContainmentIntent, IntentState, API_VERSION, KIND};
use pretty_assertions::assert_eq;

const YAML: &str = r"
apiVersion: containment.security.io/v1alpha1
kind: Containment
metadata:
  name: alert-7781
  namespace: security
  resourceVersion: 12
spec:
  alertID: prod/svc-42
  confidence: 0.93
  suggestedAction: IsolateNetwork
  dryRun: true
  explanation: outbound beaconing every 60s
status:
  state: applied
  appliedAction: isolate_pod_dryrun
  result: isolate_pod_dryrun
  lastUpdate: 2026-10-16T12:00:00Z
";

#[test]
fn test_yaml_document_parses() {
    let intent: ContainmentIntent = serde_yaml::from_str(YAML).unwrap();
    assert_eq!(intent.api_version, API_VERSION);
    assert_eq!(intent.kind, KIND);
    assert_eq!(intent.version(), 12);
    assert_eq!(
        intent.spec.suggested_action,
        ActionRequest::Known(SuggestedAction::IsolateNetwork)
    );
    assert!(intent.spec.dry_run);
    assert_eq!(intent.status.state, Some(IntentState::Applied));
    assert!(intent.status.is_terminal());
}

#[test]
fn test_alias_is_written_back_as_wire_name() {
    let intent: ContainmentIntent = serde_yaml::from_str(YAML).unwrap();
    let doc = serde_yaml::to_string(&intent).unwrap();
    assert!(doc.contains("suggestedAction: isolate_pod"));
    assert!(doc.contains("alertID: prod/svc-42"));
}

#[test]
fn test_unknown_action_is_preserved_verbatim() {
    let intent: ContainmentIntent =
        serde_yaml::from_str(&YAML.replace("IsolateNetwork", "reboot_node")).unwrap();
    assert_eq!(
        intent.spec.suggested_action,
        ActionRequest::Unrecognized("reboot_node".into())
    );

    let doc = serde_yaml::to_string(&intent).unwrap();
    assert!(doc.contains("suggestedAction: reboot_node"));
}

#[test]
fn test_schema_describes_wire_names() {
    let schema = serde_json::to_value(schemars::schema_for!(ContainmentIntent)).unwrap();
    let text = schema.to_string();
    assert!(text.contains("\"alertID\""));
    assert!(text.contains("\"suggestedAction\""));
    assert!(text.contains("\"isolate_pod\""));
}
