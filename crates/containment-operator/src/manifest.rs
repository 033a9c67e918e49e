//! Cluster manifests for containment actions

use containment_core::action::SuggestedAction;
use containment_core::executor::EVICTION_GRACE_PERIOD;
use containment_core::target::Target;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

/// HTTP status returned by a blackholed service
pub const BLACKHOLE_STATUS: u16 = 503;

/// A rendered Kubernetes object
///
/// Serializes as the bare document.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Object kind
    pub kind: &'static str,
    /// Object namespace
    pub namespace: String,
    /// Object name
    pub name: String,
    /// Full document
    pub body: Value,
}

impl Serialize for Manifest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

impl Manifest {
    fn new(kind: &'static str, target: &Target, name: String, body: Value) -> Self {
        Self {
            kind,
            namespace: target.namespace.clone(),
            name,
            body,
        }
    }

    /// File name unique per `(kind, namespace, name)`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.{}.json",
            self.kind.to_ascii_lowercase(),
            self.namespace,
            self.name
        )
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind.to_ascii_lowercase(), self.namespace, self.name)
    }
}

/// Deny-all ingress and egress policy for pods labelled `app=<workload>`
#[must_use]
pub fn network_policy(target: &Target) -> Manifest {
    let name = format!("isolate-{}", target.workload);
    let body = json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "NetworkPolicy",
        "metadata": {
            "name": name,
            "namespace": target.namespace,
            "labels": { "app.kubernetes.io/managed-by": "containment-operator" },
        },
        "spec": {
            "podSelector": { "matchLabels": { "app": target.workload } },
            "policyTypes": ["Ingress", "Egress"],
            "ingress": [],
            "egress": [],
        },
    });
    Manifest::new("NetworkPolicy", target, name, body)
}

/// Graceful eviction of the workload's pod
#[must_use]
pub fn eviction(target: &Target) -> Manifest {
    let body = json!({
        "apiVersion": "policy/v1",
        "kind": "Eviction",
        "metadata": {
            "name": target.workload,
            "namespace": target.namespace,
        },
        "deleteOptions": {
            "gracePeriodSeconds": EVICTION_GRACE_PERIOD.as_secs(),
        },
    });
    Manifest::new("Eviction", target, target.workload.clone(), body)
}

/// Mesh route that aborts every request to the workload's service
#[must_use]
pub fn blackhole_virtual_service(target: &Target) -> Manifest {
    let name = format!("blackhole-{}", target.workload);
    let host = format!("{}.{}.svc.cluster.local", target.workload, target.namespace);
    let body = json!({
        "apiVersion": "networking.istio.io/v1beta1",
        "kind": "VirtualService",
        "metadata": {
            "name": name,
            "namespace": target.namespace,
            "labels": { "app.kubernetes.io/managed-by": "containment-operator" },
        },
        "spec": {
            "hosts": [host],
            "http": [{
                "fault": {
                    "abort": {
                        "httpStatus": BLACKHOLE_STATUS,
                        "percentage": { "value": 100.0 },
                    },
                },
                "route": [{ "destination": { "host": host } }],
            }],
        },
    });
    Manifest::new("VirtualService", target, name, body)
}

/// Manifest an action produces for `target`
#[must_use]
pub fn render(action: SuggestedAction, target: &Target) -> Manifest {
    match action {
        SuggestedAction::IsolateNetwork => network_policy(target),
        SuggestedAction::EvictWorkload => eviction(target),
        SuggestedAction::BlackholeTraffic => blackhole_virtual_service(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn target() -> Target {
        Target::new("prod", "svc-42")
    }

    #[test]
    fn network_policy_denies_all() {
        let manifest = network_policy(&target());
        assert_eq!(manifest.name, "isolate-svc-42");
        assert_eq!(manifest.file_name(), "networkpolicy.prod.isolate-svc-42.json");
        assert_eq!(
            manifest.body["spec"],
            json!({
                "podSelector": { "matchLabels": { "app": "svc-42" } },
                "policyTypes": ["Ingress", "Egress"],
                "ingress": [],
                "egress": [],
            })
        );
    }

    #[test]
    fn eviction_has_grace_period() {
        let manifest = eviction(&target());
        assert_eq!(manifest.body["deleteOptions"]["gracePeriodSeconds"], json!(30));
        assert_eq!(manifest.body["metadata"]["namespace"], json!("prod"));
        assert_eq!(manifest.to_string(), "eviction prod/svc-42");
    }

    #[test]
    fn blackhole_aborts_service_host() {
        let manifest = blackhole_virtual_service(&target());
        assert_eq!(manifest.name, "blackhole-svc-42");
        assert_eq!(
            manifest.body["spec"]["hosts"],
            json!(["svc-42.prod.svc.cluster.local"])
        );
        assert_eq!(
            manifest.body["spec"]["http"][0]["fault"]["abort"]["httpStatus"],
            json!(503)
        );
    }

    #[test]
    fn serializes_as_plain_document() {
        let manifest = render(SuggestedAction::EvictWorkload, &target());
        let doc = serde_json::to_value(&manifest).unwrap();
        assert_eq!(doc, manifest.body);
    }
}
