//! Probe pod spec builder
//!
//! Pure construction of the single-use pod definition: unique name, never
//! restarted, minimal privileges, fixed resource footprint. One lightweight
//! image serves every probe kind via different shell commands.

use k8s_openapi::api::core::v1::{
    Capabilities, Container, Pod, PodSpec, ResourceRequirements, SecurityContext,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Label identifying pods owned by the probe engine; the sweeper keys on it
pub const PROBE_LABEL: &str = "netdiag.io/probe";

/// Generate a collision-free pod name for one probe invocation
pub fn probe_pod_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("netdiag-probe-{}", &suffix[..8])
}

/// Create labels for a probe pod
pub fn probe_labels(kind: &str) -> BTreeMap<String, String> {
    [
        (
            "app.kubernetes.io/managed-by".to_string(),
            "netdiag".to_string(),
        ),
        (PROBE_LABEL.to_string(), "true".to_string()),
        ("netdiag.io/kind".to_string(), kind.to_string()),
    ]
    .into_iter()
    .collect()
}

/// Build the pod definition for a probe invocation
///
/// No cluster side effects; validation of namespace and command happens in
/// the manager before this is called.
pub fn build_probe_pod(name: &str, namespace: &str, image: &str, command: &[String], kind: &str) -> Pod {
    let labels = probe_labels(kind);

    let mut limits = BTreeMap::new();
    limits.insert("cpu".to_string(), Quantity("100m".to_string()));
    limits.insert("memory".to_string(), Quantity("64Mi".to_string()));
    let requests = limits.clone();

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            // Record the probe command for operator inspection
            annotations: Some(
                [("netdiag.io/command".to_string(), command.join(" "))]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "probe".to_string(),
                image: Some(image.to_string()),
                image_pull_policy: Some("IfNotPresent".to_string()),
                // Keep the container alive so the command can be exec'd into it
                command: Some(vec!["/bin/sh".to_string()]),
                args: Some(vec![
                    "-c".to_string(),
                    "trap 'exit 0' TERM; while true; do sleep 1; done".to_string(),
                ]),
                resources: Some(ResourceRequirements {
                    limits: Some(limits),
                    requests: Some(requests),
                    ..Default::default()
                }),
                security_context: Some(SecurityContext {
                    run_as_non_root: Some(true),
                    run_as_user: Some(65534),
                    allow_privilege_escalation: Some(false),
                    capabilities: Some(Capabilities {
                        drop: Some(vec!["ALL".to_string()]),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            restart_policy: Some("Never".to_string()),
            dns_policy: Some("ClusterFirst".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
