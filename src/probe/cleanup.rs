//! Cleanup guarantor
//!
//! Deletes probe pods on every exit path of the orchestration, and runs an
//! independent background sweep that removes any probe-labeled pod older
//! than a safety threshold, so a crash between creation and cleanup cannot
//! leak a pod forever.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::k8s::{delete_pod_with_retry, K8sClient};
use crate::probe::driver::PodDriver;
use crate::probe::spec::PROBE_LABEL;
use crate::probe::types::ProbeError;

/// How often the background sweep runs
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Probe pods older than this are assumed orphaned; comfortably above the
/// probe deadline ceiling
const SWEEP_MAX_AGE_SECONDS: i64 = 120;

/// Issue the pod deletion request with zero grace period
///
/// A missing pod counts as released. Failures are reported so the caller can
/// log them, but they never alter a probe's outcome.
pub async fn release(
    driver: &dyn PodDriver,
    namespace: &str,
    name: &str,
) -> Result<(), ProbeError> {
    driver.delete_pod(namespace, name).await
}

/// Periodically delete orphaned probe pods cluster-wide
///
/// Secondary guarantee only; the per-request release path is the primary one.
pub async fn start_probe_sweeper(k8s: Arc<RwLock<Option<K8sClient>>>) {
    info!("Starting probe pod sweeper");

    loop {
        tokio::time::sleep(SWEEP_INTERVAL).await;

        let client = k8s.read().await.clone();
        let Some(client) = client else {
            continue;
        };

        let selector = format!("{}=true", PROBE_LABEL);
        let pods = match client.list_pods_by_label(&selector).await {
            Ok(pods) => pods,
            Err(e) => {
                warn!(error = %e, "Probe sweep failed to list pods");
                continue;
            }
        };

        for pod in pods {
            let Some(name) = pod.metadata.name.clone() else {
                continue;
            };
            let Some(namespace) = pod.metadata.namespace.clone() else {
                continue;
            };
            let Some(created) = pod.metadata.creation_timestamp.as_ref() else {
                continue;
            };

            let age = Utc::now().signed_duration_since(created.0);
            if age.num_seconds() < SWEEP_MAX_AGE_SECONDS {
                continue;
            }

            warn!(
                name = %name,
                namespace = %namespace,
                age_seconds = age.num_seconds(),
                "Sweeping orphaned probe pod"
            );

            let api = client.pods_in(&namespace);
            match delete_pod_with_retry(&api, &name).await {
                Ok(()) => {
                    metrics::counter!("netdiag_probe_pods_swept_total", 1);
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "Failed to sweep probe pod");
                }
            }
        }
    }
}
