//! Kubernetes client wrapper for NetDiag

use std::time::Duration;

use anyhow::Result;
use k8s_openapi::api::core::v1::{Endpoints, Pod, Service};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    Client, Config,
};
use tracing::{info, instrument, warn};

/// Attempts made for create/delete calls that hit a transient API error
const RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff between retries; doubles per attempt
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Wrapper around kube::Client with helper methods for NetDiag operations
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Create a new K8sClient using the default kubeconfig or in-cluster config
    #[instrument(skip_all)]
    pub async fn new() -> Result<Self> {
        let config = Config::infer().await?;
        let client = Client::try_from(config)?;

        info!("Connected to Kubernetes cluster");

        Ok(Self { client })
    }

    /// Get a typed API for pods in the given namespace
    pub fn pods_in(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Get a typed API for pods across all namespaces
    pub fn pods_all(&self) -> Api<Pod> {
        Api::all(self.client.clone())
    }

    /// Get a typed API for services in the given namespace
    pub fn services_in(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Get a typed API for endpoints in the given namespace
    pub fn endpoints_in(&self, namespace: &str) -> Api<Endpoints> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Get a typed API for network policies in the given namespace
    pub fn network_policies_in(&self, namespace: &str) -> Api<NetworkPolicy> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// List pods with a label selector, cluster-wide
    pub async fn list_pods_by_label(&self, label_selector: &str) -> Result<Vec<Pod>> {
        let pods = self.pods_all();
        let list = pods
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(list.items)
    }

    /// Check if cluster is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let version = self.client.apiserver_version().await?;
        info!(version = %version.git_version, "Kubernetes cluster is healthy");
        Ok(true)
    }
}

/// Whether a kube API error is worth retrying (rate limiting or server trouble)
pub fn is_transient(err: &kube::Error) -> bool {
    matches!(&err, kube::Error::Api(ae) if ae.code == 429 || ae.code >= 500)
}

/// Create a pod, retrying transient API errors with bounded backoff
#[instrument(skip_all, fields(pod_name = %pod.metadata.name.as_deref().unwrap_or("unknown")))]
pub async fn create_pod_with_retry(pods: &Api<Pod>, pod: &Pod) -> Result<Pod, kube::Error> {
    let mut backoff = RETRY_BACKOFF;
    let mut attempt = 1;
    loop {
        match pods.create(&PostParams::default(), pod).await {
            Ok(created) => {
                info!("Created pod");
                return Ok(created);
            }
            Err(e) if is_transient(&e) && attempt < RETRY_ATTEMPTS => {
                warn!(attempt, error = %e, "Transient error creating pod, retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Delete a pod with zero grace period, retrying transient API errors
#[instrument(skip(pods))]
pub async fn delete_pod_with_retry(pods: &Api<Pod>, name: &str) -> Result<(), kube::Error> {
    let dp = DeleteParams {
        grace_period_seconds: Some(0),
        ..Default::default()
    };

    let mut backoff = RETRY_BACKOFF;
    let mut attempt = 1;
    loop {
        match pods.delete(name, &dp).await {
            Ok(_) => {
                info!(name, "Deleted pod");
                return Ok(());
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                warn!(name, "Pod not found (already deleted?)");
                return Ok(());
            }
            Err(e) if is_transient(&e) && attempt < RETRY_ATTEMPTS => {
                warn!(attempt, error = %e, "Transient error deleting pod, retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
