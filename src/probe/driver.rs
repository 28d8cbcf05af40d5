//! Cluster surface the probe engine drives
//!
//! The engine only ever needs four pod operations; putting them behind a
//! trait keeps the orchestration (ordering, deadline, cleanup) testable
//! without an apiserver. The kube-backed implementation lives in
//! `crate::k8s`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use tokio::io::AsyncRead;

use crate::probe::types::ProbeError;

/// Output channels of a command started inside a pod
///
/// A `None` stream was simply not opened. Both streams reach EOF when the
/// in-pod process exits.
pub struct ExecStreams {
    pub stdout: Option<Box<dyn AsyncRead + Send + Unpin>>,
    pub stderr: Option<Box<dyn AsyncRead + Send + Unpin>>,
}

/// Pod operations a single probe performs against the cluster
#[async_trait]
pub trait PodDriver: Send + Sync {
    /// Create the probe pod; admission rejection is terminal
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<(), ProbeError>;

    /// Fetch the pod's current state
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ProbeError>;

    /// Delete the pod; a missing pod counts as deleted
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ProbeError>;

    /// Start `command` in the pod's container and hand back its streams
    async fn exec(
        &self,
        namespace: &str,
        name: &str,
        command: &[String],
    ) -> Result<ExecStreams, ProbeError>;
}
