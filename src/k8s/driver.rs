//! kube-backed pod driver for the probe engine

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams};
use tokio::io::AsyncRead;
use tokio::sync::RwLock;

use crate::k8s::{create_pod_with_retry, delete_pod_with_retry, K8sClient};
use crate::probe::{ExecStreams, PodDriver, ProbeError};

/// Drives probe pods through the shared, reconnecting kube client
pub struct KubePodDriver {
    k8s: Arc<RwLock<Option<K8sClient>>>,
}

impl KubePodDriver {
    pub fn new(k8s: Arc<RwLock<Option<K8sClient>>>) -> Self {
        Self { k8s }
    }

    async fn pods(&self, namespace: &str) -> Result<Api<Pod>, ProbeError> {
        let client = self.k8s.read().await.clone();
        match client {
            Some(client) => Ok(client.pods_in(namespace)),
            None => Err(ProbeError::Scheduling(
                "Kubernetes cluster not available".to_string(),
            )),
        }
    }
}

#[async_trait]
impl PodDriver for KubePodDriver {
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<(), ProbeError> {
        let pods = self.pods(namespace).await?;
        create_pod_with_retry(&pods, pod)
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Scheduling(e.to_string()))
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ProbeError> {
        let pods = self.pods(namespace).await?;
        pods.get(name)
            .await
            .map_err(|e| ProbeError::Scheduling(e.to_string()))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ProbeError> {
        let pods = self.pods(namespace).await?;
        delete_pod_with_retry(&pods, name)
            .await
            .map_err(|e| ProbeError::Cleanup(e.to_string()))
    }

    async fn exec(
        &self,
        namespace: &str,
        name: &str,
        command: &[String],
    ) -> Result<ExecStreams, ProbeError> {
        let pods = self.pods(namespace).await?;
        let ap = AttachParams {
            stdin: false,
            stdout: true,
            stderr: true,
            tty: false,
            ..Default::default()
        };

        let mut attached = pods
            .exec(name, command.to_vec(), &ap)
            .await
            .map_err(|e| ProbeError::ExecTransport(e.to_string()))?;

        let stdout = attached
            .stdout()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Send + Unpin>);
        let stderr = attached
            .stderr()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Send + Unpin>);

        // Exit status is deliberately ignored; join only tidies the channel
        tokio::spawn(async move {
            let _ = attached.join().await;
        });

        Ok(ExecStreams { stdout, stderr })
    }
}
