pub mod cluster;
pub mod diagnostic;
pub mod health;
pub mod metrics;
pub mod openapi;
pub mod response;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::k8s::K8sClient;
use crate::probe::ProbeManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub k8s: Arc<RwLock<Option<K8sClient>>>,
    pub probes: Arc<ProbeManager>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let k8s: Arc<RwLock<Option<K8sClient>>> = Arc::new(RwLock::new(None));
        let probes = Arc::new(ProbeManager::new(k8s.clone(), &config));
        Self {
            config,
            k8s,
            probes,
            metrics: None,
        }
    }

    pub async fn set_k8s(&self, k8s: K8sClient) {
        let mut guard = self.k8s.write().await;
        *guard = Some(k8s);
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
