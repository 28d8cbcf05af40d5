//! Probe manager facade
//!
//! Single entry point for running a probe: validate the request, build the
//! pod spec, create the pod, wait for readiness, exec the command, and
//! release the pod. The deadline is the minimum of the caller's timeout and
//! the configured ceiling. A fixed-size semaphore bounds how many probes may
//! be between pod creation and cleanup at once, cluster-wide.
//!
//! Only a malformed request is an error to the caller; every lifecycle,
//! exec, or transport problem is folded into a `ProbeResult` so a
//! well-formed request always gets a structured answer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, Semaphore};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::k8s::{K8sClient, KubePodDriver};
use crate::probe::cleanup;
use crate::probe::driver::PodDriver;
use crate::probe::exec;
use crate::probe::lifecycle;
use crate::probe::spec::{build_probe_pod, probe_pod_name};
use crate::probe::types::{ProbeError, ProbePhase, ProbeRequest, ProbeResult};

pub struct ProbeManager {
    driver: Arc<dyn PodDriver>,
    gate: Arc<Semaphore>,
    image: String,
    timeout_ceiling: Duration,
    output_limit: usize,
}

impl ProbeManager {
    pub fn new(k8s: Arc<RwLock<Option<K8sClient>>>, config: &Config) -> Self {
        Self::with_driver(Arc::new(KubePodDriver::new(k8s)), config)
    }

    /// Build a manager over an arbitrary pod surface
    pub fn with_driver(driver: Arc<dyn PodDriver>, config: &Config) -> Self {
        Self {
            driver,
            gate: Arc::new(Semaphore::new(config.max_concurrent_probes.max(1))),
            image: config.probe_image.clone(),
            timeout_ceiling: Duration::from_secs(config.max_timeout_seconds.max(1)),
            output_limit: config.output_limit_bytes,
        }
    }

    /// Run a probe to completion
    ///
    /// Fails only for a malformed request; see module docs.
    pub async fn execute(&self, request: ProbeRequest) -> Result<ProbeResult, ProbeError> {
        self.execute_cancellable(request, CancellationToken::new())
            .await
    }

    /// Run a probe, aborting early (with cleanup) when `cancel` fires
    pub async fn execute_cancellable(
        &self,
        request: ProbeRequest,
        cancel: CancellationToken,
    ) -> Result<ProbeResult, ProbeError> {
        validate(&request)?;

        let kind = request.kind.as_str();
        let started = Instant::now();
        let deadline = started + self.deadline_for(request.timeout_seconds);

        metrics::counter!("netdiag_probes_total", 1, "kind" => kind);

        let outcome = self.run(&request, deadline, &cancel).await;

        let duration = started.elapsed();
        metrics::histogram!("netdiag_probe_duration_seconds", duration.as_secs_f64());

        let result = match outcome {
            Ok(output) => {
                info!(kind, duration_ms = duration.as_millis() as u64, "Probe completed");
                ProbeResult {
                    success: true,
                    output,
                    error: String::new(),
                    duration_ms: duration.as_millis() as u64,
                }
            }
            Err(e) => {
                warn!(kind, error = %e, "Probe failed");
                metrics::counter!("netdiag_probe_failures_total", 1, "kind" => kind);
                ProbeResult {
                    success: false,
                    output: String::new(),
                    error: e.to_string(),
                    duration_ms: duration.as_millis() as u64,
                }
            }
        };

        debug!(kind, phase = ProbePhase::Terminal.as_str(), "Probe state");
        Ok(result)
    }

    /// Deadline for one probe: caller's timeout clamped to the ceiling
    fn deadline_for(&self, timeout_seconds: Option<u64>) -> Duration {
        match timeout_seconds {
            Some(secs) => Duration::from_secs(secs).min(self.timeout_ceiling),
            None => self.timeout_ceiling,
        }
    }

    /// The strictly ordered orchestration: gate → create → ready → exec → release
    async fn run(
        &self,
        request: &ProbeRequest,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<String, ProbeError> {
        // A request may spend its whole deadline queued for a permit
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProbeError::Canceled),
            _ = sleep_until(deadline) => return Err(ProbeError::SchedulingTimeout),
            permit = self.gate.clone().acquire_owned() => {
                permit.map_err(|_| ProbeError::Scheduling("probe gate closed".to_string()))?
            }
        };

        let namespace = request.namespace.as_str();
        let name = probe_pod_name();
        let pod = build_probe_pod(
            &name,
            namespace,
            &self.image,
            &request.command,
            request.kind.as_str(),
        );

        debug!(name = %name, phase = ProbePhase::Created.as_str(), "Probe state");
        self.driver.create_pod(namespace, &pod).await?;
        debug!(name = %name, phase = ProbePhase::Scheduled.as_str(), "Probe state");

        // From here the pod exists: release must be issued on every path out
        let outcome = async {
            lifecycle::wait_ready(self.driver.as_ref(), namespace, &name, deadline, cancel)
                .await?;
            debug!(name = %name, phase = ProbePhase::Ready.as_str(), "Probe state");

            debug!(name = %name, phase = ProbePhase::Executing.as_str(), "Probe state");
            let output = exec::exec_command(
                self.driver.as_ref(),
                namespace,
                &name,
                &request.command,
                deadline,
                self.output_limit,
                cancel,
            )
            .await?;
            debug!(name = %name, phase = ProbePhase::Completed.as_str(), "Probe state");

            Ok(output)
        }
        .await;

        debug!(name = %name, phase = ProbePhase::CleanupIssued.as_str(), "Probe state");
        if let Err(e) = cleanup::release(self.driver.as_ref(), namespace, &name).await {
            // Deletion failure never changes the probe's reported outcome
            warn!(name = %name, error = %e, "Probe pod cleanup failed");
        }

        outcome
    }
}

/// Reject malformed requests before any cluster action
fn validate(request: &ProbeRequest) -> Result<(), ProbeError> {
    if request.namespace.trim().is_empty() {
        return Err(ProbeError::Validation("namespace must not be empty".to_string()));
    }
    if request.command.is_empty() {
        return Err(ProbeError::Validation("command must not be empty".to_string()));
    }
    if request.command.iter().any(|arg| arg.is_empty()) {
        return Err(ProbeError::Validation(
            "command arguments must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::types::ProbeKind;

    fn manager() -> ProbeManager {
        let k8s = Arc::new(RwLock::new(None));
        ProbeManager::new(k8s, &Config::default())
    }

    fn request(namespace: &str, command: Vec<&str>) -> ProbeRequest {
        ProbeRequest {
            kind: ProbeKind::Connectivity,
            namespace: namespace.to_string(),
            command: command.into_iter().map(String::from).collect(),
            timeout_seconds: None,
        }
    }

    #[test]
    fn test_deadline_clamped_to_ceiling() {
        let m = manager();
        assert_eq!(m.deadline_for(Some(100)), Duration::from_secs(30));
        assert_eq!(m.deadline_for(Some(5)), Duration::from_secs(5));
        assert_eq!(m.deadline_for(None), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        assert!(validate(&request("", vec!["sh"])).is_err());
        assert!(validate(&request("default", vec![])).is_err());
        assert!(validate(&request("default", vec!["sh", ""])).is_err());
        assert!(validate(&request("default", vec!["sh", "-c", "true"])).is_ok());
    }

    #[tokio::test]
    async fn test_malformed_request_is_rejected_synchronously() {
        let m = manager();
        let err = m.execute(request("default", vec![])).await.unwrap_err();
        assert!(matches!(err, ProbeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_well_formed_request_yields_result_without_cluster() {
        let m = manager();
        let result = m
            .execute(request("default", vec!["sh", "-c", "true"]))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.contains("not available"));
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_yields_canceled_result() {
        let m = manager();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = m
            .execute_cancellable(request("default", vec!["sh", "-c", "true"]), cancel)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.contains("canceled"));
        assert!(result.output.is_empty());
    }
}
