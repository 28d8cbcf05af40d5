//! Probe pod lifecycle
//!
//! Readiness observation for a single probe pod, bounded by the request
//! deadline and the caller's cancellation signal. Readiness is observed by
//! polling; the interval is short enough that scheduling latency dominates.

use k8s_openapi::api::core::v1::Pod;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::probe::driver::PodDriver;
use crate::probe::types::ProbeError;

/// Poll interval while waiting for the pod to become executable
const READY_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);

/// Container waiting reasons that will never resolve on their own
const TERMINAL_WAITING_REASONS: &[&str] = &[
    "ErrImagePull",
    "ImagePullBackOff",
    "InvalidImageName",
    "CreateContainerConfigError",
    "CrashLoopBackOff",
];

/// Wait until the pod's container is running and ready, or fail
///
/// Returns `SchedulingTimeout` at the deadline and `Canceled` as soon as the
/// cancellation signal fires; neither path panics or bypasses the caller's
/// cleanup.
pub async fn wait_ready(
    driver: &dyn PodDriver,
    namespace: &str,
    name: &str,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<(), ProbeError> {
    loop {
        // The status fetch itself can stall on a bad API connection, so it
        // gets no more latitude than the sleeps between polls
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProbeError::Canceled),
            _ = sleep_until(deadline) => return Err(ProbeError::SchedulingTimeout),
            fetched = driver.get_pod(namespace, name) => fetched,
        };

        match fetched {
            Ok(pod) => {
                if let Some(reason) = terminal_failure(&pod) {
                    return Err(ProbeError::Scheduling(reason));
                }
                if is_ready(&pod) {
                    debug!(name, "Probe pod is ready");
                    return Ok(());
                }
            }
            Err(e) => {
                // Transient API trouble; keep polling until the deadline decides
                warn!(name, error = %e, "Failed to fetch probe pod status");
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProbeError::Canceled),
            _ = sleep_until(deadline) => return Err(ProbeError::SchedulingTimeout),
            _ = sleep(READY_POLL_INTERVAL) => {}
        }
    }
}

/// Whether the pod is running with every container ready
fn is_ready(pod: &Pod) -> bool {
    let Some(status) = &pod.status else {
        return false;
    };
    if status.phase.as_deref() != Some("Running") {
        return false;
    }
    let Some(container_statuses) = &status.container_statuses else {
        return false;
    };
    container_statuses
        .iter()
        .all(|cs| cs.ready && cs.state.as_ref().is_some_and(|s| s.running.is_some()))
}

/// Detect failure states that polling will never recover from
fn terminal_failure(pod: &Pod) -> Option<String> {
    let status = pod.status.as_ref()?;

    match status.phase.as_deref() {
        Some("Failed") => {
            let reason = status.reason.clone().unwrap_or_else(|| "Failed".to_string());
            return Some(format!("pod failed: {}", reason));
        }
        // The holding command never exits on its own; Succeeded means it was killed
        Some("Succeeded") => {
            return Some("pod exited before the command could run".to_string());
        }
        _ => {}
    }

    for cs in status.container_statuses.iter().flatten() {
        if let Some(waiting) = cs.state.as_ref().and_then(|s| s.waiting.as_ref()) {
            if let Some(reason) = waiting.reason.as_deref() {
                if TERMINAL_WAITING_REASONS.contains(&reason) {
                    let message = waiting.message.clone().unwrap_or_default();
                    return Some(format!("container cannot start: {} {}", reason, message)
                        .trim_end()
                        .to_string());
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateWaiting, ContainerStatus, PodStatus,
    };

    fn pod_with_status(status: PodStatus) -> Pod {
        Pod {
            status: Some(status),
            ..Default::default()
        }
    }

    fn container_status(ready: bool, state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            name: "probe".to_string(),
            ready,
            state: Some(state),
            restart_count: 0,
            image: "busybox:1.36".to_string(),
            image_id: String::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ready_when_running_and_ready() {
        let pod = pod_with_status(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(vec![container_status(
                true,
                ContainerState {
                    running: Some(ContainerStateRunning::default()),
                    ..Default::default()
                },
            )]),
            ..Default::default()
        });
        assert!(is_ready(&pod));
    }

    #[test]
    fn test_not_ready_while_pending() {
        let pod = pod_with_status(PodStatus {
            phase: Some("Pending".to_string()),
            ..Default::default()
        });
        assert!(!is_ready(&pod));
        assert!(terminal_failure(&pod).is_none());
    }

    #[test]
    fn test_image_pull_failure_is_terminal() {
        let pod = pod_with_status(PodStatus {
            phase: Some("Pending".to_string()),
            container_statuses: Some(vec![container_status(
                false,
                ContainerState {
                    waiting: Some(ContainerStateWaiting {
                        reason: Some("ImagePullBackOff".to_string()),
                        message: Some("Back-off pulling image".to_string()),
                    }),
                    ..Default::default()
                },
            )]),
            ..Default::default()
        });
        let reason = terminal_failure(&pod).unwrap();
        assert!(reason.contains("ImagePullBackOff"));
    }

    #[test]
    fn test_failed_phase_is_terminal() {
        let pod = pod_with_status(PodStatus {
            phase: Some("Failed".to_string()),
            reason: Some("Evicted".to_string()),
            ..Default::default()
        });
        let reason = terminal_failure(&pod).unwrap();
        assert!(reason.contains("Evicted"));
    }
}
