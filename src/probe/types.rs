//! Probe request/result types and the probe error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// What a probe is checking; all kinds run on the same diagnostic image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Connectivity,
    Dns,
    Http,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Connectivity => "connectivity",
            ProbeKind::Dns => "dns",
            ProbeKind::Http => "http",
        }
    }
}

/// Logical probe intent, immutable once submitted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProbeRequest {
    pub kind: ProbeKind,
    /// Namespace the probe pod is created in
    pub namespace: String,
    /// Command in argv form, run inside the probe container
    pub command: Vec<String>,
    /// Caller-requested timeout, clamped to the system ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Outcome of a single probe
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProbeResult {
    /// Whether the command ran to completion; says nothing about what it found
    pub success: bool,
    /// Captured combined stdout/stderr, possibly truncated
    pub output: String,
    /// Populated only on lifecycle/transport failure, never from command output
    pub error: String,
    /// Wall-clock time from submission to result
    pub duration_ms: u64,
}

/// Per-request lifecycle phases, logged as the orchestration advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePhase {
    Created,
    Scheduled,
    Ready,
    Executing,
    Completed,
    CleanupIssued,
    Terminal,
}

impl ProbePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbePhase::Created => "created",
            ProbePhase::Scheduled => "scheduled",
            ProbePhase::Ready => "ready",
            ProbePhase::Executing => "executing",
            ProbePhase::Completed => "completed",
            ProbePhase::CleanupIssued => "cleanup_issued",
            ProbePhase::Terminal => "terminal",
        }
    }
}

/// Probe failure taxonomy
///
/// Only `Validation` ever reaches a caller as an error; every other kind is
/// folded into a `ProbeResult` with `success = false`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe request: {0}")]
    Validation(String),

    #[error("pod scheduling failed: {0}")]
    Scheduling(String),

    #[error("pod was not ready before the deadline")]
    SchedulingTimeout,

    #[error("exec channel failure: {0}")]
    ExecTransport(String),

    #[error("command did not exit before the deadline")]
    ExecTimeout,

    #[error("probe canceled")]
    Canceled,

    #[error("pod cleanup failed: {0}")]
    Cleanup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_kind_serde() {
        let json = serde_json::to_string(&ProbeKind::Connectivity).unwrap();
        assert_eq!(json, "\"connectivity\"");
        let kind: ProbeKind = serde_json::from_str("\"dns\"").unwrap();
        assert_eq!(kind, ProbeKind::Dns);
    }

    #[test]
    fn test_request_optional_timeout() {
        let req: ProbeRequest = serde_json::from_str(
            r#"{"kind":"http","namespace":"default","command":["sh","-c","true"]}"#,
        )
        .unwrap();
        assert_eq!(req.timeout_seconds, None);
        assert_eq!(req.command.len(), 3);
    }
}
