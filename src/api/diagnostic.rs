//! Network diagnostic API endpoints
//!
//! Tool handlers that turn a logical diagnostic question (can this be
//! reached? does this name resolve?) into a probe command, run it through
//! the probe engine, and interpret the sentinel strings in the command's
//! output into a finding. Sentinel interpretation lives here and nowhere
//! else; the engine below reports transport truth only.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::probe::{ProbeError, ProbeKind, ProbeRequest, ProbeResult};

pub const CONNECTIVITY_OK: &str = "CONNECTION_SUCCESS";
pub const CONNECTIVITY_FAIL: &str = "CONNECTION_FAILED";
pub const DNS_OK: &str = "DNS_RESOLVED";
pub const DNS_FAIL: &str = "DNS_FAILED";
pub const HTTP_OK: &str = "HTTP_OK";
pub const HTTP_FAIL: &str = "HTTP_FAILED";

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConnectivityCheckRequest {
    /// Hostname or IP to reach
    pub host: String,
    pub port: u16,
    /// Namespace to probe from; defaults to the configured probe namespace
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DnsCheckRequest {
    /// Name to resolve (service, pod, or external hostname)
    pub host: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HttpCheckRequest {
    /// URL to fetch, http or https
    pub url: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// A diagnostic finding: the interpreted verdict plus the raw probe outcome
#[derive(Debug, Serialize, ToSchema)]
pub struct DiagnosticFinding {
    /// Interpreted verdict; absent when the probe itself could not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
    pub detail: String,
    pub probe: ProbeResult,
}

/// Run a raw probe request through the engine
///
/// Boundary contract for automated callers that build their own commands.
#[utoipa::path(
    post,
    path = "/api/probes",
    tag = "diagnostics",
    request_body = ProbeRequest,
    responses(
        (status = 200, description = "Probe outcome", body = ProbeResult),
        (status = 400, description = "Malformed probe request"),
    )
)]
pub async fn run_probe(
    State(state): State<AppState>,
    Json(request): Json<ProbeRequest>,
) -> AppResult<Json<ProbeResult>> {
    let result = state
        .probes
        .execute(request)
        .await
        .map_err(validation_to_app_error)?;
    Ok(Json(result))
}

/// Test TCP reachability of a host:port from inside the cluster
#[utoipa::path(
    post,
    path = "/api/diagnostics/connectivity",
    tag = "diagnostics",
    request_body = ConnectivityCheckRequest,
    responses(
        (status = 200, description = "Connectivity finding", body = DiagnosticFinding),
        (status = 400, description = "Invalid target"),
    )
)]
pub async fn run_connectivity_check(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityCheckRequest>,
) -> AppResult<Json<DiagnosticFinding>> {
    validate_host(&req.host)?;
    if req.port == 0 {
        return Err(AppError::bad_request("port must be between 1 and 65535"));
    }

    info!(host = %req.host, port = req.port, "Running connectivity check");

    let command = shell_command(format!(
        "nc -z -w 5 {} {} && echo {} || echo {}",
        req.host, req.port, CONNECTIVITY_OK, CONNECTIVITY_FAIL
    ));
    let result = execute(
        &state,
        ProbeKind::Connectivity,
        req.namespace,
        command,
        req.timeout_seconds,
    )
    .await?;

    let reachable = interpret(&result, CONNECTIVITY_OK, CONNECTIVITY_FAIL);
    let detail = match reachable {
        Some(true) => format!("{}:{} is reachable via TCP", req.host, req.port),
        Some(false) => format!("{}:{} is not reachable via TCP", req.host, req.port),
        None => "probe did not produce a verdict".to_string(),
    };

    Ok(Json(DiagnosticFinding {
        reachable,
        detail,
        probe: result,
    }))
}

/// Test DNS resolution of a name from inside the cluster
#[utoipa::path(
    post,
    path = "/api/diagnostics/dns",
    tag = "diagnostics",
    request_body = DnsCheckRequest,
    responses(
        (status = 200, description = "DNS finding", body = DiagnosticFinding),
        (status = 400, description = "Invalid target"),
    )
)]
pub async fn run_dns_check(
    State(state): State<AppState>,
    Json(req): Json<DnsCheckRequest>,
) -> AppResult<Json<DiagnosticFinding>> {
    validate_host(&req.host)?;

    info!(host = %req.host, "Running DNS check");

    let command = shell_command(format!(
        "nslookup {} && echo {} || echo {}",
        req.host, DNS_OK, DNS_FAIL
    ));
    let result =
        execute(&state, ProbeKind::Dns, req.namespace, command, req.timeout_seconds).await?;

    let reachable = interpret(&result, DNS_OK, DNS_FAIL);
    let detail = match reachable {
        Some(true) => format!("{} resolves", req.host),
        Some(false) => format!("{} does not resolve", req.host),
        None => "probe did not produce a verdict".to_string(),
    };

    Ok(Json(DiagnosticFinding {
        reachable,
        detail,
        probe: result,
    }))
}

/// Test HTTP reachability of a URL from inside the cluster
#[utoipa::path(
    post,
    path = "/api/diagnostics/http",
    tag = "diagnostics",
    request_body = HttpCheckRequest,
    responses(
        (status = 200, description = "HTTP finding", body = DiagnosticFinding),
        (status = 400, description = "Invalid target"),
    )
)]
pub async fn run_http_check(
    State(state): State<AppState>,
    Json(req): Json<HttpCheckRequest>,
) -> AppResult<Json<DiagnosticFinding>> {
    validate_url(&req.url)?;

    info!(url = %req.url, "Running HTTP check");

    let command = shell_command(format!(
        "wget -q -O /dev/null -T 5 {} && echo {} || echo {}",
        req.url, HTTP_OK, HTTP_FAIL
    ));
    let result =
        execute(&state, ProbeKind::Http, req.namespace, command, req.timeout_seconds).await?;

    let reachable = interpret(&result, HTTP_OK, HTTP_FAIL);
    let detail = match reachable {
        Some(true) => format!("{} answered an HTTP request", req.url),
        Some(false) => format!("{} did not answer an HTTP request", req.url),
        None => "probe did not produce a verdict".to_string(),
    };

    Ok(Json(DiagnosticFinding {
        reachable,
        detail,
        probe: result,
    }))
}

/// Wrap a shell expression into the argv form the engine expects
fn shell_command(expression: String) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), expression]
}

async fn execute(
    state: &AppState,
    kind: ProbeKind,
    namespace: Option<String>,
    command: Vec<String>,
    timeout_seconds: Option<u64>,
) -> AppResult<ProbeResult> {
    let request = ProbeRequest {
        kind,
        namespace: namespace.unwrap_or_else(|| state.config.probe_namespace.clone()),
        command,
        timeout_seconds,
    };
    state
        .probes
        .execute(request)
        .await
        .map_err(validation_to_app_error)
}

fn validation_to_app_error(e: ProbeError) -> AppError {
    match e {
        ProbeError::Validation(msg) => AppError::BadRequest(msg),
        // The manager folds everything else into the result
        other => AppError::Internal(other.to_string()),
    }
}

/// Classify the probe output by its sentinel strings
///
/// `None` means the command produced neither sentinel (or never ran), which
/// is a different situation from "ran and found the target unreachable".
fn interpret(result: &ProbeResult, ok_sentinel: &str, fail_sentinel: &str) -> Option<bool> {
    if !result.success {
        return None;
    }
    if result.output.contains(ok_sentinel) {
        Some(true)
    } else if result.output.contains(fail_sentinel) {
        Some(false)
    } else {
        None
    }
}

/// Hostnames and IPs only; anything else could smuggle shell syntax into the
/// probe command
fn validate_host(host: &str) -> AppResult<()> {
    if host.is_empty() || host.len() > 253 {
        return Err(AppError::bad_request("host must be 1-253 characters"));
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
    {
        return Err(AppError::bad_request(
            "host may only contain letters, digits, '.', '-' and ':'",
        ));
    }
    Ok(())
}

fn validate_url(url: &str) -> AppResult<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::bad_request(
            "url must start with http:// or https://",
        ));
    }
    if url.len() > 2048 {
        return Err(AppError::bad_request("url is too long"));
    }
    if !url.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(c, '.' | '-' | '_' | ':' | '/' | '?' | '=' | '&' | '%')
    }) {
        return Err(AppError::bad_request("url contains unsupported characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool, output: &str) -> ProbeResult {
        ProbeResult {
            success,
            output: output.to_string(),
            error: String::new(),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_interpret_sentinels() {
        assert_eq!(
            interpret(
                &result(true, "ok\nCONNECTION_SUCCESS\n"),
                CONNECTIVITY_OK,
                CONNECTIVITY_FAIL
            ),
            Some(true)
        );
        assert_eq!(
            interpret(
                &result(true, "CONNECTION_FAILED\n"),
                CONNECTIVITY_OK,
                CONNECTIVITY_FAIL
            ),
            Some(false)
        );
        assert_eq!(
            interpret(&result(true, "garbage"), CONNECTIVITY_OK, CONNECTIVITY_FAIL),
            None
        );
        // A failed probe never produces a verdict, whatever its output says
        assert_eq!(
            interpret(
                &result(false, "CONNECTION_SUCCESS"),
                CONNECTIVITY_OK,
                CONNECTIVITY_FAIL
            ),
            None
        );
    }

    #[test]
    fn test_validate_host() {
        assert!(validate_host("example.com").is_ok());
        assert!(validate_host("10.0.0.1").is_ok());
        assert!(validate_host("fe80::1").is_ok());
        assert!(validate_host("my-svc.default.svc").is_ok());
        assert!(validate_host("").is_err());
        assert!(validate_host("host; rm -rf /").is_err());
        assert!(validate_host("$(whoami)").is_err());
        assert!(validate_host("a b").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("http://example.com/health?x=1").is_ok());
        assert!(validate_url("https://10.0.0.1:8443/ready").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("http://example.com/`id`").is_err());
        assert!(validate_url("http://example.com/a b").is_err());
    }

    #[test]
    fn test_shell_command_shape() {
        let cmd = shell_command("echo hi".to_string());
        assert_eq!(cmd, vec!["sh", "-c", "echo hi"]);
    }
}
