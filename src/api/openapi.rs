//! OpenAPI documentation for the NetDiag API
//!
//! This module provides Swagger/OpenAPI documentation for all API endpoints.

use utoipa::OpenApi;

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "NetDiag API",
        version = "1.0.0",
        description = "On-demand Kubernetes network diagnostics.\n\n## Features\n- Run ephemeral in-cluster probes (TCP, DNS, HTTP)\n- Inspect network policies and service endpoint health\n- Structured results suitable for automated callers",
        license(name = "MIT"),
        contact(name = "NetDiag Team")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "diagnostics", description = "Ephemeral probe execution - connectivity, DNS, HTTP"),
        (name = "cluster", description = "Kubernetes cluster status and read-only inspectors"),
        (name = "metrics", description = "Prometheus metrics")
    ),
    paths(
        // Diagnostics
        crate::api::diagnostic::run_probe,
        crate::api::diagnostic::run_connectivity_check,
        crate::api::diagnostic::run_dns_check,
        crate::api::diagnostic::run_http_check,
        // Cluster
        crate::api::health::health_check,
        crate::api::health::cluster_status,
        crate::api::cluster::list_network_policies,
        crate::api::cluster::service_health,
        // Metrics / Prometheus
        crate::api::metrics::metrics_handler,
    ),
    components(schemas(
        crate::api::diagnostic::ConnectivityCheckRequest,
        crate::api::diagnostic::DnsCheckRequest,
        crate::api::diagnostic::HttpCheckRequest,
        crate::api::diagnostic::DiagnosticFinding,
        crate::api::cluster::NetworkPolicySummary,
        crate::api::cluster::ServiceHealth,
        crate::api::health::HealthResponse,
        crate::api::health::ClusterStatusResponse,
        crate::probe::ProbeKind,
        crate::probe::ProbeRequest,
        crate::probe::ProbeResult,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_renders() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/api/probes"));
        assert!(json.contains("/api/diagnostics/connectivity"));
    }
}
