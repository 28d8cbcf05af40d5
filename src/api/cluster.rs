//! Read-only cluster inspectors
//!
//! Query-and-reformat endpoints over existing cluster objects: network
//! policy listings and service endpoint health. No pods are created here.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use kube::api::ListParams;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::k8s::K8sClient;

#[derive(Debug, Deserialize)]
pub struct NetworkPolicyQuery {
    /// Namespace to list in; defaults to the configured probe namespace
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NetworkPolicySummary {
    pub name: String,
    pub namespace: String,
    /// Pods the policy selects; empty map means all pods in the namespace
    pub pod_selector: BTreeMap<String, String>,
    pub policy_types: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceHealth {
    pub name: String,
    pub namespace: String,
    pub cluster_ip: Option<String>,
    pub ports: Vec<i32>,
    pub endpoints_ready: usize,
    pub endpoints_total: usize,
    /// At least one ready endpoint backs the service
    pub healthy: bool,
}

async fn require_k8s(state: &AppState) -> AppResult<K8sClient> {
    state
        .k8s
        .read()
        .await
        .clone()
        .ok_or_else(|| AppError::internal("Kubernetes cluster not available"))
}

/// List network policies in a namespace
#[utoipa::path(
    get,
    path = "/api/cluster/network-policies",
    tag = "cluster",
    params(
        ("namespace" = Option<String>, Query, description = "Namespace to list in"),
    ),
    responses(
        (status = 200, description = "Network policies", body = [NetworkPolicySummary]),
    )
)]
pub async fn list_network_policies(
    State(state): State<AppState>,
    Query(query): Query<NetworkPolicyQuery>,
) -> AppResult<Json<Vec<NetworkPolicySummary>>> {
    let k8s = require_k8s(&state).await?;
    let namespace = query
        .namespace
        .unwrap_or_else(|| state.config.probe_namespace.clone());

    info!(namespace = %namespace, "Listing network policies");

    let policies = k8s
        .network_policies_in(&namespace)
        .list(&ListParams::default())
        .await?;

    let summaries = policies
        .items
        .into_iter()
        .map(|policy| {
            let name = policy.metadata.name.unwrap_or_default();
            let spec = policy.spec.unwrap_or_default();
            NetworkPolicySummary {
                name,
                namespace: namespace.clone(),
                pod_selector: spec.pod_selector.match_labels.unwrap_or_default(),
                policy_types: spec.policy_types.unwrap_or_default(),
            }
        })
        .collect();

    Ok(Json(summaries))
}

/// Health of a service judged by its ready endpoints
#[utoipa::path(
    get,
    path = "/api/cluster/services/{namespace}/{name}/health",
    tag = "cluster",
    params(
        ("namespace" = String, Path, description = "Service namespace"),
        ("name" = String, Path, description = "Service name"),
    ),
    responses(
        (status = 200, description = "Service health", body = ServiceHealth),
        (status = 404, description = "Service not found"),
    )
)]
pub async fn service_health(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> AppResult<Json<ServiceHealth>> {
    let k8s = require_k8s(&state).await?;

    info!(namespace = %namespace, name = %name, "Checking service health");

    let service = match k8s.services_in(&namespace).get(&name).await {
        Ok(svc) => svc,
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            return Err(AppError::not_found(&format!(
                "Service {}/{} not found",
                namespace, name
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let spec = service.spec.unwrap_or_default();
    let ports = spec
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.port)
        .collect();

    // Endpoints object shares the service's name
    let (ready, total) = match k8s.endpoints_in(&namespace).get(&name).await {
        Ok(endpoints) => {
            let mut ready = 0;
            let mut total = 0;
            for subset in endpoints.subsets.unwrap_or_default() {
                ready += subset.addresses.as_ref().map_or(0, Vec::len);
                total += subset.addresses.as_ref().map_or(0, Vec::len)
                    + subset.not_ready_addresses.as_ref().map_or(0, Vec::len);
            }
            (ready, total)
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => (0, 0),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(ServiceHealth {
        name,
        namespace,
        cluster_ip: spec.cluster_ip,
        ports,
        endpoints_ready: ready,
        endpoints_total: total,
        healthy: ready > 0,
    }))
}
