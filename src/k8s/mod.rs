//! Kubernetes integration module for NetDiag
//!
//! Thin wrapper around the kube client plus retry helpers for
//! control-plane calls that may be rate limited.

mod client;
mod driver;

pub use client::{create_pod_with_retry, delete_pod_with_retry, is_transient, K8sClient};
pub use driver::KubePodDriver;
