//! Ephemeral probe execution engine
//!
//! Runs a diagnostic command inside a throwaway pod: build the pod spec,
//! create it, wait for it to become executable, exec the command under a
//! deadline, and delete the pod on every exit path. The meaning of the
//! command's output (sentinel strings and the like) is the caller's
//! business, not this module's.

mod cleanup;
mod driver;
mod exec;
mod lifecycle;
mod manager;
mod spec;
mod types;

pub use cleanup::start_probe_sweeper;
pub use driver::{ExecStreams, PodDriver};
pub use manager::ProbeManager;
pub use spec::{build_probe_pod, probe_pod_name, PROBE_LABEL};
pub use types::{ProbeError, ProbeKind, ProbePhase, ProbeRequest, ProbeResult};
