use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_kubeconfig")]
    pub kubeconfig: Option<String>,

    /// Namespace probe pods are created in when a request does not name one
    #[serde(default = "default_probe_namespace")]
    pub probe_namespace: String,

    /// Container image used for all probe pods
    #[serde(default = "default_probe_image")]
    pub probe_image: String,

    /// Hard ceiling for a single probe, seconds; caller timeouts are clamped to this
    #[serde(default = "default_max_timeout_seconds")]
    pub max_timeout_seconds: u64,

    /// Size of the concurrency gate: probes simultaneously in flight cluster-wide
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,

    /// Ceiling on captured command output, bytes
    #[serde(default = "default_output_limit_bytes")]
    pub output_limit_bytes: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_kubeconfig() -> Option<String> {
    None
}

fn default_probe_namespace() -> String {
    "default".to_string()
}

fn default_probe_image() -> String {
    "busybox:1.36".to_string()
}

fn default_max_timeout_seconds() -> u64 {
    30
}

fn default_max_concurrent_probes() -> usize {
    5
}

fn default_output_limit_bytes() -> usize {
    1024 * 1024
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let settings: Config = config
            .try_deserialize()
            .unwrap_or_else(|_| Config::default());

        Ok(settings)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            kubeconfig: default_kubeconfig(),
            probe_namespace: default_probe_namespace(),
            probe_image: default_probe_image(),
            max_timeout_seconds: default_max_timeout_seconds(),
            max_concurrent_probes: default_max_concurrent_probes(),
            output_limit_bytes: default_output_limit_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.probe_namespace, "default");
        assert_eq!(config.probe_image, "busybox:1.36");
        assert_eq!(config.max_timeout_seconds, 30);
        assert_eq!(config.max_concurrent_probes, 5);
        assert_eq!(config.output_limit_bytes, 1024 * 1024);
    }
}
