/// Stack configuration for the GKE cluster and its node pool
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::kubeconfig::ContextIdentity;

/// Main stack configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// GCP project ID
    pub project: String,

    /// Region the cluster is created in (e.g., "us-central1")
    pub region: String,

    /// Zone used to name the kubeconfig context (e.g., "us-central1-a")
    pub zone: String,

    /// Cluster settings
    pub cluster: ClusterSettings,

    /// Primary node pool settings
    pub node_pool: NodePoolSettings,
}

/// GKE cluster settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSettings {
    /// Cluster name
    #[serde(default = "default_cluster_name")]
    pub name: String,

    /// Initial Kubernetes version of the control plane
    #[serde(default = "default_cluster_version")]
    pub initial_version: String,

    /// Node count of the default pool created together with the cluster
    #[serde(default = "default_one")]
    pub initial_node_count: u32,

    /// Master basic-auth user name
    pub username: String,

    /// Master basic-auth password (can also be set via GKE_CLUSTER_PASSWORD env var)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// VPC network name within the project
    #[serde(default = "default_network")]
    pub network: String,

    /// OAuth scopes granted to nodes of the default pool
    #[serde(default = "default_cluster_scopes")]
    pub oauth_scopes: Vec<String>,
}

/// Node pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePoolSettings {
    /// Node pool name
    #[serde(default = "default_node_pool_name")]
    pub name: String,

    /// Compute Engine machine type (e.g., "n1-standard-1")
    pub machine_type: String,

    /// Number of nodes in the pool
    #[serde(default = "default_node_count")]
    pub node_count: u32,

    /// Kubernetes version pin for the nodes
    pub version: String,

    /// Use preemptible VMs
    #[serde(default = "default_true")]
    pub preemptible: bool,

    /// Let GKE repair unhealthy nodes
    #[serde(default = "default_true")]
    pub auto_repair: bool,

    /// OAuth scopes granted to the pool's nodes
    #[serde(default = "default_node_pool_scopes")]
    pub oauth_scopes: Vec<String>,
}

const SCOPE_PREFIX: &str = "https://www.googleapis.com/auth/";

fn scopes(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("{}{}", SCOPE_PREFIX, name))
        .collect()
}

fn default_cluster_scopes() -> Vec<String> {
    scopes(&[
        "devstorage.read_only",
        "logging.write",
        "monitoring",
        "service.management.readonly",
        "servicecontrol",
        "trace.append",
        "compute",
    ])
}

fn default_node_pool_scopes() -> Vec<String> {
    scopes(&[
        "compute",
        "devstorage.read_only",
        "logging.write",
        "monitoring",
    ])
}

fn default_cluster_name() -> String {
    "gke-native".to_string()
}

fn default_cluster_version() -> String {
    "1.18.16-gke.2100".to_string()
}

fn default_network() -> String {
    "default".to_string()
}

fn default_node_pool_name() -> String {
    "nodepool".to_string()
}

fn default_node_count() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

impl StackConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StackConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [
            ("project", &self.project),
            ("region", &self.region),
            ("zone", &self.zone),
            ("cluster.name", &self.cluster.name),
            ("node_pool.name", &self.node_pool.name),
            ("node_pool.machine_type", &self.node_pool.machine_type),
        ] {
            if value.is_empty() {
                anyhow::bail!("{} cannot be empty", field);
            }
        }

        if self.cluster.initial_node_count == 0 {
            anyhow::bail!("cluster.initial_node_count must be at least 1");
        }

        if self.node_pool.node_count == 0 {
            anyhow::bail!("node_pool.node_count must be at least 1");
        }

        if self.cluster.username.is_empty() && self.cluster_password().is_some() {
            anyhow::bail!("cluster.username cannot be empty when a master password is set");
        }

        if self.cluster.oauth_scopes.is_empty() || self.node_pool.oauth_scopes.is_empty() {
            anyhow::bail!("at least one OAuth scope is required for cluster and node pool");
        }

        Ok(())
    }

    /// Identity used to name the kubeconfig context
    pub fn identity(&self) -> ContextIdentity {
        ContextIdentity::new(&self.project, &self.zone)
    }

    /// Get the master password from config or environment
    pub fn cluster_password(&self) -> Option<String> {
        self.cluster
            .password
            .clone()
            .or_else(|| std::env::var("GKE_CLUSTER_PASSWORD").ok())
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            project: "my-project".to_string(),
            region: "us-central1".to_string(),
            zone: "us-central1-a".to_string(),
            cluster: ClusterSettings {
                name: default_cluster_name(),
                initial_version: default_cluster_version(),
                initial_node_count: 1,
                username: "admin".to_string(),
                password: None,
                network: default_network(),
                oauth_scopes: default_cluster_scopes(),
            },
            node_pool: NodePoolSettings {
                name: default_node_pool_name(),
                machine_type: "n1-standard-1".to_string(),
                node_count: default_node_count(),
                version: "1.18.16-gke.2100".to_string(),
                preemptible: true,
                auto_repair: true,
                oauth_scopes: default_node_pool_scopes(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = StackConfig::example();
        assert!(config.validate().is_ok());

        config.project = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("project"));
    }

    #[test]
    fn test_zero_node_count_rejected() {
        let mut config = StackConfig::example();
        config.node_pool.node_count = 0;
        assert!(config.validate().is_err());

        let mut config = StackConfig::example();
        config.cluster.initial_node_count = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cluster.initial_node_count"));
    }

    #[test]
    fn test_password_requires_username() {
        let mut config = StackConfig::example();
        config.cluster.password = Some("s3cret-s3cret-s3cret".to_string());
        assert!(config.validate().is_ok());

        config.cluster.username = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cluster.username"));
    }

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let yaml = r#"
project: demo
region: us-central1
zone: us-central1-a
cluster:
  username: admin
node_pool:
  machine_type: n1-standard-2
  version: 1.18.16-gke.2100
"#;
        let config: StackConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.cluster.name, "gke-native");
        assert_eq!(config.cluster.network, "default");
        assert_eq!(config.cluster.oauth_scopes.len(), 7);
        assert_eq!(config.node_pool.name, "nodepool");
        assert_eq!(config.node_pool.oauth_scopes.len(), 4);
        assert!(config.node_pool.preemptible);
        assert!(config.node_pool.auto_repair);
        assert_eq!(
            config.node_pool.oauth_scopes[0],
            "https://www.googleapis.com/auth/compute"
        );
    }

    #[test]
    fn test_identity() {
        let config = StackConfig::example();
        assert_eq!(
            config.identity().context_name(&config.cluster.name),
            "my-project_us-central1-a_gke-native"
        );
    }

    #[test]
    fn test_example_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&StackConfig::example()).unwrap();
        assert!(!yaml.contains("password"));

        let parsed: StackConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project, "my-project");
    }
}
