/// Subsets of the GKE resources reported by `gcloud ... describe --format=json`
use serde::Deserialize;

use crate::kubeconfig::MasterAuth;

/// GKE cluster
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    pub status: String,
    pub location: String,
    /// Empty until the control plane has an address
    #[serde(default)]
    pub endpoint: String,
    pub master_auth: Option<MasterAuth>,
    #[serde(default)]
    pub current_master_version: String,
    #[serde(default)]
    pub current_node_count: u32,
    #[serde(default)]
    pub status_message: Option<String>,
}

impl Cluster {
    pub fn is_running(&self) -> bool {
        self.status == "RUNNING"
    }

    pub fn is_failed(&self) -> bool {
        self.status == "ERROR" || self.status == "DEGRADED"
    }
}

/// GKE node pool
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub initial_node_count: u32,
    pub config: Option<NodePoolConfig>,
    #[serde(default)]
    pub status_message: Option<String>,
}

impl NodePool {
    pub fn is_running(&self) -> bool {
        self.status == "RUNNING"
    }

    pub fn is_failed(&self) -> bool {
        self.status == "ERROR"
    }
}

/// Machine configuration of a node pool
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolConfig {
    pub machine_type: String,
    #[serde(default)]
    pub preemptible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cluster() {
        let json = r#"{
            "name": "gke-native",
            "status": "RUNNING",
            "location": "us-central1",
            "endpoint": "34.1.2.3",
            "masterAuth": {"clusterCaCertificate": "QUJDRA=="},
            "currentMasterVersion": "1.18.16-gke.2100",
            "currentNodeCount": 4,
            "selfLink": "https://container.googleapis.com/v1/projects/p/locations/us-central1/clusters/gke-native"
        }"#;

        let cluster: Cluster = serde_json::from_str(json).unwrap();
        assert!(cluster.is_running());
        assert_eq!(cluster.endpoint, "34.1.2.3");
        assert_eq!(
            cluster.master_auth.unwrap().cluster_ca_certificate,
            "QUJDRA=="
        );
        assert_eq!(cluster.current_node_count, 4);
    }

    #[test]
    fn test_parse_provisioning_cluster() {
        let json = r#"{"name": "gke-native", "status": "PROVISIONING", "location": "us-central1"}"#;

        let cluster: Cluster = serde_json::from_str(json).unwrap();
        assert!(!cluster.is_running());
        assert!(!cluster.is_failed());
        assert!(cluster.endpoint.is_empty());
        assert!(cluster.master_auth.is_none());
    }

    #[test]
    fn test_parse_node_pool() {
        let json = r#"{
            "name": "nodepool",
            "status": "RUNNING",
            "version": "1.18.16-gke.2100",
            "initialNodeCount": 3,
            "config": {"machineType": "n1-standard-1", "preemptible": true}
        }"#;

        let pool: NodePool = serde_json::from_str(json).unwrap();
        assert!(pool.is_running());
        let config = pool.config.unwrap();
        assert_eq!(config.machine_type, "n1-standard-1");
        assert!(config.preemptible);
    }
}
