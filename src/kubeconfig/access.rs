/// Cluster access data embedded in a kubeconfig
use serde::{Deserialize, Serialize};

/// Authentication bundle reported for a cluster
///
/// Only the CA certificate is read; any other fields GKE returns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterAuth {
    /// Base64 encoded PEM of the cluster CA
    pub cluster_ca_certificate: String,
}

/// Everything needed to reach one cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAccessInfo {
    pub name: String,
    /// Host or IP of the API server, without scheme
    pub endpoint: String,
    /// Base64 encoded CA certificate, embedded verbatim
    pub ca_certificate: String,
}

impl ClusterAccessInfo {
    pub fn new(name: String, endpoint: String, ca_certificate: String) -> Self {
        Self {
            name,
            endpoint,
            ca_certificate,
        }
    }
}

/// Project and zone used to name the kubeconfig context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextIdentity {
    project: String,
    zone: String,
}

impl ContextIdentity {
    pub fn new(project: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
        }
    }

    /// Context name in the same `{project}_{zone}_{cluster}` form gcloud uses
    pub fn context_name(&self, cluster_name: &str) -> String {
        format!("{}_{}_{}", self.project, self.zone, cluster_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_name() {
        let identity = ContextIdentity::new("my-proj", "us-central1-a");
        assert_eq!(
            identity.context_name("gke-native"),
            "my-proj_us-central1-a_gke-native"
        );
    }

    #[test]
    fn test_master_auth_ignores_other_fields() {
        let json = r#"{
            "clusterCaCertificate": "QUJDRA==",
            "clientCertificateConfig": {},
            "username": "admin"
        }"#;

        let auth: MasterAuth = serde_json::from_str(json).unwrap();
        assert_eq!(auth.cluster_ca_certificate, "QUJDRA==");
    }
}
