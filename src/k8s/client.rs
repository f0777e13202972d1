/// kubectl access to the provisioned cluster
use anyhow::Result;
use std::path::Path;

use crate::utils::command::{check_tool_installed, CommandBuilder};

/// Kubernetes client for kubectl operations
pub struct KubernetesClient;

impl KubernetesClient {
    /// Check if kubectl is installed
    pub async fn check_kubectl_installed() -> Result<()> {
        check_tool_installed(
            "kubectl",
            &["version", "--client"],
            "https://kubernetes.io/docs/tasks/tools/",
        )
        .await
    }

    /// List node names visible through a kubeconfig
    pub async fn get_nodes(kubeconfig_path: &Path) -> Result<Vec<String>> {
        let stdout = CommandBuilder::new("kubectl")
            .args(["get", "nodes", "-o", "jsonpath={.items[*].metadata.name}"])
            .kubeconfig(kubeconfig_path)
            .context("Failed to list cluster nodes")
            .run()
            .await?;

        Ok(parse_node_names(&stdout))
    }
}

fn parse_node_names(stdout: &str) -> Vec<String> {
    stdout.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_names() {
        let nodes = parse_node_names(
            "gke-gke-native-nodepool-1a2b gke-gke-native-nodepool-3c4d\n",
        );
        assert_eq!(
            nodes,
            vec!["gke-gke-native-nodepool-1a2b", "gke-gke-native-nodepool-3c4d"]
        );
        assert!(parse_node_names("").is_empty());
    }

    #[tokio::test]
    async fn test_check_kubectl() {
        // Informational only: kubectl is usually missing in CI
        if KubernetesClient::check_kubectl_installed().await.is_err() {
            println!("kubectl not installed (expected in test environment)");
        }
    }
}
