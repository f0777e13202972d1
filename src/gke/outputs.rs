/// Cluster attributes resolved from the external engine
use anyhow::Result;
use std::future::Future;
use tracing::debug;

use super::client::GcloudClient;
use super::models::Cluster;
use crate::deferred::{self, Deferred};
use crate::kubeconfig::MasterAuth;

/// Name, endpoint and master auth of a cluster, each resolved independently
#[derive(Debug)]
pub struct ClusterOutputs {
    pub name: Deferred<String>,
    pub endpoint: Deferred<String>,
    pub master_auth: Deferred<MasterAuth>,
}

impl ClusterOutputs {
    /// Resolve the outputs from a cluster description produced in the background
    ///
    /// Must be called inside a tokio runtime.
    pub fn resolve_with<F>(describe: F) -> Self
    where
        F: Future<Output = Result<Cluster>> + Send + 'static,
    {
        let (name_tx, name) = deferred::channel();
        let (endpoint_tx, endpoint) = deferred::channel();
        let (auth_tx, master_auth) = deferred::channel();

        tokio::spawn(async move {
            let cluster = match describe.await {
                Ok(cluster) => cluster,
                Err(e) => {
                    let reason = format!("{:#}", e);
                    name_tx.reject(reason.clone());
                    endpoint_tx.reject(reason.clone());
                    auth_tx.reject(reason);
                    return;
                }
            };

            if name_tx.is_cancelled() && endpoint_tx.is_cancelled() && auth_tx.is_cancelled() {
                debug!("Outputs of cluster {} no longer awaited", cluster.name);
                return;
            }

            debug!("Cluster {} reported status {}", cluster.name, cluster.status);

            if cluster.endpoint.is_empty() {
                endpoint_tx.reject(format!("cluster {} has no endpoint yet", cluster.name));
            } else {
                endpoint_tx.resolve(cluster.endpoint);
            }

            match cluster.master_auth {
                Some(auth) => auth_tx.resolve(auth),
                None => auth_tx.reject(format!("cluster {} reported no master auth", cluster.name)),
            }

            name_tx.resolve(cluster.name);
        });

        Self {
            name,
            endpoint,
            master_auth,
        }
    }

    /// Resolve the outputs of a live cluster through gcloud
    pub fn from_gcloud(client: GcloudClient, cluster_name: String) -> Self {
        Self::resolve_with(async move { client.describe_cluster(&cluster_name).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubeconfig::{materialize, ContextIdentity};

    fn running_cluster() -> Cluster {
        serde_json::from_str(
            r#"{
                "name": "gke-native",
                "status": "RUNNING",
                "location": "us-central1",
                "endpoint": "34.1.2.3",
                "masterAuth": {"clusterCaCertificate": "QUJDRA=="}
            }"#,
        )
        .unwrap()
    }

    fn outputs_of(cluster: Cluster) -> ClusterOutputs {
        ClusterOutputs::resolve_with(async move { Ok(cluster) })
    }

    #[tokio::test]
    async fn test_outputs_resolve() {
        let outputs = outputs_of(running_cluster());

        assert_eq!(outputs.name.await.unwrap(), "gke-native");
        assert_eq!(outputs.endpoint.await.unwrap(), "34.1.2.3");
        assert_eq!(
            outputs.master_auth.await.unwrap().cluster_ca_certificate,
            "QUJDRA=="
        );
    }

    #[tokio::test]
    async fn test_describe_failure_rejects_all() {
        let outputs = ClusterOutputs::resolve_with(async {
            Err(anyhow::anyhow!("cluster gke-native not found"))
        });

        for err in [
            outputs.name.await.unwrap_err(),
            outputs.endpoint.await.unwrap_err(),
        ] {
            assert!(err.reason().contains("not found"));
        }
        assert!(outputs.master_auth.await.is_err());
    }

    #[tokio::test]
    async fn test_missing_endpoint_rejects_endpoint_only() {
        let mut cluster = running_cluster();
        cluster.endpoint = String::new();
        let outputs = outputs_of(cluster);

        assert!(outputs.name.await.is_ok());
        assert!(outputs.master_auth.await.is_ok());
        let err = outputs.endpoint.await.unwrap_err();
        assert!(err.reason().contains("no endpoint"));
    }

    #[tokio::test]
    async fn test_outputs_feed_materialize() {
        let outputs = outputs_of(running_cluster());
        let identity = ContextIdentity::new("my-proj", "us-central1-a");

        let document = materialize(
            &identity,
            outputs.name,
            outputs.endpoint,
            outputs.master_auth,
        )
        .await
        .unwrap();

        assert!(document.contains("current-context: my-proj_us-central1-a_gke-native"));
        assert!(document.contains("server: https://34.1.2.3"));
    }

    #[tokio::test]
    async fn test_provisioning_cluster_fails_materialize() {
        let mut cluster = running_cluster();
        cluster.master_auth = None;
        let outputs = outputs_of(cluster);

        let result = materialize(
            &ContextIdentity::new("my-proj", "us-central1-a"),
            outputs.name,
            outputs.endpoint,
            outputs.master_auth,
        )
        .await;

        assert!(result.is_err());
    }
}
