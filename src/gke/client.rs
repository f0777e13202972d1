/// GKE operations delegated to the gcloud CLI
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use super::declarations::{ClusterDeclaration, NodePoolDeclaration};
use super::models::{Cluster, NodePool};
use crate::config::StackConfig;
use crate::utils::command::{check_tool_installed, CommandBuilder};
use crate::utils::polling::PollingConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// gcloud reports a missing resource as a 404 / NOT_FOUND response
fn is_not_found(stderr: &str) -> bool {
    stderr.contains("code=404") || stderr.contains("NOT_FOUND") || stderr.contains("Not found")
}

/// gcloud reports a create conflict as a 409 / ALREADY_EXISTS response
fn is_already_exists(stderr: &str) -> bool {
    stderr.contains("code=409")
        || stderr.contains("ALREADY_EXISTS")
        || stderr.contains("Already exists")
}

/// gcloud client scoped to one project and location
#[derive(Debug, Clone)]
pub struct GcloudClient {
    project: String,
    location: String,
    program: String,
    program_args: Vec<String>,
}

impl GcloudClient {
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            program: "gcloud".to_string(),
            program_args: Vec::new(),
        }
    }

    /// Run another executable in place of gcloud
    #[cfg(test)]
    fn with_program(mut self, program: &str, args: &[&str]) -> Self {
        self.program = program.to_string();
        self.program_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    fn gcloud(&self) -> CommandBuilder {
        CommandBuilder::new(&self.program).args(&self.program_args)
    }

    pub fn from_config(config: &StackConfig) -> Self {
        Self::new(&config.project, &config.region)
    }

    /// Check if gcloud is installed
    pub async fn check_gcloud_installed() -> Result<()> {
        check_tool_installed(
            "gcloud",
            &["version"],
            "https://cloud.google.com/sdk/docs/install",
        )
        .await
    }

    /// Base `gcloud container <group> <verb> <name>` invocation with project and location
    fn container(&self, group: &str, verb: &str, name: &str) -> CommandBuilder {
        self.gcloud()
            .args(["container", group, verb, name])
            .flag("--project", &self.project)
            .flag("--location", &self.location)
    }

    /// Describe a cluster
    pub async fn describe_cluster(&self, name: &str) -> Result<Cluster> {
        self.container("clusters", "describe", name)
            .flag("--format", "json")
            .context(format!("Failed to describe cluster {}", name))
            .json()
            .await
    }

    /// Describe a cluster, or `None` if it does not exist
    pub async fn find_cluster(&self, name: &str) -> Result<Option<Cluster>> {
        let stdout = self
            .container("clusters", "describe", name)
            .flag("--format", "json")
            .context(format!("Failed to describe cluster {}", name))
            .run_unless(is_not_found)
            .await?;

        stdout
            .map(|json| serde_json::from_str(&json).context("Failed to parse cluster description"))
            .transpose()
    }

    /// `gcloud container node-pools <verb>` for a declared node pool
    fn node_pools(&self, verb: &str, pool: &NodePoolDeclaration) -> CommandBuilder {
        self.gcloud()
            .args(["container", "node-pools", verb, pool.name.as_str()])
            .flag("--project", &pool.projects_id)
            .flag("--location", &pool.locations_id)
            .flag("--cluster", &pool.clusters_id)
    }

    /// Describe a declared node pool in the location it was created in
    pub async fn describe_node_pool(&self, pool: &NodePoolDeclaration) -> Result<NodePool> {
        self.node_pools("describe", pool)
            .flag("--format", "json")
            .context(format!("Failed to describe node pool {}", pool.name))
            .json()
            .await
    }

    /// Describe a declared node pool, or `None` if it does not exist
    pub async fn find_node_pool(&self, pool: &NodePoolDeclaration) -> Result<Option<NodePool>> {
        let stdout = self
            .node_pools("describe", pool)
            .flag("--format", "json")
            .context(format!("Failed to describe node pool {}", pool.name))
            .run_unless(is_not_found)
            .await?;

        stdout
            .map(|json| {
                serde_json::from_str(&json).context("Failed to parse node pool description")
            })
            .transpose()
    }

    /// Create the cluster unless it already exists
    pub async fn ensure_cluster(&self, cluster: &ClusterDeclaration) -> Result<()> {
        match self.find_cluster(&cluster.name).await? {
            Some(existing) => {
                info!(
                    "Found existing cluster: {} (status: {})",
                    existing.name, existing.status
                );
                Ok(())
            }
            None => self.create_cluster(cluster).await,
        }
    }

    /// Create the node pool unless it already exists
    pub async fn ensure_node_pool(&self, pool: &NodePoolDeclaration) -> Result<()> {
        match self.find_node_pool(pool).await? {
            Some(existing) => {
                info!(
                    "Found existing node pool: {} (status: {})",
                    existing.name, existing.status
                );
                Ok(())
            }
            None => self.create_node_pool(pool).await,
        }
    }

    /// Start creating a cluster. Returns once gcloud has accepted the request.
    pub async fn create_cluster(&self, cluster: &ClusterDeclaration) -> Result<()> {
        info!("Creating cluster {} in {}...", cluster.name, cluster.locations_id);

        let mut command = self
            .container("clusters", "create", &cluster.name)
            .flag("--cluster-version", &cluster.initial_cluster_version)
            .flag("--num-nodes", cluster.initial_node_count.to_string())
            .flag("--network", &cluster.network)
            .flag("--scopes", cluster.node_config.oauth_scopes.join(","));

        if let Some(password) = &cluster.master_auth.password {
            command = command
                .arg("--enable-basic-auth")
                .flag("--username", &cluster.master_auth.username)
                .env("CLOUDSDK_CONTAINER_CLUSTER_PASSWORD", password);
        } else {
            warn!("No master password configured, basic auth stays disabled");
        }

        let created = command
            .args(["--async", "--quiet"])
            .context(format!("Failed to create cluster {}", cluster.name))
            .run_unless(is_already_exists)
            .await?;

        if created.is_none() {
            info!("Cluster {} already exists", cluster.name);
        }

        Ok(())
    }

    /// Start creating a node pool in an existing cluster
    pub async fn create_node_pool(&self, pool: &NodePoolDeclaration) -> Result<()> {
        info!(
            "Creating node pool {} in cluster {}...",
            pool.name, pool.clusters_id
        );

        let mut command = self
            .node_pools("create", pool)
            .flag("--num-nodes", pool.initial_node_count.to_string())
            .flag("--node-version", &pool.version)
            .flag("--scopes", pool.config.oauth_scopes.join(","));

        if let Some(machine_type) = &pool.config.machine_type {
            command = command.flag("--machine-type", machine_type);
        }
        if pool.config.preemptible {
            command = command.arg("--preemptible");
        }
        command = command.arg(if pool.management.auto_repair {
            "--enable-autorepair"
        } else {
            "--no-enable-autorepair"
        });

        let created = command
            .args(["--async", "--quiet"])
            .context(format!("Failed to create node pool {}", pool.name))
            .run_unless(is_already_exists)
            .await?;

        if created.is_none() {
            info!("Node pool {} already exists", pool.name);
        }

        Ok(())
    }

    /// Start deleting a cluster together with its node pools. A missing cluster is not an
    /// error.
    pub async fn delete_cluster(&self, name: &str) -> Result<()> {
        info!("Deleting cluster {}...", name);

        let deleted = self
            .container("clusters", "delete", name)
            .args(["--async", "--quiet"])
            .context(format!("Failed to delete cluster {}", name))
            .run_unless(is_not_found)
            .await?;

        if deleted.is_none() {
            info!("Cluster {} not found, nothing to delete", name);
        }

        Ok(())
    }

    /// Wait until the cluster reports RUNNING
    pub async fn wait_for_cluster(&self, name: &str, timeout_secs: u64) -> Result<Cluster> {
        PollingConfig::new(
            Duration::from_secs(timeout_secs),
            POLL_INTERVAL,
            format!("Waiting for cluster {} to be RUNNING", name),
        )
        .poll(|| async move {
            let cluster = self.describe_cluster(name).await?;
            if cluster.is_failed() {
                anyhow::bail!(
                    "Cluster {} is {}: {}",
                    name,
                    cluster.status,
                    cluster.status_message.as_deref().unwrap_or("no details")
                );
            }
            Ok(cluster.is_running().then_some(cluster))
        })
        .await
        .with_context(|| format!("Cluster {} did not become ready", name))
    }

    /// Wait until the node pool reports RUNNING
    pub async fn wait_for_node_pool(
        &self,
        pool: &NodePoolDeclaration,
        timeout_secs: u64,
    ) -> Result<NodePool> {
        PollingConfig::new(
            Duration::from_secs(timeout_secs),
            POLL_INTERVAL,
            format!("Waiting for node pool {} to be RUNNING", pool.name),
        )
        .poll(|| async move {
            let node_pool = self.describe_node_pool(pool).await?;
            if node_pool.is_failed() {
                anyhow::bail!(
                    "Node pool {} is {}: {}",
                    pool.name,
                    node_pool.status,
                    node_pool.status_message.as_deref().unwrap_or("no details")
                );
            }
            Ok(node_pool.is_running().then_some(node_pool))
        })
        .await
        .with_context(|| format!("Node pool {} did not become ready", pool.name))
    }
}
