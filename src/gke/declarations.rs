/// Declared GKE resources, in the shape of the container/v1 API
use serde::Serialize;

use crate::config::StackConfig;

/// Cluster declaration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDeclaration {
    pub projects_id: String,
    pub locations_id: String,
    pub clusters_id: String,
    pub parent: String,
    pub name: String,
    pub initial_cluster_version: String,
    pub initial_node_count: u32,
    pub master_auth: MasterAuthDeclaration,
    pub network: String,
    pub node_config: NodeConfigDeclaration,
}

/// Master basic-auth credentials
#[derive(Debug, Clone, Serialize)]
pub struct MasterAuthDeclaration {
    pub username: String,
    // Never written out with the plan.
    #[serde(skip)]
    pub password: Option<String>,
}

/// Node machine configuration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigDeclaration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub preemptible: bool,
    pub oauth_scopes: Vec<String>,
}

/// Node pool management settings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementDeclaration {
    pub auto_repair: bool,
}

/// Node pool declaration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolDeclaration {
    pub projects_id: String,
    /// Taken from the cluster's reported location once it exists
    pub locations_id: String,
    pub clusters_id: String,
    pub node_pools_id: String,
    pub name: String,
    pub initial_node_count: u32,
    pub config: NodeConfigDeclaration,
    pub version: String,
    pub management: ManagementDeclaration,
    pub depends_on: Vec<String>,
}

impl NodePoolDeclaration {
    /// Same declaration, placed in the location the cluster actually reports
    pub fn located_in(mut self, location: &str) -> Self {
        self.locations_id = location.to_string();
        self
    }
}

/// All declared resources, in creation order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub cluster: ClusterDeclaration,
    pub node_pool: NodePoolDeclaration,
}

impl Plan {
    pub fn from_config(config: &StackConfig) -> Self {
        let cluster = ClusterDeclaration {
            projects_id: config.project.clone(),
            locations_id: config.region.clone(),
            clusters_id: config.cluster.name.clone(),
            parent: format!("projects/{}/locations/{}", config.project, config.region),
            name: config.cluster.name.clone(),
            initial_cluster_version: config.cluster.initial_version.clone(),
            initial_node_count: config.cluster.initial_node_count,
            master_auth: MasterAuthDeclaration {
                username: config.cluster.username.clone(),
                password: config.cluster_password(),
            },
            network: format!(
                "projects/{}/global/networks/{}",
                config.project, config.cluster.network
            ),
            node_config: NodeConfigDeclaration {
                machine_type: None,
                preemptible: false,
                oauth_scopes: config.cluster.oauth_scopes.clone(),
            },
        };

        let node_pool = NodePoolDeclaration {
            projects_id: config.project.clone(),
            locations_id: config.region.clone(),
            clusters_id: config.cluster.name.clone(),
            node_pools_id: config.node_pool.name.clone(),
            name: config.node_pool.name.clone(),
            initial_node_count: config.node_pool.node_count,
            config: NodeConfigDeclaration {
                machine_type: Some(config.node_pool.machine_type.clone()),
                preemptible: config.node_pool.preemptible,
                oauth_scopes: config.node_pool.oauth_scopes.clone(),
            },
            version: config.node_pool.version.clone(),
            management: ManagementDeclaration {
                auto_repair: config.node_pool.auto_repair,
            },
            depends_on: vec![format!("cluster/{}", config.cluster.name)],
        };

        Self { cluster, node_pool }
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
