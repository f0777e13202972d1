/// gke-native - GKE cluster with a gcloud-authenticated kubeconfig
///
/// Declares a GKE cluster and its node pool, delegates provisioning to gcloud and derives a
/// kubeconfig for the resulting cluster.
mod config;
mod deferred;
mod gke;
mod k8s;
mod kubeconfig;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::StackConfig;
use crate::gke::{ClusterOutputs, GcloudClient, Plan};
use crate::k8s::KubernetesClient;

/// Upper bound for a cluster or node pool to reach RUNNING
const PROVISION_TIMEOUT_SECS: u64 = 1800;

#[derive(Parser)]
#[command(name = "gke-native")]
#[command(about = "Provision a GKE cluster and generate its kubeconfig", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "stack.yaml")]
    config: PathBuf,

    /// Output directory for generated files
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    Init,

    /// Print the declared resources in creation order
    Plan,

    /// Create the cluster and node pool, then write the kubeconfig
    Up,

    /// Write the kubeconfig of an existing cluster
    Kubeconfig {
        /// Print to stdout instead of writing to the output directory
        #[arg(long)]
        stdout: bool,
    },

    /// Show cluster status
    Status,

    /// Delete the cluster and its node pools
    Down,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so plan and kubeconfig output can be piped
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gke_native={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Init => init_config(&cli).await,
        Commands::Plan => show_plan(&cli),
        Commands::Up => create_stack(&cli).await,
        Commands::Kubeconfig { stdout } => export_kubeconfig(&cli, stdout).await,
        Commands::Status => show_status(&cli).await,
        Commands::Down => destroy_stack(&cli).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<StackConfig> {
    StackConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Resolve the cluster outputs through gcloud and render the kubeconfig
async fn materialize_kubeconfig(config: &StackConfig) -> Result<String> {
    let client = GcloudClient::from_config(config);
    let outputs = ClusterOutputs::from_gcloud(client, config.cluster.name.clone());

    let document = kubeconfig::materialize(
        &config.identity(),
        outputs.name,
        outputs.endpoint,
        outputs.master_auth,
    )
    .await
    .context("Failed to materialize kubeconfig")?;

    Ok(document)
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let yaml = serde_yaml::to_string(&StackConfig::example())?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Set project, region and zone in the configuration file");
    info!("  2. Authenticate gcloud:");
    info!("     gcloud auth login");
    info!("  3. Optionally set the master password:");
    info!("     export GKE_CLUSTER_PASSWORD=your-password");
    info!("  4. Create the cluster:");
    info!("     gke-native up");

    Ok(())
}

/// Print declared resources
fn show_plan(cli: &Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let plan = Plan::from_config(&config);

    print!("{}", plan.to_yaml()?);

    Ok(())
}

/// Create cluster, node pool and kubeconfig
async fn create_stack(cli: &Cli) -> Result<()> {
    info!("Starting stack creation...");

    GcloudClient::check_gcloud_installed()
        .await
        .context("gcloud is required")?;

    let config = load_config(&cli.config)?;
    let plan = Plan::from_config(&config);
    let client = GcloudClient::from_config(&config);

    info!("Project: {}", config.project);
    info!("Cluster name: {}", config.cluster.name);

    // Re-running `up` picks up where a previous run stopped
    client.ensure_cluster(&plan.cluster).await?;
    let cluster = client
        .wait_for_cluster(&plan.cluster.name, PROVISION_TIMEOUT_SECS)
        .await?;

    // The node pool depends on the cluster and lives wherever GKE placed it
    let node_pool = plan.node_pool.located_in(&cluster.location);
    client.ensure_node_pool(&node_pool).await?;
    client
        .wait_for_node_pool(&node_pool, PROVISION_TIMEOUT_SECS)
        .await?;

    let document = materialize_kubeconfig(&config).await?;
    let kubeconfig_path = cli.output.join("kubeconfig");
    kubeconfig::write_kubeconfig(&kubeconfig_path, &document).await?;

    if KubernetesClient::check_kubectl_installed().await.is_ok() {
        match KubernetesClient::get_nodes(&kubeconfig_path).await {
            Ok(nodes) => info!("Cluster reports {} nodes", nodes.len()),
            Err(e) => warn!("Could not list nodes: {:#}", e),
        }
    }

    info!("✓ Stack creation completed successfully!");
    info!("");
    info!("Cluster details:");
    info!("  Name: {}", cluster.name);
    info!("  Location: {}", cluster.location);
    info!("  Endpoint: https://{}", cluster.endpoint);
    info!("  Master version: {}", cluster.current_master_version);
    info!("");
    info!("To access your cluster:");
    info!("  export KUBECONFIG={}", kubeconfig_path.display());
    info!("  kubectl get nodes");

    Ok(())
}

/// Write or print the kubeconfig of the existing cluster
async fn export_kubeconfig(cli: &Cli, to_stdout: bool) -> Result<()> {
    GcloudClient::check_gcloud_installed()
        .await
        .context("gcloud is required")?;

    let config = load_config(&cli.config)?;
    let document = materialize_kubeconfig(&config).await?;

    if to_stdout {
        print!("{}", document);
    } else {
        kubeconfig::write_kubeconfig(&cli.output.join("kubeconfig"), &document).await?;
    }

    Ok(())
}

/// Show cluster status
async fn show_status(cli: &Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let client = GcloudClient::from_config(&config);

    let cluster = client.describe_cluster(&config.cluster.name).await?;

    info!("Cluster: {}", cluster.name);
    info!("  Status: {}", cluster.status);
    info!("  Location: {}", cluster.location);
    info!("  Endpoint: {}", cluster.endpoint);
    info!("  Master version: {}", cluster.current_master_version);
    info!("  Nodes: {}", cluster.current_node_count);
    if let Some(message) = &cluster.status_message {
        info!("  Message: {}", message);
    }

    let node_pool = Plan::from_config(&config)
        .node_pool
        .located_in(&cluster.location);

    info!("");
    match client.describe_node_pool(&node_pool).await {
        Ok(pool) => {
            info!("Node pool: {}", pool.name);
            info!("  Status: {}", pool.status);
            info!("  Version: {}", pool.version);
            info!("  Nodes: {}", pool.initial_node_count);
            if let Some(machine) = &pool.config {
                info!(
                    "  Machine type: {}{}",
                    machine.machine_type,
                    if machine.preemptible { " (preemptible)" } else { "" }
                );
            }
        }
        Err(e) => info!("Node pool {} unavailable: {:#}", node_pool.name, e),
    }

    Ok(())
}

/// Delete the cluster
async fn destroy_stack(cli: &Cli) -> Result<()> {
    info!("Starting stack destruction...");

    GcloudClient::check_gcloud_installed()
        .await
        .context("gcloud is required")?;

    let config = load_config(&cli.config)?;
    let client = GcloudClient::from_config(&config);

    // Node pools go away with the cluster
    client.delete_cluster(&config.cluster.name).await?;

    let kubeconfig_path = cli.output.join("kubeconfig");
    if kubeconfig_path.exists() {
        tokio::fs::remove_file(&kubeconfig_path)
            .await
            .context("Failed to remove stale kubeconfig")?;
    }

    info!("✓ Cluster deletion started: {}", config.cluster.name);

    Ok(())
}
