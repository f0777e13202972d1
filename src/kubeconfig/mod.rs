/// Kubeconfig generation for GKE clusters
///
/// GKE requires gcloud for cluster authentication instead of a client certificate, so the
/// generated document carries a `gcp` auth-provider stanza that shells out to gcloud.
pub mod access;
pub mod template;

use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::deferred::{all3, Deferred, ResolutionError};

pub use access::{ClusterAccessInfo, ContextIdentity, MasterAuth};
pub use template::KubeconfigTemplate;

/// Errors produced while materializing a kubeconfig
#[derive(Debug, Error)]
pub enum Error {
    #[error("cluster attribute unavailable: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("invalid kubeconfig template: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("failed to render kubeconfig: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Build the kubeconfig once the cluster name, endpoint and master auth have all resolved
///
/// Fails with [`Error::Resolution`] as soon as any input fails. No partial document is ever
/// produced.
pub async fn materialize(
    identity: &ContextIdentity,
    name: Deferred<String>,
    endpoint: Deferred<String>,
    master_auth: Deferred<MasterAuth>,
) -> std::result::Result<String, Error> {
    let identity = identity.clone();
    let template = KubeconfigTemplate::shared()?;

    let document = all3(name, endpoint, master_auth)
        .apply(move |(name, endpoint, auth)| -> std::result::Result<String, Error> {
            let info = ClusterAccessInfo::new(name, endpoint, auth.cluster_ca_certificate);
            debug!(
                "Rendering kubeconfig for context {}",
                identity.context_name(&info.name)
            );
            template.render(&identity, &info)
        })
        .await??;

    Ok(document)
}

/// Write a kubeconfig to disk, readable by the owner only
pub async fn write_kubeconfig(path: &Path, document: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create output directory")?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    // `mode` only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to restrict kubeconfig permissions")?;
    }

    file.write_all(document.as_bytes())
        .await
        .with_context(|| format!("Failed to write kubeconfig to {}", path.display()))?;
    file.flush().await?;

    info!("Kubeconfig written to {}", path.display());

    Ok(())
}
