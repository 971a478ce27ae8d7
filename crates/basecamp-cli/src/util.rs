//! Shared command helpers

use std::sync::Arc;

use basecamp_kube::{KubeResourceClient, ResourceManager};
use miette::{IntoDiagnostic, Result, WrapErr};

/// Build a manager against the ambient kubeconfig or in-cluster config.
pub async fn manager() -> Result<ResourceManager> {
    let client = KubeResourceClient::new()
        .await
        .into_diagnostic()
        .wrap_err("connecting to the cluster")?;
    Ok(ResourceManager::new(Arc::new(client)))
}
