//! Delete command - remove a Kustomization and confirm it is gone

use console::style;
use miette::{IntoDiagnostic, Result};

/// Run the delete-kustomization command
pub async fn run(name: &str, namespace: &str) -> Result<()> {
    let manager = crate::util::manager().await?;
    manager
        .delete_kustomization(name, namespace)
        .await
        .into_diagnostic()?;
    println!(
        "{} kustomization {}/{}",
        style("deleted").red(),
        namespace,
        style(name).cyan()
    );
    Ok(())
}
