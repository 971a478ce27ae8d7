//! Suspend command - pause reconciliation of Flux resources

use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};

/// What kind of resource to suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuspendKind {
    Kustomization,
    Helmrelease,
}

/// Run the suspend command
pub async fn run(kind: SuspendKind, name: &str, namespace: &str) -> Result<()> {
    let manager = crate::util::manager().await?;
    match kind {
        SuspendKind::Kustomization => manager
            .suspend_kustomization(name, namespace)
            .await
            .into_diagnostic()?,
        SuspendKind::Helmrelease => manager
            .suspend_helm_release(name, namespace)
            .await
            .into_diagnostic()?,
    }
    println!(
        "{} {}/{}",
        style("suspended").yellow(),
        namespace,
        style(name).cyan()
    );
    Ok(())
}
