//! Releases command - HelmReleases managed by a Kustomization

use console::style;
use miette::{IntoDiagnostic, Result};

/// Run the releases command
pub async fn run(name: &str, namespace: &str) -> Result<()> {
    let manager = crate::util::manager().await?;
    let releases = manager
        .get_helm_releases_for_kustomization(name, namespace)
        .await
        .into_diagnostic()?;

    if releases.is_empty() {
        println!("no helm releases managed by {namespace}/{name}");
        return Ok(());
    }

    println!("{}", style("HELM RELEASES").bold().underlined());
    for release in &releases {
        let state = if release.suspended {
            style("Suspended").yellow()
        } else if release.ready {
            style("Ready").green()
        } else {
            style("NotReady").yellow()
        };
        println!(
            "  {:<30} {:<20} {:<24} {:<10} {}",
            release.name,
            release.namespace,
            release.chart.as_deref().unwrap_or("-"),
            release.version.as_deref().unwrap_or("-"),
            state
        );
    }
    Ok(())
}
