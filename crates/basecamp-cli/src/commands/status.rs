//! Status command - one-shot readiness report for Kustomizations

use console::style;
use miette::{IntoDiagnostic, Result};

/// Run the status command
pub async fn run(names: &[String]) -> Result<()> {
    let manager = crate::util::manager().await?;
    let status = manager
        .get_kustomization_status(names)
        .await
        .into_diagnostic()?;

    println!("{}", style("KUSTOMIZATIONS").bold().underlined());
    for (name, ready) in &status {
        let state = if *ready {
            style("Ready").green()
        } else {
            style("NotReady").yellow()
        };
        println!("  {name:<40} {state}");
    }
    Ok(())
}
