//! Wait command - block until Kustomizations report Ready

use basecamp_kube::ConsoleSink;
use console::style;
use miette::{IntoDiagnostic, Result};

/// Run the wait command
pub async fn run(message: &str, names: &[String]) -> Result<()> {
    let manager = crate::util::manager().await?;
    let sink = ConsoleSink::new();
    manager
        .wait_for_kustomizations(message, names, &sink)
        .await
        .into_diagnostic()?;
    println!("{} {}", style("ready").green(), names.join(", "));
    Ok(())
}
