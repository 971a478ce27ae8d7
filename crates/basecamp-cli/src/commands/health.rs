//! Health command - wait for the API server and nodes

use std::time::Duration;

use basecamp_kube::ConsoleSink;
use console::style;
use miette::{IntoDiagnostic, Result};

/// Run the health command
pub async fn run(endpoint: &str, nodes: &[String], timeout: Option<Duration>) -> Result<()> {
    let manager = crate::util::manager().await?;
    let sink = ConsoleSink::new();
    manager
        .wait_for_kubernetes_healthy(endpoint, nodes, timeout, &sink)
        .await
        .into_diagnostic()?;
    println!("{} cluster is healthy", style("ok").green());
    Ok(())
}
