//! Sources command - surface Git and OCI repository failures

use console::style;
use miette::{IntoDiagnostic, Result};

/// Run the sources command
pub async fn run() -> Result<()> {
    let manager = crate::util::manager().await?;
    manager.check_git_repository_status().await.into_diagnostic()?;
    println!("{} all Git and OCI sources ready", style("ok").green());
    Ok(())
}
