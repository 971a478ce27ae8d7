//! Namespace commands - create and delete namespaces

use console::style;
use miette::{IntoDiagnostic, Result};

/// Run the create-namespace command
pub async fn create(name: &str) -> Result<()> {
    let manager = crate::util::manager().await?;
    manager.create_namespace(name).await.into_diagnostic()?;
    println!("{} namespace {}", style("created").green(), style(name).cyan());
    Ok(())
}

/// Run the delete-namespace command
pub async fn delete(name: &str) -> Result<()> {
    let manager = crate::util::manager().await?;
    manager.delete_namespace(name).await.into_diagnostic()?;
    println!("{} namespace {}", style("deleted").red(), style(name).cyan());
    Ok(())
}
