//! Nodes command - current ready state of cluster nodes

use console::style;
use miette::{IntoDiagnostic, Result};

/// Run the nodes command
pub async fn run(names: &[String]) -> Result<()> {
    let manager = crate::util::manager().await?;
    let statuses = manager.get_node_ready_status(names).await.into_diagnostic()?;

    println!("{}", style("NODES").bold().underlined());
    let mut nodes: Vec<_> = statuses.iter().map(|(n, r)| (n.clone(), *r)).collect();
    nodes.sort();
    for (name, ready) in nodes {
        let state = if ready {
            style("Ready").green()
        } else {
            style("NotReady").yellow()
        };
        println!("  {name:<40} {state}");
    }

    // Requested nodes the cluster has never seen.
    for name in names {
        if !statuses.contains_key(name) {
            println!("  {name:<40} {}", style("Missing").red());
        }
    }
    Ok(())
}
