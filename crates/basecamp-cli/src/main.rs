//! Basecamp CLI - Flux-based cluster reconciliation from the command line

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::EnvFilter;

mod commands;
mod util;

#[derive(Parser)]
#[command(name = "basecamp")]
#[command(author = "Basecamp Contributors")]
#[command(version)]
#[command(about = "Flux-based cluster reconciliation from the command line", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply resource manifests to the cluster
    Apply {
        /// Manifest file(s); each may contain multiple YAML documents
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Create a namespace
    CreateNamespace {
        /// Namespace name
        name: String,
    },

    /// Delete a Kustomization and wait until it is gone
    DeleteKustomization {
        /// Kustomization name
        name: String,

        /// Namespace the Kustomization lives in
        #[arg(short, long, default_value = "flux-system")]
        namespace: String,
    },

    /// Delete a namespace
    DeleteNamespace {
        /// Namespace name
        name: String,
    },

    /// Wait until the named Kustomizations report Ready
    Wait {
        /// Kustomization name(s)
        #[arg(required = true)]
        names: Vec<String>,

        /// Message shown while waiting
        #[arg(short, long, default_value = "Waiting for kustomizations")]
        message: String,
    },

    /// One-shot readiness report for the named Kustomizations
    Status {
        /// Kustomization name(s)
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Check every Git and OCI repository source for failures
    Sources,

    /// List the HelmReleases managed by a Kustomization
    Releases {
        /// Kustomization name
        name: String,

        /// Namespace the Kustomization lives in
        #[arg(short, long, default_value = "flux-system")]
        namespace: String,
    },

    /// Suspend reconciliation of a Kustomization or HelmRelease
    Suspend {
        /// What to suspend
        #[arg(value_enum)]
        kind: commands::suspend::SuspendKind,

        /// Resource name
        name: String,

        /// Namespace the resource lives in
        #[arg(short, long, default_value = "flux-system")]
        namespace: String,
    },

    /// Show the ready state of cluster nodes
    Nodes {
        /// Node name(s); empty shows every node
        names: Vec<String>,
    },

    /// Wait until the cluster API is healthy and the named nodes are ready
    Health {
        /// API server endpoint, e.g. https://host:6443
        endpoint: String,

        /// Node name(s) that must also become ready
        #[arg(long = "node")]
        nodes: Vec<String>,

        /// Overall timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("basecamp=debug,basecamp_kube=debug,kube=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Apply { files } => commands::apply::run(&files).await,

        Commands::CreateNamespace { name } => commands::namespace::create(&name).await,

        Commands::DeleteKustomization { name, namespace } => {
            commands::delete::run(&name, &namespace).await
        }

        Commands::DeleteNamespace { name } => commands::namespace::delete(&name).await,

        Commands::Wait { names, message } => commands::wait::run(&message, &names).await,

        Commands::Status { names } => commands::status::run(&names).await,

        Commands::Sources => commands::sources::run().await,

        Commands::Releases { name, namespace } => commands::releases::run(&name, &namespace).await,

        Commands::Suspend {
            kind,
            name,
            namespace,
        } => commands::suspend::run(kind, &name, &namespace).await,

        Commands::Nodes { names } => commands::nodes::run(&names).await,

        Commands::Health {
            endpoint,
            nodes,
            timeout,
        } => commands::health::run(&endpoint, &nodes, timeout.map(Duration::from_secs)).await,
    }
}
