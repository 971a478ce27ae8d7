//! Basecamp Kube - cluster reconciliation for Basecamp
//!
//! This crate provides:
//! - **Generic Resources**: Schema-free documents addressed by group/version/resource
//! - **Resource Manager**: Apply with merge, confirmed deletes, readiness waits, status aggregation
//! - **Client Contract**: A narrow async trait with a kube-rs backend and a scripted test double
//! - **Flux Views**: Typed Kustomization, GitRepository, OCIRepository, and HelmRelease boundaries
//! - **Health Checks**: API liveness probing and node readiness polling
//! - **Progress Reporting**: Spinner-backed feedback during long waits

pub mod client;
pub mod error;
pub mod flux;
pub mod manager;
pub mod progress;
pub mod resource;
pub mod validate;

pub use client::{
    ApplyOptions, DeleteOptions, KubeResourceClient, MockResourceClient, Propagation,
    ResourceClient,
};
pub use error::{ClientError, ClusterError, Result};
pub use flux::{GitRepository, HelmRelease, Kustomization, OciRepository, SourceRef};
pub use manager::{ManagerConfig, ResourceManager};
pub use progress::{ConsoleSink, NodeState, NoopSink, ProgressSink, RecordingSink};
pub use resource::{Condition, InventoryEntry, ResourceRef, Unstructured};
pub use validate::validate_resource;
