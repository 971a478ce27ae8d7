//! The resource-client contract
//!
//! A narrow, stateless-per-call boundary over the remote resource API. The
//! manager only ever talks to this trait; the kube-backed implementation
//! lives in [`kube`] and a scripted test double in [`mock`]. Auth and
//! transport concerns stay behind the implementation.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::resource::{ResourceRef, Unstructured};

pub mod kube;
pub mod mock;

pub use self::kube::KubeResourceClient;
pub use self::mock::{MockCall, MockResourceClient};

/// Options for a server-side apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Writer identity for field ownership tracking
    pub field_manager: String,
    /// Overwrite fields owned by other field managers
    pub force: bool,
}

impl ApplyOptions {
    pub fn new(field_manager: &str) -> Self {
        Self {
            field_manager: field_manager.to_string(),
            force: false,
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// How deletion of a parent relates to deletion of its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Parent disappears immediately; dependents are cleaned up asynchronously
    Background,
    /// Parent remains until dependents are gone
    Foreground,
}

/// Options for a delete. An absent propagation leaves the policy to the
/// server's default for that resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub propagation: Option<Propagation>,
}

impl DeleteOptions {
    pub fn background() -> Self {
        Self {
            propagation: Some(Propagation::Background),
        }
    }

    pub fn foreground() -> Self {
        Self {
            propagation: Some(Propagation::Foreground),
        }
    }
}

/// The remote resource API as the manager sees it.
///
/// Every operation is addressed by a [`ResourceRef`]; objects cross the
/// boundary in generic form only. Implementations translate remote failures
/// into the structured kinds of
/// [`ClientError`](crate::error::ClientError) so callers never inspect
/// message text.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch a single object.
    async fn get(&self, target: &ResourceRef) -> ClientResult<Unstructured>;

    /// List all objects of the ref's resource in its namespace. The ref's
    /// name is ignored.
    async fn list(&self, target: &ResourceRef) -> ClientResult<Vec<Unstructured>>;

    /// Server-side apply: declare full-document ownership for the options'
    /// field manager.
    async fn apply(
        &self,
        target: &ResourceRef,
        object: &Unstructured,
        options: &ApplyOptions,
    ) -> ClientResult<Unstructured>;

    /// Delete an object.
    async fn delete(&self, target: &ResourceRef, options: &DeleteOptions) -> ClientResult<()>;

    /// JSON merge patch.
    async fn patch(
        &self,
        target: &ResourceRef,
        patch: &[u8],
        field_manager: &str,
    ) -> ClientResult<Unstructured>;

    /// Probe the API server's liveness endpoint.
    async fn check_health(&self, endpoint: &str) -> ClientResult<()>;

    /// Ready state per node. Nodes that have not registered are absent from
    /// the map. An empty `names` slice reports every node.
    async fn node_ready_status(&self, names: &[String]) -> ClientResult<HashMap<String, bool>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_options_builder() {
        let options = ApplyOptions::new("basecamp");
        assert_eq!(options.field_manager, "basecamp");
        assert!(!options.force);
        assert!(options.forced().force);
    }

    #[test]
    fn delete_options_default_leaves_policy_to_server() {
        assert_eq!(DeleteOptions::default().propagation, None);
        assert_eq!(
            DeleteOptions::background().propagation,
            Some(Propagation::Background)
        );
        assert_eq!(
            DeleteOptions::foreground().propagation,
            Some(Propagation::Foreground)
        );
    }
}
