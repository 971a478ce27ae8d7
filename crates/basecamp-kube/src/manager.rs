//! Resource manager: the reconciliation core
//!
//! Orchestrates the client contract into higher-level operations: apply with
//! merge, delete with confirmation, readiness waiting, status aggregation,
//! node polling, helm-release discovery, suspend patches. Holds no mutable
//! state across calls; configuration is set at construction and read-only
//! afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::client::{ApplyOptions, DeleteOptions, ResourceClient};
use crate::error::{ClusterError, Result};
use crate::flux::{GitRepository, HelmRelease, Kustomization, OciRepository};
use crate::progress::{NodeState, ProgressSink, classify_nodes, transitions};
use crate::resource::{ResourceRef, Unstructured, gvr};
use crate::validate::validate_resource;

/// Terminal reason on a Kustomization's Ready=False condition.
const RECONCILIATION_FAILED: &str = "ReconciliationFailed";

/// Merge patch applied by the suspend operations.
const SUSPEND_PATCH: &[u8] = br#"{"spec":{"suspend":true}}"#;

/// Read-only manager configuration.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Namespace the Flux toolkit resources live in
    pub flux_namespace: String,
    /// Field manager identity for server-side apply and patches
    pub field_manager: String,
    /// Tick interval for resource readiness and deletion-confirmation polls
    pub poll_interval: Duration,
    /// Tick interval for node readiness polls
    pub node_poll_interval: Duration,
    /// Tick interval for API liveness probes
    pub health_poll_interval: Duration,
    /// Overall bound on deletion confirmation
    pub delete_timeout: Duration,
    /// Overall bound on resource readiness waits
    pub wait_timeout: Duration,
    /// Default bound on the health wait when the caller supplies none
    pub health_timeout: Duration,
    /// Pause between deleting an immutable ConfigMap and re-applying it
    pub immutable_replace_pause: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            flux_namespace: "flux-system".to_string(),
            field_manager: "basecamp".to_string(),
            poll_interval: Duration::from_secs(5),
            node_poll_interval: Duration::from_secs(2),
            health_poll_interval: Duration::from_secs(5),
            delete_timeout: Duration::from_secs(120),
            wait_timeout: Duration::from_secs(300),
            health_timeout: Duration::from_secs(300),
            immutable_replace_pause: Duration::from_secs(1),
        }
    }
}

/// The reconciliation core. Owns its client as a constructor-supplied
/// dependency so managers against different clusters can coexist.
pub struct ResourceManager {
    client: Option<Arc<dyn ResourceClient>>,
    config: ManagerConfig,
}

impl ResourceManager {
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        Self::with_config(client, ManagerConfig::default())
    }

    pub fn with_config(client: Arc<dyn ResourceClient>, config: ManagerConfig) -> Self {
        Self {
            client: Some(client),
            config,
        }
    }

    /// A manager without a client; every operation fails with
    /// [`ClusterError::NotConfigured`] until [`set_client`](Self::set_client)
    /// is called.
    pub fn unconfigured() -> Self {
        Self {
            client: None,
            config: ManagerConfig::default(),
        }
    }

    pub fn set_client(&mut self, client: Arc<dyn ResourceClient>) {
        self.client = Some(client);
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn client(&self) -> Result<&Arc<dyn ResourceClient>> {
        self.client.as_ref().ok_or(ClusterError::NotConfigured)
    }

    // ========== Apply ==========

    /// Converge remote state to the desired object.
    ///
    /// One fetch-merge-apply pass: when the object already exists, the
    /// desired document is shallow-merged over it, the existing
    /// resourceVersion is carried over, and the apply is forced (the existing
    /// object has field ownership the merge may touch). When it does not
    /// exist, the desired object is applied as-is with the caller's options.
    async fn apply_with_merge(
        &self,
        target: &ResourceRef,
        desired: &Unstructured,
        options: &ApplyOptions,
    ) -> Result<Unstructured> {
        let client = self.client()?;
        match client.get(target).await {
            Ok(existing) => {
                debug!(target = %target, "object exists, merging before apply");
                let merged = desired.merged_over(&existing);
                let forced = options.clone().forced();
                Ok(client.apply(target, &merged, &forced).await?)
            }
            Err(e) if e.is_not_found() => {
                debug!(target = %target, "object absent, applying fresh");
                Ok(client.apply(target, desired, options).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate and apply a generic resource document.
    pub async fn apply_resource(&self, object: &Unstructured) -> Result<Unstructured> {
        self.client()?;
        validate_resource(object)?;
        let target = ResourceRef::for_object(object)?;
        let options = ApplyOptions::new(&self.config.field_manager);
        self.apply_with_merge(&target, object, &options).await
    }

    pub async fn apply_kustomization(&self, kustomization: &Kustomization) -> Result<()> {
        self.apply_resource(&kustomization.to_unstructured())
            .await
            .map(drop)
    }

    pub async fn apply_git_repository(&self, repository: &GitRepository) -> Result<()> {
        self.apply_resource(&repository.to_unstructured())
            .await
            .map(drop)
    }

    pub async fn apply_oci_repository(&self, repository: &OciRepository) -> Result<()> {
        self.apply_resource(&repository.to_unstructured())
            .await
            .map(drop)
    }

    pub async fn create_namespace(&self, name: &str) -> Result<()> {
        let object = Unstructured::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name },
            "spec": {},
        }))?;
        self.apply_resource(&object).await.map(drop)
    }

    /// Apply a ConfigMap, replacing it when the existing object is immutable.
    ///
    /// Immutable ConfigMaps cannot be updated in place: the existing object
    /// is deleted first and a short pause taken before the normal apply pass
    /// runs, so the replacement does not race the removal.
    pub async fn apply_config_map(
        &self,
        name: &str,
        namespace: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<()> {
        let object = Unstructured::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": name, "namespace": namespace },
            "data": data,
        }))?;
        let client = self.client()?;
        validate_resource(&object)?;

        let target = ResourceRef::config_map(name, namespace);
        match client.get(&target).await {
            Ok(existing) => {
                if existing.nested_bool(&["spec", "immutable"]).unwrap_or(false) {
                    debug!(target = %target, "existing configmap is immutable, replacing");
                    if let Err(e) = client.delete(&target, &DeleteOptions::default()).await {
                        return Err(ClusterError::ImmutableConfigMap {
                            name: name.to_string(),
                            message: e.to_string(),
                        });
                    }
                    sleep(self.config.immutable_replace_pause).await;
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let options = ApplyOptions::new(&self.config.field_manager);
        self.apply_with_merge(&target, &object, &options)
            .await
            .map(drop)
    }

    // ========== Delete ==========

    /// Delete a Kustomization and poll until it is gone.
    ///
    /// Background propagation lets the parent disappear from listings while
    /// dependents are cleaned up asynchronously. A not-found response from
    /// the delete itself means already deleted and counts as success.
    pub async fn delete_kustomization(&self, name: &str, namespace: &str) -> Result<()> {
        let client = self.client()?;
        let target = ResourceRef::kustomization(name, namespace);

        match client.delete(&target, &DeleteOptions::background()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let deadline = Instant::now() + self.config.delete_timeout;
        loop {
            match client.get(&target).await {
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e.into()),
                Ok(_) => debug!(target = %target, "still present after delete"),
            }
            if Instant::now() >= deadline {
                return Err(ClusterError::Timeout {
                    waiting_for: format!("deletion of kustomization '{name}'"),
                });
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// Delete a namespace. No propagation override and no confirmation
    /// polling; the single delete call's result is returned directly.
    pub async fn delete_namespace(&self, name: &str) -> Result<()> {
        let client = self.client()?;
        let target = ResourceRef::namespace(name);
        client.delete(&target, &DeleteOptions::default()).await?;
        Ok(())
    }

    // ========== Readiness ==========

    /// Wait until every named Kustomization reports Ready=True.
    ///
    /// A fetch failure or a missing/unready condition marks the round
    /// not-ready and polling continues; every name is checked within the
    /// same tick before the round is decided.
    pub async fn wait_for_kustomizations(
        &self,
        message: &str,
        names: &[String],
        sink: &dyn ProgressSink,
    ) -> Result<()> {
        let client = self.client()?;
        sink.start(message);
        let deadline = Instant::now() + self.config.wait_timeout;

        loop {
            let mut all_ready = true;
            for name in names {
                let target = ResourceRef::kustomization(name, &self.config.flux_namespace);
                let ready = matches!(client.get(&target).await, Ok(obj) if obj.is_ready());
                if !ready {
                    all_ready = false;
                }
            }

            if all_ready {
                sink.stop();
                sink.line(&format!("Kustomizations ready: {}", names.join(", ")));
                return Ok(());
            }
            if Instant::now() >= deadline {
                sink.stop();
                sink.line(&format!(
                    "Timed out waiting for kustomizations: {}",
                    names.join(", ")
                ));
                return Err(ClusterError::Timeout {
                    waiting_for: format!("kustomizations [{}] to become ready", names.join(", ")),
                });
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// One-shot readiness snapshot for the named Kustomizations.
    ///
    /// A Ready=False condition with the terminal ReconciliationFailed reason
    /// aborts the whole call; any name absent from the listing is reported
    /// as not ready (it may simply not exist yet).
    pub async fn get_kustomization_status(
        &self,
        names: &[String],
    ) -> Result<BTreeMap<String, bool>> {
        let client = self.client()?;
        let listing = client
            .list(&ResourceRef::listing(
                gvr::KUSTOMIZATION,
                Some(&self.config.flux_namespace),
            ))
            .await?;

        let mut status: BTreeMap<String, bool> =
            names.iter().map(|n| (n.clone(), false)).collect();
        for object in listing {
            let Some(name) = object.name() else { continue };
            if !status.contains_key(name) {
                continue;
            }
            match object.ready_condition() {
                Some(c) if c.is_true() => {
                    status.insert(name.to_string(), true);
                }
                Some(c) if c.is_false() && c.reason == RECONCILIATION_FAILED => {
                    return Err(ClusterError::ReconciliationFailed {
                        name: name.to_string(),
                        message: c.message,
                    });
                }
                _ => {}
            }
        }
        Ok(status)
    }

    /// Check all Git and OCI repository sources in the Flux namespace.
    ///
    /// For sources, any Ready=False is a reportable failure; GitRepositories
    /// are checked before OCIRepositories and the first failure wins.
    pub async fn check_git_repository_status(&self) -> Result<()> {
        let client = self.client()?;
        for (kind, resource) in [
            ("GitRepository", gvr::GIT_REPOSITORY),
            ("OCIRepository", gvr::OCI_REPOSITORY),
        ] {
            let listing = client
                .list(&ResourceRef::listing(
                    resource,
                    Some(&self.config.flux_namespace),
                ))
                .await?;
            for object in listing {
                if let Some(condition) = object.ready_condition()
                    && condition.is_false()
                {
                    return Err(ClusterError::SourceNotReady {
                        kind: kind.to_string(),
                        name: object.name().unwrap_or("unknown").to_string(),
                        message: condition.message,
                    });
                }
            }
        }
        Ok(())
    }

    // ========== Health and nodes ==========

    /// Wait for the API server liveness probe to succeed, then for the named
    /// nodes (if any) to become ready. The caller's deadline applies to both
    /// phases together; absent, it defaults to the configured health timeout.
    pub async fn wait_for_kubernetes_healthy(
        &self,
        endpoint: &str,
        node_names: &[String],
        timeout: Option<Duration>,
        sink: &dyn ProgressSink,
    ) -> Result<()> {
        let client = self.client()?;
        let deadline = Instant::now() + timeout.unwrap_or(self.config.health_timeout);

        sink.start(&format!("Waiting for Kubernetes API at {endpoint}"));
        loop {
            match client.check_health(endpoint).await {
                Ok(()) => break,
                Err(e) => debug!(error = %e, "liveness probe not ready"),
            }
            if Instant::now() >= deadline {
                sink.stop();
                return Err(ClusterError::Timeout {
                    waiting_for: format!("kubernetes api at {endpoint}"),
                });
            }
            sleep(self.config.health_poll_interval).await;
        }
        sink.stop();
        sink.line(&format!("Kubernetes API at {endpoint} is healthy"));

        if !node_names.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            self.wait_for_nodes_ready(node_names, remaining, sink).await?;
        }
        Ok(())
    }

    /// Poll node readiness until every named node is ready.
    ///
    /// Each poll classifies every node as missing, not ready, or ready, and
    /// emits one line per node whose classification changed. On timeout a
    /// closing poll distinguishes nodes that never appeared from nodes that
    /// never became ready.
    pub async fn wait_for_nodes_ready(
        &self,
        names: &[String],
        timeout: Duration,
        sink: &dyn ProgressSink,
    ) -> Result<()> {
        let client = self.client()?;
        if names.is_empty() {
            return Ok(());
        }
        let deadline = Instant::now() + timeout;
        let mut previous = BTreeMap::new();

        loop {
            let statuses = client.node_ready_status(names).await?;
            let current = classify_nodes(names, &statuses);
            for (name, state) in transitions(&previous, &current) {
                sink.line(&format!("Node {name}: {state}"));
            }
            if current.values().all(|s| *s == NodeState::Ready) {
                return Ok(());
            }
            previous = current;

            if Instant::now() >= deadline {
                let statuses = client
                    .node_ready_status(names)
                    .await
                    .map_err(ClusterError::FinalNodeCheck)?;
                let closing = classify_nodes(names, &statuses);
                if closing.values().all(|s| *s == NodeState::Ready) {
                    return Ok(());
                }
                let group = |wanted: NodeState| {
                    closing
                        .iter()
                        .filter(|(_, s)| **s == wanted)
                        .map(|(n, _)| n.clone())
                        .collect::<Vec<_>>()
                };
                return Err(ClusterError::NodesNotReady {
                    missing: group(NodeState::Missing),
                    not_ready: group(NodeState::NotReady),
                });
            }
            sleep(self.config.node_poll_interval).await;
        }
    }

    /// Current ready state per node, straight from the client.
    pub async fn get_node_ready_status(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, bool>> {
        let client = self.client()?;
        Ok(client.node_ready_status(names).await?)
    }

    // ========== Helm releases ==========

    /// HelmReleases recorded in a Kustomization's inventory.
    ///
    /// A missing Kustomization yields an empty list; it may legitimately
    /// have no children yet. Fetch errors on a discovered release abort the
    /// whole call.
    pub async fn get_helm_releases_for_kustomization(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Vec<HelmRelease>> {
        let client = self.client()?;
        let target = ResourceRef::kustomization(name, namespace);
        let object = match client.get(&target).await {
            Ok(object) => object,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut releases = Vec::new();
        for entry in object.inventory_entries() {
            if !entry.is_helm_release() {
                continue;
            }
            let release_target = ResourceRef::helm_release(&entry.name, &entry.namespace);
            let release = client.get(&release_target).await?;
            releases.push(HelmRelease::from_unstructured(&release)?);
        }
        Ok(releases)
    }

    // ========== Suspend ==========

    /// Suspend reconciliation of a Kustomization via merge patch. No
    /// existence check; a missing resource surfaces as an ordinary error.
    pub async fn suspend_kustomization(&self, name: &str, namespace: &str) -> Result<()> {
        let client = self.client()?;
        let target = ResourceRef::kustomization(name, namespace);
        client
            .patch(&target, SUSPEND_PATCH, &self.config.field_manager)
            .await?;
        Ok(())
    }

    /// Suspend reconciliation of a HelmRelease via merge patch.
    pub async fn suspend_helm_release(&self, name: &str, namespace: &str) -> Result<()> {
        let client = self.client()?;
        let target = ResourceRef::helm_release(name, namespace);
        client
            .patch(&target, SUSPEND_PATCH, &self.config.field_manager)
            .await?;
        Ok(())
    }
}
