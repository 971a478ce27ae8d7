//! kube-rs backed implementation of the resource-client contract

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams};
use kube::core::ApiResource;
use kube::{Client, api::PropagationPolicy};
use serde_json::Value;
use tracing::debug;

use crate::client::{ApplyOptions, DeleteOptions, Propagation, ResourceClient};
use crate::error::{ClientError, ClientResult, classify_not_found};
use crate::resource::{ResourceRef, Unstructured};

/// Timeout for a single liveness probe request.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Resource client backed by a kube-rs dynamic API.
pub struct KubeResourceClient {
    client: Client,
    http: reqwest::Client,
}

impl KubeResourceClient {
    /// Connect using the ambient kubeconfig or in-cluster configuration.
    pub async fn new() -> ClientResult<Self> {
        let client = Client::try_default().await?;
        Self::with_client(client)
    }

    /// Wrap an existing kube client.
    pub fn with_client(client: Client) -> ClientResult<Self> {
        // The probe endpoint is typically a fresh cluster whose CA the local
        // trust store does not know yet; the probe carries no data.
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Probe(e.to_string()))?;
        Ok(Self { client, http })
    }

    fn api_for(&self, target: &ResourceRef) -> Api<DynamicObject> {
        let ar = api_resource(target);
        match &target.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

fn api_resource(target: &ResourceRef) -> ApiResource {
    ApiResource {
        group: target.group.clone(),
        version: target.version.clone(),
        api_version: target.api_version(),
        kind: kind_for(&target.resource),
        plural: target.resource.clone(),
    }
}

/// Kind name for the plurals basecamp addresses. Unknown plurals fall back
/// to a capitalised singular guess; only display strings depend on it.
fn kind_for(resource: &str) -> String {
    match resource {
        "kustomizations" => "Kustomization".to_string(),
        "helmreleases" => "HelmRelease".to_string(),
        "gitrepositories" => "GitRepository".to_string(),
        "ocirepositories" => "OCIRepository".to_string(),
        "namespaces" => "Namespace".to_string(),
        "configmaps" => "ConfigMap".to_string(),
        "nodes" => "Node".to_string(),
        other => {
            let singular = other.strip_suffix('s').unwrap_or(other);
            let mut chars = singular.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

/// Map a kube error onto the structured client-error kinds.
///
/// A 404 for a namespaced operation whose message names the `namespaces`
/// resource means the namespace itself is missing; that is a different
/// failure than the addressed resource being absent and must not be treated
/// as idempotent success.
fn map_error(target: &ResourceRef, err: kube::Error) -> ClientError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => {
            let names_namespace = ae.message.to_lowercase().contains("namespaces \"");
            if target.resource != "namespaces" && names_namespace {
                ClientError::NamespaceNotFound {
                    namespace: target.namespace.clone().unwrap_or_default(),
                }
            } else if ae.reason == "NotFound" || classify_not_found(&ae.message) {
                ClientError::NotFound {
                    resource: target.resource.clone(),
                    name: target.name.clone(),
                }
            } else {
                ClientError::Api(kube::Error::Api(ae))
            }
        }
        kube::Error::Api(ae) if ae.code == 409 => ClientError::Conflict {
            resource: target.resource.clone(),
            name: target.name.clone(),
            message: ae.message,
        },
        other => ClientError::Api(other),
    }
}

fn to_unstructured(object: DynamicObject) -> ClientResult<Unstructured> {
    let value = serde_json::to_value(object)
        .map_err(|e| ClientError::Other(format!("failed to encode response object: {e}")))?;
    match value {
        Value::Object(map) => Ok(Unstructured(map)),
        _ => Err(ClientError::Other("response object is not a mapping".into())),
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get(&self, target: &ResourceRef) -> ClientResult<Unstructured> {
        debug!(target = %target, "get");
        let api = self.api_for(target);
        let object = api
            .get(&target.name)
            .await
            .map_err(|e| map_error(target, e))?;
        to_unstructured(object)
    }

    async fn list(&self, target: &ResourceRef) -> ClientResult<Vec<Unstructured>> {
        debug!(target = %target, "list");
        let api = self.api_for(target);
        let listing = api
            .list(&ListParams::default())
            .await
            .map_err(|e| map_error(target, e))?;
        listing.items.into_iter().map(to_unstructured).collect()
    }

    async fn apply(
        &self,
        target: &ResourceRef,
        object: &Unstructured,
        options: &ApplyOptions,
    ) -> ClientResult<Unstructured> {
        debug!(target = %target, force = options.force, "server-side apply");
        let api = self.api_for(target);
        let mut params = PatchParams::apply(&options.field_manager);
        params.force = options.force;
        let value = object.clone().into_value();
        let applied = api
            .patch(&target.name, &params, &Patch::Apply(&value))
            .await
            .map_err(|e| map_error(target, e))?;
        to_unstructured(applied)
    }

    async fn delete(&self, target: &ResourceRef, options: &DeleteOptions) -> ClientResult<()> {
        debug!(target = %target, "delete");
        let api = self.api_for(target);
        let params = DeleteParams {
            propagation_policy: options.propagation.map(|p| match p {
                Propagation::Background => PropagationPolicy::Background,
                Propagation::Foreground => PropagationPolicy::Foreground,
            }),
            ..Default::default()
        };
        api.delete(&target.name, &params)
            .await
            .map_err(|e| map_error(target, e))?;
        Ok(())
    }

    async fn patch(
        &self,
        target: &ResourceRef,
        patch: &[u8],
        field_manager: &str,
    ) -> ClientResult<Unstructured> {
        debug!(target = %target, "merge patch");
        let api = self.api_for(target);
        let body: Value = serde_json::from_slice(patch)
            .map_err(|e| ClientError::Other(format!("invalid merge patch: {e}")))?;
        let params = PatchParams {
            field_manager: Some(field_manager.to_string()),
            ..Default::default()
        };
        let patched = api
            .patch(&target.name, &params, &Patch::Merge(&body))
            .await
            .map_err(|e| map_error(target, e))?;
        to_unstructured(patched)
    }

    async fn check_health(&self, endpoint: &str) -> ClientResult<()> {
        let url = format!("{}/healthz", endpoint.trim_end_matches('/'));
        debug!(url = %url, "liveness probe");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Probe(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Probe(format!(
                "{url} returned status {}",
                response.status()
            )))
        }
    }

    async fn node_ready_status(&self, names: &[String]) -> ClientResult<HashMap<String, bool>> {
        debug!(?names, "node ready status");
        let api: Api<Node> = Api::all(self.client.clone());
        let listing = api.list(&ListParams::default()).await?;

        let mut statuses = HashMap::new();
        for node in listing.items {
            let Some(name) = node.metadata.name else {
                continue;
            };
            if !names.is_empty() && !names.contains(&name) {
                continue;
            }
            let ready = node
                .status
                .as_ref()
                .and_then(|s| s.conditions.as_ref())
                .map(|conditions| {
                    conditions
                        .iter()
                        .any(|c| c.type_ == "Ready" && c.status == "True")
                })
                .unwrap_or(false);
            statuses.insert(name, ready);
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_404(message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        })
    }

    #[test]
    fn kind_lookup_and_fallback() {
        assert_eq!(kind_for("kustomizations"), "Kustomization");
        assert_eq!(kind_for("nodes"), "Node");
        assert_eq!(kind_for("widgets"), "Widget");
    }

    #[test]
    fn api_resource_core_group() {
        let ar = api_resource(&ResourceRef::config_map("cfg", "prod"));
        assert_eq!(ar.api_version, "v1");
        assert_eq!(ar.plural, "configmaps");
        assert_eq!(ar.kind, "ConfigMap");
    }

    #[test]
    fn missing_resource_maps_to_not_found() {
        let target = ResourceRef::kustomization("web", "flux-system");
        let err = map_error(
            &target,
            api_404("kustomizations.kustomize.toolkit.fluxcd.io \"web\" not found"),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_namespace_maps_to_namespace_not_found() {
        let target = ResourceRef::kustomization("web", "ghost");
        let err = map_error(&target, api_404("namespaces \"ghost\" not found"));
        assert!(matches!(
            err,
            ClientError::NamespaceNotFound { ref namespace } if namespace == "ghost"
        ));
        assert!(!err.is_not_found());
    }

    #[test]
    fn deleting_a_namespace_itself_is_plain_not_found() {
        let target = ResourceRef::namespace("ghost");
        let err = map_error(&target, api_404("namespaces \"ghost\" not found"));
        assert!(err.is_not_found());
    }

    #[test]
    fn conflict_maps_to_conflict() {
        let target = ResourceRef::config_map("cfg", "prod");
        let err = map_error(
            &target,
            kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "field manager conflict".to_string(),
                reason: "Conflict".to_string(),
                code: 409,
            }),
        );
        assert!(matches!(err, ClientError::Conflict { .. }));
    }
}
