//! Generic, schema-free resource representation
//!
//! Every object that crosses the client boundary is a nested string-keyed
//! document. Typed views ([`crate::flux`]) exist only at the manager's public
//! boundary; condition lookup, inventory parsing, and the apply merge all
//! work on the generic form so the manager never depends on a closed set of
//! schemas.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// API group, version, and plural resource name for the kinds basecamp
/// manages. Versions follow the Flux CRD tables.
pub mod gvr {
    pub const KUSTOMIZATION: (&str, &str, &str) =
        ("kustomize.toolkit.fluxcd.io", "v1", "kustomizations");
    pub const HELM_RELEASE: (&str, &str, &str) = ("helm.toolkit.fluxcd.io", "v2", "helmreleases");
    pub const GIT_REPOSITORY: (&str, &str, &str) =
        ("source.toolkit.fluxcd.io", "v1", "gitrepositories");
    pub const OCI_REPOSITORY: (&str, &str, &str) =
        ("source.toolkit.fluxcd.io", "v1", "ocirepositories");
    pub const NAMESPACE: (&str, &str, &str) = ("", "v1", "namespaces");
    pub const CONFIG_MAP: (&str, &str, &str) = ("", "v1", "configmaps");
    pub const NODE: (&str, &str, &str) = ("", "v1", "nodes");
}

/// The API group that owns HelmRelease objects, as it appears in inventory ids.
pub const HELM_RELEASE_GROUP: &str = "helm.toolkit.fluxcd.io";

/// Coordinates of a remote resource.
///
/// `namespace` is `None` for cluster-scoped resources; `name` is empty only
/// when the ref addresses a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceRef {
    pub fn new(
        (group, version, resource): (&str, &str, &str),
        namespace: Option<&str>,
        name: &str,
    ) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn kustomization(name: &str, namespace: &str) -> Self {
        Self::new(gvr::KUSTOMIZATION, Some(namespace), name)
    }

    pub fn helm_release(name: &str, namespace: &str) -> Self {
        Self::new(gvr::HELM_RELEASE, Some(namespace), name)
    }

    pub fn git_repository(name: &str, namespace: &str) -> Self {
        Self::new(gvr::GIT_REPOSITORY, Some(namespace), name)
    }

    pub fn oci_repository(name: &str, namespace: &str) -> Self {
        Self::new(gvr::OCI_REPOSITORY, Some(namespace), name)
    }

    pub fn namespace(name: &str) -> Self {
        Self::new(gvr::NAMESPACE, None, name)
    }

    pub fn config_map(name: &str, namespace: &str) -> Self {
        Self::new(gvr::CONFIG_MAP, Some(namespace), name)
    }

    /// A ref addressing all objects of one resource in a namespace.
    pub fn listing(kind: (&str, &str, &str), namespace: Option<&str>) -> Self {
        Self::new(kind, namespace, "")
    }

    /// Derive coordinates from an object's own `kind` and metadata.
    ///
    /// Only the kinds basecamp manages are recognised; anything else is a
    /// validation failure before any network call is made.
    pub fn for_object(object: &Unstructured) -> Result<Self, crate::error::ClusterError> {
        let kind = object.kind().unwrap_or_default();
        let gvr = match kind {
            "Kustomization" => gvr::KUSTOMIZATION,
            "HelmRelease" => gvr::HELM_RELEASE,
            "GitRepository" => gvr::GIT_REPOSITORY,
            "OCIRepository" => gvr::OCI_REPOSITORY,
            "Namespace" => gvr::NAMESPACE,
            "ConfigMap" => gvr::CONFIG_MAP,
            other => {
                return Err(crate::error::ClusterError::Validation(format!(
                    "unsupported kind '{other}'"
                )));
            }
        };
        let name = object
            .name()
            .ok_or_else(|| crate::error::ClusterError::Validation("missing metadata.name".into()))?;
        Ok(Self::new(gvr, object.namespace(), name))
    }

    /// apiVersion string as it appears on wire objects.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.resource, ns, self.name),
            None => write!(f, "{}/{}", self.resource, self.name),
        }
    }
}

/// A single entry in `status.conditions`. Only `type == "Ready"` is
/// interpreted by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }

    pub fn is_false(&self) -> bool {
        self.status == "False"
    }
}

/// Parsed form of a Kustomization inventory id: four `_`-joined segments,
/// `namespace_name_group_kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub namespace: String,
    pub name: String,
    pub group: String,
    pub kind: String,
}

impl InventoryEntry {
    /// Parse an inventory id. Ids with fewer than four segments are ignored
    /// rather than treated as errors; the inventory records kinds basecamp
    /// has no interest in.
    pub fn parse(id: &str) -> Option<Self> {
        let segments: Vec<&str> = id.split('_').collect();
        if segments.len() < 4 {
            return None;
        }
        Some(Self {
            namespace: segments[0].to_string(),
            name: segments[1].to_string(),
            group: segments[2].to_string(),
            kind: segments[3].to_string(),
        })
    }

    pub fn is_helm_release(&self) -> bool {
        self.group == HELM_RELEASE_GROUP && self.kind == "HelmRelease"
    }
}

/// A schema-free resource document: an ordered string-keyed map of arbitrary
/// nested values. Built per call and never cached.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unstructured(pub Map<String, Value>);

impl Unstructured {
    /// Wrap a JSON value; fails unless it is an object.
    pub fn from_value(value: Value) -> Result<Self, crate::error::ClusterError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(crate::error::ClusterError::Serialization(format!(
                "expected an object document, got {other}"
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Walk a path of object keys. Returns `None` when any hop is absent or
    /// not a mapping.
    pub fn nested(&self, path: &[&str]) -> Option<&Value> {
        let mut current: &Value = self.0.get(*path.first()?)?;
        for key in &path[1..] {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    pub fn nested_str(&self, path: &[&str]) -> Option<&str> {
        self.nested(path)?.as_str()
    }

    pub fn nested_bool(&self, path: &[&str]) -> Option<bool> {
        self.nested(path)?.as_bool()
    }

    pub fn nested_array(&self, path: &[&str]) -> Option<&Vec<Value>> {
        self.nested(path)?.as_array()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.nested_str(&["apiVersion"])
    }

    pub fn kind(&self) -> Option<&str> {
        self.nested_str(&["kind"])
    }

    pub fn name(&self) -> Option<&str> {
        self.nested_str(&["metadata", "name"])
    }

    pub fn namespace(&self) -> Option<&str> {
        self.nested_str(&["metadata", "namespace"])
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.nested_str(&["metadata", "resourceVersion"])
    }

    pub fn set_resource_version(&mut self, rv: &str) {
        let metadata = self
            .0
            .entry("metadata".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(map) = metadata.as_object_mut() {
            map.insert("resourceVersion".to_string(), Value::String(rv.to_string()));
        }
    }

    /// Decode `status.conditions`, skipping malformed entries.
    pub fn conditions(&self) -> Vec<Condition> {
        self.nested_array(&["status", "conditions"])
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `Ready` condition, if the object carries one.
    pub fn ready_condition(&self) -> Option<Condition> {
        self.conditions().into_iter().find(|c| c.type_ == "Ready")
    }

    /// True when a `Ready` condition exists with status `True`.
    pub fn is_ready(&self) -> bool {
        self.ready_condition().is_some_and(|c| c.is_true())
    }

    /// Parsed `status.inventory.entries`, unparseable ids skipped.
    pub fn inventory_entries(&self) -> Vec<InventoryEntry> {
        self.nested_array(&["status", "inventory", "entries"])
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.get("id")?.as_str())
                    .filter_map(InventoryEntry::parse)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shallow-merge this (desired) document over an existing one.
    ///
    /// Top-level keys from the desired document win; keys present only in
    /// the existing document (server-populated status, finalizers) are
    /// preserved. The existing `resourceVersion` is carried onto the result
    /// so the subsequent apply targets the state that was just read.
    pub fn merged_over(&self, existing: &Unstructured) -> Unstructured {
        let mut merged = existing.clone();
        for (key, value) in &self.0 {
            merged.0.insert(key.clone(), value.clone());
        }
        if let Some(rv) = existing.resource_version() {
            let rv = rv.to_string();
            merged.set_resource_version(&rv);
        }
        merged
    }

    /// Human-readable identity for error context.
    pub fn display_name(&self) -> String {
        let kind = self.kind().unwrap_or("unknown");
        let name = self.name().unwrap_or("unnamed");
        match self.namespace() {
            Some(ns) => format!("{ns}/{kind}/{name}"),
            None => format!("{kind}/{name}"),
        }
    }
}
