//! Typed views over Flux resources
//!
//! These structs exist only at the manager's public boundary: callers
//! describe what they want with plain fields, and the view is converted to an
//! [`Unstructured`] document at the client boundary. Decoding back from the
//! generic form is explicit and fallible.

use serde_json::json;

use crate::error::{ClusterError, Result};
use crate::resource::{ResourceRef, Unstructured, gvr};

/// Reference from a Kustomization to the source it renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub kind: String,
    pub name: String,
}

impl SourceRef {
    pub fn git_repository(name: &str) -> Self {
        Self {
            kind: "GitRepository".to_string(),
            name: name.to_string(),
        }
    }

    pub fn oci_repository(name: &str) -> Self {
        Self {
            kind: "OCIRepository".to_string(),
            name: name.to_string(),
        }
    }
}

/// Desired state of a Flux Kustomization.
#[derive(Debug, Clone)]
pub struct Kustomization {
    pub name: String,
    pub namespace: String,
    pub interval: String,
    pub path: String,
    pub prune: bool,
    pub source_ref: SourceRef,
    pub target_namespace: Option<String>,
    pub wait: bool,
    pub timeout: Option<String>,
}

impl Kustomization {
    pub fn to_unstructured(&self) -> Unstructured {
        let mut spec = json!({
            "interval": self.interval,
            "path": self.path,
            "prune": self.prune,
            "wait": self.wait,
            "sourceRef": {
                "kind": self.source_ref.kind,
                "name": self.source_ref.name,
            },
        });
        if let Some(target) = &self.target_namespace {
            spec["targetNamespace"] = json!(target);
        }
        if let Some(timeout) = &self.timeout {
            spec["timeout"] = json!(timeout);
        }

        let gvr = ResourceRef::new(gvr::KUSTOMIZATION, None, "");
        Unstructured::from_value(json!({
            "apiVersion": gvr.api_version(),
            "kind": "Kustomization",
            "metadata": { "name": self.name, "namespace": self.namespace },
            "spec": spec,
        }))
        .expect("kustomization document is an object")
    }
}

/// Desired state of a Flux GitRepository source.
#[derive(Debug, Clone)]
pub struct GitRepository {
    pub name: String,
    pub namespace: String,
    pub url: String,
    pub interval: String,
    pub branch: Option<String>,
    pub tag: Option<String>,
    /// Name of the secret carrying repository credentials
    pub secret_ref: Option<String>,
}

impl GitRepository {
    pub fn to_unstructured(&self) -> Unstructured {
        let mut reference = json!({});
        if let Some(branch) = &self.branch {
            reference["branch"] = json!(branch);
        }
        if let Some(tag) = &self.tag {
            reference["tag"] = json!(tag);
        }

        let mut spec = json!({
            "url": self.url,
            "interval": self.interval,
            "ref": reference,
        });
        if let Some(secret) = &self.secret_ref {
            spec["secretRef"] = json!({ "name": secret });
        }

        let gvr = ResourceRef::new(gvr::GIT_REPOSITORY, None, "");
        Unstructured::from_value(json!({
            "apiVersion": gvr.api_version(),
            "kind": "GitRepository",
            "metadata": { "name": self.name, "namespace": self.namespace },
            "spec": spec,
        }))
        .expect("git repository document is an object")
    }
}

/// Desired state of a Flux OCIRepository source.
#[derive(Debug, Clone)]
pub struct OciRepository {
    pub name: String,
    pub namespace: String,
    pub url: String,
    pub interval: String,
    pub tag: Option<String>,
}

impl OciRepository {
    pub fn to_unstructured(&self) -> Unstructured {
        let mut spec = json!({
            "url": self.url,
            "interval": self.interval,
        });
        if let Some(tag) = &self.tag {
            spec["ref"] = json!({ "tag": tag });
        }

        let gvr = ResourceRef::new(gvr::OCI_REPOSITORY, None, "");
        Unstructured::from_value(json!({
            "apiVersion": gvr.api_version(),
            "kind": "OCIRepository",
            "metadata": { "name": self.name, "namespace": self.namespace },
            "spec": spec,
        }))
        .expect("oci repository document is an object")
    }
}

/// Read-side view of a HelmRelease, decoded from the generic form when
/// discovered through a Kustomization's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmRelease {
    pub name: String,
    pub namespace: String,
    pub chart: Option<String>,
    pub version: Option<String>,
    pub suspended: bool,
    pub ready: bool,
}

impl HelmRelease {
    pub fn from_unstructured(object: &Unstructured) -> Result<Self> {
        let name = object
            .name()
            .ok_or_else(|| ClusterError::Serialization("helm release has no name".into()))?
            .to_string();
        let namespace = object.namespace().unwrap_or_default().to_string();

        Ok(Self {
            name,
            namespace,
            chart: object
                .nested_str(&["spec", "chart", "spec", "chart"])
                .map(str::to_string),
            version: object
                .nested_str(&["spec", "chart", "spec", "version"])
                .map(str::to_string),
            suspended: object.nested_bool(&["spec", "suspend"]).unwrap_or(false),
            ready: object.is_ready(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kustomization_document_shape() {
        let k = Kustomization {
            name: "apps".into(),
            namespace: "flux-system".into(),
            interval: "5m".into(),
            path: "./apps/prod".into(),
            prune: true,
            source_ref: SourceRef::git_repository("platform"),
            target_namespace: Some("prod".into()),
            wait: true,
            timeout: None,
        };

        let obj = k.to_unstructured();
        assert_eq!(obj.api_version(), Some("kustomize.toolkit.fluxcd.io/v1"));
        assert_eq!(obj.kind(), Some("Kustomization"));
        assert_eq!(obj.name(), Some("apps"));
        assert_eq!(obj.nested_str(&["spec", "path"]), Some("./apps/prod"));
        assert_eq!(obj.nested_bool(&["spec", "prune"]), Some(true));
        assert_eq!(
            obj.nested_str(&["spec", "sourceRef", "kind"]),
            Some("GitRepository")
        );
        assert_eq!(obj.nested_str(&["spec", "targetNamespace"]), Some("prod"));
        assert_eq!(obj.nested(&["spec", "timeout"]), None);
    }

    #[test]
    fn git_repository_document_shape() {
        let repo = GitRepository {
            name: "platform".into(),
            namespace: "flux-system".into(),
            url: "ssh://git@example.com/platform.git".into(),
            interval: "1m".into(),
            branch: Some("main".into()),
            tag: None,
            secret_ref: Some("deploy-key".into()),
        };

        let obj = repo.to_unstructured();
        assert_eq!(obj.api_version(), Some("source.toolkit.fluxcd.io/v1"));
        assert_eq!(obj.nested_str(&["spec", "ref", "branch"]), Some("main"));
        assert_eq!(
            obj.nested_str(&["spec", "secretRef", "name"]),
            Some("deploy-key")
        );
    }

    #[test]
    fn oci_repository_document_shape() {
        let repo = OciRepository {
            name: "images".into(),
            namespace: "flux-system".into(),
            url: "oci://registry.example.com/manifests".into(),
            interval: "10m".into(),
            tag: Some("latest".into()),
        };

        let obj = repo.to_unstructured();
        assert_eq!(obj.kind(), Some("OCIRepository"));
        assert_eq!(obj.nested_str(&["spec", "ref", "tag"]), Some("latest"));
    }

    #[test]
    fn helm_release_decode() {
        let obj = Unstructured::from_value(json!({
            "apiVersion": "helm.toolkit.fluxcd.io/v2",
            "kind": "HelmRelease",
            "metadata": { "name": "db", "namespace": "prod" },
            "spec": {
                "suspend": true,
                "chart": { "spec": { "chart": "postgresql", "version": "15.x" } },
            },
            "status": { "conditions": [ { "type": "Ready", "status": "True" } ] },
        }))
        .unwrap();

        let hr = HelmRelease::from_unstructured(&obj).unwrap();
        assert_eq!(hr.name, "db");
        assert_eq!(hr.namespace, "prod");
        assert_eq!(hr.chart.as_deref(), Some("postgresql"));
        assert_eq!(hr.version.as_deref(), Some("15.x"));
        assert!(hr.suspended);
        assert!(hr.ready);
    }

    #[test]
    fn helm_release_decode_requires_name() {
        let obj = Unstructured::from_value(json!({ "kind": "HelmRelease" })).unwrap();
        assert!(HelmRelease::from_unstructured(&obj).is_err());
    }
}
