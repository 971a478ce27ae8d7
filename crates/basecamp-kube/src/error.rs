//! Error types for basecamp-kube

use thiserror::Error;

/// Result type for basecamp-kube operations
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Result type for the resource-client boundary
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by a [`ResourceClient`](crate::client::ResourceClient)
/// implementation.
///
/// The remote API often reports failures as loosely-worded messages; the
/// client boundary is responsible for turning those into structured kinds so
/// the manager never has to pattern-match on text. A missing namespace is
/// deliberately a different kind than a missing resource: deleting into a
/// namespace that does not exist is not an idempotent success.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The addressed resource does not exist
    #[error("{resource} '{name}' not found")]
    NotFound { resource: String, name: String },

    /// The target namespace does not exist
    #[error("namespace '{namespace}' not found")]
    NamespaceNotFound { namespace: String },

    /// Write conflict (server-side apply field ownership, stale resourceVersion)
    #[error("conflict while writing {resource} '{name}': {message}")]
    Conflict {
        resource: String,
        name: String,
        message: String,
    },

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Liveness probe failure
    #[error("health probe failed: {0}")]
    Probe(String),

    /// Anything else the remote side reported
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Check whether this error means "the resource does not exist".
    ///
    /// `NamespaceNotFound` is intentionally excluded.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Classify a raw error message as "resource not found".
///
/// Remote APIs that only hand back text use a handful of phrasings for a
/// missing object. Matching is case-insensitive. A message mentioning
/// "namespace not found" is never classified as not-found, even when it also
/// contains one of the recognised phrases.
pub fn classify_not_found(message: &str) -> bool {
    let lower = message.to_lowercase();

    if lower.contains("namespace not found") {
        return false;
    }

    lower.contains("resource not found")
        || lower.contains("could not find the requested resource")
        || lower.contains("the server could not find the requested resource")
        || lower.ends_with(" not found")
}

/// Errors produced by the [`ResourceManager`](crate::manager::ResourceManager).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClusterError {
    /// Manager used before a resource client was supplied
    #[error("resource manager has no client configured")]
    NotConfigured,

    /// Desired object failed pre-apply field validation
    #[error("invalid resource: {0}")]
    Validation(String),

    /// Error from the resource-client boundary
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A Kustomization reported a terminal reconciliation failure
    #[error("kustomization '{name}' failed to reconcile: {message}")]
    ReconciliationFailed { name: String, message: String },

    /// A Git or OCI repository source reported Ready=False
    #[error("{kind} '{name}' is not ready: {message}")]
    SourceNotReady {
        kind: String,
        name: String,
        message: String,
    },

    /// A bounded wait exhausted its deadline
    #[error("timed out waiting for {waiting_for}")]
    Timeout { waiting_for: String },

    /// Node wait exhausted its deadline; names split by failure mode
    #[error(
        "timed out waiting for nodes: [{}] never appeared, [{}] never became ready",
        .missing.join(", "),
        .not_ready.join(", ")
    )]
    NodesNotReady {
        missing: Vec<String>,
        not_ready: Vec<String>,
    },

    /// The closing node status check after a timeout itself failed
    #[error("timed out waiting for nodes and the final status check failed: {0}")]
    FinalNodeCheck(#[source] ClientError),

    /// An immutable ConfigMap could not be removed before replacement
    #[error("failed to delete immutable configmap '{name}': {message}")]
    ImmutableConfigMap { name: String, message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ClusterError {
    fn from(e: serde_json::Error) -> Self {
        ClusterError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_not_found_phrases_classify() {
        assert!(classify_not_found("resource not found"));
        assert!(classify_not_found("could not find the requested resource"));
        assert!(classify_not_found(
            "the server could not find the requested resource"
        ));
        assert!(classify_not_found("kustomizations.kustomize.toolkit.fluxcd.io \"web\" not found"));
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert!(classify_not_found("Resource Not Found"));
        assert!(classify_not_found("The Server Could Not Find The Requested Resource"));
        assert!(classify_not_found("deployment \"web\" Not Found"));
    }

    #[test]
    fn namespace_not_found_is_never_not_found() {
        assert!(!classify_not_found("namespace not found"));
        // Even when another recognised phrase is present as a substring.
        assert!(!classify_not_found(
            "namespace not found: could not find the requested resource"
        ));
        assert!(!classify_not_found("Namespace Not Found"));
    }

    #[test]
    fn unrelated_messages_do_not_classify() {
        assert!(!classify_not_found("connection refused"));
        assert!(!classify_not_found("not found in the middle of a sentence"));
        assert!(!classify_not_found(""));
    }

    #[test]
    fn client_error_is_not_found() {
        let e = ClientError::NotFound {
            resource: "kustomizations".into(),
            name: "web".into(),
        };
        assert!(e.is_not_found());

        let e = ClientError::NamespaceNotFound {
            namespace: "prod".into(),
        };
        assert!(!e.is_not_found());

        let e = ClientError::Other("boom".into());
        assert!(!e.is_not_found());
    }

    #[test]
    fn nodes_not_ready_message_names_both_groups() {
        let e = ClusterError::NodesNotReady {
            missing: vec!["worker-2".into()],
            not_ready: vec!["worker-0".into(), "worker-1".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("[worker-2] never appeared"));
        assert!(msg.contains("[worker-0, worker-1] never became ready"));
    }
}
