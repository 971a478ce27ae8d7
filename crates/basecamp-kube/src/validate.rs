//! Pre-apply field validation
//!
//! Minimal required-field checks that keep malformed requests off the wire.
//! This is not schema validation: only the fields the manager itself relies
//! on are inspected.

use serde_json::Value;

use crate::error::{ClusterError, Result};
use crate::resource::Unstructured;

/// Validate a desired object before any client call.
///
/// Rules:
/// - `metadata` must be present and a mapping
/// - `metadata.name` must be non-empty after trimming whitespace
/// - ConfigMaps must carry a `data` key that is neither null nor an empty
///   mapping
/// - every other kind must carry a `spec` key (content uninspected)
pub fn validate_resource(object: &Unstructured) -> Result<()> {
    let metadata = object
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| ClusterError::Validation("metadata must be a mapping".into()))?;

    let name_ok = metadata
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .is_some_and(|n| !n.is_empty());
    if !name_ok {
        return Err(ClusterError::Validation(
            "metadata.name must be a non-empty string".into(),
        ));
    }

    if object.kind() == Some("ConfigMap") {
        match object.get("data") {
            None => {
                return Err(ClusterError::Validation(
                    "configmap must carry a data key".into(),
                ));
            }
            Some(Value::Null) => {
                return Err(ClusterError::Validation(
                    "configmap data must not be null".into(),
                ));
            }
            Some(Value::Object(map)) if map.is_empty() => {
                return Err(ClusterError::Validation(
                    "configmap data must not be empty".into(),
                ));
            }
            Some(_) => {}
        }
    } else if object.get("spec").is_none() {
        return Err(ClusterError::Validation(format!(
            "{} must carry a spec",
            object.kind().unwrap_or("resource")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Unstructured {
        Unstructured::from_value(value).unwrap()
    }

    #[test]
    fn accepts_well_formed_resource() {
        let obj = doc(json!({
            "kind": "Kustomization",
            "metadata": { "name": "web" },
            "spec": {},
        }));
        assert!(validate_resource(&obj).is_ok());
    }

    #[test]
    fn rejects_missing_or_non_mapping_metadata() {
        assert!(validate_resource(&doc(json!({ "kind": "Kustomization" }))).is_err());
        assert!(
            validate_resource(&doc(json!({ "kind": "Kustomization", "metadata": "oops" })))
                .is_err()
        );
    }

    #[test]
    fn rejects_blank_names() {
        for name in [json!(""), json!("   "), json!(null), json!(7)] {
            let obj = doc(json!({
                "kind": "Namespace",
                "metadata": { "name": name },
                "spec": {},
            }));
            assert!(validate_resource(&obj).is_err(), "name {name:?} accepted");
        }
    }

    #[test]
    fn trims_whitespace_around_names() {
        let obj = doc(json!({
            "kind": "Namespace",
            "metadata": { "name": "  prod  " },
            "spec": {},
        }));
        assert!(validate_resource(&obj).is_ok());
    }

    #[test]
    fn configmap_data_rules() {
        let missing = doc(json!({ "kind": "ConfigMap", "metadata": { "name": "c" } }));
        assert!(validate_resource(&missing).is_err());

        let null = doc(json!({
            "kind": "ConfigMap", "metadata": { "name": "c" }, "data": null,
        }));
        assert!(validate_resource(&null).is_err());

        let empty = doc(json!({
            "kind": "ConfigMap", "metadata": { "name": "c" }, "data": {},
        }));
        assert!(validate_resource(&empty).is_err());

        let populated = doc(json!({
            "kind": "ConfigMap", "metadata": { "name": "c" }, "data": { "k": "v" },
        }));
        assert!(validate_resource(&populated).is_ok());
    }

    #[test]
    fn non_configmap_requires_spec() {
        let no_spec = doc(json!({ "kind": "GitRepository", "metadata": { "name": "r" } }));
        assert!(validate_resource(&no_spec).is_err());

        let empty_spec = doc(json!({
            "kind": "GitRepository", "metadata": { "name": "r" }, "spec": {},
        }));
        assert!(validate_resource(&empty_spec).is_ok());
    }
}
