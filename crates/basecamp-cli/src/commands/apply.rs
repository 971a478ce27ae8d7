//! Apply command - converge the cluster to manifest files

use std::path::PathBuf;

use basecamp_kube::Unstructured;
use console::style;
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use serde::Deserialize;

/// Parse a manifest file into documents, skipping empty ones.
fn parse_documents(text: &str) -> Result<Vec<Unstructured>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_json::Value::deserialize(document)
            .map_err(|e| miette!("invalid YAML document: {e}"))?;
        if value.is_null() {
            continue;
        }
        documents.push(Unstructured::from_value(value).into_diagnostic()?);
    }
    Ok(documents)
}

/// Run the apply command
pub async fn run(files: &[PathBuf]) -> Result<()> {
    let manager = crate::util::manager().await?;

    let mut applied = 0usize;
    for file in files {
        let text = std::fs::read_to_string(file)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {}", file.display()))?;
        let documents =
            parse_documents(&text).wrap_err_with(|| format!("parsing {}", file.display()))?;

        for object in documents {
            let name = object.display_name();
            manager
                .apply_resource(&object)
                .await
                .into_diagnostic()
                .wrap_err_with(|| format!("applying {name}"))?;
            println!("{} {}", style("applied").green(), name);
            applied += 1;
        }
    }

    println!("{} resource(s) applied", style(applied).bold());
    Ok(())
}
