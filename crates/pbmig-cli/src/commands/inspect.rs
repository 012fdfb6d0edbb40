use pbmig_core::{
    classify, extract_collection, extract_collection_update, extract_fields, from_script,
    ChangeKind,
};
use serde_json::json;

use crate::store::MigrationStore;

pub fn run_list(store: &MigrationStore) -> Result<String, String> {
    let names = store.list().map_err(|e| e.to_string())?;
    if names.is_empty() {
        return Ok(format!("No migrations found in {}", store.dir().display()));
    }

    let count = names.len();
    let word = if count == 1 { "migration" } else { "migrations" };
    let mut lines = names;
    lines.push(format!("\n{count} {word} in {}", store.dir().display()));
    Ok(lines.join("\n"))
}

pub fn run_view(store: &MigrationStore, name: &str) -> Result<String, String> {
    let content = store.read(name).map_err(|e| e.to_string())?;
    Ok(content.trim_end().to_string())
}

/// Classification plus whatever descriptors the script yields, as JSON.
pub fn run_inspect(store: &MigrationStore, name: &str) -> Result<String, String> {
    let content = store.read(name).map_err(|e| e.to_string())?;
    let classification = classify(&content);

    let mut output = json!({
        "file": name,
        "classification": classification,
        "fields": extract_fields(&content),
    });
    match classification.kind {
        ChangeKind::Create => {
            if let Some(collection) = extract_collection(&content) {
                output["collection"] = json!(collection);
            }
        }
        ChangeKind::Update if classification.recognized => {
            output["update"] = json!(extract_collection_update(&content));
        }
        _ => {}
    }

    serde_json::to_string_pretty(&output).map_err(|e| format!("JSON serialization error: {e}"))
}

pub fn run_payload(store: &MigrationStore, name: &str) -> Result<String, String> {
    let content = store.read(name).map_err(|e| e.to_string())?;
    let request = from_script(&content).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&request).map_err(|e| format!("JSON serialization error: {e}"))
}
