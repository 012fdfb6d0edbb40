use std::fs;
use std::path::{Path, PathBuf};

use pbmig_core::{ChangeDescriptor, CollectionDescriptor, FieldDescriptor, MigrationConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const CONFIG_FILE: &str = "pbmig.config.yaml";
pub const MIGRATIONS_DIR_ENV: &str = "POCKETBASE_MIGRATIONS_DIR";

/// Read project config from pbmig.config.yaml. A missing file is not an error.
pub fn read_project_config(config_path: &Path) -> Result<Option<MigrationConfig>, String> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read {}: {}", config_path.display(), e))?;
    let config: MigrationConfig = serde_yaml::from_str(&content)
        .map_err(|e| format!("Invalid YAML config {}: {}", config_path.display(), e))?;
    Ok(Some(config))
}

/// Effective configuration. The migrations directory comes from the flag,
/// then the environment, then the config file, then the built-in default.
pub fn resolve_config(
    dir_flag: Option<PathBuf>,
    config_path: Option<&Path>,
    env_dir: Option<String>,
) -> Result<MigrationConfig, String> {
    let config_path = config_path.unwrap_or(Path::new(CONFIG_FILE));
    let mut config = read_project_config(config_path)?.unwrap_or_default();

    if let Some(dir) = dir_flag {
        config.migrations_dir = dir;
    } else if let Some(dir) = env_dir.filter(|d| !d.trim().is_empty()) {
        config.migrations_dir = PathBuf::from(dir);
    }

    log::debug!(
        "migrations directory: {}, extension: {}",
        config.migrations_dir.display(),
        config.extension
    );
    Ok(config)
}

pub fn read_json(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| format!("Invalid {what}: {e}"))
}

/// A collection descriptor, with missing rules filled from `default_rule`.
pub fn read_collection(path: &Path, config: &MigrationConfig) -> Result<CollectionDescriptor, String> {
    let mut value = read_json(path)?;
    config.fill_default_rules(&mut value);
    decode(value, "collection descriptor")
}

/// Either a bare array of fields or an object with a `fields` array.
pub fn read_fields(path: &Path) -> Result<Vec<FieldDescriptor>, String> {
    match read_json(path)? {
        Value::Object(mut obj) => match obj.remove("fields") {
            Some(fields) => decode(fields, "field list"),
            None => Err(format!("No \"fields\" array in {}", path.display())),
        },
        other => decode(other, "field list"),
    }
}

pub fn parse_field(json: &str) -> Result<FieldDescriptor, String> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| format!("Invalid field JSON: {e}"))?;
    decode(value, "field descriptor")
}

/// A change descriptor tagged by `action`. Creations get the default rule
/// like [`read_collection`].
pub fn read_change(path: &Path, config: &MigrationConfig) -> Result<ChangeDescriptor, String> {
    let mut value = read_json(path)?;
    if value.get("action").and_then(Value::as_str) == Some("create") {
        config.fill_default_rules(&mut value);
    }
    decode(value, "change descriptor")
}

/// Command-line rule value: the literal `null` clears the rule.
pub fn parse_rule(raw: &str) -> Option<String> {
    if raw == "null" {
        None
    } else {
        Some(raw.to_string())
    }
}
