use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIGRATIONS_DIR: &str = "./pb_migrations";
pub const DEFAULT_EXTENSION: &str = "js";

/// Settings threaded through rendering and the file store.
///
/// Nothing here is process-global: callers build one and pass it along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub migrations_dir: PathBuf,
    pub extension: String,
    /// Rule applied to a new collection's access rules when its descriptor
    /// leaves them out. `None` keeps them null.
    pub default_rule: Option<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            default_rule: None,
        }
    }
}

impl MigrationConfig {
    /// Fill the access rules a raw collection descriptor omits with
    /// `default_rule`. Rules present in the input (including explicit `null`)
    /// are left alone.
    pub fn fill_default_rules(&self, descriptor: &mut serde_json::Value) {
        let Some(rule) = &self.default_rule else {
            return;
        };
        let Some(obj) = descriptor.as_object_mut() else {
            return;
        };
        for key in ["listRule", "createRule", "updateRule", "deleteRule"] {
            if !obj.contains_key(key) {
                obj.insert(key.to_string(), serde_json::Value::String(rule.clone()));
            }
        }
    }
}
