//! Identifier and file-name derivation.
//!
//! Every place that needs an identifier for a name (field ids, collection ids,
//! file-name slugs) goes through [`identifier`], so rendering and re-parsing
//! always agree.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::ChangeDescriptor;

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a name: trim, collapse whitespace runs to `_`, lower-case.
///
/// Distinct names may normalize to the same identifier ("Order Items" and
/// "order  items"); detecting that is the caller's job, see
/// [`crate::validator::validate`].
pub fn identifier(name: &str) -> String {
    RE_WHITESPACE
        .replace_all(name.trim(), "_")
        .to_lowercase()
}

/// The `{action}_{...}` part of a migration file name.
pub fn change_slug(change: &ChangeDescriptor) -> String {
    match change {
        ChangeDescriptor::Create(c) => format!("create_{}", identifier(&c.name)),
        ChangeDescriptor::UpdateCollection { collection, update } => {
            let action = if update.new_name.is_some() {
                "rename"
            } else {
                "update"
            };
            format!("{action}_{}", identifier(collection))
        }
        ChangeDescriptor::Delete { collection } => format!("delete_{}", identifier(collection)),
        ChangeDescriptor::AddField { collection, field } => format!(
            "add_field_{}_to_{}",
            identifier(&field.name),
            identifier(collection)
        ),
        ChangeDescriptor::RemoveField { collection, field } => format!(
            "remove_field_{}_from_{}",
            identifier(field),
            identifier(collection)
        ),
        ChangeDescriptor::UpdateFields { collection, .. } => {
            format!("update_fields_{}", identifier(collection))
        }
    }
}

/// `{unix-seconds}_{slug}.{extension}`
pub fn migration_file_name(timestamp: i64, slug: &str, extension: &str) -> String {
    format!("{timestamp}_{slug}.{extension}")
}

/// File name for a revert of `original`: `{unix-seconds}_revert_{original stem}.{extension}`.
///
/// The configured extension is stripped whole, so `pb.js` leaves no `.pb`
/// behind. Other names lose only their last extension.
pub fn revert_file_name(timestamp: i64, original: &str, extension: &str) -> String {
    let file_name = Path::new(original)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| original.to_string());
    let stem = match file_name.strip_suffix(&format!(".{extension}")) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => Path::new(&file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| identifier(original)),
    };
    migration_file_name(timestamp, &format!("revert_{stem}"), extension)
}
