use std::collections::{HashMap, HashSet};

use crate::naming::identifier;
use crate::types::*;

/// Check a change descriptor before it is rendered.
///
/// The renderer accepts anything; this is where shape problems surface.
/// Colliding identifiers are reported, never merged.
pub fn validate(change: &ChangeDescriptor) -> ValidateResult {
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut warnings: Vec<Diagnostic> = Vec::new();

    // PBM-E001: Empty collection name
    if change.collection_name().trim().is_empty() {
        errors.push(error("PBM-E001", "Collection name is empty".to_string()));
    }

    match change {
        ChangeDescriptor::Create(collection) => {
            validate_fields(&collection.name, &collection.fields, &mut errors, &mut warnings);
        }
        ChangeDescriptor::UpdateFields { collection, fields } => {
            validate_fields(collection, fields, &mut errors, &mut warnings);
        }
        ChangeDescriptor::AddField { collection, field } => {
            validate_fields(
                collection,
                std::slice::from_ref(field),
                &mut errors,
                &mut warnings,
            );
        }
        ChangeDescriptor::RemoveField { field, .. } => {
            if field.trim().is_empty() {
                errors.push(error("PBM-E002", "Field name is empty".to_string()));
            }
        }
        ChangeDescriptor::UpdateCollection { collection, update } => {
            // PBM-E006: Nothing to change
            if update.is_empty() {
                errors.push(error(
                    "PBM-E006",
                    format!("Update of collection \"{collection}\" changes nothing"),
                ));
            }
            // PBM-W003: Rename to the same name
            if let Some(ref new_name) = update.new_name {
                if new_name == collection {
                    warnings.push(warning(
                        "PBM-W003",
                        format!("Collection \"{collection}\" is renamed to its current name"),
                    ));
                }
                if new_name.trim().is_empty() {
                    errors.push(error("PBM-E001", "New collection name is empty".to_string()));
                }
            }
        }
        ChangeDescriptor::Delete { .. } => {}
    }

    ValidateResult { errors, warnings }
}

fn validate_fields(
    collection: &str,
    fields: &[FieldDescriptor],
    errors: &mut Vec<Diagnostic>,
    warnings: &mut Vec<Diagnostic>,
) {
    let mut ids: HashMap<String, &str> = HashMap::new();

    for field in fields {
        // PBM-E002: Empty field name
        if field.name.trim().is_empty() {
            errors.push(error(
                "PBM-E002",
                format!("Field name is empty in collection \"{collection}\""),
            ));
            continue;
        }

        // PBM-E003: Identifier collision
        let id = identifier(&field.name);
        if let Some(first) = ids.get(&id) {
            errors.push(error(
                "PBM-E003",
                format!(
                    "Fields \"{}\" and \"{}\" in collection \"{}\" both map to identifier \"{}\"",
                    first, field.name, collection, id
                ),
            ));
        } else {
            ids.insert(id, &field.name);
        }

        match &field.kind {
            FieldKind::Select { options } => {
                // PBM-E004: Select without options
                if options.is_empty() {
                    errors.push(error(
                        "PBM-E004",
                        format!("Select field \"{}\" has no options", field.name),
                    ));
                }
                // PBM-W001: Duplicate select option
                let mut seen: HashSet<&str> = HashSet::new();
                for option in options {
                    if !seen.insert(option) {
                        warnings.push(warning(
                            "PBM-W001",
                            format!(
                                "Select field \"{}\" lists option \"{}\" more than once",
                                field.name, option
                            ),
                        ));
                    }
                }
            }
            FieldKind::Relation {
                related_collection_id,
                ..
            } => {
                // PBM-E005: Relation without target
                if related_collection_id
                    .as_deref()
                    .is_none_or(|id| id.trim().is_empty())
                {
                    errors.push(error(
                        "PBM-E005",
                        format!("Relation field \"{}\" has no collectionId", field.name),
                    ));
                }
            }
            FieldKind::Number {
                min: Some(min),
                max: Some(max),
                ..
            } => {
                // PBM-W002: Inverted bounds
                if *max != 0.0 && min > max {
                    warnings.push(warning(
                        "PBM-W002",
                        format!(
                            "Number field \"{}\" has min {} greater than max {}",
                            field.name, min, max
                        ),
                    ));
                }
            }
            _ => {}
        }
    }
}

fn error(code: &str, message: String) -> Diagnostic {
    Diagnostic {
        code: code.into(),
        severity: DiagnosticSeverity::Error,
        message,
    }
}

fn warning(code: &str, message: String) -> Diagnostic {
    Diagnostic {
        code: code.into(),
        severity: DiagnosticSeverity::Warning,
        message,
    }
}
