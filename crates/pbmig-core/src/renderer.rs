//! Script Renderer: [`ChangeDescriptor`] -> migration script text.
//!
//! Output follows the platform's JS migration convention:
//!
//! ```text
//! migrate((db) => { /* apply */ }, (db) => { /* inverse */ });
//! ```
//!
//! Only "create" gets a real inverse. Every other change has no record of the
//! state it replaces, so its inverse throws.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::clock::{Clock, MonotonicClock, SystemClock};
use crate::config::MigrationConfig;
use crate::naming;
use crate::types::*;

pub struct Renderer<C = MonotonicClock> {
    config: MigrationConfig,
    clock: C,
}

impl Renderer {
    pub fn new(config: MigrationConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new(SystemClock))
    }
}

impl<C: Clock> Renderer<C> {
    pub fn with_clock(config: MigrationConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Render a change into a named script. Total for any descriptor; shape
    /// checks belong to [`crate::validator::validate`].
    pub fn render(&self, change: &ChangeDescriptor) -> RenderedScript {
        let generated_at = self.now();
        let file_name = naming::migration_file_name(
            generated_at.timestamp(),
            &naming::change_slug(change),
            &self.config.extension,
        );
        log::debug!(
            "rendering {} migration for \"{}\" as {}",
            change.kind(),
            change.collection_name(),
            file_name
        );
        RenderedScript::new(file_name, render_content(change, generated_at))
    }
}

/// Script text for `change`, stamped with `generated_at`.
pub fn render_content(change: &ChangeDescriptor, generated_at: DateTime<Utc>) -> String {
    let name = change.collection_name();
    let (title, apply, inverse) = match change {
        ChangeDescriptor::Create(collection) => (
            format!("Create {name} collection"),
            format!(
                "{}\n\n  return $app.save(collection);",
                collection_literal(collection)
            ),
            format!(
                "  return $app.delete($app.findCollectionByNameOrId({}));",
                js_str(name)
            ),
        ),
        ChangeDescriptor::UpdateCollection { update, .. } => {
            let mut apply = find_collection(name);
            let lines = update_lines(update);
            if !lines.is_empty() {
                apply.push_str("\n\n");
                apply.push_str(&lines.join("\n"));
            }
            apply.push_str("\n\n  return $app.save(collection);");
            (
                format!("Update {name} collection"),
                apply,
                fail(&format!("Cannot revert update of {name} collection")),
            )
        }
        ChangeDescriptor::Delete { .. } => (
            format!("Delete {name} collection"),
            format!(
                "{}\n\n  return $app.delete(collection);",
                find_collection(name)
            ),
            fail(&format!("Cannot revert deletion of {name} collection")),
        ),
        ChangeDescriptor::AddField { field, .. } => (
            format!("Add field to {name} collection"),
            format!(
                "{}\n\n  // Add new field to existing fields\n  collection.fields.push(\n{}\n  );\n\n  return $app.save(collection);",
                find_collection(name),
                field_block(field, 4)
            ),
            fail(&format!(
                "Cannot revert addition of field {} to {name} collection",
                field.name
            )),
        ),
        ChangeDescriptor::RemoveField { field, .. } => (
            format!("Remove field from {name} collection"),
            format!(
                "{}\n\n  // Remove the field by name\n{}\n\n  return $app.save(collection);",
                find_collection(name),
                remove_field_line(field)
            ),
            fail(&format!(
                "Cannot revert removal of field {field} from {name} collection"
            )),
        ),
        ChangeDescriptor::UpdateFields { fields, .. } => (
            format!("Update fields of {name} collection"),
            format!(
                "{}\n\n  // Replace all fields with new definition\n  collection.fields = [\n{}\n  ];\n\n  return $app.save(collection);",
                find_collection(name),
                field_list(fields, 4)
            ),
            fail(&format!(
                "Cannot revert field replacement on {name} collection"
            )),
        ),
    };

    format!(
        "{}{}",
        header(&[title], generated_at),
        migrate(&apply, &inverse)
    )
}

// ---------------------------------------------------------------------------
// Script building blocks (shared with the revert synthesizer)
// ---------------------------------------------------------------------------

/// Message suffix for inverse steps that have nothing to restore from.
const NOT_CAPTURED: &str = "original state not captured";

pub(crate) fn header(lines: &[String], generated_at: DateTime<Utc>) -> String {
    let mut out = String::from("/**\n");
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            out.push_str(&format!(" * PocketBase Migration - {}\n", comment_text(line)));
        } else {
            out.push_str(&format!(" * {}\n", comment_text(line)));
        }
    }
    out.push_str(&format!(
        " * Generated: {}\n */\n\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    out
}

pub(crate) fn migrate(apply: &str, inverse: &str) -> String {
    format!("migrate((db) => {{\n{apply}\n}}, (db) => {{\n{inverse}\n}});\n")
}

/// Statement that throws `message` when the step runs.
pub(crate) fn throw(message: &str) -> String {
    format!("  throw new Error({});", js_str(message))
}

fn fail(what: &str) -> String {
    throw(&format!("{what} - {NOT_CAPTURED}"))
}

pub(crate) fn find_collection(name: &str) -> String {
    format!(
        "  const collection = $app.findCollectionByNameOrId({});\n\n  if (!collection) {{\n  {}\n  }}",
        js_str(name),
        throw(&format!("Collection {name} not found"))
    )
}

pub(crate) fn collection_literal(collection: &CollectionDescriptor) -> String {
    let mut out = String::from("  const collection = new Collection({\n");
    out.push_str(&format!(
        "    id: {},\n",
        js_str(&naming::identifier(&collection.name))
    ));
    out.push_str(&format!("    name: {},\n", js_str(&collection.name)));
    out.push_str(&format!("    type: {},\n", js_str(collection.kind.as_str())));
    out.push_str("    system: false,\n\n    fields: [\n");
    if !collection.fields.is_empty() {
        out.push_str(&field_list(&collection.fields, 6));
        out.push('\n');
    }
    out.push_str("    ],\n\n");
    for (key, rule) in collection.rules() {
        out.push_str(&format!("    {key}: {},\n", js_rule(rule)));
    }
    out.push_str("  });");
    out
}

pub(crate) fn remove_field_line(field: &str) -> String {
    format!(
        "  collection.fields = collection.fields.filter(f => f.name !== {});",
        js_str(field)
    )
}

fn update_lines(update: &CollectionUpdate) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(ref new_name) = update.new_name {
        lines.push(format!("  collection.name = {};", js_str(new_name)));
    }
    for (key, rule) in update.rules() {
        if let Some(rule) = rule {
            lines.push(format!("  collection.{key} = {};", js_rule(rule)));
        }
    }
    lines
}

fn field_list(fields: &[FieldDescriptor], indent: usize) -> String {
    fields
        .iter()
        .map(|f| format!("{},", field_block(f, indent)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `new <Kind>Field({...})` construction, indented by `indent` spaces.
pub(crate) fn field_block(field: &FieldDescriptor, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = format!("{pad}new {}({{\n", field.kind.class_name());
    for (key, value) in field_props(field) {
        out.push_str(&format!("{pad}  {key}: {value},\n"));
    }
    out.push_str(&format!("{pad}}})"));
    out
}

fn field_props(field: &FieldDescriptor) -> Vec<(&'static str, String)> {
    let mut props = vec![
        ("id", js_str(&field.id())),
        ("name", js_str(&field.name)),
        ("required", field.required.to_string()),
    ];

    match &field.kind {
        FieldKind::Text { max_length } => {
            props.push(("max", max_length.unwrap_or(0).to_string()));
        }
        FieldKind::Number { min, max, non_zero } => {
            if let Some(min) = min {
                props.push(("min", js_number(*min)));
            }
            if let Some(max) = max.filter(|m| *m != 0.0) {
                props.push(("max", js_number(max)));
            }
            if let Some(non_zero) = non_zero {
                props.push(("nonZero", non_zero.to_string()));
            }
        }
        FieldKind::Select { options } => {
            props.push(("values", js_array(options)));
        }
        FieldKind::File { max_selections } => {
            props.push(("maxSelect", max_selections.unwrap_or(1).to_string()));
            props.push(("maxSize", DEFAULT_FILE_MAX_SIZE.to_string()));
        }
        FieldKind::Relation {
            related_collection_id,
            max_selections,
            cascade_delete,
        } => {
            props.push((
                "collectionId",
                js_str(related_collection_id.as_deref().unwrap_or("")),
            ));
            props.push(("maxSelect", max_selections.unwrap_or(1).to_string()));
            props.push(("cascadeDelete", cascade_delete.unwrap_or(false).to_string()));
        }
        FieldKind::Email
        | FieldKind::Url
        | FieldKind::Bool
        | FieldKind::Date
        | FieldKind::Json
        | FieldKind::Autodate => {}
    }

    props
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// Double-quoted, escaped string literal. JSON string syntax is valid JS.
pub(crate) fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

/// Rule value: string literal or the `null` sentinel.
pub(crate) fn js_rule(rule: Option<&str>) -> String {
    rule.map(js_str).unwrap_or_else(|| "null".to_string())
}

fn js_array(items: &[String]) -> String {
    let items: Vec<String> = items.iter().map(|s| js_str(s)).collect();
    format!("[{}]", items.join(", "))
}

fn js_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn comment_text(s: &str) -> String {
    s.replace("*/", "* /").replace(['\r', '\n'], " ")
}
