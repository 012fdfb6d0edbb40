//! Translation into the collection requests the live service accepts.
//!
//! Nothing here talks to the service. A [`CollectionRequest`] is the method,
//! path and JSON body a client would send to apply the same change.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::classifier::classify;
use crate::error::{MigrationError, MigrationResult};
use crate::introspect::{apply_section, extract_collection, extract_collection_update, extract_fields};
use crate::types::*;

pub const COLLECTIONS_PATH: &str = "/api/collections";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRequest {
    pub method: Method,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl CollectionRequest {
    /// The collection name is percent-encoded as one path segment.
    fn new(method: Method, collection: Option<&str>, body: Option<Value>) -> Self {
        let path = match collection {
            Some(name) => format!("{COLLECTIONS_PATH}/{}", urlencoding::encode(name)),
            None => COLLECTIONS_PATH.to_string(),
        };
        Self { method, path, body }
    }
}

/// A single field in request form, with the defaults a rendered script carries.
pub fn field_request(field: &FieldDescriptor) -> Value {
    let mut body = Map::new();
    body.insert("name".into(), field.name.clone().into());
    body.insert("type".into(), field.kind.type_name().into());
    body.insert("required".into(), field.required.into());

    match field.kind.with_render_defaults() {
        FieldKind::Text { max_length } => {
            if let Some(max) = max_length {
                body.insert("max".into(), max.into());
            }
        }
        FieldKind::Number { min, max, non_zero } => {
            if let Some(min) = min {
                body.insert("min".into(), min.into());
            }
            if let Some(max) = max {
                body.insert("max".into(), max.into());
            }
            if let Some(non_zero) = non_zero {
                body.insert("nonZero".into(), non_zero.into());
            }
        }
        FieldKind::Select { options } => {
            body.insert("values".into(), options.into());
        }
        FieldKind::File { max_selections } => {
            if let Some(max) = max_selections {
                body.insert("maxSelect".into(), max.into());
            }
            body.insert("maxSize".into(), DEFAULT_FILE_MAX_SIZE.into());
        }
        FieldKind::Relation {
            related_collection_id,
            max_selections,
            cascade_delete,
        } => {
            if let Some(id) = related_collection_id {
                body.insert("collectionId".into(), id.into());
            }
            if let Some(max) = max_selections {
                body.insert("maxSelect".into(), max.into());
            }
            if let Some(cascade) = cascade_delete {
                body.insert("cascadeDelete".into(), cascade.into());
            }
        }
        _ => {}
    }
    Value::Object(body)
}

/// `{"fields": [...]}`, replacing the whole field list.
pub fn fields_request(fields: &[FieldDescriptor]) -> Value {
    let mut body = Map::new();
    body.insert(
        "fields".into(),
        Value::Array(fields.iter().map(field_request).collect()),
    );
    Value::Object(body)
}

/// Full body for creating `collection`. Rules are always present, `null` when unset.
pub fn collection_request(collection: &CollectionDescriptor) -> Value {
    let mut body = Map::new();
    body.insert("name".into(), collection.name.clone().into());
    body.insert("type".into(), collection.kind.as_str().into());
    body.insert(
        "fields".into(),
        Value::Array(collection.fields.iter().map(field_request).collect()),
    );
    for (key, rule) in collection.rules() {
        body.insert(key.into(), rule_value(rule));
    }
    Value::Object(body)
}

/// Only what the update touches: the new name and the rules it sets or clears.
pub fn update_request(update: &CollectionUpdate) -> Value {
    let mut body = Map::new();
    if let Some(ref name) = update.new_name {
        body.insert("name".into(), name.clone().into());
    }
    for (key, rule) in update.rules() {
        if let Some(rule) = rule {
            body.insert(key.into(), rule_value(rule));
        }
    }
    Value::Object(body)
}

/// The request applying `change`. Adding or removing a single field has no
/// request of its own: the service only accepts whole field lists.
pub fn change_request(change: &ChangeDescriptor) -> MigrationResult<CollectionRequest> {
    match change {
        ChangeDescriptor::Create(collection) => Ok(CollectionRequest::new(
            Method::Post,
            None,
            Some(collection_request(collection)),
        )),
        ChangeDescriptor::UpdateCollection { collection, update } => Ok(CollectionRequest::new(
            Method::Patch,
            Some(collection),
            Some(update_request(update)),
        )),
        ChangeDescriptor::Delete { collection } => Ok(CollectionRequest::new(
            Method::Delete,
            Some(collection),
            None,
        )),
        ChangeDescriptor::UpdateFields { collection, fields } => Ok(CollectionRequest::new(
            Method::Patch,
            Some(collection),
            Some(fields_request(fields)),
        )),
        ChangeDescriptor::AddField { .. } | ChangeDescriptor::RemoveField { .. } => {
            Err(single_field_unsupported(change.kind()))
        }
    }
}

/// Classify `script` and rebuild the request its apply step corresponds to.
pub fn from_script(script: &str) -> MigrationResult<CollectionRequest> {
    let classification = classify(script);
    classification.ensure_resolved()?;
    let name = classification.collection.as_str();

    match classification.kind {
        ChangeKind::Create => {
            let collection = extract_collection(script).ok_or_else(|| {
                MigrationError::UnsupportedPattern(format!(
                    "collection definition for \"{name}\" not found"
                ))
            })?;
            Ok(CollectionRequest::new(
                Method::Post,
                None,
                Some(collection_request(&collection)),
            ))
        }
        ChangeKind::Update => {
            let update = extract_collection_update(script);
            if update.is_empty() {
                return Err(MigrationError::UnsupportedPattern(format!(
                    "no literal name or rule assignment found for \"{name}\""
                )));
            }
            Ok(CollectionRequest::new(
                Method::Patch,
                Some(name),
                Some(update_request(&update)),
            ))
        }
        ChangeKind::UpdateFields => {
            let fields = extract_fields(apply_section(script));
            Ok(CollectionRequest::new(
                Method::Patch,
                Some(name),
                Some(fields_request(&fields)),
            ))
        }
        ChangeKind::Delete => Ok(CollectionRequest::new(Method::Delete, Some(name), None)),
        kind @ (ChangeKind::AddField | ChangeKind::RemoveField) => {
            Err(single_field_unsupported(kind))
        }
    }
}

fn single_field_unsupported(kind: ChangeKind) -> MigrationError {
    MigrationError::UnsupportedPattern(format!(
        "{kind} has no collection request; send the full field list instead"
    ))
}

fn rule_value(rule: Option<&str>) -> Value {
    rule.map_or(Value::Null, Value::from)
}
