use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Field descriptors
// ---------------------------------------------------------------------------

/// Field kind together with the attributes that only make sense for that kind.
///
/// JSON keys follow the platform's field options (`max`, `values`, `maxSelect`, ...),
/// tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text {
        #[serde(rename = "max", default, skip_serializing_if = "Option::is_none")]
        max_length: Option<u64>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(rename = "nonZero", default, skip_serializing_if = "Option::is_none")]
        non_zero: Option<bool>,
    },
    Email,
    Url,
    #[serde(rename = "bool", alias = "boolean")]
    Bool,
    Date,
    Select {
        #[serde(rename = "values", default)]
        options: Vec<String>,
    },
    Json,
    File {
        #[serde(rename = "maxSelect", default, skip_serializing_if = "Option::is_none")]
        max_selections: Option<u32>,
    },
    Relation {
        #[serde(rename = "collectionId", default, skip_serializing_if = "Option::is_none")]
        related_collection_id: Option<String>,
        #[serde(rename = "maxSelect", default, skip_serializing_if = "Option::is_none")]
        max_selections: Option<u32>,
        #[serde(rename = "cascadeDelete", default, skip_serializing_if = "Option::is_none")]
        cascade_delete: Option<bool>,
    },
    Autodate,
}

/// Default upload limit written for file fields (5 MiB).
pub const DEFAULT_FILE_MAX_SIZE: u64 = 5_242_880;

impl FieldKind {
    pub fn text() -> Self {
        FieldKind::Text { max_length: None }
    }

    pub fn number() -> Self {
        FieldKind::Number {
            min: None,
            max: None,
            non_zero: None,
        }
    }

    pub fn select<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldKind::Select {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn file() -> Self {
        FieldKind::File {
            max_selections: None,
        }
    }

    pub fn relation(collection_id: impl Into<String>) -> Self {
        FieldKind::Relation {
            related_collection_id: Some(collection_id.into()),
            max_selections: None,
            cascade_delete: None,
        }
    }

    /// Type tag used in descriptor JSON and in the service's request bodies.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Number { .. } => "number",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Bool => "bool",
            FieldKind::Date => "date",
            FieldKind::Select { .. } => "select",
            FieldKind::Json => "json",
            FieldKind::File { .. } => "file",
            FieldKind::Relation { .. } => "relation",
            FieldKind::Autodate => "autodate",
        }
    }

    /// Script-side constructor class (`new TextField({...})`).
    pub fn class_name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "TextField",
            FieldKind::Number { .. } => "NumberField",
            FieldKind::Email => "EmailField",
            FieldKind::Url => "URLField",
            FieldKind::Bool => "BoolField",
            FieldKind::Date => "DateField",
            FieldKind::Select { .. } => "SelectField",
            FieldKind::Json => "JSONField",
            FieldKind::File { .. } => "FileField",
            FieldKind::Relation { .. } => "RelationField",
            FieldKind::Autodate => "AutodateField",
        }
    }

    /// Inverse of [`FieldKind::class_name`] with every attribute unset.
    /// Unknown classes map to text.
    pub fn from_class_name(class: &str) -> Self {
        match class {
            "NumberField" => FieldKind::number(),
            "EmailField" => FieldKind::Email,
            "URLField" => FieldKind::Url,
            "BoolField" => FieldKind::Bool,
            "DateField" => FieldKind::Date,
            "SelectField" => FieldKind::Select { options: vec![] },
            "JSONField" => FieldKind::Json,
            "FileField" => FieldKind::file(),
            "RelationField" => FieldKind::Relation {
                related_collection_id: None,
                max_selections: None,
                cascade_delete: None,
            },
            "AutodateField" => FieldKind::Autodate,
            _ => FieldKind::text(),
        }
    }

    /// The kind as the renderer writes it: absent attributes replaced by the
    /// values the script carries for them.
    pub fn with_render_defaults(&self) -> Self {
        match self {
            FieldKind::Text { max_length } => FieldKind::Text {
                max_length: Some(max_length.unwrap_or(0)),
            },
            FieldKind::Number { min, max, non_zero } => FieldKind::Number {
                min: *min,
                max: max.filter(|m| *m != 0.0),
                non_zero: *non_zero,
            },
            FieldKind::File { max_selections } => FieldKind::File {
                max_selections: Some(max_selections.unwrap_or(1)),
            },
            FieldKind::Relation {
                related_collection_id,
                max_selections,
                cascade_delete,
            } => FieldKind::Relation {
                related_collection_id: Some(related_collection_id.clone().unwrap_or_default()),
                max_selections: Some(max_selections.unwrap_or(1)),
                cascade_delete: Some(cascade_delete.unwrap_or(false)),
            },
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            required: false,
            kind,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Derived script identifier, see [`crate::naming::identifier`].
    pub fn id(&self) -> String {
        crate::naming::identifier(&self.name)
    }

    /// This descriptor as it reads back from a rendered script.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.clone(),
            required: self.required,
            kind: self.kind.with_render_defaults(),
        }
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    #[default]
    Base,
    Auth,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Base => "base",
            CollectionType::Auth => "auth",
        }
    }
}

/// Full definition of a collection. A `None` rule means "no additional rule"
/// and is written as the literal `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CollectionType,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub list_rule: Option<String>,
    #[serde(default)]
    pub create_rule: Option<String>,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
}

impl CollectionDescriptor {
    pub fn new(name: impl Into<String>, kind: CollectionType) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: Vec::new(),
            list_rule: None,
            create_rule: None,
            update_rule: None,
            delete_rule: None,
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Rules in script order, keyed by their property name.
    pub fn rules(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("listRule", self.list_rule.as_deref()),
            ("createRule", self.create_rule.as_deref()),
            ("updateRule", self.update_rule.as_deref()),
            ("deleteRule", self.delete_rule.as_deref()),
        ]
    }
}

/// Changes applied to an existing collection. Each rule is tri-state:
/// absent (unchanged), `Some(None)` (cleared to null) or `Some(Some(rule))`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub list_rule: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_rule: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub update_rule: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub delete_rule: Option<Option<String>>,
}

impl CollectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.new_name.is_none() && self.rules().iter().all(|(_, rule)| rule.is_none())
    }

    pub fn rules(&self) -> [(&'static str, Option<Option<&str>>); 4] {
        [
            ("listRule", self.list_rule.as_ref().map(|r| r.as_deref())),
            ("createRule", self.create_rule.as_ref().map(|r| r.as_deref())),
            ("updateRule", self.update_rule.as_ref().map(|r| r.as_deref())),
            ("deleteRule", self.delete_rule.as_ref().map(|r| r.as_deref())),
        ]
    }

    pub(crate) fn set_rule(&mut self, key: &str, value: Option<String>) {
        match key {
            "listRule" => self.list_rule = Some(value),
            "createRule" => self.create_rule = Some(value),
            "updateRule" => self.update_rule = Some(value),
            "deleteRule" => self.delete_rule = Some(value),
            _ => {}
        }
    }
}

/// Present-but-null deserializes to `Some(None)`; absence is handled by `default`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChangeDescriptor {
    Create(CollectionDescriptor),
    UpdateCollection {
        collection: String,
        update: CollectionUpdate,
    },
    Delete {
        collection: String,
    },
    AddField {
        collection: String,
        field: FieldDescriptor,
    },
    RemoveField {
        collection: String,
        field: String,
    },
    UpdateFields {
        collection: String,
        fields: Vec<FieldDescriptor>,
    },
}

impl ChangeDescriptor {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeDescriptor::Create(_) => ChangeKind::Create,
            ChangeDescriptor::UpdateCollection { .. } => ChangeKind::Update,
            ChangeDescriptor::Delete { .. } => ChangeKind::Delete,
            ChangeDescriptor::AddField { .. } => ChangeKind::AddField,
            ChangeDescriptor::RemoveField { .. } => ChangeKind::RemoveField,
            ChangeDescriptor::UpdateFields { .. } => ChangeKind::UpdateFields,
        }
    }

    pub fn collection_name(&self) -> &str {
        match self {
            ChangeDescriptor::Create(c) => &c.name,
            ChangeDescriptor::UpdateCollection { collection, .. }
            | ChangeDescriptor::Delete { collection }
            | ChangeDescriptor::AddField { collection, .. }
            | ChangeDescriptor::RemoveField { collection, .. }
            | ChangeDescriptor::UpdateFields { collection, .. } => collection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
    AddField,
    RemoveField,
    UpdateFields,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 6] = [
        ChangeKind::Create,
        ChangeKind::Update,
        ChangeKind::Delete,
        ChangeKind::AddField,
        ChangeKind::RemoveField,
        ChangeKind::UpdateFields,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
            ChangeKind::AddField => "add_field",
            ChangeKind::RemoveField => "remove_field",
            ChangeKind::UpdateFields => "update_fields",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// A rendered migration: file name plus text. Produced once, never edited;
/// a correction is a new script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedScript {
    file_name: String,
    content: String,
}

impl RenderedScript {
    pub(crate) fn new(file_name: String, content: String) -> Self {
        Self { file_name, content }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_parts(self) -> (String, String) {
        (self.file_name, self.content)
    }
}

/// Collection name reported when no name could be recovered from a script.
pub const UNKNOWN_COLLECTION: &str = "unknown";

/// What a script does, as recovered from its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub kind: ChangeKind,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// False when no signature matched and `kind` is the fallback.
    pub recognized: bool,
}

impl Classification {
    pub fn is_resolved(&self) -> bool {
        self.recognized && self.collection != UNKNOWN_COLLECTION
    }

    pub fn ensure_resolved(&self) -> crate::MigrationResult<()> {
        if !self.recognized {
            return Err(crate::MigrationError::UnsupportedPattern(
                "no known migration signature found".into(),
            ));
        }
        if self.collection == UNKNOWN_COLLECTION {
            return Err(crate::MigrationError::UnsupportedPattern(format!(
                "collection name not found in {} migration",
                self.kind
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: DiagnosticSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidateResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
