//! Script Introspector: recover descriptors from migration text.
//!
//! No grammar here. A string-aware pattern finds every `new <Kind>Field({...})`
//! construction and a small tokenizer splits its body into `key: value`
//! entries, so whitespace and property order do not matter. Shapes the
//! renderer never writes (computed values, nested objects, comments inside a
//! field) are skipped rather than reported.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::*;

/// A double-quoted literal with backslash escapes.
const STRING_LITERAL: &str = r#""(?:[^"\\]|\\.)*""#;

static RE_STRING: LazyLock<Regex> = LazyLock::new(|| Regex::new(STRING_LITERAL).unwrap());

static RE_FIELD_CTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"new\s+(\w*Field)\(\s*\{{((?:{STRING_LITERAL}|[^}}"])*)\}}\s*\)"#
    ))
    .unwrap()
});

static RE_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(\w+)\s*:\s*({STRING_LITERAL}|\[(?:{STRING_LITERAL}|[^\]"])*\]|[^,\s\[\]]+)"#
    ))
    .unwrap()
});

static RE_APPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)migrate\(\s*\(\s*\w*\s*\)\s*=>\s*\{(.*?)\}\s*,\s*\(\s*\w*\s*\)\s*=>\s*\{")
        .unwrap()
});

static RE_COLLECTION_CTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"new\s+Collection\(\s*\{").unwrap());

static RE_NAME_PROP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\bname\s*:\s*({STRING_LITERAL})")).unwrap());

static RE_TYPE_PROP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\btype\s*:\s*({STRING_LITERAL})")).unwrap());

static RE_RULE_PROP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(listRule|createRule|updateRule|deleteRule)\s*:\s*(null|{STRING_LITERAL})"
    ))
    .unwrap()
});

static RE_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"collection\.(name|listRule|createRule|updateRule|deleteRule)\s*=\s*(null|{STRING_LITERAL})"
    ))
    .unwrap()
});

/// Every field construction in `script`, in order of appearance.
pub fn extract_fields(script: &str) -> Vec<FieldDescriptor> {
    RE_FIELD_CTOR
        .captures_iter(script)
        .filter_map(|caps| {
            let class = caps.get(1)?.as_str();
            let body = caps.get(2)?.as_str();
            field_from_props(class, &Props::parse(body))
        })
        .collect()
}

/// The collection a "create" script builds, if it has one.
pub fn extract_collection(script: &str) -> Option<CollectionDescriptor> {
    let apply = apply_section(script);
    let start = RE_COLLECTION_CTOR.find(apply)?.end();
    let literal = &apply[start..];

    let name = RE_NAME_PROP
        .captures(literal)
        .map(|caps| decode_string(&caps[1]))?;
    let kind = match RE_TYPE_PROP.captures(literal).map(|caps| decode_string(&caps[1])) {
        Some(t) if t == "auth" => CollectionType::Auth,
        _ => CollectionType::Base,
    };

    let mut collection = CollectionDescriptor::new(name, kind);
    collection.fields = extract_fields(literal);
    for caps in RE_RULE_PROP.captures_iter(literal) {
        let value = rule_value(&caps[2]);
        match &caps[1] {
            "listRule" => collection.list_rule = value,
            "createRule" => collection.create_rule = value,
            "updateRule" => collection.update_rule = value,
            "deleteRule" => collection.delete_rule = value,
            _ => {}
        }
    }
    Some(collection)
}

/// Name and rule assignments made by the apply step of an update script.
pub fn extract_collection_update(script: &str) -> CollectionUpdate {
    let mut update = CollectionUpdate::default();
    for caps in RE_ASSIGNMENT.captures_iter(apply_section(script)) {
        let value = rule_value(&caps[2]);
        if &caps[1] == "name" {
            if let Some(name) = value {
                update.new_name = Some(name);
            }
        } else {
            update.set_rule(&caps[1], value);
        }
    }
    update
}

/// Body of the apply function, or the whole text when the `migrate(...)`
/// wrapper is not recognizable.
pub(crate) fn apply_section(script: &str) -> &str {
    RE_APPLY
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(script)
}

/// Decode a double-quoted literal. Falls back to the raw inner text when the
/// escapes are not JSON-compatible.
pub(crate) fn decode_string(literal: &str) -> String {
    serde_json::from_str::<String>(literal).unwrap_or_else(|_| {
        literal
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(literal)
            .to_string()
    })
}

fn rule_value(raw: &str) -> Option<String> {
    if raw == "null" {
        None
    } else {
        Some(decode_string(raw))
    }
}

// ---------------------------------------------------------------------------
// Property lists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum PropValue {
    Str(String),
    List(Vec<String>),
    Scalar(String),
}

struct Props(Vec<(String, PropValue)>);

impl Props {
    fn parse(body: &str) -> Self {
        let entries = RE_PROPERTY
            .captures_iter(body)
            .map(|caps| {
                let raw = &caps[2];
                let value = if raw.starts_with('"') {
                    PropValue::Str(decode_string(raw))
                } else if raw.starts_with('[') {
                    PropValue::List(
                        RE_STRING
                            .find_iter(raw)
                            .map(|m| decode_string(m.as_str()))
                            .collect(),
                    )
                } else {
                    PropValue::Scalar(raw.to_string())
                };
                (caps[1].to_string(), value)
            })
            .collect();
        Props(entries)
    }

    fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            PropValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            PropValue::List(items) => Some(items.clone()),
            _ => None,
        }
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            PropValue::Scalar(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            PropValue::Scalar(s) => s.parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Integer literals parse exactly; `280.0` or `1e3` go through f64.
    fn unsigned(&self, key: &str) -> Option<u64> {
        if let Some(PropValue::Scalar(s)) = self.get(key) {
            if let Ok(n) = s.parse::<u64>() {
                return Some(n);
            }
        }
        self.number(key)
            .filter(|n| *n >= 0.0 && *n < u64::MAX as f64 && n.fract() == 0.0)
            .map(|n| n as u64)
    }
}

fn field_from_props(class: &str, props: &Props) -> Option<FieldDescriptor> {
    let Some(name) = props.string("name") else {
        log::debug!("skipping {class} construction without a name");
        return None;
    };

    let mut kind = FieldKind::from_class_name(class);
    if kind.class_name() != class {
        log::debug!("unknown field class {class} for \"{name}\", reading it as text");
    }

    match &mut kind {
        FieldKind::Text { max_length } => *max_length = props.unsigned("max"),
        FieldKind::Number { min, max, non_zero } => {
            *min = props.number("min");
            *max = props.number("max");
            *non_zero = props.boolean("nonZero");
        }
        FieldKind::Select { options } => *options = props.list("values").unwrap_or_default(),
        FieldKind::File { max_selections } => {
            *max_selections = props.unsigned("maxSelect").and_then(|n| u32::try_from(n).ok());
        }
        FieldKind::Relation {
            related_collection_id,
            max_selections,
            cascade_delete,
        } => {
            *related_collection_id = props.string("collectionId");
            *max_selections = props.unsigned("maxSelect").and_then(|n| u32::try_from(n).ok());
            *cascade_delete = props.boolean("cascadeDelete");
        }
        FieldKind::Email
        | FieldKind::Url
        | FieldKind::Bool
        | FieldKind::Date
        | FieldKind::Json
        | FieldKind::Autodate => {}
    }

    Some(FieldDescriptor {
        name,
        required: props.boolean("required").unwrap_or(false),
        kind,
    })
}
