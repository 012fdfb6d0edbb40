//! Change Classifier: which of the six changes a script performs.
//!
//! Signatures are checked in a fixed order and the first hit wins. The order
//! matters: a revert of a deletion both builds a `new Collection(...)` and
//! saves it, and older scripts carry a field filter in their inverse step, so
//! a later signature can appear in text that belongs to an earlier kind.
//! Matching only looks at the apply step when it can be isolated.

use std::sync::LazyLock;

use regex::Regex;

use crate::introspect::{apply_section, decode_string, extract_fields};
use crate::types::*;

const STRING_LITERAL: &str = r#""(?:[^"\\]|\\.)*""#;

/// Priority order: creation marker, deletion call, field-list append,
/// field-list filter, whole-list replacement, rule/name mutation.
static SIGNATURES: LazyLock<Vec<(ChangeKind, Regex)>> = LazyLock::new(|| {
    [
        (ChangeKind::Create, r"new\s+Collection\(\s*\{"),
        (
            ChangeKind::Delete,
            r"\$?app\.delete\(\s*(?:collection\s*\)|\$?app\.findCollectionByNameOrId\()",
        ),
        (ChangeKind::AddField, r"collection\.fields\.push\("),
        (ChangeKind::RemoveField, r"\.filter\(\s*\(?\s*f\s*\)?\s*=>\s*f\.name\s*!=="),
        (ChangeKind::UpdateFields, r"collection\.fields\s*=\s*\["),
        (
            ChangeKind::Update,
            r"collection\.(?:name|listRule|viewRule|createRule|updateRule|deleteRule)\s*=",
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
    .collect()
});

static RE_LOOKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\$?app\.findCollectionByNameOrId\(\s*({STRING_LITERAL})\s*\)"
    ))
    .unwrap()
});

static RE_FILTERED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"f\.name\s*!==\s*({STRING_LITERAL})")).unwrap()
});

/// Header markers, one per kind: `* PocketBase Migration - Create <name> collection`.
/// "Update fields of" sits ahead of the plain "Update" prefix it would
/// otherwise lose to.
static HEADER_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        "Update fields of",
        "Update",
        "Create",
        "Delete",
        "Add field to",
        "Remove field from",
    ]
    .into_iter()
    .map(|prefix| {
        let pattern = format!(r"(?m)^\s*\*?\s*PocketBase Migration - {prefix} (.+?) collection\s*$");
        Regex::new(&pattern).unwrap()
    })
    .collect()
});

/// Classify a migration script. Never fails: text that matches nothing comes
/// back as an unrecognized collection update, and a missing collection name as
/// [`UNKNOWN_COLLECTION`].
pub fn classify(script: &str) -> Classification {
    let apply = apply_section(script);
    let matched = SIGNATURES
        .iter()
        .find(|(_, re)| re.is_match(apply))
        .map(|(kind, _)| *kind);

    let recognized = matched.is_some();
    let kind = matched.unwrap_or(ChangeKind::Update);
    let collection = collection_name(script);
    let field = match kind {
        ChangeKind::AddField => extract_fields(apply).into_iter().next().map(|f| f.name),
        ChangeKind::RemoveField => RE_FILTERED_FIELD
            .captures(apply)
            .map(|caps| decode_string(&caps[1])),
        _ => None,
    };

    if recognized {
        log::debug!("classified migration as {kind} on \"{collection}\"");
    } else {
        log::debug!("no migration signature matched, treating as unrecognized {kind}");
    }

    Classification {
        kind,
        collection,
        field,
        recognized,
    }
}

/// Lookup-by-name call first, then the header markers, most specific first.
fn collection_name(script: &str) -> String {
    if let Some(caps) = RE_LOOKUP.captures(script) {
        return decode_string(&caps[1]);
    }

    HEADER_MARKERS
        .iter()
        .find_map(|re| re.captures(script).map(|caps| caps[1].trim().to_string()))
        .unwrap_or_else(|| UNKNOWN_COLLECTION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_call_names_the_collection() {
        let c = classify(
            r#"migrate((db) => {
  const collection = $app.findCollectionByNameOrId("orders");
  return $app.delete(collection);
}, (db) => {
  throw new Error("nope");
});"#,
        );
        assert_eq!(c.kind, ChangeKind::Delete);
        assert_eq!(c.collection, "orders");
        assert!(c.is_resolved());
    }

    #[test]
    fn header_marker_is_the_fallback() {
        let c = classify(
            "/**\n * PocketBase Migration - Update fields of Order Items collection\n */\ncollection.fields = [\n];",
        );
        assert_eq!(c.kind, ChangeKind::UpdateFields);
        assert_eq!(c.collection, "Order Items");
    }

    #[test]
    fn header_only_update_fields_names_the_collection() {
        let c = classify("/**\n * PocketBase Migration - Update fields of posts collection\n */\n");
        assert!(!c.recognized);
        assert_eq!(c.kind, ChangeKind::Update);
        assert_eq!(c.collection, "posts");

        let c = classify("/**\n * PocketBase Migration - Update posts collection\n */\n");
        assert_eq!(c.collection, "posts");
    }

    #[test]
    fn unmatched_text_is_unknown() {
        let c = classify("console.log('hello');");
        assert!(!c.recognized);
        assert_eq!(c.collection, UNKNOWN_COLLECTION);
        assert!(!c.is_resolved());
        assert!(matches!(
            c.ensure_resolved(),
            Err(crate::MigrationError::UnsupportedPattern(_))
        ));
    }

    #[test]
    fn signature_without_name_is_unresolved() {
        let c = classify("collection.fields.push(new TextField({ name: \"x\" }));");
        assert_eq!(c.kind, ChangeKind::AddField);
        assert_eq!(c.field.as_deref(), Some("x"));
        assert_eq!(c.collection, UNKNOWN_COLLECTION);
        assert!(c.ensure_resolved().is_err());
    }

    #[test]
    fn creation_outranks_save_and_push() {
        let c = classify(
            r#"migrate((db) => {
  const collection = new Collection({ name: "a", fields: [] });
  collection.fields.push(new TextField({ name: "x" }));
  return $app.save(collection);
}, (db) => {});"#,
        );
        assert_eq!(c.kind, ChangeKind::Create);
    }

    #[test]
    fn inverse_step_is_ignored_when_apply_is_isolated() {
        // Older delete scripts rebuilt a placeholder collection on rollback.
        let c = classify(
            r#"migrate((db) => {
  const collection = $app.findCollectionByNameOrId("sessions");
  return $app.delete(collection);
}, (db) => {
  const collection = new Collection({ name: "sessions" });
  return $app.save(collection);
});"#,
        );
        assert_eq!(c.kind, ChangeKind::Delete);
    }

    #[test]
    fn inline_lookup_delete() {
        let c = classify(
            r#"migrate((db) => {
  return $app.delete($app.findCollectionByNameOrId("posts"));
}, (db) => {
  throw new Error("Rollback of revert migration not supported");
});"#,
        );
        assert_eq!(c.kind, ChangeKind::Delete);
        assert_eq!(c.collection, "posts");
    }

    #[test]
    fn append_outranks_filter() {
        let c = classify(
            r#"const collection = $app.findCollectionByNameOrId("posts");
collection.fields.push(new TextField({ name: "summary" }));
collection.fields = collection.fields.filter(f => f.name !== "summary");"#,
        );
        assert_eq!(c.kind, ChangeKind::AddField);
        assert_eq!(c.field.as_deref(), Some("summary"));
    }

    #[test]
    fn app_receiver_without_dollar() {
        let c = classify(
            r#"migrate((app) => {
  const collection = app.findCollectionByNameOrId("posts");
  collection.listRule = null;
  return app.save(collection);
}, (app) => {});"#,
        );
        assert_eq!(c.kind, ChangeKind::Update);
        assert_eq!(c.collection, "posts");
        assert!(c.recognized);
    }
}
