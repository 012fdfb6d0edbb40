use pbmig_core::{validate, ChangeDescriptor, MigrationConfig, Renderer};

use crate::store::MigrationStore;

/// Validate `change`, render it and write the script into the store.
/// Warnings are logged; any error stops before rendering.
pub fn run_generate(
    change: &ChangeDescriptor,
    config: &MigrationConfig,
    store: &MigrationStore,
    dry_run: bool,
) -> Result<String, String> {
    let result = validate(change);
    for d in &result.warnings {
        log::warn!("{}: {}", d.code, d.message);
    }
    if !result.is_ok() {
        let lines: Vec<String> = result
            .errors
            .iter()
            .map(|d| format!("  error[{}]: {}", d.code, d.message))
            .collect();
        return Err(format!(
            "Invalid {} descriptor:\n{}",
            change.kind(),
            lines.join("\n")
        ));
    }

    let script = Renderer::new(config.clone()).render(change);
    if dry_run {
        return Ok(script.content().trim_end().to_string());
    }

    let path = store.write(&script).map_err(|e| e.to_string())?;
    Ok(format!("Created migration: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbmig_core::{CollectionDescriptor, CollectionType, FieldDescriptor, FieldKind};

    fn setup() -> (tempfile::TempDir, MigrationConfig, MigrationStore) {
        let tmp = tempfile::tempdir().unwrap();
        let config = MigrationConfig {
            migrations_dir: tmp.path().join("pb_migrations"),
            ..Default::default()
        };
        let store = MigrationStore::new(&config.migrations_dir, &config.extension);
        (tmp, config, store)
    }

    #[test]
    fn writes_valid_change() {
        let (_tmp, config, store) = setup();
        let change = ChangeDescriptor::Create(
            CollectionDescriptor::new("posts", CollectionType::Base)
                .with_field(FieldDescriptor::new("title", FieldKind::text())),
        );

        let output = run_generate(&change, &config, &store, false).unwrap();
        assert!(output.starts_with("Created migration: "));
        let names = store.list().unwrap();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with("_create_posts.js"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (_tmp, config, store) = setup();
        let change = ChangeDescriptor::Delete {
            collection: "sessions".into(),
        };
        let output = run_generate(&change, &config, &store, true).unwrap();
        assert!(output.contains("PocketBase Migration - Delete sessions collection"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn invalid_change_is_not_rendered() {
        let (_tmp, config, store) = setup();
        let change = ChangeDescriptor::AddField {
            collection: "posts".into(),
            field: FieldDescriptor::new("status", FieldKind::Select { options: vec![] }),
        };
        let err = run_generate(&change, &config, &store, false).unwrap_err();
        assert!(err.contains("PBM-E004"));
        assert!(store.list().unwrap().is_empty());
    }
}
