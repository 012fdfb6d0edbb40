use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run `pbmig` inside `cwd` with a clean migrations environment.
fn pbmig(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pbmig"));
    cmd.current_dir(cwd);
    cmd.env_remove("POCKETBASE_MIGRATIONS_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(cwd: &Path, args: &[&str]) -> Output {
    pbmig(cwd).args(args).output().expect("failed to run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_success(output: &Output) {
    assert!(output.status.success(), "stderr: {}", stderr(output));
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn migrations(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

const POSTS: &str = r#"{
  "name": "posts",
  "type": "base",
  "fields": [
    {"name": "title", "type": "text", "required": true, "max": 200},
    {"name": "status", "type": "select", "values": ["draft", "published"]},
    {"name": "author", "type": "relation", "collectionId": "_pb_users_auth_"}
  ],
  "listRule": "@request.auth.id != \"\""
}"#;

fn project() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "posts.json", POSTS);
    tmp
}

// ---------------------------------------------------------------------------
// Basics
// ---------------------------------------------------------------------------

#[test]
fn cli_help() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run(tmp.path(), &["--help"]);
    assert_success(&output);
    assert!(stdout(&output).contains("PocketBase migration generator"));
}

#[test]
fn cli_version() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run(tmp.path(), &["--version"]);
    assert_success(&output);
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ---------------------------------------------------------------------------
// Generating
// ---------------------------------------------------------------------------

#[test]
fn cli_create_writes_to_default_dir() {
    let tmp = project();
    let output = run(tmp.path(), &["create", "posts.json"]);
    assert_success(&output);
    assert!(stdout(&output).starts_with("Created migration: "));

    let names = migrations(&tmp.path().join("pb_migrations"));
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with("_create_posts.js"), "{names:?}");

    let content = fs::read_to_string(tmp.path().join("pb_migrations").join(&names[0])).unwrap();
    assert!(content.contains("new RelationField({"));
    assert!(content.contains(r#"listRule: "@request.auth.id != \"\"","#));
    assert!(content.contains("createRule: null,"));
}

#[test]
fn cli_dry_run_prints_script() {
    let tmp = project();
    let output = run(tmp.path(), &["create", "posts.json", "--dry-run"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.starts_with("/**\n * PocketBase Migration - Create posts collection\n"));
    assert!(!tmp.path().join("pb_migrations").exists());
}

#[test]
fn cli_dir_flag_and_env() {
    let tmp = project();

    let output = run(tmp.path(), &["--dir", "flag_dir", "delete", "sessions"]);
    assert_success(&output);
    assert_eq!(migrations(&tmp.path().join("flag_dir")).len(), 1);

    let output = pbmig(tmp.path())
        .env("POCKETBASE_MIGRATIONS_DIR", "env_dir")
        .args(["delete", "sessions"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(migrations(&tmp.path().join("env_dir")).len(), 1);
}

#[test]
fn cli_config_file() {
    let tmp = project();
    write(
        tmp.path(),
        "pbmig.config.yaml",
        "migrations_dir: db/migrations\ndefault_rule: \"@request.auth.id != ''\"\n",
    );
    let output = run(tmp.path(), &["create", "posts.json"]);
    assert_success(&output);

    let dir = tmp.path().join("db/migrations");
    let names = migrations(&dir);
    assert_eq!(names.len(), 1);
    let content = fs::read_to_string(dir.join(&names[0])).unwrap();
    // Explicit rule kept, missing rules filled.
    assert!(content.contains(r#"listRule: "@request.auth.id != \"\"","#));
    assert!(content.contains(r#"deleteRule: "@request.auth.id != ''","#));
}

#[test]
fn cli_update_with_null_rule() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run(
        tmp.path(),
        &[
            "update",
            "posts",
            "--rename",
            "articles",
            "--list-rule",
            "null",
            "--dry-run",
        ],
    );
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains(r#"collection.name = "articles";"#));
    assert!(out.contains("collection.listRule = null;"));
    assert!(!out.contains("collection.createRule"));
}

#[test]
fn cli_add_field_inline_json() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run(
        tmp.path(),
        &[
            "add-field",
            "posts",
            r#"{"name": "summary", "type": "text", "max": 280}"#,
        ],
    );
    assert_success(&output);
    let names = migrations(&tmp.path().join("pb_migrations"));
    assert!(names[0].ends_with("_add_field_summary_to_posts.js"));
}

#[test]
fn cli_update_fields_from_file() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "fields.json",
        r#"[{"name": "title", "type": "text"}, {"name": "done", "type": "boolean"}]"#,
    );
    let output = run(tmp.path(), &["update-fields", "todos", "fields.json", "--dry-run"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("collection.fields = ["));
    assert!(out.contains("new BoolField({"));
}

#[test]
fn cli_render_change_descriptor() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "change.json",
        r#"{"action": "remove_field", "collection": "products", "field": "legacy_sku"}"#,
    );
    let output = run(tmp.path(), &["render", "change.json"]);
    assert_success(&output);
    let names = migrations(&tmp.path().join("pb_migrations"));
    assert!(names[0].ends_with("_remove_field_legacy_sku_from_products.js"));
}

#[test]
fn cli_invalid_descriptor_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run(
        tmp.path(),
        &["add-field", "posts", r#"{"name": "status", "type": "select"}"#],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("PBM-E004"));
    assert!(!tmp.path().join("pb_migrations").exists());
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

#[test]
fn cli_validate_exit_codes() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "ok.json",
        r#"{"action": "delete", "collection": "sessions"}"#,
    );
    write(
        tmp.path(),
        "bad.json",
        r#"{"action": "update_collection", "collection": "posts", "update": {}}"#,
    );

    let output = run(tmp.path(), &["validate", "ok.json"]);
    assert_success(&output);
    assert!(stdout(&output).contains("0 errors, 0 warnings"));

    let output = run(tmp.path(), &["validate", "bad.json", "--format", "json"]);
    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["summary"]["errors"], 1);
    assert_eq!(value["diagnostics"][0]["code"], "PBM-E006");
}

// ---------------------------------------------------------------------------
// Reading back
// ---------------------------------------------------------------------------

#[test]
fn cli_list_view_inspect_payload() {
    let tmp = project();
    assert_success(&run(tmp.path(), &["create", "posts.json"]));
    let name = migrations(&tmp.path().join("pb_migrations")).remove(0);

    let output = run(tmp.path(), &["list"]);
    assert_success(&output);
    assert!(stdout(&output).contains(&name));
    assert!(stdout(&output).contains("1 migration in"));

    let output = run(tmp.path(), &["view", &name]);
    assert_success(&output);
    assert!(stdout(&output).contains("migrate((db) => {"));

    let output = run(tmp.path(), &["inspect", &name]);
    assert_success(&output);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["classification"]["kind"], "create");
    assert_eq!(value["fields"].as_array().unwrap().len(), 3);
    assert_eq!(value["fields"][2]["collectionId"], "_pb_users_auth_");

    let output = run(tmp.path(), &["payload", &name]);
    assert_success(&output);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["method"], "POST");
    assert_eq!(value["path"], "/api/collections");
    assert_eq!(value["body"]["fields"][0]["max"], 200);
    assert_eq!(value["body"]["createRule"], serde_json::Value::Null);
}

#[test]
fn cli_list_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run(tmp.path(), &["list"]);
    assert_success(&output);
    assert!(stdout(&output).starts_with("No migrations found"));
}

#[test]
fn cli_view_rejects_traversal() {
    let tmp = project();
    let output = run(tmp.path(), &["view", "../posts.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid migration name"));

    let output = run(tmp.path(), &["view", "1_missing.js"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Migration file not found"));
}

// ---------------------------------------------------------------------------
// Revert
// ---------------------------------------------------------------------------

#[test]
fn cli_revert_create() {
    let tmp = project();
    assert_success(&run(tmp.path(), &["create", "posts.json"]));
    let name = migrations(&tmp.path().join("pb_migrations")).remove(0);

    let output = run(tmp.path(), &["revert", &name]);
    assert_success(&output);
    assert!(stdout(&output).starts_with("Created revert migration: "));

    let names = migrations(&tmp.path().join("pb_migrations"));
    assert_eq!(names.len(), 2);
    let revert = names
        .iter()
        .find(|n| n.contains("_revert_"))
        .expect("revert file");
    let content = fs::read_to_string(tmp.path().join("pb_migrations").join(revert)).unwrap();
    assert!(content.contains(r#"return $app.delete($app.findCollectionByNameOrId("posts"));"#));
}

#[test]
fn cli_revert_remove_field_strict() {
    let tmp = tempfile::tempdir().unwrap();
    assert_success(&run(tmp.path(), &["remove-field", "products", "legacy_sku"]));
    let name = migrations(&tmp.path().join("pb_migrations")).remove(0);

    let output = run(tmp.path(), &["revert", &name, "--strict"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("legacy_sku"));
    assert_eq!(migrations(&tmp.path().join("pb_migrations")).len(), 1);

    let output = run(tmp.path(), &["revert", &name]);
    assert_success(&output);
    assert!(stdout(&output).contains("fails when applied"));
}
