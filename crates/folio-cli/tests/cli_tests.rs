#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI integration tests
//!
//! Run the compiled `folio` binary against a temp database and check the
//! JSON it prints.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const PAGE: &str = r#"
page:
  keyword: about
  sections:
    - style: markdown
      keyword: intro
      translations:
        1:
          text: "Hello {{team.name}}"
        2:
          text: "Hallo {{team.name}}"
      data_sources:
        - table: teams
          scope: team
          retrieve: first
data:
  teams:
    - record_id: 1
      name: folio
"#;

fn setup(temp_dir: &TempDir) -> PathBuf {
    let def = temp_dir.path().join("about.yaml");
    fs::write(&def, PAGE).unwrap();
    def
}

fn folio(temp_dir: &TempDir, args: &[&str]) -> Output {
    let db = temp_dir.path().join("folio.db");
    Command::new(env!("CARGO_BIN_EXE_folio"))
        .current_dir(temp_dir.path())
        .arg("--db")
        .arg(&db)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI")
}

fn json_ok(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn import(temp_dir: &TempDir, def: &Path) {
    json_ok(&folio(temp_dir, &["page", "import", def.to_str().unwrap()]));
}

#[test]
fn test_import_reports_page() {
    let temp_dir = TempDir::new().unwrap();
    let def = setup(&temp_dir);

    let report = json_ok(&folio(&temp_dir, &["page", "import", def.to_str().unwrap()]));

    assert_eq!(report["result"], "imported");
    assert_eq!(report["keyword"], "about");
    assert_eq!(report["sections"], 1);
    assert_eq!(report["data_rows"], 1);
}

#[test]
fn test_render_unpublished_page_needs_preview_rights() {
    let temp_dir = TempDir::new().unwrap();
    let def = setup(&temp_dir);
    import(&temp_dir, &def);

    // Without rights: error, non-zero exit
    let denied = folio(&temp_dir, &["render", "about"]);
    assert!(!denied.status.success());
    assert!(String::from_utf8_lossy(&denied.stderr).contains("not published"));

    // With rights: the draft
    let draft = json_ok(&folio(&temp_dir, &["render", "about", "--can-preview"]));
    assert_eq!(draft["source"]["kind"], "draft");
    assert_eq!(
        draft["document"]["sections"][0]["content_fields"]["text"]["content"],
        "Hello folio"
    );
}

#[test]
fn test_render_http_mode_prints_headers() {
    let temp_dir = TempDir::new().unwrap();
    let def = setup(&temp_dir);
    import(&temp_dir, &def);

    let response = json_ok(&folio(
        &temp_dir,
        &["render", "about", "--preview", "--can-preview", "--http"],
    ));

    assert_eq!(response["status"], 200);
    assert_eq!(response["headers"]["Cache-Control"], "no-store");
    assert_eq!(response["headers"]["X-Robots-Tag"], "noindex");

    let missing = json_ok(&folio(&temp_dir, &["render", "404", "--http"]));
    assert_eq!(missing["status"], 404);
}

#[test]
fn test_publish_then_render_in_another_language() {
    let temp_dir = TempDir::new().unwrap();
    let def = setup(&temp_dir);
    import(&temp_dir, &def);

    let published = json_ok(&folio(
        &temp_dir,
        &["version", "publish", "about", "--name", "launch"],
    ));
    assert_eq!(published["result"], "published");
    assert_eq!(published["version_number"], 1);

    let render = json_ok(&folio(&temp_dir, &["--lang", "2", "render", "about"]));
    assert_eq!(render["source"]["kind"], "version");
    assert_eq!(
        render["document"]["sections"][0]["content_fields"]["text"]["content"],
        "Hallo folio"
    );
}

#[test]
fn test_version_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let def = setup(&temp_dir);
    import(&temp_dir, &def);

    let v1 = json_ok(&folio(&temp_dir, &["version", "publish", "about"]));
    let v2 = json_ok(&folio(
        &temp_dir,
        &["version", "create", "about", "--metadata", r#"{"note": "draft"}"#],
    ));
    let v1_id = v1["version_id"].to_string();
    let v2_id = v2["version_id"].to_string();

    let listing = json_ok(&folio(&temp_dir, &["version", "list", "about"]));
    assert_eq!(listing["total"], 2);
    assert_eq!(listing["items"][0]["version_number"], 2);
    assert_eq!(listing["items"][1]["is_published"], true);

    let shown = json_ok(&folio(&temp_dir, &["version", "show", "about", &v2_id]));
    assert_eq!(shown["metadata"]["note"], "draft");

    // identical drafts: empty summary
    let compare = json_ok(&folio(
        &temp_dir,
        &["version", "compare", "about", &v1_id, &v2_id, "--format", "json_patch"],
    ));
    assert_eq!(compare["diff"]["ops"], serde_json::json!([]));

    // the published version is protected
    let denied = folio(&temp_dir, &["version", "delete", "about", &v1_id]);
    assert!(!denied.status.success());

    let unpublished = json_ok(&folio(&temp_dir, &["version", "unpublish", "about"]));
    assert_eq!(unpublished["previous_version_id"], v1["version_id"]);

    let pruned = json_ok(&folio(&temp_dir, &["version", "prune", "about", "--keep", "1"]));
    assert_eq!(pruned["deleted"], serde_json::json!([v1["version_id"]]));
}

#[test]
fn test_compare_rejects_unknown_format() {
    let temp_dir = TempDir::new().unwrap();
    let def = setup(&temp_dir);
    import(&temp_dir, &def);
    json_ok(&folio(&temp_dir, &["version", "create", "about"]));

    let output = folio(
        &temp_dir,
        &["version", "compare", "about", "1", "1", "--format", "xml"],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown diff format"));
}

#[test]
fn test_config_file_sets_database_and_language() {
    let temp_dir = TempDir::new().unwrap();
    let def = setup(&temp_dir);
    let config = temp_dir.path().join("folio.toml");
    fs::write(
        &config,
        "database_path = \"data/site.db\"\ndefault_language_id = 2\n",
    )
    .unwrap();

    let run = |args: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_folio"))
            .current_dir(temp_dir.path())
            .arg("--config")
            .arg(&config)
            .args(args)
            .env("RUST_LOG", "off")
            .output()
            .expect("Failed to execute CLI")
    };

    json_ok(&run(&["page", "import", def.to_str().unwrap()]));
    let draft = json_ok(&run(&["render", "about", "--can-preview"]));

    assert!(temp_dir.path().join("data/site.db").exists());
    assert_eq!(draft["language_id"], 2);
    assert_eq!(
        draft["document"]["sections"][0]["content_fields"]["text"]["content"],
        "Hallo folio"
    );
}
