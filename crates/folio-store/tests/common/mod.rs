//! Shared fixtures for folio-store integration tests

#![allow(dead_code)]

use folio_store::db;
use folio_store::import::{import_definition, parse_definition_str, ImportReport};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A migrated database file inside a temp dir
pub fn temp_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("folio.db");
    db::open_and_migrate(&path).expect("Failed to create database");
    (dir, path)
}

pub fn connect(path: &Path) -> Connection {
    db::open_and_migrate(path).expect("Failed to open database")
}

/// Two-language page with a parent data source and a filtered child
pub const HOME_PAGE: &str = r#"
page:
  keyword: home
  url: /home
  protocol: GET
  sections:
    - style: container
      keyword: scores
      data_sources:
        - table: scores
          scope: parent
          retrieve: first
      children:
        - style: markdown
          keyword: answer
          data_sources:
            - table: answers
              scope: answer
              retrieve: first
              filter: "record_id={{parent.record_id}}"
          fields:
            css: highlight
          translations:
            1:
              text: "Score {{parent.score}}: {{answer.label}}"
            2:
              text: "Punkte {{parent.score}}: {{answer.label}}"
        - style: markdown
          keyword: members
          condition: '{"==": [{"var": "parent.score"}, 90]}'
          debug: true
          fields:
            text: "Members only"
data:
  scores:
    - record_id: 7
      score: 90
  answers:
    - record_id: 3
      label: wrong
    - record_id: 7
      label: right
"#;

pub fn import_home(conn: &mut Connection) -> ImportReport {
    let definition = parse_definition_str(HOME_PAGE).expect("fixture parses");
    import_definition(&definition, conn).expect("fixture imports")
}
