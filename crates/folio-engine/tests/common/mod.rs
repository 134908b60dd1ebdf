//! Shared fixtures for folio-engine integration tests

#![allow(dead_code)]

use folio_core_types::PageId;
use folio_engine::{EngineContext, FolioConfig};
use folio_store::db;
use folio_store::import::{import_definition, parse_definition_str};
use rusqlite::Connection;
use tempfile::TempDir;

/// A migrated database file inside a temp dir, plus an open connection
pub fn setup_db() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let conn = db::open_and_migrate(dir.path().join("folio.db")).expect("Failed to create database");
    (dir, conn)
}

pub fn context() -> EngineContext {
    EngineContext::new(FolioConfig::default())
}

pub fn context_with(config: FolioConfig) -> EngineContext {
    EngineContext::new(config)
}

/// Two-language page: a data-driven answer and a members-only block
pub const HOME_PAGE: &str = r#"
page:
  keyword: home
  url: /home
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
          translations:
            1:
              text: "Score {{parent.score}}: {{answer.label}}"
            2:
              text: "Punkte {{parent.score}}: {{answer.label}}"
        - style: markdown
          keyword: members
          condition: '{"==": [{"var": "parent.score"}, 90]}'
          fields:
            text: "Members only"
data:
  scores:
    - record_id: 7
      score: 90
  answers:
    - record_id: 7
      label: right
"#;

/// Single markdown section, no data sources
pub const ABOUT_PAGE: &str = r#"
page:
  keyword: about
  sections:
    - style: markdown
      keyword: intro
      fields:
        title: About us
        text: Hello
"#;

pub fn import(conn: &mut Connection, yaml: &str) -> PageId {
    let definition = parse_definition_str(yaml).expect("fixture parses");
    import_definition(&definition, conn)
        .expect("fixture imports")
        .page_id
}

/// Edit a neutral draft field in place, keeping section ids stable
pub fn set_draft_field(conn: &Connection, page_id: PageId, field: &str, content: &str) {
    let updated = conn
        .execute(
            "UPDATE section_fields SET content = ?1
             WHERE field_name = ?2 AND language_id = 0
               AND section_id IN (SELECT id FROM sections WHERE page_id = ?3)",
            rusqlite::params![content, field, page_id.get()],
        )
        .expect("update field");
    assert!(updated > 0, "no draft field {} on page {}", field, page_id);
}
