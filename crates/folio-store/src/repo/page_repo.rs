//! Draft page repository
//!
//! Sections are stored flat (`parent_section_id`, `position`) and assembled
//! into an ordered tree on load. Field rows with `language_id = 0` are
//! language-neutral; every other language is stored as an override.

use std::collections::{BTreeMap, HashMap};

use crate::errors::{from_rusqlite, page_not_found, Result};
use folio_core::model::{ContentField, DataSourceConfig, Document, PageMetadata, SectionNode};
use folio_core_types::{LanguageId, PageId, VersionId};
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

/// Language id of language-neutral field rows
pub const NEUTRAL_LANGUAGE: i64 = 0;

/// Column values for a new section row
#[derive(Debug, Clone)]
pub struct NewSection<'a> {
    pub page_id: PageId,
    pub parent_section_id: Option<i64>,
    pub position: i32,
    pub keyword: &'a str,
    pub style_kind: &'a str,
    pub condition: Option<&'a str>,
    pub debug: bool,
    pub data_sources: &'a [DataSourceConfig],
}

struct SectionRow {
    id: i64,
    parent_section_id: Option<i64>,
    position: i32,
    keyword: String,
    style_kind: String,
    condition: Option<String>,
    debug: bool,
    data_sources: String,
}

struct FieldRow {
    section_id: i64,
    field_name: String,
    language_id: i64,
    content: String,
    meta: Option<String>,
}

/// SQLite repository for draft pages
pub struct PageRepo;

impl PageRepo {
    /// Insert a page or update the one with the same keyword; returns its id
    pub fn upsert_page(
        conn: &Connection,
        keyword: &str,
        url: Option<&str>,
        nav_position: Option<i32>,
        extra: &BTreeMap<String, Value>,
    ) -> Result<PageId> {
        let now = chrono::Utc::now().timestamp_millis();
        let extra = serde_json::to_string(extra).map_err(folio_core::ExError::from)?;
        let id: i64 = conn
            .query_row(
                "INSERT INTO pages (keyword, url, nav_position, extra, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(keyword) DO UPDATE SET
                    url = excluded.url,
                    nav_position = excluded.nav_position,
                    extra = excluded.extra,
                    updated_at = excluded.updated_at
                 RETURNING id",
                rusqlite::params![keyword, url, nav_position, extra, now],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(PageId::new(id))
    }

    pub fn find_by_keyword(conn: &Connection, keyword: &str) -> Result<Option<PageId>> {
        conn.query_row(
            "SELECT id FROM pages WHERE keyword = ?1",
            [keyword],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map(|id| id.map(PageId::new))
        .map_err(from_rusqlite)
    }

    pub fn page_exists(conn: &Connection, page_id: PageId) -> Result<bool> {
        conn.query_row("SELECT 1 FROM pages WHERE id = ?1", [page_id.get()], |_| Ok(()))
            .optional()
            .map(|r| r.is_some())
            .map_err(from_rusqlite)
    }

    /// The version the page currently publishes
    ///
    /// # Errors
    ///
    /// `NotFound` when the page does not exist.
    pub fn published_version_id(conn: &Connection, page_id: PageId) -> Result<Option<VersionId>> {
        let pointer: Option<Option<i64>> = conn
            .query_row(
                "SELECT published_version_id FROM pages WHERE id = ?1",
                [page_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        match pointer {
            Some(id) => Ok(id.map(VersionId::new)),
            None => Err(page_not_found("published_version_id", page_id)),
        }
    }

    /// Remove every section (and field) of a page
    pub fn clear_sections(conn: &Connection, page_id: PageId) -> Result<usize> {
        conn.execute("DELETE FROM sections WHERE page_id = ?1", [page_id.get()])
            .map_err(from_rusqlite)
    }

    pub fn insert_section(conn: &Connection, section: &NewSection<'_>) -> Result<i64> {
        let data_sources =
            serde_json::to_string(section.data_sources).map_err(folio_core::ExError::from)?;
        conn.execute(
            "INSERT INTO sections
                (page_id, parent_section_id, position, keyword, style_kind, condition, debug, data_sources)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                section.page_id.get(),
                section.parent_section_id,
                section.position,
                section.keyword,
                section.style_kind,
                section.condition,
                section.debug,
                data_sources,
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(conn.last_insert_rowid())
    }

    /// Write one field value; `language_id` 0 for language-neutral fields
    pub fn upsert_field(
        conn: &Connection,
        section_id: i64,
        field_name: &str,
        language_id: i64,
        field: &ContentField,
    ) -> Result<()> {
        let meta = if field.meta.is_null() {
            None
        } else {
            Some(field.meta.to_string())
        };
        conn.execute(
            "INSERT INTO section_fields (section_id, field_name, language_id, content, meta)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(section_id, field_name, language_id) DO UPDATE SET
                content = excluded.content,
                meta = excluded.meta",
            rusqlite::params![section_id, field_name, language_id, field.content, meta],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Page attributes without sections
    ///
    /// # Errors
    ///
    /// `NotFound` when the page does not exist.
    pub fn load_metadata(conn: &Connection, page_id: PageId) -> Result<PageMetadata> {
        let row: Option<(String, Option<String>, Option<i32>, String)> = conn
            .query_row(
                "SELECT keyword, url, nav_position, extra FROM pages WHERE id = ?1",
                [page_id.get()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;
        let (keyword, url, nav_position, extra) =
            row.ok_or_else(|| page_not_found("load_metadata", page_id))?;

        let extra = serde_json::from_str(&extra).unwrap_or_else(|e| {
            tracing::warn!(page_id = page_id.get(), "Ignoring unreadable page attributes: {}", e);
            BTreeMap::new()
        });
        Ok(PageMetadata {
            id: page_id,
            keyword,
            url,
            nav_position,
            extra,
        })
    }

    /// The full draft with every language: neutral fields in
    /// `content_fields`, per-language fields in `translations`.
    ///
    /// This is the shape frozen into a version.
    pub fn load_document(conn: &Connection, page_id: PageId) -> Result<Document> {
        let metadata = Self::load_metadata(conn, page_id)?;
        let sections = load_section_rows(conn, page_id)?;
        let fields = load_field_rows(conn, page_id)?;
        Ok(Document {
            metadata,
            sections: assemble_tree(page_id, sections, fields),
        })
    }

    /// The draft for one language, with overrides applied and no
    /// `translations` left on any node
    pub fn load_draft(conn: &Connection, page_id: PageId, language_id: LanguageId) -> Result<Document> {
        let mut document = Self::load_document(conn, page_id)?;
        for section in &mut document.sections {
            flatten_language(section, language_id);
        }
        Ok(document)
    }
}

fn flatten_language(node: &mut SectionNode, language_id: LanguageId) {
    if let Some(overrides) = node.translations.remove(&language_id) {
        node.content_fields.extend(overrides);
    }
    node.translations.clear();
    for child in &mut node.children {
        flatten_language(child, language_id);
    }
}

fn load_section_rows(conn: &Connection, page_id: PageId) -> Result<Vec<SectionRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, parent_section_id, position, keyword, style_kind, condition, debug, data_sources
             FROM sections WHERE page_id = ?1
             ORDER BY position, id",
        )
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([page_id.get()], |row| {
            Ok(SectionRow {
                id: row.get(0)?,
                parent_section_id: row.get(1)?,
                position: row.get(2)?,
                keyword: row.get(3)?,
                style_kind: row.get(4)?,
                condition: row.get(5)?,
                debug: row.get(6)?,
                data_sources: row.get(7)?,
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

fn load_field_rows(conn: &Connection, page_id: PageId) -> Result<Vec<FieldRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT f.section_id, f.field_name, f.language_id, f.content, f.meta
             FROM section_fields f
             JOIN sections s ON s.id = f.section_id
             WHERE s.page_id = ?1",
        )
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([page_id.get()], |row| {
            Ok(FieldRow {
                section_id: row.get(0)?,
                field_name: row.get(1)?,
                language_id: row.get(2)?,
                content: row.get(3)?,
                meta: row.get(4)?,
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

/// Build the ordered section tree from flat rows already sorted by position
fn assemble_tree(page_id: PageId, sections: Vec<SectionRow>, fields: Vec<FieldRow>) -> Vec<SectionNode> {
    let mut nodes: HashMap<i64, SectionNode> = HashMap::with_capacity(sections.len());
    let mut children_of: HashMap<Option<i64>, Vec<i64>> = HashMap::new();

    for row in sections {
        let data_sources: Vec<DataSourceConfig> = serde_json::from_str(&row.data_sources)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    page_id = page_id.get(),
                    section_id = row.id,
                    "Ignoring unreadable data-source config: {}",
                    e
                );
                Vec::new()
            });
        let mut node = SectionNode::new(row.id, row.style_kind)
            .with_keyword(row.keyword)
            .with_debug(row.debug);
        node.position = row.position;
        node.condition = row.condition;
        node.data_sources = data_sources;

        children_of.entry(row.parent_section_id).or_default().push(row.id);
        nodes.insert(row.id, node);
    }

    for field in fields {
        let Some(node) = nodes.get_mut(&field.section_id) else {
            continue;
        };
        let meta = match field.meta.as_deref().map(serde_json::from_str::<Value>) {
            Some(Ok(meta)) => meta,
            Some(Err(e)) => {
                tracing::warn!(
                    page_id = page_id.get(),
                    section_id = field.section_id,
                    field = %field.field_name,
                    "Ignoring unreadable field meta: {}",
                    e
                );
                Value::Null
            }
            None => Value::Null,
        };
        let value = ContentField::new(field.content).with_meta(meta);
        if field.language_id == NEUTRAL_LANGUAGE {
            node.content_fields.insert(field.field_name, value);
        } else {
            node.translations
                .entry(LanguageId::new(field.language_id))
                .or_default()
                .insert(field.field_name, value);
        }
    }

    fn attach(
        id: i64,
        nodes: &mut HashMap<i64, SectionNode>,
        children_of: &HashMap<Option<i64>, Vec<i64>>,
    ) -> Option<SectionNode> {
        let mut node = nodes.remove(&id)?;
        if let Some(children) = children_of.get(&Some(id)) {
            node.children = children
                .iter()
                .filter_map(|child| attach(*child, nodes, children_of))
                .collect();
        }
        Some(node)
    }

    let roots = children_of.get(&None).cloned().unwrap_or_default();
    let tree: Vec<SectionNode> = roots
        .into_iter()
        .filter_map(|id| attach(id, &mut nodes, &children_of))
        .collect();

    if !nodes.is_empty() {
        tracing::warn!(
            page_id = page_id.get(),
            orphans = nodes.len(),
            "Sections unreachable from the page root were skipped"
        );
    }
    tree
}
