//! Importer orchestration
//!
//! A definition replaces the page's draft sections wholesale. Versions
//! are untouched: importing never changes what visitors see until the
//! draft is published.

use crate::errors::{from_rusqlite, Result};
use crate::import::format::{PageDefinition, SectionDef};
use crate::import::parser::parse_definition_file;
use crate::repo::page_repo::NEUTRAL_LANGUAGE;
use crate::repo::{data_rows, NewSection, PageRepo};
use folio_core_types::{LanguageId, PageId};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// Outcome of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub page_id: PageId,
    pub keyword: String,
    pub sections: usize,
    pub data_rows: usize,
}

/// Parse and import a definition file
pub fn import_page_file(path: &Path, conn: &mut Connection) -> Result<ImportReport> {
    let definition = parse_definition_file(path)?;
    import_definition(&definition, conn)
}

/// Import a parsed definition in one transaction
pub fn import_definition(definition: &PageDefinition, conn: &mut Connection) -> Result<ImportReport> {
    let tx = conn.transaction().map_err(from_rusqlite)?;

    let page = &definition.page;
    let page_id = PageRepo::upsert_page(
        &tx,
        &page.keyword,
        page.url.as_deref(),
        page.nav_position,
        &page.extra,
    )?;
    let removed = PageRepo::clear_sections(&tx, page_id)?;

    for (position, section) in page.sections.iter().enumerate() {
        insert_section_tree(&tx, page_id, None, position, section)?;
    }

    let mut row_count = 0;
    for (table, rows) in &definition.data {
        data_rows::clear_table(&tx, table)?;
        for row in rows {
            data_rows::insert_row(
                &tx,
                table,
                row.record_id,
                row.language_id.map(LanguageId::new),
                &row.fields,
            )?;
            row_count += 1;
        }
    }

    tx.commit().map_err(from_rusqlite)?;

    let sections = page.sections.iter().map(SectionDef::subtree_len).sum();
    tracing::info!(
        page_id = page_id.get(),
        keyword = %page.keyword,
        sections,
        replaced = removed,
        data_rows = row_count,
        "Imported page definition"
    );

    Ok(ImportReport {
        page_id,
        keyword: page.keyword.clone(),
        sections,
        data_rows: row_count,
    })
}

fn insert_section_tree(
    conn: &Connection,
    page_id: PageId,
    parent: Option<i64>,
    position: usize,
    section: &SectionDef,
) -> Result<()> {
    let condition = section.condition.as_ref().map(|c| c.expression());
    let id = PageRepo::insert_section(
        conn,
        &NewSection {
            page_id,
            parent_section_id: parent,
            position: i32::try_from(position).unwrap_or(i32::MAX),
            keyword: &section.keyword,
            style_kind: &section.style_kind,
            condition: condition.as_deref(),
            debug: section.debug,
            data_sources: &section.data_sources,
        },
    )?;

    for (name, field) in &section.fields {
        PageRepo::upsert_field(conn, id, name, NEUTRAL_LANGUAGE, &field.to_content_field())?;
    }
    for (language_id, fields) in &section.translations {
        for (name, field) in fields {
            PageRepo::upsert_field(conn, id, name, *language_id, &field.to_content_field())?;
        }
    }

    for (child_position, child) in section.children.iter().enumerate() {
        insert_section_tree(conn, page_id, Some(id), child_position, child)?;
    }
    Ok(())
}
