#![allow(clippy::unwrap_used, clippy::expect_used)]

// Integration tests for version commands and queries through the engine:
// publish, unpublish, delete, prune, import, list and get.

mod common;

use common::{context, context_with, import, set_draft_field, setup_db, ABOUT_PAGE, HOME_PAGE};
use folio_core::errors::ExErrorKind;
use folio_core::logging_facility::test_capture::init_test_capture;
use folio_core_types::schema::{EVENT_END, EVENT_END_ERROR};
use folio_core_types::{PageId, UserId, VersionId};
use folio_engine::commands::engine_query::VersionPage;
use folio_engine::response::{command_response, query_response};
use folio_engine::{
    apply_engine_command, apply_engine_query, EngineCommand, EngineCommandResult, EngineQuery,
    EngineQueryResult, FolioConfig,
};
use folio_store::repo::PageRepo;
use serde_json::json;

fn list(conn: &rusqlite::Connection, ctx: &folio_engine::EngineContext, page: PageId) -> VersionPage {
    let query = EngineQuery::ListVersions {
        page_id: page,
        page: 1,
        page_size: 50,
    };
    match apply_engine_query(query, conn, ctx).unwrap() {
        EngineQueryResult::Versions(page) => page,
        other => panic!("unexpected result {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Publish
// ---------------------------------------------------------------------------

#[test]
fn test_publish_responds_201_with_version_fields() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);

    let result = apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx);
    let response = command_response(&result);

    assert_eq!(response.status, 201);
    assert_eq!(response.body["version_number"], json!(1));
    assert!(response.body["version_id"].is_i64());
    assert!(response.body["published_at"].is_string());
    assert_eq!(
        PageRepo::published_version_id(&conn, page).unwrap(),
        Some(VersionId::new(response.body["version_id"].as_i64().unwrap()))
    );
}

#[test]
fn test_publish_records_name_author_and_metadata() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);

    let cmd = EngineCommand::Publish {
        page_id: page,
        version_name: Some("launch".to_string()),
        created_by: Some(UserId::new(3)),
        metadata: json!({"ticket": "CMS-12"}),
    };
    let version_id = match apply_engine_command(cmd, &mut conn, &ctx).unwrap() {
        EngineCommandResult::Published(p) => p.version_id,
        other => panic!("unexpected result {:?}", other),
    };

    let query = EngineQuery::GetVersion {
        page_id: page,
        version_id,
    };
    let version = match apply_engine_query(query, &conn, &ctx).unwrap() {
        EngineQueryResult::Version(v) => v,
        other => panic!("unexpected result {:?}", other),
    };
    assert_eq!(version.version_name.as_deref(), Some("launch"));
    assert_eq!(version.created_by, Some(UserId::new(3)));
    assert_eq!(version.metadata, json!({"ticket": "CMS-12"}));
    assert!(version.published_at.is_some());
    assert_eq!(version.document.metadata.keyword, "about");
}

#[test]
fn test_publish_existing_version_rolls_back() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);

    let first = match apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap() {
        EngineCommandResult::Published(p) => p.version_id,
        other => panic!("unexpected result {:?}", other),
    };
    set_draft_field(&conn, page, "text", "v2");
    apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap();

    // WHEN the first version is re-published
    apply_engine_command(
        EngineCommand::PublishVersion {
            page_id: page,
            version_id: first,
        },
        &mut conn,
        &ctx,
    )
    .unwrap();

    // THEN the pointer moves back and exactly one version is marked published
    assert_eq!(PageRepo::published_version_id(&conn, page).unwrap(), Some(first));
    let listing = list(&conn, &ctx, page);
    let published: Vec<_> = listing.items.iter().filter(|v| v.is_published).collect();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, first);
}

#[test]
fn test_create_version_does_not_publish() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);

    let cmd = EngineCommand::CreateVersion {
        page_id: page,
        version_name: None,
        created_by: None,
        metadata: json!({}),
    };
    let result = apply_engine_command(cmd, &mut conn, &ctx).unwrap();

    assert!(matches!(
        result,
        EngineCommandResult::VersionCreated {
            version_number: 1,
            ..
        }
    ));
    assert_eq!(PageRepo::published_version_id(&conn, page).unwrap(), None);
}

#[test]
fn test_publish_unknown_page_is_not_found() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();

    let result = apply_engine_command(EngineCommand::publish(PageId::new(77)), &mut conn, &ctx);

    assert_eq!(command_response(&result).status, 404);
}

// ---------------------------------------------------------------------------
// Unpublish / delete / prune
// ---------------------------------------------------------------------------

#[test]
fn test_unpublish_reports_previous_version() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);
    apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap();
    let published = PageRepo::published_version_id(&conn, page).unwrap();

    let result =
        apply_engine_command(EngineCommand::Unpublish { page_id: page }, &mut conn, &ctx).unwrap();

    assert_eq!(
        result,
        EngineCommandResult::Unpublished {
            page_id: page,
            previous_version_id: published,
        }
    );
    assert_eq!(PageRepo::published_version_id(&conn, page).unwrap(), None);
}

#[test]
fn test_delete_published_version_is_rejected_with_400() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);
    apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap();
    let published = PageRepo::published_version_id(&conn, page).unwrap().unwrap();

    let result = apply_engine_command(
        EngineCommand::DeleteVersion {
            page_id: page,
            version_id: published,
        },
        &mut conn,
        &ctx,
    );

    assert_eq!(
        result.as_ref().unwrap_err().kind(),
        ExErrorKind::PublishedVersionProtected
    );
    let response = command_response(&result);
    assert_eq!(response.status, 400);
    assert_eq!(
        response.body["error"]["code"],
        json!("ERR_PUBLISHED_VERSION_PROTECTED")
    );
    assert_eq!(list(&conn, &ctx, page).total, 1);
}

#[test]
fn test_delete_unpublished_version() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);
    let created = apply_engine_command(
        EngineCommand::CreateVersion {
            page_id: page,
            version_name: None,
            created_by: None,
            metadata: json!({}),
        },
        &mut conn,
        &ctx,
    )
    .unwrap();
    let EngineCommandResult::VersionCreated { version_id, .. } = created else {
        panic!("unexpected result {:?}", created);
    };

    let result = apply_engine_command(
        EngineCommand::DeleteVersion {
            page_id: page,
            version_id,
        },
        &mut conn,
        &ctx,
    );

    assert_eq!(command_response(&result).status, 200);
    assert_eq!(list(&conn, &ctx, page).total, 0);
}

#[test]
fn test_prune_keeps_newest_and_published() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);

    // GIVEN five versions with version 1 published
    apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap();
    for _ in 0..4 {
        apply_engine_command(
            EngineCommand::CreateVersion {
                page_id: page,
                version_name: None,
                created_by: None,
                metadata: json!({}),
            },
            &mut conn,
            &ctx,
        )
        .unwrap();
    }

    // WHEN pruning to the newest two
    let result = apply_engine_command(
        EngineCommand::PruneVersions {
            page_id: page,
            keep: 2,
        },
        &mut conn,
        &ctx,
    )
    .unwrap();

    // THEN versions 2 and 3 are removed; the published version 1 survives
    let EngineCommandResult::Pruned { deleted, .. } = result else {
        panic!("unexpected result {:?}", result);
    };
    assert_eq!(deleted.len(), 2);
    let mut numbers: Vec<i64> = list(&conn, &ctx, page)
        .items
        .iter()
        .map(|v| v.version_number)
        .collect();
    numbers.sort();
    assert_eq!(numbers, vec![1, 4, 5]);
}

#[test]
fn test_retention_policy_prunes_after_publish() {
    let (_tmp, mut conn) = setup_db();
    let mut config = FolioConfig::default();
    config.retention.keep_versions = Some(2);
    let ctx = context_with(config);
    let page = import(&mut conn, ABOUT_PAGE);

    let mut last = None;
    for n in 0..4 {
        set_draft_field(&conn, page, "text", &format!("edition {}", n));
        last = Some(apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap());
    }

    let listing = list(&conn, &ctx, page);
    let numbers: Vec<i64> = listing.items.iter().map(|v| v.version_number).collect();
    // the published version does not count against the two kept
    assert_eq!(numbers, vec![4, 3, 2]);
    let Some(EngineCommandResult::Published(publish)) = last else {
        panic!("expected a publish result");
    };
    assert_eq!(publish.pruned.len(), 1);
    assert!(publish.prune_error.is_none());
}

#[test]
fn test_failed_retention_does_not_fail_committed_publish() {
    let (_tmp, mut conn) = setup_db();
    let mut config = FolioConfig::default();
    config.retention.keep_versions = Some(0);
    let ctx = context_with(config);
    let page = import(&mut conn, ABOUT_PAGE);
    apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap();

    // GIVEN version deletes are blocked at the database
    conn.execute_batch(
        "CREATE TRIGGER block_version_delete BEFORE DELETE ON page_versions
         BEGIN SELECT RAISE(ABORT, 'deletes blocked'); END;",
    )
    .unwrap();

    // WHEN a second version is published and retention tries to drop the first
    set_draft_field(&conn, page, "text", "Second edition");
    let result = apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap();

    // THEN the publish is reported as committed, with the retention failure attached
    let EngineCommandResult::Published(publish) = result else {
        panic!("unexpected result {:?}", result);
    };
    assert_eq!(publish.version_number, 2);
    assert!(publish.pruned.is_empty());
    assert!(publish.prune_error.is_some());

    assert_eq!(
        PageRepo::published_version_id(&conn, page).unwrap(),
        Some(publish.version_id)
    );
    assert_eq!(list(&conn, &ctx, page).total, 2);
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[test]
fn test_import_page_command_reads_definition_file() {
    let (tmp, mut conn) = setup_db();
    let ctx = context();
    let path = tmp.path().join("home.yaml");
    std::fs::write(&path, HOME_PAGE).unwrap();

    let result = apply_engine_command(EngineCommand::ImportPage { path }, &mut conn, &ctx).unwrap();

    let EngineCommandResult::Imported(report) = result else {
        panic!("unexpected result {:?}", result);
    };
    assert_eq!(report.keyword, "home");
    assert_eq!(report.sections, 3);
    assert_eq!(report.data_rows, 2);
    assert_eq!(PageRepo::find_by_keyword(&conn, "home").unwrap(), Some(report.page_id));
}

#[test]
fn test_import_missing_file_is_an_error() {
    let (tmp, mut conn) = setup_db();
    let ctx = context();

    let result = apply_engine_command(
        EngineCommand::ImportPage {
            path: tmp.path().join("missing.yaml"),
        },
        &mut conn,
        &ctx,
    );

    assert_eq!(result.unwrap_err().kind(), ExErrorKind::Io);
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

#[test]
fn test_list_versions_paginates_newest_first() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);
    for _ in 0..3 {
        apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap();
    }

    let query = EngineQuery::ListVersions {
        page_id: page,
        page: 2,
        page_size: 2,
    };
    let result = apply_engine_query(query, &conn, &ctx);
    let response = query_response(&result);

    assert_eq!(response.status, 200);
    assert_eq!(response.body["total"], json!(3));
    assert_eq!(response.body["items"].as_array().unwrap().len(), 1);
    assert_eq!(response.body["items"][0]["version_number"], json!(1));
}

#[test]
fn test_list_versions_of_unknown_page_is_404() {
    let (_tmp, conn) = setup_db();
    let ctx = context();

    let query = EngineQuery::ListVersions {
        page_id: PageId::new(5),
        page: 1,
        page_size: 10,
    };

    assert_eq!(query_response(&apply_engine_query(query, &conn, &ctx)).status, 404);
}

#[test]
fn test_get_version_of_another_page_is_404() {
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let about = import(&mut conn, ABOUT_PAGE);
    let home = import(&mut conn, HOME_PAGE);
    apply_engine_command(EngineCommand::publish(about), &mut conn, &ctx).unwrap();
    let version_id = PageRepo::published_version_id(&conn, about).unwrap().unwrap();

    let query = EngineQuery::GetVersion {
        page_id: home,
        version_id,
    };

    assert_eq!(query_response(&apply_engine_query(query, &conn, &ctx)).status, 404);
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[test]
fn test_commands_emit_operation_events() {
    let capture = init_test_capture();
    let (_tmp, mut conn) = setup_db();
    let ctx = context();
    let page = import(&mut conn, ABOUT_PAGE);
    apply_engine_command(EngineCommand::publish(page), &mut conn, &ctx).unwrap();
    let published = PageRepo::published_version_id(&conn, page).unwrap().unwrap();

    let _ = apply_engine_command(
        EngineCommand::DeleteVersion {
            page_id: page,
            version_id: published,
        },
        &mut conn,
        &ctx,
    );

    capture.assert_event_exists("publish", EVENT_END);
    let errors = capture.count_events(|e| {
        e.op.as_deref() == Some("delete_version")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.field("err_code") == Some("ERR_PUBLISHED_VERSION_PROTECTED")
    });
    assert!(errors >= 1);
}
