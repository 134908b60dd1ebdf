#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{connect, import_home, temp_db};
use folio_core::errors::ExErrorKind;
use folio_core::logging_facility::test_capture::init_test_capture;
use folio_core_types::{PageId, UserId, VersionId};
use folio_store::repo::PageRepo;
use folio_store::versions::{self, NewVersion};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

fn snapshot(conn: &mut rusqlite::Connection, page_id: PageId) -> folio_core::model::Version {
    let doc = PageRepo::load_document(conn, page_id).unwrap();
    versions::create_version(conn, &NewVersion::new(page_id, &doc)).unwrap()
}

#[test]
fn test_version_numbers_start_at_one_and_increase() {
    // GIVEN an imported page
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;

    // WHEN three versions are created
    let numbers: Vec<i64> = (0..3).map(|_| snapshot(&mut conn, page).version_number).collect();

    // THEN they are numbered 1, 2, 3
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(versions::version_numbers(&conn, page).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_snapshot_is_stored_verbatim_with_all_languages() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let doc = PageRepo::load_document(&conn, page).unwrap();

    let created = versions::create_version(
        &mut conn,
        &NewVersion::new(page, &doc)
            .with_name("launch")
            .with_author(UserId::new(5))
            .with_metadata(serde_json::json!({"note": "first"})),
    )
    .unwrap();

    let loaded = versions::get_version(&conn, created.id).unwrap();
    assert_eq!(loaded.document, doc);
    assert_eq!(loaded.version_name.as_deref(), Some("launch"));
    assert_eq!(loaded.created_by, Some(UserId::new(5)));
    assert_eq!(loaded.metadata["note"], "first");
    assert!(loaded.published_at.is_none());

    let child = &loaded.document.sections[0].children[0];
    assert_eq!(child.translations.len(), 2);
}

#[test]
fn test_same_content_has_same_digest() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;

    let a = snapshot(&mut conn, page);
    let b = snapshot(&mut conn, page);
    assert_eq!(a.content_digest, b.content_digest);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_snapshot_for_other_page_is_rejected() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let doc = PageRepo::load_document(&conn, page).unwrap();

    let err = versions::create_version(&mut conn, &NewVersion::new(PageId::new(999), &doc))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}

#[test]
fn test_publish_moves_the_single_pointer() {
    // GIVEN two versions of a page
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let v1 = snapshot(&mut conn, page);
    let v2 = snapshot(&mut conn, page);

    // WHEN v1 then v2 is published
    let published = versions::publish(&mut conn, page, v1.id).unwrap();
    assert!(published.published_at.is_some());
    versions::publish(&mut conn, page, v2.id).unwrap();

    // THEN the page points at v2 and exactly one listing row is published
    assert_eq!(PageRepo::published_version_id(&conn, page).unwrap(), Some(v2.id));
    let (rows, total) = versions::list_for_page(&conn, page, 1, 10).unwrap();
    assert_eq!(total, 2);
    let flagged: Vec<VersionId> = rows.iter().filter(|r| r.is_published).map(|r| r.id).collect();
    assert_eq!(flagged, vec![v2.id]);

    // AND the snapshot did not change
    assert_eq!(versions::get_version(&conn, v1.id).unwrap().document, v1.document);
}

#[test]
fn test_publish_rejects_version_of_other_page() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let v1 = snapshot(&mut conn, page);
    let other = PageRepo::upsert_page(&conn, "other", None, None, &Default::default()).unwrap();

    let err = versions::publish(&mut conn, other, v1.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(PageRepo::published_version_id(&conn, other).unwrap(), None);
}

#[test]
fn test_unpublish_clears_pointer_and_keeps_versions() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let v1 = snapshot(&mut conn, page);
    versions::publish(&mut conn, page, v1.id).unwrap();

    let previous = versions::unpublish(&conn, page).unwrap();

    assert_eq!(previous, Some(v1.id));
    assert_eq!(PageRepo::published_version_id(&conn, page).unwrap(), None);
    assert!(versions::get_version(&conn, v1.id).is_ok());
}

#[test]
fn test_deleting_published_version_is_rejected() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let v1 = snapshot(&mut conn, page);
    let v2 = snapshot(&mut conn, page);
    versions::publish(&mut conn, page, v1.id).unwrap();

    let err = versions::delete_version(&mut conn, page, v1.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::PublishedVersionProtected);
    assert_eq!(err.code(), "ERR_PUBLISHED_VERSION_PROTECTED");

    versions::delete_version(&mut conn, page, v2.id).unwrap();
    let err = versions::get_version(&conn, v2.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let err = versions::delete_version(&mut conn, page, v2.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_delete_oldest_keeps_published_and_newest() {
    // GIVEN five versions with v2 published
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let ids: Vec<VersionId> = (0..5).map(|_| snapshot(&mut conn, page).id).collect();
    versions::publish(&mut conn, page, ids[1]).unwrap();

    // WHEN pruning down to two
    let removed = versions::delete_oldest(&mut conn, page, 2).unwrap();

    // THEN v1 and v3 are gone, the published v2 survives
    assert_eq!(removed, vec![ids[0], ids[2]]);
    assert_eq!(versions::version_numbers(&conn, page).unwrap(), vec![2, 4, 5]);

    // AND numbering continues after the highest surviving number
    assert_eq!(snapshot(&mut conn, page).version_number, 6);
}

#[test]
fn test_list_pagination_newest_first() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    for _ in 0..5 {
        snapshot(&mut conn, page);
    }

    let (first, total) = versions::list_for_page(&conn, page, 1, 2).unwrap();
    let (last, _) = versions::list_for_page(&conn, page, 3, 2).unwrap();
    let (beyond, _) = versions::list_for_page(&conn, page, 4, 2).unwrap();

    assert_eq!(total, 5);
    assert_eq!(first.iter().map(|v| v.version_number).collect::<Vec<_>>(), vec![5, 4]);
    assert_eq!(last.iter().map(|v| v.version_number).collect::<Vec<_>>(), vec![1]);
    assert!(beyond.is_empty());

    let err = versions::list_for_page(&conn, page, 0, 2).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}

#[test]
fn test_corrupt_snapshot_is_invalid_document() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let v1 = snapshot(&mut conn, page);
    conn.execute(
        "UPDATE page_versions SET snapshot = '{\"not\": \"a page\"}' WHERE id = ?1",
        [v1.id.get()],
    )
    .unwrap();

    let err = versions::get_version(&conn, v1.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidDocument);
}

#[test]
fn test_unreadable_metadata_is_dropped_with_warning() {
    let capture = init_test_capture();
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    let v1 = snapshot(&mut conn, page);
    conn.execute(
        "UPDATE page_versions SET metadata = '{broken' WHERE id = ?1",
        [v1.id.get()],
    )
    .unwrap();

    // the snapshot is intact, so the version still loads
    let loaded = versions::get_version(&conn, v1.id).unwrap();
    assert!(loaded.metadata.is_null());
    assert!(
        capture.count_events(|e| {
            e.level == tracing::Level::WARN
                && e.field("message")
                    .is_some_and(|m| m.contains("unreadable version metadata"))
        }) >= 1
    );
}

#[test]
fn test_get_by_number() {
    let (_dir, path) = temp_db();
    let mut conn = connect(&path);
    let page = import_home(&mut conn).page_id;
    snapshot(&mut conn, page);
    let v2 = snapshot(&mut conn, page);

    assert_eq!(versions::get_by_number(&conn, page, 2).unwrap().id, v2.id);
    let err = versions::get_by_number(&conn, page, 9).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_concurrent_creation_yields_unique_consecutive_numbers() {
    // GIVEN one page and several writers with their own connections
    let (_dir, path) = temp_db();
    let page = {
        let mut conn = connect(&path);
        import_home(&mut conn).page_id
    };
    const WRITERS: usize = 4;
    const PER_WRITER: usize = 5;
    let barrier = Arc::new(Barrier::new(WRITERS));

    // WHEN they all create versions at once
    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut conn = connect(&path);
                let doc = PageRepo::load_document(&conn, page).unwrap();
                barrier.wait();
                (0..PER_WRITER)
                    .map(|_| {
                        versions::create_version(&mut conn, &NewVersion::new(page, &doc))
                            .unwrap()
                            .version_number
                    })
                    .collect::<Vec<i64>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for number in handle.join().unwrap() {
            assert!(seen.insert(number), "version number {} assigned twice", number);
        }
    }

    // THEN numbers are exactly 1..=N
    let conn = connect(&path);
    let expected: Vec<i64> = (1..=(WRITERS * PER_WRITER) as i64).collect();
    assert_eq!(versions::version_numbers(&conn, page).unwrap(), expected);
}

#[test]
fn test_concurrent_publish_leaves_one_pointer() {
    let (_dir, path) = temp_db();
    let (page, ids) = {
        let mut conn = connect(&path);
        let page = import_home(&mut conn).page_id;
        let ids: Vec<VersionId> = (0..4).map(|_| snapshot(&mut conn, page).id).collect();
        (page, ids)
    };

    let handles: Vec<_> = ids
        .iter()
        .copied()
        .map(|id| {
            let path = path.clone();
            thread::spawn(move || {
                let mut conn = connect(&path);
                versions::publish(&mut conn, page, id).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = connect(&path);
    let pointer = PageRepo::published_version_id(&conn, page).unwrap().unwrap();
    assert!(ids.contains(&pointer));
    let (rows, _) = versions::list_for_page(&conn, page, 1, 10).unwrap();
    assert_eq!(rows.iter().filter(|r| r.is_published).count(), 1);
}
