//! Integration tests for folder tree operations.

mod helpers;

use std::collections::BTreeSet;

use carpetas_core::error::ErrorKind;
use carpetas_core::events::FolderEvent;
use carpetas_core::types::FolderId;
use carpetas_entity::folder::{CarpetaCreate, CarpetaUpdate};

use helpers::TestApp;

#[tokio::test]
async fn test_move_under_own_descendant_is_rejected() {
    let app = TestApp::new();
    let f1 = app.folder("2024", None).await;
    let f2 = app.folder("Enero", Some(f1)).await;
    let before = app.service.list().await.unwrap();

    let err = app
        .service
        .update(f1, CarpetaUpdate::move_to(Some(f2)))
        .await
        .expect_err("cycle");

    assert_eq!(err.kind, ErrorKind::Cycle);
    assert_eq!(err.subject(), Some(f2.to_string().as_str()));
    assert_eq!(app.service.list().await.unwrap(), before);
}

#[tokio::test]
async fn test_move_under_self_is_rejected() {
    let app = TestApp::new();
    let f1 = app.folder("2024", None).await;

    let err = app
        .service
        .update(f1, CarpetaUpdate::move_to(Some(f1)))
        .await
        .expect_err("self parent");
    assert_eq!(err.kind, ErrorKind::Cycle);
}

#[tokio::test]
async fn test_move_to_missing_parent() {
    let app = TestApp::new();
    let f1 = app.folder("2024", None).await;

    let err = app
        .service
        .update(f1, CarpetaUpdate::move_to(Some(FolderId::new())))
        .await
        .expect_err("missing parent");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_rename_keeps_parent() {
    let app = TestApp::new();
    let f1 = app.folder("2024", None).await;
    let f2 = app.folder("Enero", Some(f1)).await;

    let renamed = app
        .service
        .update(f2, CarpetaUpdate::rename("January"))
        .await
        .unwrap();

    assert_eq!(renamed.name, "January");
    assert_eq!(renamed.parent_id, Some(f1));
    let node = app.service.get(f2).await.unwrap();
    assert_eq!(node.nombre, "January");
}

#[tokio::test]
async fn test_rename_and_move_together() {
    let app = TestApp::new();
    let a = app.folder("A", None).await;
    let b = app.folder("B", None).await;
    let mut rx = app.service.subscribe();

    let folder = app
        .service
        .update(
            a,
            CarpetaUpdate {
                nombre: Some("A2".to_string()),
                parent_id: Some(Some(b)),
            },
        )
        .await
        .unwrap();
    assert_eq!(folder.name, "A2");
    assert_eq!(folder.parent_id, Some(b));

    let renamed = rx.recv().await.unwrap();
    assert!(matches!(renamed.payload, FolderEvent::Renamed { .. }));
    let moved = rx.recv().await.unwrap();
    assert_eq!(
        moved.payload,
        FolderEvent::Moved {
            folder_id: a,
            from_parent_id: None,
            to_parent_id: Some(b),
        }
    );
}

#[tokio::test]
async fn test_move_subtree_to_root() {
    let app = TestApp::new();
    let f1 = app.folder("2024", None).await;
    let f2 = app.folder("Enero", Some(f1)).await;
    let f3 = app.folder("Semana 1", Some(f2)).await;

    app.service
        .update(f2, CarpetaUpdate::move_to(None))
        .await
        .unwrap();

    let tree = app.service.list().await.unwrap();
    assert_eq!(tree.roots.len(), 2);
    let moved = tree.find(f2).unwrap();
    assert_eq!(moved.parent_id, None);
    assert_eq!(moved.children[0].id, f3);
    assert!(tree.find(f1).unwrap().children.is_empty());
}

#[tokio::test]
async fn test_delete_cascades_and_orphans() {
    let app = TestApp::new();
    let f1 = app.folder("2024", None).await;
    let f2 = app.folder("Enero", Some(f1)).await;
    let f3 = app.folder("Semana 1", Some(f2)).await;
    let keep = app.folder("2025", None).await;
    let inv1 = app.invoice("F-1", 10.0, None);
    let inv2 = app.invoice("F-2", 20.0, None);
    let inv3 = app.invoice("F-3", 30.0, None);
    app.assign(inv1, f2).await;
    app.assign(inv2, f3).await;
    app.assign(inv3, keep).await;

    let outcome = app.service.delete(f1).await.unwrap();

    assert_eq!(outcome.folders_removed, 3);
    assert_eq!(outcome.invoices_orphaned, 2);
    assert_eq!(app.all_folder_ids().await, BTreeSet::from([keep]));
    assert_eq!(app.stored_folder(inv1).await, None);
    assert_eq!(app.stored_folder(inv2).await, None);
    assert_eq!(app.stored_folder(inv3).await, Some(keep));
    assert_eq!(app.invoices.len(), 3);
}

#[tokio::test]
async fn test_delete_missing_folder() {
    let app = TestApp::new();
    let err = app
        .service
        .delete(FolderId::new())
        .await
        .expect_err("missing");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_deleted_ids_are_not_reusable() {
    let app = TestApp::new();
    let f1 = app.folder("2024", None).await;
    app.service.delete(f1).await.unwrap();

    let err = app
        .service
        .create(CarpetaCreate::child("Enero", f1))
        .await
        .expect_err("deleted parent");
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = app.service.get(f1).await.expect_err("gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_list_children_and_search() {
    let app = TestApp::new();
    let year = app.folder("2024", None).await;
    app.folder("marzo", Some(year)).await;
    app.folder("Enero", Some(year)).await;
    app.folder("Febrero", Some(year)).await;

    let names: Vec<String> = app
        .service
        .list_children(year)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["Enero", "Febrero", "marzo"]);

    let hits = app.service.search("ero").await.unwrap();
    let names: Vec<&str> = hits.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Enero", "Febrero"]);
}

#[tokio::test]
async fn test_list_children_of_missing_folder() {
    let app = TestApp::new();
    let err = app
        .service
        .list_children(FolderId::new())
        .await
        .expect_err("missing");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

/// Random-ish create/move sequence; every parent chain must reach a root.
#[tokio::test]
async fn test_moves_never_create_cycles() {
    let app = TestApp::new();
    let mut ids = Vec::new();
    for i in 0..12 {
        let parent = if i == 0 { None } else { Some(ids[(i * 7 + 3) % i]) };
        ids.push(app.folder(&format!("f{i}"), parent).await);
    }

    for step in 0..60usize {
        let folder = ids[(step * 5 + 3) % ids.len()];
        let target = ids[(step * 11 + 1) % ids.len()];
        let _ = app
            .service
            .update(folder, CarpetaUpdate::move_to(Some(target)))
            .await;
    }

    for id in &ids {
        let crumbs = app.query.breadcrumbs(*id).await.expect("acyclic chain");
        assert!(crumbs.len() <= ids.len());
        assert_eq!(crumbs.last().map(|f| f.id), Some(*id));
        assert_eq!(crumbs[0].parent_id, None);
    }
    assert_eq!(app.service.list().await.unwrap().total_folders, ids.len() as u64);
}

#[tokio::test]
async fn test_concurrent_moves_stay_acyclic() {
    let app = TestApp::new();
    let a = app.folder("A", None).await;
    let b = app.folder("B", None).await;

    for _ in 0..20 {
        let s1 = app.service.clone();
        let s2 = app.service.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.update(a, CarpetaUpdate::move_to(Some(b))).await }),
            tokio::spawn(async move { s2.update(b, CarpetaUpdate::move_to(Some(a))).await }),
        );
        let ok = [r1.unwrap().is_ok(), r2.unwrap().is_ok()];
        assert_eq!(ok.iter().filter(|x| **x).count(), 1);

        let crumbs_a = app.query.breadcrumbs(a).await.expect("acyclic");
        let crumbs_b = app.query.breadcrumbs(b).await.expect("acyclic");
        assert!(crumbs_a.len() <= 2 && crumbs_b.len() <= 2);

        // Reset both to roots for the next round.
        app.service.update(a, CarpetaUpdate::move_to(None)).await.unwrap();
        app.service.update(b, CarpetaUpdate::move_to(None)).await.unwrap();
    }
}

#[tokio::test]
async fn test_readers_never_see_partial_cascade() {
    let app = TestApp::new();
    let root = app.folder("root", None).await;
    let mut parent = root;
    let mut chain = vec![root];
    for i in 0..30 {
        parent = app.folder(&format!("n{i}"), Some(parent)).await;
        chain.push(parent);
    }
    let total = chain.len() as u64;

    let reader = {
        let service = app.service.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                let count = service.list().await.unwrap().total_folders;
                assert!(count == total || count == 0, "saw {count} folders");
                tokio::task::yield_now().await;
            }
        })
    };
    app.service.delete(root).await.unwrap();
    reader.await.unwrap();
}
