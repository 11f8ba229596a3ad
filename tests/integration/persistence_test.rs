//! Integration tests for snapshot persistence.

mod helpers;

use std::sync::Arc;

use carpetas_core::error::ErrorKind;
use carpetas_entity::folder::{CarpetaCreate, CarpetaUpdate};
use carpetas_service::FolderService;
use carpetas_store::{InMemoryInvoiceRepository, InvoiceRepository, SnapshotFile};

use helpers::TestApp;

#[tokio::test]
async fn test_reopen_restores_tree_and_assignments() {
    let dir = tempfile::tempdir().unwrap();
    let invoices = Arc::new(InMemoryInvoiceRepository::new());

    let (year, month, inv) = {
        let app = TestApp::persistent(dir.path(), invoices.clone()).await;
        let year = app.folder("2024", None).await;
        let month = app.folder("Enero", Some(year)).await;
        let inv = app.invoice("F-1", 10.0, None);
        app.assign(inv, month).await;
        app.service
            .update(month, CarpetaUpdate::rename("January"))
            .await
            .unwrap();
        (year, month, inv)
    };

    let app = TestApp::persistent(dir.path(), invoices).await;
    let tree = app.service.list().await.unwrap();
    assert_eq!(tree.total_folders, 2);
    let node = tree.find(month).unwrap();
    assert_eq!(node.nombre, "January");
    assert_eq!(node.parent_id, Some(year));
    assert_eq!(node.facturas[0].id, inv);
    assert!(app.query.descendant_invoice_ids(year).await.unwrap().contains(&inv));
}

#[tokio::test]
async fn test_deleted_ids_stay_retired_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let invoices = Arc::new(InMemoryInvoiceRepository::new());

    let gone = {
        let app = TestApp::persistent(dir.path(), invoices.clone()).await;
        let gone = app.folder("tmp", None).await;
        app.service.delete(gone).await.unwrap();
        gone
    };

    let json = tokio::fs::read_to_string(dir.path().join("carpetas.json"))
        .await
        .unwrap();
    assert!(json.contains(&gone.to_string()), "retired id is recorded");

    let app = TestApp::persistent(dir.path(), invoices).await;
    let err = app
        .service
        .create(CarpetaCreate::child("x", gone))
        .await
        .expect_err("retired parent");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_failed_snapshot_write_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let invoices = Arc::new(InMemoryInvoiceRepository::new());
    let app = TestApp::persistent(dir.path(), invoices).await;
    let kept = app.folder("2024", None).await;

    // A directory where the temp file should go makes every write fail.
    tokio::fs::create_dir(dir.path().join("carpetas.json.tmp"))
        .await
        .unwrap();

    let err = app
        .service
        .create(CarpetaCreate::root("2025"))
        .await
        .expect_err("write fails");
    assert_eq!(err.kind, ErrorKind::Storage);

    let err = app.service.delete(kept).await.expect_err("write fails");
    assert_eq!(err.kind, ErrorKind::Storage);

    let tree = app.service.list().await.unwrap();
    assert_eq!(tree.total_folders, 1);
    assert_eq!(tree.roots[0].id, kept);
}

#[tokio::test]
async fn test_failed_sync_restores_repository() {
    let dir = tempfile::tempdir().unwrap();
    let invoices = Arc::new(InMemoryInvoiceRepository::new());
    let app = TestApp::persistent(dir.path(), invoices.clone()).await;
    let ghost = carpetas_core::types::FolderId::new();
    let inv = app.invoice("F-1", 1.0, None);
    invoices.set_invoice_folder(inv, Some(ghost)).await.unwrap();

    tokio::fs::create_dir(dir.path().join("carpetas.json.tmp"))
        .await
        .unwrap();

    let err = app.service.sync_invoices().await.expect_err("write fails");
    assert_eq!(err.kind, ErrorKind::Storage);
    assert_eq!(app.stored_folder(inv).await, Some(ghost));
}

#[tokio::test]
async fn test_corrupt_snapshot_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("carpetas.json");
    tokio::fs::write(&path, b"{\"folders\": 12}").await.unwrap();

    let err = FolderService::open(
        SnapshotFile::new(&path),
        Arc::new(InMemoryInvoiceRepository::new()),
    )
    .await
    .expect_err("corrupt");
    assert_eq!(err.kind, ErrorKind::Serialization);
}

#[tokio::test]
async fn test_snapshot_with_parent_loop_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("carpetas.json");
    let a = carpetas_core::types::FolderId::new();
    let b = carpetas_core::types::FolderId::new();
    let json = format!(
        r#"{{
            "folders": {{
                "folders": [
                    {{"id": "{a}", "nombre": "A", "parent_id": "{b}",
                      "created_at": "2024-01-01T00:00:00Z",
                      "updated_at": "2024-01-01T00:00:00Z"}},
                    {{"id": "{b}", "nombre": "B", "parent_id": "{a}",
                      "created_at": "2024-01-01T00:00:00Z",
                      "updated_at": "2024-01-01T00:00:00Z"}}
                ]
            }},
            "assignments": []
        }}"#
    );
    tokio::fs::write(&path, json).await.unwrap();

    let result = FolderService::open(
        SnapshotFile::new(&path),
        Arc::new(InMemoryInvoiceRepository::new()),
    )
    .await;
    assert!(result.is_err());
}
