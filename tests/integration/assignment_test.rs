//! Integration tests for invoice assignment and orphaning.

mod helpers;

use std::collections::BTreeSet;
use std::sync::Arc;

use carpetas_core::error::ErrorKind;
use carpetas_core::types::{FolderId, InvoiceId};
use carpetas_entity::folder::{CarpetaCreate, Folder};
use carpetas_entity::invoice::{AssignRequest, Invoice};
use carpetas_service::FolderService;
use carpetas_store::{FolderState, InMemoryInvoiceRepository, InvoiceRepository};

use helpers::{FlakyRepository, TestApp};

#[tokio::test]
async fn test_subtree_contains_nested_assignment() {
    let app = TestApp::new();
    let f1 = app.folder("2024", None).await;
    let f2 = app.folder("Enero", Some(f1)).await;
    let inv1 = app.invoice("F-1", 100.0, None);
    app.assign(inv1, f2).await;

    assert_eq!(
        app.query.descendant_invoice_ids(f1).await.unwrap(),
        BTreeSet::from([inv1])
    );
    assert!(app.query.invoices_of(f1).await.unwrap().is_empty());
    assert_eq!(app.stored_folder(inv1).await, Some(f2));
}

#[tokio::test]
async fn test_reassign_moves_invoice() {
    let app = TestApp::new();
    let f = app.folder("F", None).await;
    let g = app.folder("G", None).await;
    let inv = app.invoice("F-1", 1.0, None);
    app.assign(inv, f).await;

    let outcome = app
        .service
        .assign_invoice(inv, AssignRequest { carpeta_id: g })
        .await
        .unwrap();

    assert_eq!(outcome.carpeta_id, Some(g));
    assert_eq!(outcome.carpeta_nombre.as_deref(), Some("G"));
    assert_eq!(outcome.carpeta_anterior_id, Some(f));
    assert!(app.query.invoices_of(g).await.unwrap().contains(&inv));
    assert!(!app.query.invoices_of(f).await.unwrap().contains(&inv));
    assert_eq!(app.stored_folder(inv).await, Some(g));
}

#[tokio::test]
async fn test_assign_to_missing_folder() {
    let app = TestApp::new();
    let inv = app.invoice("F-1", 1.0, None);
    let ghost = FolderId::new();

    let err = app
        .service
        .assign_invoice(inv, AssignRequest { carpeta_id: ghost })
        .await
        .expect_err("missing folder");

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.subject(), Some(ghost.to_string().as_str()));
    assert_eq!(app.stored_folder(inv).await, None);
}

#[tokio::test]
async fn test_assign_unknown_invoice() {
    let app = TestApp::new();
    let f = app.folder("F", None).await;

    let err = app
        .service
        .assign_invoice(InvoiceId::new(), AssignRequest { carpeta_id: f })
        .await
        .expect_err("unknown invoice");
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(app.query.invoices_of(f).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unassign_is_idempotent() {
    let app = TestApp::new();
    let f = app.folder("F", None).await;
    let inv = app.invoice("F-1", 1.0, None);
    app.assign(inv, f).await;

    let first = app.service.unassign_invoice(inv).await.unwrap();
    assert_eq!(first.carpeta_anterior_id, Some(f));
    let second = app.service.unassign_invoice(inv).await.unwrap();
    assert_eq!(second.carpeta_anterior_id, None);

    assert!(app.query.invoices_of(f).await.unwrap().is_empty());
    assert_eq!(app.stored_folder(inv).await, None);
}

#[tokio::test]
async fn test_failed_orphaning_leaves_everything_unchanged() {
    let inner = Arc::new(InMemoryInvoiceRepository::new());
    let a = Invoice::new("F-1", "ACME", 1.0, None);
    let b = Invoice::new("F-2", "ACME", 2.0, None);
    let (a_id, b_id) = (a.id, b.id);
    inner.insert(a);
    inner.insert(b);

    // Two writes for the assignments, one for the first orphaning, then a
    // failure on the second.
    let flaky = Arc::new(FlakyRepository::new(inner.clone(), 3, 1));
    let service = FolderService::new(flaky);
    let query = service.query_engine();
    let folder = service.create(CarpetaCreate::root("2024")).await.unwrap();
    let child = service
        .create(CarpetaCreate::child("Enero", folder.id))
        .await
        .unwrap();
    service
        .assign_invoice(a_id, AssignRequest { carpeta_id: folder.id })
        .await
        .unwrap();
    service
        .assign_invoice(b_id, AssignRequest { carpeta_id: child.id })
        .await
        .unwrap();
    let before = service.list().await.unwrap();

    let err = service.delete(folder.id).await.expect_err("repository down");

    assert_eq!(err.kind, ErrorKind::ExternalService);
    assert_eq!(service.list().await.unwrap(), before);
    assert_eq!(
        query.descendant_invoice_ids(folder.id).await.unwrap(),
        BTreeSet::from([a_id, b_id])
    );
    let stored_a = inner.get_invoice(a_id).await.unwrap().unwrap();
    let stored_b = inner.get_invoice(b_id).await.unwrap().unwrap();
    assert_eq!(stored_a.folder_id, Some(folder.id));
    assert_eq!(stored_b.folder_id, Some(child.id));

    // The repository recovered; the delete now goes through.
    let outcome = service.delete(folder.id).await.unwrap();
    assert_eq!(outcome.invoices_orphaned, 2);
}

#[tokio::test]
async fn test_failed_assignment_keeps_index() {
    let inner = Arc::new(InMemoryInvoiceRepository::new());
    let invoice = Invoice::new("F-1", "ACME", 1.0, None);
    let id = invoice.id;
    inner.insert(invoice);

    let service = FolderService::new(Arc::new(FlakyRepository::new(inner.clone(), 0, 1)));
    let query = service.query_engine();
    let folder = service.create(CarpetaCreate::root("2024")).await.unwrap();

    let err = service
        .assign_invoice(id, AssignRequest { carpeta_id: folder.id })
        .await
        .expect_err("repository down");
    assert_eq!(err.kind, ErrorKind::ExternalService);
    assert!(query.invoices_of(folder.id).await.unwrap().is_empty());
    assert_eq!(inner.get_invoice(id).await.unwrap().unwrap().folder_id, None);
}

#[tokio::test]
async fn test_orphaning_skips_invoices_gone_from_repository() {
    // The index knows an invoice the repository has never heard of.
    let mut state = FolderState::new();
    let folder = Folder::new("2024", None);
    let folder_id = folder.id;
    state.folders.insert(folder).unwrap();
    state
        .assignments
        .assign(&state.folders, InvoiceId::new(), folder_id)
        .unwrap();
    let service = FolderService::with_state(state, Arc::new(InMemoryInvoiceRepository::new()));

    let outcome = service.delete(folder_id).await.unwrap();

    assert_eq!(outcome.folders_removed, 1);
    assert_eq!(outcome.invoices_orphaned, 1);
    assert_eq!(service.list().await.unwrap().total_folders, 0);
}

#[tokio::test]
async fn test_sync_rebuilds_index_from_repository() {
    let app = TestApp::new();
    let f = app.folder("F", None).await;
    let inv = app.invoice("F-1", 1.0, None);
    app.invoices
        .set_invoice_folder(inv, Some(f))
        .await
        .unwrap();
    assert!(app.query.invoices_of(f).await.unwrap().is_empty());

    let report = app.service.sync_invoices().await.unwrap();

    assert_eq!(report.invoices_seen, 1);
    assert_eq!(report.assigned, 1);
    assert_eq!(report.orphaned, 0);
    assert_eq!(
        app.query.invoices_of(f).await.unwrap(),
        BTreeSet::from([inv])
    );
}
