//! Integration tests for subtree queries, sorting, and pagination.

mod helpers;

use std::collections::BTreeSet;

use carpetas_core::error::ErrorKind;
use carpetas_core::types::{FolderId, InvoiceId, SortDirection, SortField};
use carpetas_service::{InvoiceQuery, InvoiceSortField, filter_and_sort};

use helpers::{TestApp, date};

#[tokio::test]
async fn test_undated_invoice_sorts_last() {
    let app = TestApp::new();
    let f = app.folder("F", None).await;
    let undated = app.invoice("A", 1.0, None);
    let dated = app.invoice("B", 2.0, Some(date("2024-01-01")));
    app.assign(undated, f).await;
    app.assign(dated, f).await;

    for sort in [SortField::desc("fecha"), SortField::asc("fecha")] {
        let page = app
            .query
            .list_invoices(&InvoiceQuery {
                folder_id: Some(f),
                sort: Some(sort),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<InvoiceId> = page.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![dated, undated]);
    }
}

#[tokio::test]
async fn test_subtree_union_over_wide_tree() {
    let app = TestApp::new();
    let root = app.folder("root", None).await;
    let other = app.folder("other", None).await;
    let mut expected = BTreeSet::new();
    let mut level = vec![root];

    for depth in 0..3 {
        let mut next = Vec::new();
        for (i, parent) in level.iter().enumerate() {
            for j in 0..3 {
                let child = app
                    .folder(&format!("d{depth}-{i}-{j}"), Some(*parent))
                    .await;
                let inv = app.invoice(&format!("F-{depth}-{i}-{j}"), 1.0, None);
                app.assign(inv, child).await;
                expected.insert(inv);
                next.push(child);
            }
        }
        level = next;
    }
    let outside = app.invoice("X", 1.0, None);
    app.assign(outside, other).await;

    let got = app.query.descendant_invoice_ids(root).await.unwrap();
    assert_eq!(got, expected);
    assert_eq!(got.len(), 3 + 9 + 27);

    let summaries = app.query.descendant_invoices(root).await.unwrap();
    assert_eq!(summaries.len(), got.len());
    assert!(summaries.iter().all(|s| s.carpeta_nombre.is_some()));
}

#[tokio::test]
async fn test_descendants_of_missing_folder() {
    let app = TestApp::new();
    let err = app
        .query
        .descendant_invoice_ids(FolderId::new())
        .await
        .expect_err("missing");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_descendant_invoices_labeled_with_direct_folder() {
    let app = TestApp::new();
    let year = app.folder("2024", None).await;
    let month = app.folder("Enero", Some(year)).await;
    let inv = app.invoice("F-1", 9.5, None);
    app.assign(inv, month).await;

    let summaries = app.query.descendant_invoices(year).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].carpeta_nombre.as_deref(), Some("Enero"));
}

#[tokio::test]
async fn test_folder_of_follows_reassignment() {
    let app = TestApp::new();
    let f = app.folder("F", None).await;
    let g = app.folder("G", None).await;
    let inv = app.invoice("F-1", 1.0, None);
    assert!(app.query.folder_of(inv).await.is_none());

    app.assign(inv, f).await;
    assert_eq!(app.query.folder_of(inv).await.map(|folder| folder.id), Some(f));

    app.assign(inv, g).await;
    let holder = app.query.folder_of(inv).await.unwrap();
    assert_eq!(holder.id, g);
    assert_eq!(holder.name, "G");

    app.service.delete(g).await.unwrap();
    assert!(app.query.folder_of(inv).await.is_none());
}

#[tokio::test]
async fn test_breadcrumbs_from_root() {
    let app = TestApp::new();
    let a = app.folder("2024", None).await;
    let b = app.folder("Enero", Some(a)).await;
    let c = app.folder("Semana 1", Some(b)).await;

    let path: Vec<FolderId> = app
        .query
        .breadcrumbs(c)
        .await
        .unwrap()
        .iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(path, vec![a, b, c]);
}

#[tokio::test]
async fn test_list_invoices_paginates_and_searches() {
    let app = TestApp::new();
    let f = app.folder("F", None).await;
    for i in 0..7 {
        let inv = app.invoice(&format!("F-{i:02}"), f64::from(i), None);
        app.assign(inv, f).await;
    }
    app.invoice("Z-99", 100.0, None);

    let page = app
        .query
        .list_invoices(&InvoiceQuery {
            search: Some("f-".to_string()),
            sort: Some(SortField::desc("total")),
            page: Some(2),
            page_size: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total_items, 7);
    assert_eq!(page.total_pages, 3);
    let numbers: Vec<&str> = page.items.iter().map(|i| i.numero_factura.as_str()).collect();
    assert_eq!(numbers, vec!["F-03", "F-02", "F-01"]);

    let beyond = app
        .query
        .list_invoices(&InvoiceQuery {
            page: Some(50),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_items, 8);
}

#[tokio::test]
async fn test_list_invoices_rejects_unknown_sort_field() {
    let app = TestApp::new();
    let err = app
        .query
        .list_invoices(&InvoiceQuery {
            sort: Some(SortField::asc("color")),
            ..Default::default()
        })
        .await
        .expect_err("bad field");
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_page_size_is_capped() {
    let app = TestApp::new();
    let request = app.query.page_request(None, Some(10_000));
    assert_eq!(request.page, 1);
    assert_eq!(request.page_size, 100);
}

#[test]
fn test_stable_sort_with_missing_keys() {
    let items = vec![
        ("a", Some(2.0)),
        ("b", None),
        ("c", Some(1.0)),
        ("d", Some(2.0)),
        ("e", None),
    ];
    let sorted = filter_and_sort(
        items,
        |_| true,
        |(_, v)| v.map(carpetas_service::SortKey::Number),
        SortDirection::Desc,
    );
    let order: Vec<&str> = sorted.iter().map(|(name, _)| *name).collect();
    assert_eq!(order, vec!["a", "d", "c", "b", "e"]);
    assert_eq!(InvoiceSortField::Fecha.to_string(), "fecha");
}
