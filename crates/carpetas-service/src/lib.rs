//! # carpetas-service
//!
//! Business logic for Carpetas. [`FolderService`] is the only writer of the
//! folder tree and the assignment index; [`QueryEngine`] answers read-only
//! questions over the same shared state.
//!
//! Both hold the state behind one `tokio::sync::RwLock`. Every mutation
//! runs to completion under the write lock, so readers see the tree either
//! before or after a change, never halfway through a cascade.

pub mod folder;
pub mod query;

use std::sync::Arc;

use tokio::sync::RwLock;

use carpetas_store::FolderState;

pub use folder::{DeleteOutcome, FolderService, SyncReport};
pub use query::{
    InvoiceQuery, InvoiceSortField, QueryEngine, SortKey, compare_text, filter_and_sort,
    invoice_matches, paginate,
};

/// Folder state shared between the service and its query engines.
pub type SharedState = Arc<RwLock<FolderState>>;
