//! # carpetas-store
//!
//! Storage layer for Carpetas: the folder arena with its parent→children
//! index, the invoice assignment index, JSON snapshot persistence, and the
//! invoice repository seam.
//!
//! Nothing in this crate takes locks. Callers hold a [`FolderState`] behind
//! whatever synchronization they need; the folder service wraps it in a
//! single-writer `RwLock`.

pub mod assignment;
pub mod folder_store;
pub mod repositories;
pub mod snapshot;
pub mod state;

pub use assignment::AssignmentIndex;
pub use folder_store::FolderStore;
pub use repositories::{InMemoryInvoiceRepository, InvoiceRepository, JsonInvoiceRepository};
pub use snapshot::SnapshotFile;
pub use state::FolderState;
