//! Invoice repository seam and an in-memory implementation.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use carpetas_core::error::AppError;
use carpetas_core::result::AppResult;
use carpetas_core::types::{FolderId, InvoiceId};
use carpetas_entity::invoice::Invoice;

/// External store of invoices.
///
/// The folder engine reads invoices through this trait and writes back
/// only their folder reference. It never creates or deletes invoices.
#[async_trait]
pub trait InvoiceRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Every known invoice.
    async fn get_invoices(&self) -> AppResult<Vec<Invoice>>;

    /// A single invoice, if it exists.
    async fn get_invoice(&self, id: InvoiceId) -> AppResult<Option<Invoice>>;

    /// Set or clear an invoice's folder reference.
    ///
    /// Fails with `NotFound` if the invoice does not exist.
    async fn set_invoice_folder(
        &self,
        id: InvoiceId,
        folder_id: Option<FolderId>,
    ) -> AppResult<()>;

    /// The subset of `ids` that exist, in id order.
    async fn get_many(&self, ids: &BTreeSet<InvoiceId>) -> AppResult<Vec<Invoice>> {
        let mut found: Vec<Invoice> = self
            .get_invoices()
            .await?
            .into_iter()
            .filter(|invoice| ids.contains(&invoice.id))
            .collect();
        found.sort_by_key(|invoice| invoice.id);
        Ok(found)
    }
}

/// Invoice repository backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceRepository {
    /// Invoices by id.
    invoices: DashMap<InvoiceId, Invoice>,
}

impl InMemoryInvoiceRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-filled with `invoices`.
    pub fn from_invoices(invoices: impl IntoIterator<Item = Invoice>) -> Self {
        let repo = Self::new();
        for invoice in invoices {
            repo.insert(invoice);
        }
        repo
    }

    /// Add or replace an invoice.
    pub fn insert(&self, invoice: Invoice) {
        self.invoices.insert(invoice.id, invoice);
    }

    /// Remove an invoice, returning it if it existed.
    pub fn remove(&self, id: InvoiceId) -> Option<Invoice> {
        self.invoices.remove(&id).map(|(_, invoice)| invoice)
    }

    /// Number of invoices.
    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    /// Whether the repository is empty.
    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    /// All invoices in id order, for persisting.
    pub fn to_vec(&self) -> Vec<Invoice> {
        let mut all: Vec<Invoice> = self.invoices.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|invoice| invoice.id);
        all
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn get_invoices(&self) -> AppResult<Vec<Invoice>> {
        Ok(self.to_vec())
    }

    async fn get_invoice(&self, id: InvoiceId) -> AppResult<Option<Invoice>> {
        Ok(self.invoices.get(&id).map(|e| e.value().clone()))
    }

    async fn set_invoice_folder(
        &self,
        id: InvoiceId,
        folder_id: Option<FolderId>,
    ) -> AppResult<()> {
        let mut entry = self
            .invoices
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Invoice {id} not found")).about(id))?;
        entry.folder_id = folder_id;
        debug!(invoice_id = %id, folder_id = ?folder_id, "Invoice folder updated");
        Ok(())
    }

    async fn get_many(&self, ids: &BTreeSet<InvoiceId>) -> AppResult<Vec<Invoice>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.invoices.get(id).map(|e| e.value().clone()))
            .collect())
    }
}
