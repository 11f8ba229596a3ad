//! Invoice repository persisted to a JSON file.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use carpetas_core::error::AppError;
use carpetas_core::result::AppResult;
use carpetas_core::types::{FolderId, InvoiceId};
use carpetas_entity::invoice::Invoice;

use super::invoice::{InMemoryInvoiceRepository, InvoiceRepository};
use crate::snapshot::SnapshotFile;

/// Invoices held in memory and written through to a JSON file.
///
/// Every write rewrites the file before returning. If the file cannot be
/// written the in-memory change is undone, so the caller's error means the
/// repository is exactly as it was.
#[derive(Debug)]
pub struct JsonInvoiceRepository {
    invoices: InMemoryInvoiceRepository,
    /// `None` keeps changes in memory only.
    file: Option<SnapshotFile>,
    /// Serializes mutate-then-write so the file reflects the latest change.
    write_lock: Mutex<()>,
}

impl JsonInvoiceRepository {
    /// Load the invoices in `file`, starting empty if it does not exist.
    pub async fn open(file: SnapshotFile) -> AppResult<Self> {
        let stored: Vec<Invoice> = file.load().await?.unwrap_or_default();
        debug!(path = %file.path().display(), count = stored.len(), "Invoices loaded");
        Ok(Self {
            invoices: InMemoryInvoiceRepository::from_invoices(stored),
            file: Some(file),
            write_lock: Mutex::new(()),
        })
    }

    /// Stop writing the file. Later changes live in memory only.
    pub fn read_only(mut self) -> Self {
        self.file = None;
        self
    }

    /// Number of invoices.
    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    /// Whether there are no invoices.
    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    /// Register an invoice, replacing one with the same id.
    pub async fn add(&self, invoice: Invoice) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let id = invoice.id;
        let replaced = self.invoices.get_invoice(id).await?;
        self.invoices.insert(invoice);

        if let Err(e) = self.flush().await {
            match replaced {
                Some(previous) => self.invoices.insert(previous),
                None => {
                    self.invoices.remove(id);
                }
            }
            warn!(invoice_id = %id, error = %e, "Invoice file write failed; add undone");
            return Err(e);
        }
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        match &self.file {
            Some(file) => file.save(&self.invoices.to_vec()).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InvoiceRepository for JsonInvoiceRepository {
    async fn get_invoices(&self) -> AppResult<Vec<Invoice>> {
        self.invoices.get_invoices().await
    }

    async fn get_invoice(&self, id: InvoiceId) -> AppResult<Option<Invoice>> {
        self.invoices.get_invoice(id).await
    }

    async fn set_invoice_folder(
        &self,
        id: InvoiceId,
        folder_id: Option<FolderId>,
    ) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let previous = self
            .invoices
            .get_invoice(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice {id} not found")).about(id))?
            .folder_id;
        if previous == folder_id {
            return Ok(());
        }
        self.invoices.set_invoice_folder(id, folder_id).await?;

        if let Err(e) = self.flush().await {
            self.invoices.set_invoice_folder(id, previous).await?;
            warn!(invoice_id = %id, error = %e, "Invoice file write failed; change undone");
            return Err(e);
        }
        Ok(())
    }

    async fn get_many(&self, ids: &BTreeSet<InvoiceId>) -> AppResult<Vec<Invoice>> {
        self.invoices.get_many(ids).await
    }
}
