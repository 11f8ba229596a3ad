//! Services opened for one CLI invocation.

use std::sync::Arc;

use carpetas_core::config::AppConfig;
use carpetas_core::result::AppResult;
use carpetas_service::{FolderService, QueryEngine};
use carpetas_store::{FolderState, JsonInvoiceRepository, SnapshotFile};

/// The folder service, its query engine, and the invoice file behind them.
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Folder writer.
    pub service: FolderService,
    /// Folder and invoice reads.
    pub query: QueryEngine,
    /// Invoices, written through to the invoice file on every change.
    pub invoices: Arc<JsonInvoiceRepository>,
}

impl CliContext {
    /// Open the folder snapshot and invoice file named in `config`.
    ///
    /// Missing files start empty. With `store.persist` off, both files are
    /// read but never written.
    pub async fn open(config: &AppConfig) -> AppResult<Self> {
        let invoices =
            JsonInvoiceRepository::open(SnapshotFile::new(&config.store.invoices_path)).await?;
        let invoices = Arc::new(if config.store.persist {
            invoices
        } else {
            invoices.read_only()
        });

        let snapshot = SnapshotFile::new(&config.store.snapshot_path);
        let service = if config.store.persist {
            FolderService::open(snapshot, invoices.clone()).await?
        } else {
            let state: FolderState = snapshot.load().await?.unwrap_or_default();
            FolderService::with_state(state, invoices.clone())
        };
        let query = service.query_engine().with_config(config.query.clone());

        Ok(Self {
            service,
            query,
            invoices,
        })
    }
}
