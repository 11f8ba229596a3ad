//! Read-only queries over the folder tree.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use carpetas_core::config::query::QueryConfig;
use carpetas_core::error::{AppError, ErrorKind};
use carpetas_core::result::AppResult;
use carpetas_core::types::{FolderId, InvoiceId, PageRequest, PageResponse, SortField};
use carpetas_entity::folder::Folder;
use carpetas_entity::invoice::{Invoice, InvoiceSummary};
use carpetas_store::{FolderState, InvoiceRepository};

use super::paginate::paginate;
use super::sort::{InvoiceSortField, filter_and_sort, invoice_matches};
use crate::SharedState;

/// Parameters of an invoice listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceQuery {
    /// Restrict to this folder. `None` lists every invoice.
    pub folder_id: Option<FolderId>,
    /// Include invoices of every subfolder.
    #[serde(default)]
    pub recursive: bool,
    /// Case-insensitive text matched against number and supplier.
    pub search: Option<String>,
    /// Sort field and direction. Input order is kept when absent.
    pub sort: Option<SortField>,
    /// One-based page number.
    pub page: Option<u64>,
    /// Items per page.
    pub page_size: Option<u64>,
}

/// Answers questions about folders and their invoices. Never mutates.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    state: SharedState,
    invoices: Arc<dyn InvoiceRepository>,
    config: QueryConfig,
}

impl QueryEngine {
    /// Create an engine over `state` with default pagination settings.
    pub fn new(state: SharedState, invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self {
            state,
            invoices,
            config: QueryConfig::default(),
        }
    }

    /// Use `config` for page size defaults and limits.
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Invoices directly in `folder_id`.
    pub async fn invoices_of(&self, folder_id: FolderId) -> AppResult<BTreeSet<InvoiceId>> {
        let state = self.state.read().await;
        state.folders.require(folder_id)?;
        Ok(state.assignments.invoices_of(folder_id))
    }

    /// Invoices in `folder_id` or any folder below it.
    pub async fn descendant_invoice_ids(
        &self,
        folder_id: FolderId,
    ) -> AppResult<BTreeSet<InvoiceId>> {
        let state = self.state.read().await;
        collect_descendant_ids(&state, folder_id)
    }

    /// Summaries of every invoice in the subtree of `folder_id`, each
    /// labeled with the folder it is directly filed under.
    pub async fn descendant_invoices(
        &self,
        folder_id: FolderId,
    ) -> AppResult<Vec<InvoiceSummary>> {
        self.folder_invoices(folder_id, true).await
    }

    /// The folder `invoice_id` is filed under, if any.
    pub async fn folder_of(&self, invoice_id: InvoiceId) -> Option<Folder> {
        let state = self.state.read().await;
        state
            .assignments
            .folder_of(invoice_id)
            .and_then(|folder_id| state.folders.find_by_id(folder_id))
            .cloned()
    }

    /// The folders from the root down to `folder_id`, inclusive.
    pub async fn breadcrumbs(&self, folder_id: FolderId) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        let folder = state.folders.require(folder_id)?;
        let mut path = vec![folder.clone()];
        for ancestor in state.folders.find_ancestors(folder_id)? {
            path.push(state.folders.require(ancestor)?.clone());
        }
        path.reverse();
        Ok(path)
    }

    /// Page request from optional caller input, bounded by the configured
    /// maximum page size.
    pub fn page_request(&self, page: Option<u64>, page_size: Option<u64>) -> PageRequest {
        PageRequest::bounded(
            page.unwrap_or(1),
            page_size.unwrap_or(self.config.default_page_size),
            self.config.max_page_size,
        )
    }

    /// Filter, sort, and paginate invoices.
    pub async fn list_invoices(
        &self,
        query: &InvoiceQuery,
    ) -> AppResult<PageResponse<InvoiceSummary>> {
        let sort = query
            .sort
            .as_ref()
            .map(InvoiceSortField::from_sort_field)
            .transpose()?;
        let request = self.page_request(query.page, query.page_size);

        let items = match query.folder_id {
            Some(folder_id) => self.folder_invoices(folder_id, query.recursive).await?,
            None => self.all_invoices().await?,
        };

        let needle = query.search.clone().unwrap_or_default();
        let sorted = match sort {
            Some((field, direction)) => filter_and_sort(
                items,
                |i| invoice_matches(i, &needle),
                |i| field.key_of(i),
                direction,
            ),
            None => items
                .into_iter()
                .filter(|i| invoice_matches(i, &needle))
                .collect(),
        };

        debug!(
            folder_id = ?query.folder_id,
            recursive = query.recursive,
            matched = sorted.len(),
            page = request.page,
            "Invoices listed"
        );
        Ok(paginate(sorted, &request))
    }

    /// Invoices of one folder, optionally including its subtree.
    async fn folder_invoices(
        &self,
        folder_id: FolderId,
        recursive: bool,
    ) -> AppResult<Vec<InvoiceSummary>> {
        let state = self.state.read().await;
        let ids = if recursive {
            collect_descendant_ids(&state, folder_id)?
        } else {
            state.folders.require(folder_id)?;
            state.assignments.invoices_of(folder_id)
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = self.invoices.get_many(&ids).await.map_err(repository_failed)?;
        Ok(label(&state, found))
    }

    /// Every invoice the repository knows, labeled with its folder name.
    async fn all_invoices(&self) -> AppResult<Vec<InvoiceSummary>> {
        let state = self.state.read().await;
        let found = self.invoices.get_invoices().await.map_err(repository_failed)?;
        Ok(label(&state, found))
    }
}

/// Union of direct members over the subtree of `folder_id`.
fn collect_descendant_ids(
    state: &FolderState,
    folder_id: FolderId,
) -> AppResult<BTreeSet<InvoiceId>> {
    let subtree = state.folders.find_descendants(folder_id)?;
    let ids: BTreeSet<InvoiceId> = subtree
        .iter()
        .flat_map(|id| state.assignments.members(*id))
        .collect();
    debug!(
        folder_id = %folder_id,
        folders = subtree.len(),
        invoices = ids.len(),
        "Subtree invoices collected"
    );
    Ok(ids)
}

/// Summaries labeled with the folder each invoice is filed under in the
/// index, which is authoritative over the repository's own reference.
fn label(state: &FolderState, invoices: Vec<Invoice>) -> Vec<InvoiceSummary> {
    let mut names: HashMap<FolderId, String> = HashMap::new();
    invoices
        .iter()
        .map(|invoice| {
            let name = state.assignments.folder_of(invoice.id).map(|folder_id| {
                names
                    .entry(folder_id)
                    .or_insert_with(|| {
                        state
                            .folders
                            .find_by_id(folder_id)
                            .map(|f| f.name.clone())
                            .unwrap_or_default()
                    })
                    .clone()
            });
            invoice.summary(name)
        })
        .collect()
}

fn repository_failed(e: AppError) -> AppError {
    AppError::with_source(ErrorKind::ExternalService, "Invoice repository failed", e)
}
