//! Folder CRUD, cascade delete, and invoice assignment.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use carpetas_core::error::{AppError, ErrorKind};
use carpetas_core::events::{DomainEvent, FolderEvent};
use carpetas_core::result::AppResult;
use carpetas_core::types::{FolderId, InvoiceId};
use carpetas_entity::folder::{CarpetaCreate, CarpetaUpdate, Folder, FolderNode, FolderTree};
use carpetas_entity::invoice::{AssignRequest, AssignmentOutcome};
use carpetas_store::{AssignmentIndex, FolderState, InvoiceRepository, SnapshotFile};

use super::tree::{self, InvoiceLookup};
use crate::SharedState;
use crate::query::QueryEngine;

/// Capacity of the domain event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of a cascade delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Folders removed, including the one the delete was requested for.
    pub folders_removed: usize,
    /// Invoices whose folder reference was cleared.
    pub invoices_orphaned: usize,
}

/// Result of rebuilding the assignment index from the invoice repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Invoices read from the repository.
    pub invoices_seen: usize,
    /// Invoices filed under a live folder.
    pub assigned: usize,
    /// Invoices whose reference pointed at a missing folder and was cleared.
    pub orphaned: usize,
}

/// One invoice folder-reference change to push to the repository.
#[derive(Debug, Clone, Copy)]
struct InvoiceChange {
    invoice_id: InvoiceId,
    from: Option<FolderId>,
    to: Option<FolderId>,
}

/// Manages the folder tree. The only writer of folders and assignments.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Folder tree and assignment index.
    state: SharedState,
    /// External invoice store.
    invoices: Arc<dyn InvoiceRepository>,
    /// Snapshot written after every mutation, if persistence is on.
    snapshot: Option<SnapshotFile>,
    /// Domain event publisher.
    events: broadcast::Sender<DomainEvent>,
}

impl FolderService {
    /// Creates a service over an empty tree without persistence.
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self::with_state(FolderState::new(), invoices)
    }

    /// Creates a service over an existing state without persistence.
    pub fn with_state(state: FolderState, invoices: Arc<dyn InvoiceRepository>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(state)),
            invoices,
            snapshot: None,
            events,
        }
    }

    /// Opens the snapshot at `snapshot` (or starts empty if it does not
    /// exist) and persists every later mutation to it.
    pub async fn open(
        snapshot: SnapshotFile,
        invoices: Arc<dyn InvoiceRepository>,
    ) -> AppResult<Self> {
        let state: FolderState = snapshot.load().await?.unwrap_or_default();
        info!(
            path = %snapshot.path().display(),
            folders = state.folders.len(),
            assignments = state.assignments.len(),
            "Folder state opened"
        );
        let mut service = Self::with_state(state, invoices);
        service.snapshot = Some(snapshot);
        Ok(service)
    }

    /// A query engine reading the same state as this service.
    pub fn query_engine(&self) -> QueryEngine {
        QueryEngine::new(self.state.clone(), self.invoices.clone())
    }

    /// Subscribe to domain events published after each committed mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Creates a new folder.
    pub async fn create(&self, req: CarpetaCreate) -> AppResult<Folder> {
        let name = validate_name(&req.nombre)?;

        let mut state = self.state.write().await;
        if let Some(parent_id) = req.parent_id {
            state.folders.require(parent_id)?;
        }

        let folder = Folder::new(name, req.parent_id);
        let created = folder.clone();
        self.transact(&mut state, move |s| s.folders.insert(folder))
            .await?;
        drop(state);

        info!(
            folder_id = %created.id,
            parent_id = ?created.parent_id,
            name = %created.name,
            "Folder created"
        );
        self.emit(FolderEvent::Created {
            folder_id: created.id,
            parent_id: created.parent_id,
            name: created.name.clone(),
        });
        Ok(created)
    }

    /// Renames and/or moves a folder.
    ///
    /// A move is rejected with `Cycle` if the new parent is the folder
    /// itself or lies in its subtree. Values equal to the current ones are
    /// ignored, and an update that changes nothing leaves `updated_at` as is.
    pub async fn update(&self, folder_id: FolderId, req: CarpetaUpdate) -> AppResult<Folder> {
        let new_name = req.nombre.as_deref().map(validate_name).transpose()?;

        let mut state = self.state.write().await;
        let current = state.folders.require(folder_id)?.clone();

        let rename = new_name.filter(|name| *name != current.name);
        let reparent = req.parent_id.filter(|parent| *parent != current.parent_id);

        if let Some(new_parent) = reparent {
            if let Err(e) = state.folders.check_reparent(folder_id, new_parent) {
                warn!(
                    folder_id = %folder_id,
                    new_parent = ?new_parent,
                    kind = %e.kind,
                    "Folder move rejected"
                );
                return Err(e);
            }
        }

        if rename.is_none() && reparent.is_none() {
            debug!(folder_id = %folder_id, "Folder update is a no-op");
            return Ok(current);
        }

        let rename_to = rename.clone();
        let updated = self
            .transact(&mut state, move |s| {
                if let Some(name) = &rename_to {
                    s.folders.rename(folder_id, name)?;
                }
                if let Some(new_parent) = reparent {
                    s.folders.reparent(folder_id, new_parent)?;
                }
                Ok(s.folders.require(folder_id)?.clone())
            })
            .await?;
        drop(state);

        if let Some(new_name) = rename {
            info!(folder_id = %folder_id, new_name = %new_name, "Folder renamed");
            self.emit(FolderEvent::Renamed {
                folder_id,
                old_name: current.name.clone(),
                new_name,
            });
        }
        if let Some(new_parent) = reparent {
            info!(
                folder_id = %folder_id,
                from_parent = ?current.parent_id,
                to_parent = ?new_parent,
                "Folder moved"
            );
            self.emit(FolderEvent::Moved {
                folder_id,
                from_parent_id: current.parent_id,
                to_parent_id: new_parent,
            });
        }

        Ok(updated)
    }

    /// Deletes a folder, its whole subtree, and every assignment into it.
    ///
    /// Invoices are orphaned, never deleted. The invoice repository is
    /// updated first; if that fails, nothing in the tree changes.
    pub async fn delete(&self, folder_id: FolderId) -> AppResult<DeleteOutcome> {
        let mut state = self.state.write().await;

        let subtree = state.folders.find_descendants(folder_id)?;
        let changes: Vec<InvoiceChange> = state
            .assignments
            .affected_by(&subtree)
            .into_iter()
            .map(|row| InvoiceChange {
                invoice_id: row.factura_id,
                from: Some(row.carpeta_id),
                to: None,
            })
            .collect();

        let applied = self.propagate(&changes).await?;

        let orphaned: Vec<InvoiceId> = changes.iter().map(|c| c.invoice_id).collect();
        let result = self
            .transact(&mut state, move |s| {
                let removed = s.folders.remove_subtree(folder_id)?;
                for invoice_id in &orphaned {
                    s.assignments.unassign(*invoice_id);
                }
                Ok(DeleteOutcome {
                    folders_removed: removed.len(),
                    invoices_orphaned: orphaned.len(),
                })
            })
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.revert(&applied).await;
                return Err(e);
            }
        };
        drop(state);

        info!(
            folder_id = %folder_id,
            folders_removed = outcome.folders_removed,
            invoices_orphaned = outcome.invoices_orphaned,
            "Folder deleted"
        );
        self.emit(FolderEvent::Deleted {
            folder_id,
            folders_removed: outcome.folders_removed,
            invoices_orphaned: outcome.invoices_orphaned,
        });
        Ok(outcome)
    }

    /// Every root folder with its subtree and directly assigned invoices.
    pub async fn list(&self) -> AppResult<FolderTree> {
        let state = self.state.read().await;
        let lookup = self.lookup_assigned(&state).await?;
        let tree = tree::build_forest(&state, &lookup)?;
        debug!(total = tree.total_folders, "Folder tree listed");
        Ok(tree)
    }

    /// A single folder with its subtree.
    pub async fn get(&self, folder_id: FolderId) -> AppResult<FolderNode> {
        let state = self.state.read().await;
        state.folders.require(folder_id)?;
        let lookup = self.lookup_assigned(&state).await?;
        tree::build_subtree(&state, folder_id, &lookup)
    }

    /// Direct children of a folder, sorted by name.
    pub async fn list_children(&self, folder_id: FolderId) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        state.folders.require(folder_id)?;
        let mut children = state.folders.find_children(folder_id);
        tree::sort_by_name(&mut children);
        Ok(children.into_iter().cloned().collect())
    }

    /// Folders whose name contains `query`, case-insensitively.
    pub async fn search(&self, query: &str) -> AppResult<Vec<Folder>> {
        let needle = query.trim().to_lowercase();
        let state = self.state.read().await;
        let mut hits: Vec<&Folder> = state
            .folders
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .collect();
        tree::sort_by_name(&mut hits);
        debug!(query = %query, hits = hits.len(), "Folder search");
        Ok(hits.into_iter().cloned().collect())
    }

    /// Files an invoice under a folder, moving it out of any previous one.
    pub async fn assign_invoice(
        &self,
        invoice_id: InvoiceId,
        req: AssignRequest,
    ) -> AppResult<AssignmentOutcome> {
        let folder_id = req.carpeta_id;
        let mut state = self.state.write().await;
        let folder_name = state.folders.require(folder_id)?.name.clone();

        let known = self
            .invoices
            .get_invoice(invoice_id)
            .await
            .map_err(external)?;
        if known.is_none() {
            return Err(
                AppError::not_found(format!("Invoice {invoice_id} not found")).about(invoice_id)
            );
        }

        let previous = state.assignments.folder_of(invoice_id);
        let outcome = AssignmentOutcome {
            factura_id: invoice_id,
            carpeta_id: Some(folder_id),
            carpeta_nombre: Some(folder_name),
            carpeta_anterior_id: previous,
        };
        if previous == Some(folder_id) {
            debug!(invoice_id = %invoice_id, folder_id = %folder_id, "Invoice already in folder");
            return Ok(outcome);
        }

        let applied = self
            .propagate(&[InvoiceChange {
                invoice_id,
                from: previous,
                to: Some(folder_id),
            }])
            .await?;

        let result = self
            .transact(&mut state, move |s| {
                s.assignments.assign(&s.folders, invoice_id, folder_id)
            })
            .await;
        if let Err(e) = result {
            self.revert(&applied).await;
            return Err(e);
        }
        drop(state);

        info!(
            invoice_id = %invoice_id,
            folder_id = %folder_id,
            previous_folder_id = ?previous,
            "Invoice assigned"
        );
        self.emit(FolderEvent::InvoiceAssigned {
            invoice_id,
            folder_id,
            previous_folder_id: previous,
        });
        Ok(outcome)
    }

    /// Removes an invoice from its folder. Idempotent.
    pub async fn unassign_invoice(&self, invoice_id: InvoiceId) -> AppResult<AssignmentOutcome> {
        let mut state = self.state.write().await;
        let Some(previous) = state.assignments.folder_of(invoice_id) else {
            debug!(invoice_id = %invoice_id, "Invoice already unassigned");
            return Ok(AssignmentOutcome {
                factura_id: invoice_id,
                carpeta_id: None,
                carpeta_nombre: None,
                carpeta_anterior_id: None,
            });
        };

        let applied = self
            .propagate(&[InvoiceChange {
                invoice_id,
                from: Some(previous),
                to: None,
            }])
            .await?;

        let result = self
            .transact(&mut state, move |s| {
                s.assignments.unassign(invoice_id);
                Ok(())
            })
            .await;
        if let Err(e) = result {
            self.revert(&applied).await;
            return Err(e);
        }
        drop(state);

        info!(invoice_id = %invoice_id, folder_id = %previous, "Invoice unassigned");
        self.emit(FolderEvent::InvoiceUnassigned {
            invoice_id,
            folder_id: previous,
        });
        Ok(AssignmentOutcome {
            factura_id: invoice_id,
            carpeta_id: None,
            carpeta_nombre: None,
            carpeta_anterior_id: Some(previous),
        })
    }

    /// Rebuilds the assignment index from the invoice repository.
    ///
    /// Invoices pointing at a folder that does not exist have their
    /// reference cleared in the repository.
    pub async fn sync_invoices(&self) -> AppResult<SyncReport> {
        let mut state = self.state.write().await;
        let invoices = self.invoices.get_invoices().await.map_err(external)?;

        let mut index = AssignmentIndex::new();
        let mut dangling = Vec::new();
        for invoice in &invoices {
            let Some(folder_id) = invoice.folder_id else {
                continue;
            };
            if state.folders.contains(folder_id) {
                index.assign(&state.folders, invoice.id, folder_id)?;
            } else {
                dangling.push(InvoiceChange {
                    invoice_id: invoice.id,
                    from: Some(folder_id),
                    to: None,
                });
            }
        }

        for change in &dangling {
            warn!(
                invoice_id = %change.invoice_id,
                folder_id = ?change.from,
                "Invoice references missing folder; clearing"
            );
        }
        let applied = self.propagate(&dangling).await?;

        let report = SyncReport {
            invoices_seen: invoices.len(),
            assigned: index.len(),
            orphaned: dangling.len(),
        };
        let result = self
            .transact(&mut state, move |s| {
                s.assignments = index;
                Ok(())
            })
            .await;
        if let Err(e) = result {
            self.revert(&applied).await;
            return Err(e);
        }
        drop(state);

        info!(
            invoices_seen = report.invoices_seen,
            assigned = report.assigned,
            orphaned = report.orphaned,
            "Assignments synchronized"
        );
        Ok(report)
    }

    /// Applies `f` to a copy of the state, persists the copy, then swaps
    /// it in. On any failure the live state is untouched.
    async fn transact<T>(
        &self,
        state: &mut FolderState,
        f: impl FnOnce(&mut FolderState) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut working = state.clone();
        let out = f(&mut working)?;
        if let Some(snapshot) = &self.snapshot {
            snapshot.save(&working).await?;
        }
        *state = working;
        Ok(out)
    }

    /// Pushes folder-reference changes to the invoice repository.
    ///
    /// Clearing the reference of an invoice the repository no longer knows
    /// is treated as done. On any other failure the changes already made
    /// are reverted and the error is returned.
    async fn propagate(&self, changes: &[InvoiceChange]) -> AppResult<Vec<InvoiceChange>> {
        let mut applied = Vec::with_capacity(changes.len());
        for change in changes {
            match self
                .invoices
                .set_invoice_folder(change.invoice_id, change.to)
                .await
            {
                Ok(()) => applied.push(*change),
                Err(e) if e.kind == ErrorKind::NotFound && change.to.is_none() => {
                    debug!(invoice_id = %change.invoice_id, "Invoice gone from repository");
                }
                Err(e) => {
                    warn!(
                        invoice_id = %change.invoice_id,
                        error = %e,
                        "Invoice repository update failed"
                    );
                    self.revert(&applied).await;
                    return Err(if e.kind == ErrorKind::NotFound {
                        e
                    } else {
                        external(e)
                    });
                }
            }
        }
        Ok(applied)
    }

    /// Best-effort undo of changes made by [`propagate`](Self::propagate).
    async fn revert(&self, applied: &[InvoiceChange]) {
        for change in applied.iter().rev() {
            if let Err(e) = self
                .invoices
                .set_invoice_folder(change.invoice_id, change.from)
                .await
            {
                warn!(
                    invoice_id = %change.invoice_id,
                    error = %e,
                    "Failed to revert invoice folder"
                );
            }
        }
    }

    /// Loads details of every assigned invoice.
    async fn lookup_assigned(&self, state: &FolderState) -> AppResult<InvoiceLookup> {
        let ids: BTreeSet<InvoiceId> = state.assignments.iter().map(|a| a.factura_id).collect();
        if ids.is_empty() {
            return Ok(InvoiceLookup::new());
        }
        let found = self.invoices.get_many(&ids).await.map_err(external)?;
        Ok(found.into_iter().map(|invoice| (invoice.id, invoice)).collect())
    }

    fn emit(&self, payload: FolderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(DomainEvent::new(payload));
    }
}

/// Trims a folder name and rejects blank ones.
fn validate_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(
            AppError::invalid_input("Folder name cannot be empty").about(format!("{name:?}"))
        );
    }
    Ok(trimmed.to_string())
}

/// Wraps an invoice repository failure.
fn external(e: AppError) -> AppError {
    let message = format!("Invoice repository failed: {}", e.message);
    AppError::with_source(ErrorKind::ExternalService, message, e)
}
