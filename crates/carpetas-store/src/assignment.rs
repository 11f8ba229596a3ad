//! Invoice → folder assignment index.
//!
//! Holds the forward map (invoice to its single folder) and the reverse map
//! (folder to its direct members) and keeps them in step. An invoice is in
//! at most one folder; assigning it elsewhere moves it.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use carpetas_core::result::AppResult;
use carpetas_core::types::{FolderId, InvoiceId};

use crate::folder_store::FolderStore;

/// Maintains the invoice→folder reference and answers membership queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<Assignment>", from = "Vec<Assignment>")]
pub struct AssignmentIndex {
    /// Invoice → folder.
    by_invoice: HashMap<InvoiceId, FolderId>,
    /// Folder → invoices directly assigned to it.
    by_folder: HashMap<FolderId, BTreeSet<InvoiceId>>,
}

/// One row of the serialized index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// The invoice.
    pub factura_id: InvoiceId,
    /// The folder it is filed under.
    pub carpeta_id: FolderId,
}

impl AssignmentIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assigned invoices.
    pub fn len(&self) -> usize {
        self.by_invoice.len()
    }

    /// Whether no invoice is assigned.
    pub fn is_empty(&self) -> bool {
        self.by_invoice.is_empty()
    }

    /// File an invoice under a folder, replacing any prior assignment.
    ///
    /// Fails with `NotFound` if the folder does not exist. Returns the
    /// folder the invoice was in before.
    pub fn assign(
        &mut self,
        folders: &FolderStore,
        invoice_id: InvoiceId,
        folder_id: FolderId,
    ) -> AppResult<Option<FolderId>> {
        folders.require(folder_id)?;
        let previous = self.unassign(invoice_id);
        self.by_invoice.insert(invoice_id, folder_id);
        self.by_folder.entry(folder_id).or_default().insert(invoice_id);
        Ok(previous)
    }

    /// Clear an invoice's folder. Idempotent; returns the folder it was in.
    pub fn unassign(&mut self, invoice_id: InvoiceId) -> Option<FolderId> {
        let folder_id = self.by_invoice.remove(&invoice_id)?;
        if let Some(members) = self.by_folder.get_mut(&folder_id) {
            members.remove(&invoice_id);
            if members.is_empty() {
                self.by_folder.remove(&folder_id);
            }
        }
        Some(folder_id)
    }

    /// The folder an invoice is filed under.
    pub fn folder_of(&self, invoice_id: InvoiceId) -> Option<FolderId> {
        self.by_invoice.get(&invoice_id).copied()
    }

    /// Invoices whose folder is exactly `folder_id`.
    pub fn invoices_of(&self, folder_id: FolderId) -> BTreeSet<InvoiceId> {
        self.by_folder.get(&folder_id).cloned().unwrap_or_default()
    }

    /// Iterate over the direct members of a folder without cloning.
    pub fn members(&self, folder_id: FolderId) -> impl Iterator<Item = InvoiceId> + '_ {
        self.by_folder
            .get(&folder_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Assignments that point into any of `folder_ids`.
    pub fn affected_by(&self, folder_ids: &[FolderId]) -> Vec<Assignment> {
        folder_ids
            .iter()
            .flat_map(|carpeta_id| {
                self.members(*carpeta_id).map(move |factura_id| Assignment {
                    factura_id,
                    carpeta_id: *carpeta_id,
                })
            })
            .collect()
    }

    /// Iterate over every assignment.
    pub fn iter(&self) -> impl Iterator<Item = Assignment> + '_ {
        self.by_invoice
            .iter()
            .map(|(factura_id, carpeta_id)| Assignment {
                factura_id: *factura_id,
                carpeta_id: *carpeta_id,
            })
    }
}

impl From<AssignmentIndex> for Vec<Assignment> {
    fn from(index: AssignmentIndex) -> Self {
        let mut rows: Vec<Assignment> = index.iter().collect();
        rows.sort_by_key(|row| row.factura_id);
        rows
    }
}

impl From<Vec<Assignment>> for AssignmentIndex {
    fn from(rows: Vec<Assignment>) -> Self {
        let mut index = Self::default();
        for row in rows {
            index.unassign(row.factura_id);
            index.by_invoice.insert(row.factura_id, row.carpeta_id);
            index
                .by_folder
                .entry(row.carpeta_id)
                .or_default()
                .insert(row.factura_id);
        }
        index
    }
}
