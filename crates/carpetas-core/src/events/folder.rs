//! Folder-related domain events.

use serde::{Deserialize, Serialize};

use crate::types::{FolderId, InvoiceId};

/// Events related to folder tree and invoice assignment changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FolderEvent {
    /// A folder was created.
    Created {
        /// The new folder.
        folder_id: FolderId,
        /// Its parent (None for a root folder).
        parent_id: Option<FolderId>,
        /// The folder name.
        name: String,
    },
    /// A folder was renamed.
    Renamed {
        /// The folder ID.
        folder_id: FolderId,
        /// Name before the change.
        old_name: String,
        /// Name after the change.
        new_name: String,
    },
    /// A folder was moved under a different parent.
    Moved {
        /// The folder ID.
        folder_id: FolderId,
        /// Previous parent.
        from_parent_id: Option<FolderId>,
        /// New parent.
        to_parent_id: Option<FolderId>,
    },
    /// A folder and its whole subtree were deleted.
    Deleted {
        /// The folder the delete was requested for.
        folder_id: FolderId,
        /// Number of folders removed, including `folder_id`.
        folders_removed: usize,
        /// Number of invoices whose folder reference was cleared.
        invoices_orphaned: usize,
    },
    /// An invoice was assigned to a folder.
    InvoiceAssigned {
        /// The invoice ID.
        invoice_id: InvoiceId,
        /// The folder it now belongs to.
        folder_id: FolderId,
        /// The folder it belonged to before, if any.
        previous_folder_id: Option<FolderId>,
    },
    /// An invoice was removed from its folder.
    InvoiceUnassigned {
        /// The invoice ID.
        invoice_id: InvoiceId,
        /// The folder it belonged to.
        folder_id: FolderId,
    },
}

impl FolderEvent {
    /// Short machine-readable name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "folder.created",
            Self::Renamed { .. } => "folder.renamed",
            Self::Moved { .. } => "folder.moved",
            Self::Deleted { .. } => "folder.deleted",
            Self::InvoiceAssigned { .. } => "invoice.assigned",
            Self::InvoiceUnassigned { .. } => "invoice.unassigned",
        }
    }
}
