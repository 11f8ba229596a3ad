//! Folder tree structures for hierarchical display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carpetas_core::types::FolderId;

use crate::invoice::InvoiceSummary;

/// A node in a folder tree.
///
/// `facturas` holds only the invoices assigned directly to this folder,
/// not the ones under its subfolders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: FolderId,
    /// Folder name.
    pub nombre: String,
    /// Parent folder ID.
    pub parent_id: Option<FolderId>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
    /// Child folder nodes.
    pub children: Vec<FolderNode>,
    /// Invoices directly assigned to this folder.
    pub facturas: Vec<InvoiceSummary>,
}

impl FolderNode {
    /// Number of folders in this subtree, including this node.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(FolderNode::subtree_size).sum::<usize>()
    }

    /// Find a node by ID in this subtree.
    pub fn find(&self, id: FolderId) -> Option<&FolderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// The complete folder forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderTree {
    /// The root node(s) of the tree.
    pub roots: Vec<FolderNode>,
    /// Total number of folders in the tree.
    pub total_folders: u64,
}

impl FolderTree {
    /// Build a tree from its roots, counting every node.
    pub fn from_roots(roots: Vec<FolderNode>) -> Self {
        let total_folders = roots.iter().map(FolderNode::subtree_size).sum::<usize>() as u64;
        Self {
            roots,
            total_folders,
        }
    }

    /// Find a node by ID anywhere in the forest.
    pub fn find(&self, id: FolderId) -> Option<&FolderNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }
}
