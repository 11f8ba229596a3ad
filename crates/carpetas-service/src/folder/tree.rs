//! Folder tree building.
//!
//! Trees are assembled from the flat store by walking explicit child ids.
//! Each node lists only its directly assigned invoices.

use std::collections::{HashMap, HashSet};

use carpetas_core::error::AppError;
use carpetas_core::result::AppResult;
use carpetas_core::types::{FolderId, InvoiceId};
use carpetas_entity::folder::{Folder, FolderNode, FolderTree};
use carpetas_entity::invoice::{Invoice, InvoiceSummary};
use carpetas_store::FolderState;

use crate::query::compare_text;

/// Invoice details keyed by id, used to fill `facturas` on each node.
pub type InvoiceLookup = HashMap<InvoiceId, Invoice>;

/// Sort folders by name in dictionary order, then by id.
pub fn sort_by_name(folders: &mut [&Folder]) {
    folders.sort_by(|a, b| compare_text(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)));
}

/// Build the whole forest: every root with its subtree.
pub fn build_forest(state: &FolderState, invoices: &InvoiceLookup) -> AppResult<FolderTree> {
    let mut roots = state.folders.find_roots();
    sort_by_name(&mut roots);

    let mut seen = HashSet::new();
    let nodes = roots
        .into_iter()
        .map(|root| build_node(state, root, invoices, &mut seen))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(FolderTree::from_roots(nodes))
}

/// Build the subtree rooted at `folder_id`.
pub fn build_subtree(
    state: &FolderState,
    folder_id: FolderId,
    invoices: &InvoiceLookup,
) -> AppResult<FolderNode> {
    let folder = state.folders.require(folder_id)?;
    build_node(state, folder, invoices, &mut HashSet::new())
}

fn build_node(
    state: &FolderState,
    folder: &Folder,
    invoices: &InvoiceLookup,
    seen: &mut HashSet<FolderId>,
) -> AppResult<FolderNode> {
    if !seen.insert(folder.id) {
        return Err(
            AppError::internal(format!("Folder {} reached twice while building tree", folder.id))
                .about(folder.id),
        );
    }

    let mut kids = state.folders.find_children(folder.id);
    sort_by_name(&mut kids);
    let children = kids
        .into_iter()
        .map(|child| build_node(state, child, invoices, seen))
        .collect::<AppResult<Vec<_>>>()?;

    let facturas: Vec<InvoiceSummary> = state
        .assignments
        .members(folder.id)
        .filter_map(|id| invoices.get(&id))
        .map(|invoice| invoice.summary(Some(folder.name.clone())))
        .collect();

    Ok(FolderNode {
        id: folder.id,
        nombre: folder.name.clone(),
        parent_id: folder.parent_id,
        created_at: folder.created_at,
        updated_at: folder.updated_at,
        children,
        facturas,
    })
}
