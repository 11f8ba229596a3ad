//! Folder arena: a flat table keyed by id plus a parent→children index.
//!
//! Parent/child is a relation kept in two indices (`children` and `roots`)
//! next to the table, never a graph of embedded nodes. Every structural
//! method keeps the table and both indices in step.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use carpetas_core::error::AppError;
use carpetas_core::result::AppResult;
use carpetas_core::types::FolderId;
use carpetas_entity::folder::Folder;

/// Keyed folder storage owning the canonical parent/child relationships.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "FolderStoreSnapshot", try_from = "FolderStoreSnapshot")]
pub struct FolderStore {
    /// Folder table.
    folders: HashMap<FolderId, Folder>,
    /// Parent → direct children. Parents without children have no entry.
    children: HashMap<FolderId, BTreeSet<FolderId>>,
    /// Folders with no parent.
    roots: BTreeSet<FolderId>,
    /// Ids of deleted folders; never handed out again.
    retired: HashSet<FolderId>,
}

/// Serialized form of a [`FolderStore`]. Indices are rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderStoreSnapshot {
    /// Every live folder.
    pub folders: Vec<Folder>,
    /// Ids of deleted folders.
    #[serde(default)]
    pub retired: Vec<FolderId>,
}

impl FolderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from flat records, validating the tree.
    ///
    /// Fails with an internal error on duplicate ids, dangling parents,
    /// or a parent chain that loops.
    pub fn from_folders(folders: Vec<Folder>, retired: Vec<FolderId>) -> AppResult<Self> {
        let mut table = HashMap::with_capacity(folders.len());
        for folder in folders {
            let id = folder.id;
            if table.insert(id, folder).is_some() {
                return Err(AppError::internal("Duplicate folder id in snapshot").about(id));
            }
        }

        let mut children: HashMap<FolderId, BTreeSet<FolderId>> = HashMap::new();
        let mut roots = BTreeSet::new();
        for folder in table.values() {
            match folder.parent_id {
                None => {
                    roots.insert(folder.id);
                }
                Some(parent_id) => {
                    if !table.contains_key(&parent_id) {
                        return Err(AppError::internal(format!(
                            "Folder {} references missing parent {parent_id}",
                            folder.id
                        ))
                        .about(folder.id));
                    }
                    children.entry(parent_id).or_default().insert(folder.id);
                }
            }
        }

        let store = Self {
            folders: table,
            children,
            roots,
            retired: retired.into_iter().collect(),
        };
        for id in store.folders.keys() {
            store.find_ancestors(*id)?;
        }
        Ok(store)
    }

    /// Number of live folders.
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Whether the store holds no folders.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Whether a live folder with this id exists.
    pub fn contains(&self, id: FolderId) -> bool {
        self.folders.contains_key(&id)
    }

    /// Find a folder by ID.
    pub fn find_by_id(&self, id: FolderId) -> Option<&Folder> {
        self.folders.get(&id)
    }

    /// Find a folder by ID or fail with `NotFound`.
    pub fn require(&self, id: FolderId) -> AppResult<&Folder> {
        self.folders
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")).about(id))
    }

    /// Iterate over every live folder in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values()
    }

    /// Root folders, in id order.
    pub fn find_roots(&self) -> Vec<&Folder> {
        self.roots
            .iter()
            .filter_map(|id| self.folders.get(id))
            .collect()
    }

    /// Direct children of a folder, in id order.
    pub fn find_children(&self, parent_id: FolderId) -> Vec<&Folder> {
        self.child_ids(parent_id)
            .filter_map(|id| self.folders.get(&id))
            .collect()
    }

    /// Ids of the direct children of a folder.
    pub fn child_ids(&self, parent_id: FolderId) -> impl Iterator<Item = FolderId> + '_ {
        self.children
            .get(&parent_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Ancestor chain of a folder, nearest parent first, root last.
    pub fn find_ancestors(&self, id: FolderId) -> AppResult<Vec<FolderId>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.require(id)?.parent_id;

        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                error!(folder_id = %id, at = %parent_id, "Parent chain loops");
                return Err(AppError::internal(format!(
                    "Parent chain of folder {id} loops at {parent_id}"
                ))
                .about(id));
            }
            let parent = self.folders.get(&parent_id).ok_or_else(|| {
                AppError::internal(format!("Folder {id} has dangling ancestor {parent_id}"))
                    .about(id)
            })?;
            chain.push(parent_id);
            current = parent.parent_id;
        }

        Ok(chain)
    }

    /// Whether `candidate` is `root` or lies anywhere below it.
    ///
    /// Walks up from `candidate`, so the cost is the candidate's depth.
    pub fn is_within(&self, candidate: FolderId, root: FolderId) -> AppResult<bool> {
        if candidate == root {
            return Ok(true);
        }
        Ok(self.find_ancestors(candidate)?.contains(&root))
    }

    /// The folder and every folder below it, depth-first pre-order.
    pub fn find_descendants(&self, id: FolderId) -> AppResult<Vec<FolderId>> {
        self.require(id)?;

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                error!(folder_id = %id, at = %current, "Subtree visits a folder twice");
                return Err(AppError::internal(format!(
                    "Subtree of folder {id} reaches {current} twice"
                ))
                .about(id));
            }
            order.push(current);
            // Reverse so the smallest child id is visited first.
            let mut kids: Vec<FolderId> = self.child_ids(current).collect();
            kids.reverse();
            stack.extend(kids);
        }

        Ok(order)
    }

    /// Insert a new folder under its declared parent.
    pub fn insert(&mut self, folder: Folder) -> AppResult<()> {
        if self.folders.contains_key(&folder.id) || self.retired.contains(&folder.id) {
            return Err(AppError::internal("Folder id already used").about(folder.id));
        }
        match folder.parent_id {
            Some(parent_id) => {
                self.require(parent_id)?;
                self.children.entry(parent_id).or_default().insert(folder.id);
            }
            None => {
                self.roots.insert(folder.id);
            }
        }
        self.folders.insert(folder.id, folder);
        Ok(())
    }

    /// Change a folder's name. Returns the previous name.
    pub fn rename(&mut self, id: FolderId, name: &str) -> AppResult<String> {
        let folder = self
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")).about(id))?;
        let old = std::mem::replace(&mut folder.name, name.to_string());
        folder.updated_at = Utc::now();
        Ok(old)
    }

    /// Check that `id` may be placed under `new_parent`.
    ///
    /// Fails with `NotFound` if either folder is missing and with `Cycle`
    /// if the new parent is the folder itself or one of its descendants.
    pub fn check_reparent(&self, id: FolderId, new_parent: Option<FolderId>) -> AppResult<()> {
        self.require(id)?;
        let Some(parent_id) = new_parent else {
            return Ok(());
        };
        if parent_id == id {
            return Err(AppError::cycle(format!("Folder {id} cannot be its own parent")).about(id));
        }
        self.require(parent_id)?;
        if self.is_within(parent_id, id)? {
            return Err(AppError::cycle(format!(
                "Folder {parent_id} is a descendant of {id}"
            ))
            .about(parent_id));
        }
        Ok(())
    }

    /// Detach a folder from its parent and attach it under `new_parent`.
    ///
    /// Validates with [`check_reparent`](Self::check_reparent) first and
    /// changes nothing on failure. Returns the previous parent.
    pub fn reparent(
        &mut self,
        id: FolderId,
        new_parent: Option<FolderId>,
    ) -> AppResult<Option<FolderId>> {
        self.check_reparent(id, new_parent)?;
        let old_parent = self.require(id)?.parent_id;
        if old_parent == new_parent {
            return Ok(old_parent);
        }

        self.detach(id, old_parent);
        match new_parent {
            Some(parent_id) => {
                self.children.entry(parent_id).or_default().insert(id);
            }
            None => {
                self.roots.insert(id);
            }
        }
        if let Some(folder) = self.folders.get_mut(&id) {
            folder.parent_id = new_parent;
            folder.updated_at = Utc::now();
        }
        Ok(old_parent)
    }

    /// Remove a folder and its whole subtree. Returns the removed folders
    /// in depth-first pre-order, starting with `id`.
    pub fn remove_subtree(&mut self, id: FolderId) -> AppResult<Vec<Folder>> {
        let ids = self.find_descendants(id)?;
        let parent = self.require(id)?.parent_id;
        self.detach(id, parent);

        let mut removed = Vec::with_capacity(ids.len());
        for folder_id in ids {
            self.children.remove(&folder_id);
            if let Some(folder) = self.folders.remove(&folder_id) {
                removed.push(folder);
            }
            self.retired.insert(folder_id);
        }
        Ok(removed)
    }

    fn detach(&mut self, id: FolderId, parent: Option<FolderId>) {
        match parent {
            None => {
                self.roots.remove(&id);
            }
            Some(parent_id) => {
                if let Some(set) = self.children.get_mut(&parent_id) {
                    set.remove(&id);
                    if set.is_empty() {
                        self.children.remove(&parent_id);
                    }
                }
            }
        }
    }
}

impl From<FolderStore> for FolderStoreSnapshot {
    fn from(store: FolderStore) -> Self {
        let mut folders: Vec<Folder> = store.folders.into_values().collect();
        folders.sort_by_key(|f| f.id);
        let mut retired: Vec<FolderId> = store.retired.into_iter().collect();
        retired.sort();
        Self { folders, retired }
    }
}

impl TryFrom<FolderStoreSnapshot> for FolderStore {
    type Error = AppError;

    fn try_from(snapshot: FolderStoreSnapshot) -> Result<Self, Self::Error> {
        Self::from_folders(snapshot.folders, snapshot.retired)
    }
}
