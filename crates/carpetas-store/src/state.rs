//! The folder tree and its assignment index, kept together.
//!
//! A [`FolderState`] is the unit the folder service guards with its lock
//! and the unit written to a snapshot. Loading a state re-checks that
//! every assignment references a live folder.

use serde::{Deserialize, Serialize};

use carpetas_core::error::AppError;
use carpetas_core::result::AppResult;

use crate::assignment::AssignmentIndex;
use crate::folder_store::FolderStore;

/// Folder arena plus invoice assignment index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "FolderStateRecord")]
pub struct FolderState {
    /// Folder table and parent/child indices.
    pub folders: FolderStore,
    /// Invoice → folder references.
    pub assignments: AssignmentIndex,
}

#[derive(Deserialize)]
struct FolderStateRecord {
    #[serde(default)]
    folders: FolderStore,
    #[serde(default)]
    assignments: AssignmentIndex,
}

impl FolderState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify that every assignment references a live folder.
    ///
    /// Acyclicity is verified when the folder store itself is built.
    pub fn check_invariants(&self) -> AppResult<()> {
        for row in self.assignments.iter() {
            if !self.folders.contains(row.carpeta_id) {
                return Err(AppError::internal(format!(
                    "Invoice {} is assigned to missing folder {}",
                    row.factura_id, row.carpeta_id
                ))
                .about(row.factura_id));
            }
        }
        Ok(())
    }
}

impl TryFrom<FolderStateRecord> for FolderState {
    type Error = AppError;

    fn try_from(record: FolderStateRecord) -> Result<Self, Self::Error> {
        let state = Self {
            folders: record.folders,
            assignments: record.assignments,
        };
        state.check_invariants()?;
        Ok(state)
    }
}
