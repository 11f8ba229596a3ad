//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use carpetas_core::types::FolderId;

/// A folder in the invoice hierarchy.
///
/// Folders are flat records; the parent/child relation is the `parent_id`
/// column, never an embedded list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Unique folder identifier. Never changes and never reused.
    pub id: FolderId,
    /// Folder name. Non-blank, not required to be unique.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Parent folder ID (null for root folders).
    pub parent_id: Option<FolderId>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last renamed or moved.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Create a fresh folder with a new identifier.
    pub fn new(name: impl Into<String>, parent_id: Option<FolderId>) -> Self {
        let now = Utc::now();
        Self {
            id: FolderId::new(),
            name: name.into(),
            parent_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarpetaCreate {
    /// Folder name.
    pub nombre: String,
    /// Parent folder (None for root).
    #[serde(default)]
    pub parent_id: Option<FolderId>,
}

impl CarpetaCreate {
    /// Create a root folder request.
    pub fn root(nombre: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            parent_id: None,
        }
    }

    /// Create a child folder request.
    pub fn child(nombre: impl Into<String>, parent_id: FolderId) -> Self {
        Self {
            nombre: nombre.into(),
            parent_id: Some(parent_id),
        }
    }
}

/// Partial update of a folder.
///
/// `parent_id` is tri-state: absent leaves the parent alone, `null` moves
/// the folder to the root level, and a value moves it under that folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarpetaUpdate {
    /// New name, if renaming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    /// New parent, if moving.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<FolderId>>,
}

impl CarpetaUpdate {
    /// Rename only.
    pub fn rename(nombre: impl Into<String>) -> Self {
        Self {
            nombre: Some(nombre.into()),
            parent_id: None,
        }
    }

    /// Move only. `None` moves the folder to the root level.
    pub fn move_to(parent_id: Option<FolderId>) -> Self {
        Self {
            nombre: None,
            parent_id: Some(parent_id),
        }
    }

    /// Whether the update carries no change at all.
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none() && self.parent_id.is_none()
    }
}

/// Distinguishes an explicit `null` from an absent field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<FolderId>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<FolderId>::deserialize(deserializer).map(Some)
}
