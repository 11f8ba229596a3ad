//! Folder domain entities.

pub mod model;
pub mod tree;

pub use model::{CarpetaCreate, CarpetaUpdate, Folder};
pub use tree::{FolderNode, FolderTree};
