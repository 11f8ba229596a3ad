//! Core type definitions used across the Carpetas workspace.

pub mod id;
pub mod pagination;
pub mod sorting;

pub use id::*;
pub use pagination::{PageRequest, PageResponse};
pub use sorting::{SortDirection, SortField};
