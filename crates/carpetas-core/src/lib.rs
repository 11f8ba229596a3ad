//! # carpetas-core
//!
//! Core crate for Carpetas. Contains configuration schemas, typed
//! identifiers, domain events, pagination/sorting types, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Carpetas crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
