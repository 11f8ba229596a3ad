//! # carpetas-entity
//!
//! Domain entity models for Carpetas. Every struct in this crate is either
//! a stored record (folders), an externally owned record the engine only
//! references (invoices), or a boundary DTO. Field names on the wire follow
//! the product's Spanish vocabulary (`nombre`, `facturas`, `carpeta_id`).

pub mod folder;
pub mod invoice;
