//! Invoice references and assignment DTOs.

pub mod model;

pub use model::{AssignRequest, AssignmentOutcome, Invoice, InvoiceSummary};
