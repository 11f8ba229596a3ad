//! Read-only queries and list utilities.

pub mod engine;
pub mod paginate;
pub mod sort;

pub use engine::{InvoiceQuery, QueryEngine};
pub use paginate::paginate;
pub use sort::{InvoiceSortField, SortKey, compare_text, filter_and_sort, invoice_matches};
