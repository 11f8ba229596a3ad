//! Repositories for records the folder engine references but does not own.

pub mod invoice;
pub mod json_file;

pub use invoice::{InMemoryInvoiceRepository, InvoiceRepository};
pub use json_file::JsonInvoiceRepository;
