//! Invoice models as seen by the folder engine.
//!
//! Invoices are owned by an external repository. The engine only reads
//! them and updates their `folder_id` back-reference.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use carpetas_core::types::{FolderId, InvoiceId};

/// An invoice record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice ID.
    pub id: InvoiceId,
    /// Invoice number as printed on the document.
    pub numero_factura: String,
    /// Supplier name.
    pub proveedor: String,
    /// Invoice total.
    pub total: f64,
    /// Issue date, if known.
    #[serde(default)]
    pub fecha: Option<NaiveDate>,
    /// Folder the invoice is filed under. Weak reference.
    #[serde(default, rename = "carpeta_id")]
    pub folder_id: Option<FolderId>,
}

impl Invoice {
    /// Create an unfiled invoice with a fresh identifier.
    pub fn new(
        numero_factura: impl Into<String>,
        proveedor: impl Into<String>,
        total: f64,
        fecha: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            numero_factura: numero_factura.into(),
            proveedor: proveedor.into(),
            total,
            fecha,
            folder_id: None,
        }
    }

    /// Summarize this invoice, labeling it with its folder's name.
    pub fn summary(&self, carpeta_nombre: Option<String>) -> InvoiceSummary {
        InvoiceSummary {
            id: self.id,
            numero_factura: self.numero_factura.clone(),
            proveedor: self.proveedor.clone(),
            total: self.total,
            fecha: self.fecha,
            carpeta_nombre,
        }
    }
}

/// Compact invoice view attached to folder nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    /// Invoice ID.
    pub id: InvoiceId,
    /// Invoice number.
    pub numero_factura: String,
    /// Supplier name.
    pub proveedor: String,
    /// Invoice total.
    pub total: f64,
    /// Issue date, if known.
    #[serde(default)]
    pub fecha: Option<NaiveDate>,
    /// Name of the folder the invoice is directly filed under.
    #[serde(default)]
    pub carpeta_nombre: Option<String>,
}

/// Request body for filing an invoice under a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    /// Target folder.
    pub carpeta_id: FolderId,
}

/// Result of an assign or unassign request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    /// The invoice that was (un)assigned.
    pub factura_id: InvoiceId,
    /// The folder it now belongs to.
    pub carpeta_id: Option<FolderId>,
    /// Name of that folder.
    pub carpeta_nombre: Option<String>,
    /// The folder it belonged to before the request.
    pub carpeta_anterior_id: Option<FolderId>,
}
