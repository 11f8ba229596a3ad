//! Invoice CLI commands.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use carpetas_core::error::AppError;
use carpetas_core::types::{FolderId, InvoiceId, SortDirection, SortField};
use carpetas_entity::invoice::{AssignRequest, Invoice, InvoiceSummary};
use carpetas_service::InvoiceQuery;
use carpetas_store::InvoiceRepository;

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

/// Arguments for invoice commands
#[derive(Debug, Args)]
pub struct InvoiceArgs {
    /// Invoice subcommand
    #[command(subcommand)]
    pub command: InvoiceCommand,
}

/// Invoice subcommands
#[derive(Debug, Subcommand)]
pub enum InvoiceCommand {
    /// Register an invoice
    Add {
        /// Invoice number
        #[arg(short, long)]
        numero: String,
        /// Supplier
        #[arg(short, long)]
        proveedor: String,
        /// Total amount
        #[arg(short, long)]
        total: f64,
        /// Issue date (YYYY-MM-DD)
        #[arg(long)]
        fecha: Option<NaiveDate>,
    },
    /// File an invoice under a folder
    Assign {
        /// Invoice ID
        invoice: InvoiceId,
        /// Target folder ID
        #[arg(long)]
        folder: FolderId,
    },
    /// Remove an invoice from its folder
    Unassign {
        /// Invoice ID
        invoice: InvoiceId,
    },
    /// Show an invoice and the folder path it is filed under
    Show {
        /// Invoice ID
        invoice: InvoiceId,
    },
    /// List invoices
    List(ListArgs),
    /// Rebuild folder assignments from the invoice file
    Sync,
}

/// Filters, sorting, and paging for `invoice list`
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only invoices in this folder
    #[arg(long)]
    pub folder: Option<FolderId>,
    /// Include invoices of every subfolder
    #[arg(short, long, requires = "folder")]
    pub recursive: bool,
    /// Sort by numero_factura, proveedor, total or fecha
    #[arg(short, long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    /// Text contained in the number or supplier
    #[arg(long)]
    pub search: Option<String>,
    /// Page number, starting at 1
    #[arg(long)]
    pub page: Option<u64>,
    /// Invoices per page
    #[arg(long)]
    pub page_size: Option<u64>,
}

/// Invoice display row
#[derive(Debug, Serialize, Tabled)]
struct InvoiceRow {
    id: String,
    numero_factura: String,
    proveedor: String,
    total: String,
    fecha: String,
    carpeta: String,
}

impl From<&InvoiceSummary> for InvoiceRow {
    fn from(i: &InvoiceSummary) -> Self {
        Self {
            id: i.id.to_string(),
            numero_factura: i.numero_factura.clone(),
            proveedor: i.proveedor.clone(),
            total: format!("{:.2}", i.total),
            fecha: i.fecha.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            carpeta: i.carpeta_nombre.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// An invoice with the folder path it is filed under
#[derive(Debug, Serialize)]
struct InvoiceLocation {
    #[serde(flatten)]
    summary: InvoiceSummary,
    carpeta_id: Option<FolderId>,
    /// Folder names from the root down
    ruta: Vec<String>,
}

impl ListArgs {
    fn to_query(&self) -> InvoiceQuery {
        let direction = if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        InvoiceQuery {
            folder_id: self.folder,
            recursive: self.recursive,
            search: self.search.clone(),
            sort: self.sort.as_ref().map(|field| SortField::new(field.as_str(), direction)),
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Execute invoice commands
pub async fn execute(
    args: &InvoiceArgs,
    ctx: &CliContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        InvoiceCommand::Add {
            numero,
            proveedor,
            total,
            fecha,
        } => {
            if numero.trim().is_empty() {
                return Err(AppError::invalid_input("Invoice number cannot be empty"));
            }
            let invoice = Invoice::new(numero.trim(), proveedor.trim(), *total, *fecha);
            ctx.invoices.add(invoice.clone()).await?;
            match format {
                OutputFormat::Table => output::print_success(&format!(
                    "Invoice '{}' added (id: {})",
                    invoice.numero_factura, invoice.id
                )),
                OutputFormat::Json => output::print_json(&invoice),
            }
        }
        InvoiceCommand::Assign { invoice, folder } => {
            let outcome = ctx
                .service
                .assign_invoice(*invoice, AssignRequest { carpeta_id: *folder })
                .await?;
            match format {
                OutputFormat::Table => {
                    let name = outcome.carpeta_nombre.as_deref().unwrap_or_default();
                    output::print_success(&format!("Invoice {invoice} filed under '{name}'"));
                    if let Some(previous) = outcome.carpeta_anterior_id.filter(|p| p != folder) {
                        output::print_kv("Moved from", &previous.to_string());
                    }
                }
                OutputFormat::Json => output::print_json(&outcome),
            }
        }
        InvoiceCommand::Unassign { invoice } => {
            let outcome = ctx.service.unassign_invoice(*invoice).await?;
            match format {
                OutputFormat::Table => match outcome.carpeta_anterior_id {
                    Some(previous) => {
                        output::print_success(&format!("Invoice {invoice} removed from {previous}"))
                    }
                    None => {
                        output::print_warning(&format!("Invoice {invoice} was not in a folder"))
                    }
                },
                OutputFormat::Json => output::print_json(&outcome),
            }
        }
        InvoiceCommand::Show { invoice } => {
            let found = ctx.invoices.get_invoice(*invoice).await?.ok_or_else(|| {
                AppError::not_found(format!("Invoice {invoice} not found")).about(invoice)
            })?;
            let folder = ctx.query.folder_of(*invoice).await;
            let path = match &folder {
                Some(folder) => ctx.query.breadcrumbs(folder.id).await?,
                None => Vec::new(),
            };
            let location = InvoiceLocation {
                summary: found.summary(folder.as_ref().map(|f| f.name.clone())),
                carpeta_id: folder.as_ref().map(|f| f.id),
                ruta: path.iter().map(|f| f.name.clone()).collect(),
            };
            match format {
                OutputFormat::Table => {
                    let s = &location.summary;
                    output::print_kv("ID", &s.id.to_string());
                    output::print_kv("Number", &s.numero_factura);
                    output::print_kv("Supplier", &s.proveedor);
                    output::print_kv("Total", &format!("{:.2}", s.total));
                    if let Some(fecha) = s.fecha {
                        output::print_kv("Date", &fecha.to_string());
                    }
                    match location.carpeta_id {
                        Some(folder_id) => {
                            output::print_kv("Folder", &folder_id.to_string());
                            output::print_kv("Path", &location.ruta.join(" / "));
                        }
                        None => output::print_kv("Folder", "-"),
                    }
                }
                OutputFormat::Json => output::print_json(&location),
            }
        }
        InvoiceCommand::List(list) => {
            let page = ctx.query.list_invoices(&list.to_query()).await?;
            let rows = page.map(|i| InvoiceRow::from(&i));
            output::print_page(&rows, format);
        }
        InvoiceCommand::Sync => {
            let report = ctx.service.sync_invoices().await?;
            match format {
                OutputFormat::Table => {
                    output::print_success("Assignments synchronized");
                    output::print_kv("Invoices seen", &report.invoices_seen.to_string());
                    output::print_kv("Assigned", &report.assigned.to_string());
                    output::print_kv("Orphaned", &report.orphaned.to_string());
                }
                OutputFormat::Json => output::print_json(&report),
            }
        }
    }

    Ok(())
}
