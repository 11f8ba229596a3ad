//! Folder management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use carpetas_core::error::AppError;
use carpetas_core::types::FolderId;
use carpetas_entity::folder::{CarpetaCreate, CarpetaUpdate, Folder};

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

/// Arguments for folder commands
#[derive(Debug, Args)]
pub struct FolderArgs {
    /// Folder subcommand
    #[command(subcommand)]
    pub command: FolderCommand,
}

/// Folder subcommands
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// Create a new folder
    Create {
        /// Folder name
        #[arg(short, long)]
        name: String,
        /// Parent folder ID (omit for root)
        #[arg(short, long)]
        parent: Option<FolderId>,
    },
    /// Rename a folder
    Rename {
        /// Folder ID
        id: FolderId,
        /// New name
        #[arg(short, long)]
        name: String,
    },
    /// Move a folder under another one, or to the top level
    Move {
        /// Folder ID
        id: FolderId,
        /// New parent folder ID
        #[arg(short, long, conflicts_with = "root", required_unless_present = "root")]
        parent: Option<FolderId>,
        /// Make the folder a root
        #[arg(long)]
        root: bool,
    },
    /// Delete a folder and everything below it
    Delete {
        /// Folder ID
        id: FolderId,
    },
    /// Show the whole folder tree
    List,
    /// Show one folder with its path and subtree
    Show {
        /// Folder ID
        id: FolderId,
    },
    /// List the direct children of a folder
    Children {
        /// Folder ID
        id: FolderId,
    },
    /// Find folders by name
    Search {
        /// Text contained in the name
        query: String,
    },
}

/// Folder display row
#[derive(Debug, Serialize, Tabled)]
struct FolderRow {
    /// Folder ID
    id: String,
    /// Name
    nombre: String,
    /// Parent ID
    parent_id: String,
    /// Last change
    updated_at: String,
}

impl From<&Folder> for FolderRow {
    fn from(f: &Folder) -> Self {
        Self {
            id: f.id.to_string(),
            nombre: f.name.clone(),
            parent_id: f.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            updated_at: f.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute folder commands
pub async fn execute(
    args: &FolderArgs,
    ctx: &CliContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        FolderCommand::Create { name, parent } => {
            let req = match parent {
                Some(parent_id) => CarpetaCreate::child(name.as_str(), *parent_id),
                None => CarpetaCreate::root(name.as_str()),
            };
            let folder = ctx.service.create(req).await?;
            match format {
                OutputFormat::Table => output::print_success(&format!(
                    "Folder '{}' created (id: {})",
                    folder.name, folder.id
                )),
                OutputFormat::Json => output::print_json(&folder),
            }
        }
        FolderCommand::Rename { id, name } => {
            let folder = ctx
                .service
                .update(*id, CarpetaUpdate::rename(name.as_str()))
                .await?;
            match format {
                OutputFormat::Table => output::print_success(&format!(
                    "Folder {} renamed to '{}'",
                    folder.id, folder.name
                )),
                OutputFormat::Json => output::print_json(&folder),
            }
        }
        FolderCommand::Move { id, parent, root } => {
            let target = if *root { None } else { *parent };
            let folder = ctx.service.update(*id, CarpetaUpdate::move_to(target)).await?;
            match format {
                OutputFormat::Table => {
                    let place = folder
                        .parent_id
                        .map(|p| format!("under {p}"))
                        .unwrap_or_else(|| "to the top level".to_string());
                    output::print_success(&format!("Folder '{}' moved {place}", folder.name));
                }
                OutputFormat::Json => output::print_json(&folder),
            }
        }
        FolderCommand::Delete { id } => {
            let outcome = ctx.service.delete(*id).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Folder {id} deleted"));
                    output::print_kv("Folders removed", &outcome.folders_removed.to_string());
                    output::print_kv("Invoices orphaned", &outcome.invoices_orphaned.to_string());
                }
                OutputFormat::Json => output::print_json(&outcome),
            }
        }
        FolderCommand::List => {
            let tree = ctx.service.list().await?;
            output::print_tree(&tree, format);
        }
        FolderCommand::Show { id } => {
            let node = ctx.service.get(*id).await?;
            if format == OutputFormat::Table {
                let path: Vec<String> = ctx
                    .query
                    .breadcrumbs(*id)
                    .await?
                    .into_iter()
                    .map(|f| f.name)
                    .collect();
                output::print_kv("Path", &format!("/{}", path.join("/")));
                let total = ctx.query.descendant_invoice_ids(*id).await?.len();
                output::print_kv("Invoices in subtree", &total.to_string());
            }
            output::print_subtree(&node, format);
        }
        FolderCommand::Children { id } => {
            let children = ctx.service.list_children(*id).await?;
            let rows: Vec<FolderRow> = children.iter().map(FolderRow::from).collect();
            output::print_list(&rows, format);
        }
        FolderCommand::Search { query } => {
            let hits = ctx.service.search(query).await?;
            let rows: Vec<FolderRow> = hits.iter().map(FolderRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
