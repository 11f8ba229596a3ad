//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use carpetas_core::types::PageResponse;
use carpetas_entity::folder::{FolderNode, FolderTree};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print a list of rows in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print one page of rows followed by a page footer
pub fn print_page<T: Serialize + Tabled>(page: &PageResponse<T>, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            print_list(&page.items, format);
            println!(
                "Page {}/{} ({} items)",
                page.page, page.total_pages, page.total_items
            );
        }
        OutputFormat::Json => print_json(page),
    }
}

/// Print a folder forest as an indented tree
pub fn print_tree(tree: &FolderTree, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if tree.roots.is_empty() {
                println!("No folders.");
                return;
            }
            for root in &tree.roots {
                print_node(root, 0);
            }
            println!("{} folders", tree.total_folders);
        }
        OutputFormat::Json => print_json(tree),
    }
}

/// Print a single folder with its subtree
pub fn print_subtree(node: &FolderNode, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_node(node, 0),
        OutputFormat::Json => print_json(node),
    }
}

fn print_node(node: &FolderNode, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}├── {}/  ({})", node.nombre, node.id);
    for factura in &node.facturas {
        println!(
            "{indent}│     · {} {} {:.2}",
            factura.numero_factura, factura.proveedor, factura.total
        );
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    println!("{json}");
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}
