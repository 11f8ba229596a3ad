//! Folder store persistence configuration.

use serde::{Deserialize, Serialize};

/// Where and whether the folder tree is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON snapshot file.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Path of the JSON file backing the command-line invoice repository.
    #[serde(default = "default_invoices_path")]
    pub invoices_path: String,
    /// Write a snapshot after every successful mutation.
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            invoices_path: default_invoices_path(),
            persist: true,
        }
    }
}

fn default_snapshot_path() -> String {
    "data/carpetas.json".to_string()
}

fn default_invoices_path() -> String {
    "data/facturas.json".to_string()
}

fn default_true() -> bool {
    true
}
