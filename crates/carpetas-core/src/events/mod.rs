//! Domain events emitted by Carpetas operations.
//!
//! Events are published by the folder service after a mutation has been
//! committed. Consumers subscribe through the service; having no
//! subscribers is normal.

pub mod folder;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use folder::FolderEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: FolderEvent,
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(payload: FolderEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}
