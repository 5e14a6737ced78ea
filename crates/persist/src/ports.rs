//! Store ports used by the mutation service.
//!
//! Each store guarantees atomicity for a single call only. Nothing here spans
//! both stores; the service composes them.

use async_trait::async_trait;
use folio_common::{AuditId, ModuleSlug, SectionKey, SectionRef};

use crate::record::{AuditEvent, NewAuditEvent, SectionRow, SectionWrite};

/// Errors from store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("inconsistent write for {0}: publishedAt does not match status")]
    InconsistentWrite(SectionRef),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed read/upsert/delete of section rows.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_section(&self, key: &SectionRef) -> Result<Option<SectionRow>, StoreError>;

    /// Insert or replace the row at `write.key`. Returns the stored row with
    /// its new `updatedAt`.
    async fn upsert_section(&self, write: SectionWrite) -> Result<SectionRow, StoreError>;

    /// Remove a row. Deleting a missing row is not an error.
    async fn delete_section(&self, key: &SectionRef) -> Result<(), StoreError>;

    /// Every stored key, in key order.
    async fn list_sections(&self) -> Result<Vec<SectionRef>, StoreError>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_event(&self, event: NewAuditEvent) -> Result<AuditEvent, StoreError>;

    async fn get_event(&self, id: AuditId) -> Result<Option<AuditEvent>, StoreError>;

    /// Events for one module/section, most recent first, at most `limit`.
    async fn list_events(
        &self,
        module: &ModuleSlug,
        section: &SectionKey,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, StoreError>;
}
