//! Persistence: section rows, the append-only audit log, and their adapters.
//!
//! # Invariants
//! - The audit log is append-only; events are never updated or deleted.
//! - At most one section row exists per `(module, section, status)`.
//! - `updatedAt` is store-assigned and strictly increases per key.
//! - A draft row never carries `publishedAt`; a published row always does.

mod memory;
mod ports;
mod record;
mod store;

pub use memory::{InMemoryAuditStore, InMemoryContentStore};
pub use ports::{AuditStore, ContentStore, StoreError};
pub use record::{AuditEvent, NewAuditEvent, SectionRow, SectionWrite, advance_timestamp};
pub use store::{FileStore, IntegrityManifest, ManifestEntry, StoreMeta};
