//! Shared identifiers, lifecycle enums and collaborator seams for folio.
//!
//! # Invariants
//! - Module slugs and section keys are syntax-checked on construction.
//! - Collaborators are passed in explicitly; nothing here is a global.

pub mod collab;
pub mod types;

pub use collab::{
    CacheError, CacheInvalidator, Clock, IdentityProvider, ModuleRegistry, NoopCache,
    RecordingCache, RegistryConfig, StaticIdentity, StaticRegistry, SystemClock,
    invalidation_paths,
};
pub use types::{
    Actor, AuditAction, AuditId, IdentError, MAX_IDENT_LEN, ModuleSlug, SectionKey, SectionRef,
    SectionStatus,
};
