use folio_blocks::{CorruptSnapshot, StrictError};
use folio_common::{IdentError, SectionRef};
use folio_persist::StoreError;

/// Input rejected before any write was attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid module slug: {0}")]
    ModuleSyntax(#[source] IdentError),
    #[error("invalid section key: {0}")]
    SectionSyntax(#[source] IdentError),
    #[error("unknown module {0:?}")]
    UnknownModule(String),
    #[error("unknown section key {0:?}")]
    UnknownSection(String),
    #[error("invalid blocks: {0}")]
    Blocks(#[from] StrictError),
    #[error("{key}: {source}")]
    Corrupted {
        key: String,
        #[source]
        source: CorruptSnapshot,
    },
}

/// A payload source that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("no draft to publish for {0}")]
    Draft(SectionRef),
    #[error("no published content to copy for {0}")]
    Published(SectionRef),
    #[error("audit event {0:?} not found")]
    AuditEvent(String),
}

/// What happened to the section row after the audit insert failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationOutcome {
    /// The pre-call content was written back.
    Restored,
    /// The row did not exist before the call and was removed.
    Removed,
    /// The compensating write itself failed; the row holds un-audited content.
    Failed(String),
}

impl CompensationOutcome {
    pub fn succeeded(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl std::fmt::Display for CompensationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restored => f.write_str("previous content restored"),
            Self::Removed => f.write_str("new row removed"),
            Self::Failed(reason) => write!(f, "compensation failed: {reason}"),
        }
    }
}

/// Classified failure of a mutation-service call.
///
/// Every store error is caught and mapped here; nothing else crosses the
/// service boundary.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFound),
    /// A read before the commit failed. Nothing was written.
    #[error("content read failed: {0}")]
    ContentRead(#[source] StoreError),
    /// An audit log read failed. Nothing was written.
    #[error("audit read failed: {0}")]
    AuditRead(#[source] StoreError),
    /// The commit write failed. Nothing was written.
    #[error("content write failed: {0}")]
    ContentWrite(#[source] StoreError),
    /// The commit succeeded but the audit insert failed.
    #[error("audit write failed ({compensation}): {source}")]
    AuditWrite {
        #[source]
        source: StoreError,
        compensation: CompensationOutcome,
    },
}

impl MutationError {
    /// Stable tag for upward layers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::ContentRead(_) => "content_read",
            Self::AuditRead(_) => "audit_read",
            Self::ContentWrite(_) => "content_write",
            Self::AuditWrite { .. } => "audit_write",
        }
    }
}
