//! Section authoring: the mutation service and its compensation step.
//!
//! # Invariants
//! - A successful call leaves exactly one new audit event whose blocks equal
//!   the resulting row's blocks.
//! - A failed audit insert returns the row to its pre-call content, or
//!   removes it if the call created it.
//! - Validation and not-found failures write nothing.
//! - Store errors never cross the service boundary unclassified.

mod error;
mod saga;
mod service;

pub use error::{CompensationOutcome, MutationError, NotFound, ValidationError};
pub use saga::Compensation;
pub use service::{
    ContentService, DEFAULT_AUDIT_LIMIT, DraftOutcome, MAX_AUDIT_LIMIT, PublishOutcome,
    SectionView, clamp_audit_limit,
};
