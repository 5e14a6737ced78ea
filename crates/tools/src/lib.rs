//! Diagnostics: section inspector, audit linkage check, sample seeding.
//!
//! # Invariants
//! - Inspection and linkage checks never write.
//! - Seeding goes through the mutation service and never overwrites.

mod inspector;
mod linkage;
mod seed;

pub use inspector::{RowSummary, SectionInspector, SectionSummary};
pub use linkage::{LinkageIssue, LinkageReport, check_audit_linkage};
pub use seed::{SampleSection, SeedReport, seed_samples};
