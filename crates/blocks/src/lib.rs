//! Content blocks: the closed union of section content and its validator.
//!
//! # Invariants
//! - The write path is all-or-nothing: one bad element rejects the array.
//! - The read path never fails: elements that no longer validate are dropped.
//! - An empty block list is a value, not an absence.

mod block;
mod validate;

pub use block::{
    BulletsBlock, ContentBlock, EmptyBlock, ImageBlock, MAX_METRICS, MIN_METRICS, Metric,
    MetricIcon, MetricValue, MetricsFlowBlock, PdfBlock, ProseBlock, to_stored,
};
pub use validate::{
    BlockError, CorruptSnapshot, LEGACY_TAGS, StrictError, parse_block, parse_stored,
    parse_tolerant, parse_tolerant_slice, validate_strict,
};
