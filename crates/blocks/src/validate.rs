use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::block::{
    BulletsBlock, ContentBlock, EmptyBlock, ImageBlock, MAX_METRICS, MIN_METRICS,
    MetricsFlowBlock, PdfBlock, ProseBlock,
};

/// Tags from earlier schema versions. Recognized, never accepted.
pub const LEGACY_TAGS: &[&str] = &["kpis", "timeline", "stats", "quote", "cta", "gallery"];

/// Why a single raw element is not a current `ContentBlock`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("block is not a JSON object")]
    NotAnObject,
    #[error("block has no string \"type\" field")]
    MissingType,
    #[error("block type {0:?} is no longer supported")]
    LegacyVariant(String),
    #[error("unknown block type {0:?}")]
    UnknownVariant(String),
    #[error("invalid {variant} block: {reason}")]
    Invalid {
        variant: &'static str,
        reason: String,
    },
}

impl BlockError {
    fn invalid(variant: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            variant,
            reason: reason.into(),
        }
    }

    /// Whether the element is a recognized shape that is simply not current.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::LegacyVariant(_) | Self::UnknownVariant(_))
    }
}

/// Rejection of a whole block array on the write path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrictError {
    #[error("blocks must be a JSON array")]
    NotAnArray,
    #[error("block #{index}: {source}")]
    Block {
        index: usize,
        #[source]
        source: BlockError,
    },
}

/// A stored block list in which some elements no longer validate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored blocks are corrupted: {parsed} of {raw} elements are valid")]
pub struct CorruptSnapshot {
    pub raw: usize,
    pub parsed: usize,
}

/// Validate one raw element against the variant rules.
pub fn parse_block(value: &Value) -> Result<ContentBlock, BlockError> {
    let obj = value.as_object().ok_or(BlockError::NotAnObject)?;
    let tag = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(BlockError::MissingType)?;

    match tag {
        "bullets" => {
            let block: BulletsBlock = decode("bullets", value)?;
            if block.items.is_empty() {
                return Err(BlockError::invalid("bullets", "items must not be empty"));
            }
            Ok(ContentBlock::Bullets(block))
        }
        "prose" => decode::<ProseBlock>("prose", value).map(ContentBlock::Prose),
        "image" => {
            let block: ImageBlock = decode("image", value)?;
            if !block.has_source() {
                return Err(BlockError::invalid(
                    "image",
                    "one of assetId or path is required",
                ));
            }
            Ok(ContentBlock::Image(block))
        }
        "pdf" => decode::<PdfBlock>("pdf", value).map(ContentBlock::Pdf),
        "empty" => decode::<EmptyBlock>("empty", value).map(ContentBlock::Empty),
        "metrics_flow" => {
            let block: MetricsFlowBlock = decode("metrics_flow", value)?;
            let n = block.metrics.len();
            if !(MIN_METRICS..=MAX_METRICS).contains(&n) {
                return Err(BlockError::invalid(
                    "metrics_flow",
                    format!("expected {MIN_METRICS}..={MAX_METRICS} metrics, got {n}"),
                ));
            }
            Ok(ContentBlock::MetricsFlow(block))
        }
        other if LEGACY_TAGS.contains(&other) => Err(BlockError::LegacyVariant(other.to_string())),
        other => Err(BlockError::UnknownVariant(other.to_string())),
    }
}

fn decode<T: DeserializeOwned>(variant: &'static str, value: &Value) -> Result<T, BlockError> {
    T::deserialize(value).map_err(|e| BlockError::invalid(variant, e.to_string()))
}

/// Write-path validation: every element must be a valid current block.
///
/// An empty array is valid (all content deliberately removed); `null` or any
/// other non-array value is not.
pub fn validate_strict(raw: &Value) -> Result<Vec<ContentBlock>, StrictError> {
    let items = raw.as_array().ok_or(StrictError::NotAnArray)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_block(item).map_err(|source| StrictError::Block { index, source }))
        .collect()
}

/// Read-path parse: keep what validates, drop the rest.
///
/// Never fails. Non-array input yields an empty list.
pub fn parse_tolerant(raw: &Value) -> Vec<ContentBlock> {
    match raw.as_array() {
        Some(items) => parse_tolerant_slice(items),
        None => {
            tracing::debug!("tolerant parse of non-array value; returning no blocks");
            Vec::new()
        }
    }
}

/// Tolerant parse over stored elements.
pub fn parse_tolerant_slice(items: &[Value]) -> Vec<ContentBlock> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match parse_block(item) {
            Ok(block) => Some(block),
            Err(err) => {
                tracing::debug!(
                    index,
                    %err,
                    unrecognized = err.is_unrecognized(),
                    "dropping block"
                );
                None
            }
        })
        .collect()
}

/// Tolerant parse of a stored block list that must have survived intact.
///
/// Used when stored content becomes the payload of a new write: any dropped
/// element means the row cannot be reproduced faithfully.
pub fn parse_stored(raw: &[Value]) -> Result<Vec<ContentBlock>, CorruptSnapshot> {
    let parsed = parse_tolerant_slice(raw);
    if parsed.len() != raw.len() {
        return Err(CorruptSnapshot {
            raw: raw.len(),
            parsed: parsed.len(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MetricIcon;
    use serde_json::json;

    fn metrics(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| json!({"key": format!("k{i}"), "label": "L", "value": i, "icon": "chart"}))
                .collect(),
        )
    }

    #[test]
    fn strict_and_tolerant_diverge_on_one_bad_element() {
        let raw = json!([
            {"type": "prose", "content": "Hello"},
            {"type": "bullets", "items": []},
            {"type": "empty", "title": "Coming soon"},
        ]);

        let err = validate_strict(&raw).unwrap_err();
        assert!(matches!(err, StrictError::Block { index: 1, .. }));

        let tolerant = parse_tolerant(&raw);
        assert_eq!(tolerant.len(), 2);
        assert_eq!(tolerant[0].kind(), "prose");
        assert_eq!(tolerant[1].kind(), "empty");
    }

    #[test]
    fn empty_array_is_valid_and_null_is_not() {
        assert_eq!(validate_strict(&json!([])).unwrap(), vec![]);
        assert_eq!(validate_strict(&Value::Null), Err(StrictError::NotAnArray));
        assert!(parse_tolerant(&Value::Null).is_empty());
    }

    #[test]
    fn bullets_round_trip_to_same_json() {
        let raw = json!([{"type": "bullets", "items": ["a", "b"]}]);
        let blocks = validate_strict(&raw).unwrap();
        assert_eq!(Value::Array(crate::to_stored(&blocks)), raw);
    }

    #[test]
    fn bullets_items_must_be_strings() {
        let err = parse_block(&json!({"type": "bullets", "items": ["a", 2]})).unwrap_err();
        assert!(matches!(err, BlockError::Invalid { variant: "bullets", .. }));
    }

    #[test]
    fn optional_fields_accept_null_but_not_wrong_types() {
        assert!(parse_block(&json!({"type": "prose", "title": null, "content": "x"})).is_ok());
        assert!(parse_block(&json!({"type": "prose", "title": 5, "content": "x"})).is_err());
        assert!(parse_block(&json!({"type": "prose"})).is_err());
    }

    #[test]
    fn image_requires_alt_and_a_source() {
        assert!(parse_block(&json!({"type": "image", "alt": "a", "assetId": "as_1"})).is_ok());
        assert!(parse_block(&json!({"type": "image", "alt": "a", "path": "p.png"})).is_ok());
        assert!(parse_block(&json!({"type": "image", "alt": "a"})).is_err());
        assert!(parse_block(&json!({"type": "image", "path": "p.png"})).is_err());
    }

    #[test]
    fn pdf_not_yet_configured_is_valid() {
        let block = parse_block(&json!({"type": "pdf"})).unwrap();
        match block {
            ContentBlock::Pdf(pdf) => assert!(!pdf.is_configured()),
            other => panic!("expected pdf, got {other:?}"),
        }
        assert!(parse_block(&json!({"type": "pdf", "url": null, "caption": null})).is_ok());
    }

    #[test]
    fn empty_requires_title() {
        assert!(parse_block(&json!({"type": "empty", "title": "TBD"})).is_ok());
        assert!(parse_block(&json!({"type": "empty", "description": "x"})).is_err());
    }

    #[test]
    fn metrics_flow_bounds() {
        let block = |n| json!({"type": "metrics_flow", "title": "t", "totalLabel": "T", "metrics": metrics(n)});
        assert!(parse_block(&block(1)).is_err());
        assert!(parse_block(&block(2)).is_ok());
        assert!(parse_block(&block(8)).is_ok());
        assert!(parse_block(&block(9)).is_err());
    }

    #[test]
    fn metrics_flow_coerces_numeric_strings_and_rejects_negative() {
        let raw = json!({
            "type": "metrics_flow",
            "title": "t",
            "totalLabel": "T",
            "metrics": [
                {"key": "a", "label": "A", "value": "12", "icon": "users"},
                {"key": "b", "label": "B", "value": 3.5, "icon": "star"},
            ],
        });
        match parse_block(&raw).unwrap() {
            ContentBlock::MetricsFlow(flow) => {
                assert_eq!(flow.metrics[0].value.get(), 12.0);
                assert_eq!(flow.metrics[0].icon, MetricIcon::Users);
                assert_eq!(flow.metrics[1].value.get(), 3.5);
            }
            other => panic!("expected metrics_flow, got {other:?}"),
        }

        let mut negative = raw.clone();
        negative["metrics"][1]["value"] = json!(-1);
        assert!(parse_block(&negative).is_err());
        assert!(parse_tolerant(&json!([negative])).is_empty());
    }

    #[test]
    fn metrics_flow_rejects_unknown_icon() {
        let raw = json!({
            "type": "metrics_flow",
            "title": "t",
            "totalLabel": "T",
            "metrics": [
                {"key": "a", "label": "A", "value": 1, "icon": "rocket"},
                {"key": "b", "label": "B", "value": 2, "icon": "star"},
            ],
        });
        assert!(parse_block(&raw).is_err());
    }

    #[test]
    fn legacy_and_unknown_tags_are_distinguished() {
        assert_eq!(
            parse_block(&json!({"type": "kpis", "items": []})),
            Err(BlockError::LegacyVariant("kpis".into()))
        );
        assert_eq!(
            parse_block(&json!({"type": "timeline"})),
            Err(BlockError::LegacyVariant("timeline".into()))
        );
        let unknown = parse_block(&json!({"type": "hologram"})).unwrap_err();
        assert_eq!(unknown, BlockError::UnknownVariant("hologram".into()));
        assert!(unknown.is_unrecognized());
        assert_eq!(parse_block(&json!({"items": []})), Err(BlockError::MissingType));
        assert_eq!(parse_block(&json!("prose")), Err(BlockError::NotAnObject));
    }

    #[test]
    fn strict_rejects_legacy_and_tolerant_drops_it() {
        let raw = json!([{"type": "timeline", "entries": []}, {"type": "prose", "content": "x"}]);
        assert!(matches!(
            validate_strict(&raw),
            Err(StrictError::Block {
                index: 0,
                source: BlockError::LegacyVariant(_)
            })
        ));
        assert_eq!(parse_tolerant(&raw).len(), 1);
    }

    #[test]
    fn parse_stored_detects_dropped_elements() {
        let intact = vec![json!({"type": "prose", "content": "a"})];
        assert_eq!(parse_stored(&intact).unwrap().len(), 1);

        let damaged = vec![json!({"type": "prose", "content": "a"}), json!({"type": "kpis"})];
        assert_eq!(
            parse_stored(&damaged),
            Err(CorruptSnapshot { raw: 2, parsed: 1 })
        );
        assert!(parse_stored(&[]).unwrap().is_empty());
    }
}
