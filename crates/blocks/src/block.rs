use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Bounds on the number of metrics in a `metrics_flow` block.
pub const MIN_METRICS: usize = 2;
pub const MAX_METRICS: usize = 8;

/// One content block of a section, rendered top-to-bottom.
///
/// Closed union: anything else found in storage is either a legacy shape or
/// garbage, and never becomes a `ContentBlock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Bullets(BulletsBlock),
    Prose(ProseBlock),
    Image(ImageBlock),
    Pdf(PdfBlock),
    Empty(EmptyBlock),
    MetricsFlow(MetricsFlowBlock),
}

impl ContentBlock {
    /// The wire tag of this block.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bullets(_) => "bullets",
            Self::Prose(_) => "prose",
            Self::Image(_) => "image",
            Self::Pdf(_) => "pdf",
            Self::Empty(_) => "empty",
            Self::MetricsFlow(_) => "metrics_flow",
        }
    }

    /// Canonical JSON form, as stored and audited.
    pub fn to_value(&self) -> serde_json::Value {
        // Serializing plain structs of strings and finite numbers cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Encode a block list into its stored form.
pub fn to_stored(blocks: &[ContentBlock]) -> Vec<serde_json::Value> {
    blocks.iter().map(ContentBlock::to_value).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletsBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProseBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
}

impl ImageBlock {
    /// Whether the image points at something (an uploaded asset or a path).
    pub fn has_source(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.asset_id) || present(&self.path)
    }
}

/// A PDF block. Every field may be null: "not yet configured" is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfBlock {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl PdfBlock {
    pub fn is_configured(&self) -> bool {
        self.path.is_some() || self.url.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyBlock {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsFlowBlock {
    pub title: String,
    pub total_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub key: String,
    pub label: String,
    pub value: MetricValue,
    pub icon: MetricIcon,
}

/// Fixed icon set for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricIcon {
    Users,
    Clock,
    Currency,
    Chart,
    Target,
    Check,
    TrendingUp,
    Star,
}

/// A non-negative, finite metric value.
///
/// Accepts a JSON number or a numeric string on input; always written back
/// as a number (integral values without a fractional part).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MetricValue(f64);

impl MetricValue {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value >= 0.0).then_some(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

/// Largest integer an f64 represents exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0 <= MAX_EXACT_INT {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| de::Error::custom(format!("value {s:?} is not numeric")))?,
        };
        Self::new(value)
            .ok_or_else(|| de::Error::custom(format!("value {value} must be finite and >= 0")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_type_tag_and_camel_case() {
        let block = ContentBlock::MetricsFlow(MetricsFlowBlock {
            title: "Pipeline".into(),
            total_label: "Total".into(),
            subtitle: None,
            metrics: vec![
                Metric {
                    key: "a".into(),
                    label: "A".into(),
                    value: MetricValue::new(3.0).unwrap(),
                    icon: MetricIcon::TrendingUp,
                },
                Metric {
                    key: "b".into(),
                    label: "B".into(),
                    value: MetricValue::new(1.5).unwrap(),
                    icon: MetricIcon::Users,
                },
            ],
        });
        let value = block.to_value();
        assert_eq!(value["type"], "metrics_flow");
        assert_eq!(value["totalLabel"], "Total");
        assert!(value.get("subtitle").is_none());
        assert_eq!(value["metrics"][0]["value"], json!(3));
        assert_eq!(value["metrics"][0]["icon"], "trending_up");
        assert_eq!(value["metrics"][1]["value"], json!(1.5));
    }

    #[test]
    fn pdf_keeps_nulls() {
        let value = ContentBlock::Pdf(PdfBlock::default()).to_value();
        assert_eq!(
            value,
            json!({"type": "pdf", "path": null, "url": null, "filename": null, "caption": null})
        );
    }

    #[test]
    fn metric_value_rejects_negative_and_non_finite() {
        assert!(MetricValue::new(-1.0).is_none());
        assert!(MetricValue::new(f64::NAN).is_none());
        assert!(MetricValue::new(f64::INFINITY).is_none());
        assert_eq!(MetricValue::new(0.0).unwrap().get(), 0.0);
    }

    #[test]
    fn metric_value_coerces_numeric_strings() {
        let v: MetricValue = serde_json::from_value(json!(" 42.5 ")).unwrap();
        assert_eq!(v.get(), 42.5);
        assert!(serde_json::from_value::<MetricValue>(json!("lots")).is_err());
        assert!(serde_json::from_value::<MetricValue>(json!("-3")).is_err());
    }

    #[test]
    fn image_source_requires_non_blank() {
        let mut image = ImageBlock {
            alt: "Team".into(),
            asset_id: Some("  ".into()),
            path: None,
            caption: None,
            layout: None,
            treatment: None,
        };
        assert!(!image.has_source());
        image.path = Some("uploads/team.png".into());
        assert!(image.has_source());
    }
}
