use folio_author::{ContentService, MutationError};
use folio_common::{Actor, SectionStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One piece of sample content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSection {
    pub module: String,
    pub section: String,
    pub blocks: Value,
    /// Also publish after saving the draft.
    #[serde(default)]
    pub publish: bool,
}

impl SampleSection {
    fn label(&self) -> String {
        format!("{}/{}", self.module, self.section)
    }
}

/// What a seeding run did, by `module/section` label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub seeded: Vec<String>,
    pub published: Vec<String>,
    pub skipped: Vec<String>,
}

/// Seed sample content through the service, so every seeded row is audited.
///
/// A sample whose section already has a draft or a published row is
/// skipped. Existing content is never overwritten.
pub async fn seed_samples(
    service: &ContentService,
    samples: &[SampleSection],
    actor: &Actor,
) -> Result<SeedReport, MutationError> {
    let mut report = SeedReport::default();
    for sample in samples {
        let label = sample.label();
        let draft = service
            .load_section(&sample.module, &sample.section, SectionStatus::Draft)
            .await?;
        let published = service
            .load_section(&sample.module, &sample.section, SectionStatus::Published)
            .await?;
        if draft.is_some() || published.is_some() {
            tracing::debug!(section = %label, "sample skipped; content exists");
            report.skipped.push(label);
            continue;
        }

        service
            .save_draft(&sample.module, &sample.section, &sample.blocks, actor)
            .await?;
        if sample.publish {
            service.publish(&sample.module, &sample.section, actor).await?;
            report.published.push(label.clone());
        }
        tracing::info!(section = %label, publish = sample.publish, "sample seeded");
        report.seeded.push(label);
    }
    Ok(report)
}
