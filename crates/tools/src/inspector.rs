use chrono::{DateTime, Utc};
use folio_blocks::{ContentBlock, parse_tolerant_slice};
use folio_common::{AuditAction, ModuleSlug, SectionKey, SectionRef, SectionStatus};
use folio_persist::{AuditStore, ContentStore, SectionRow, StoreError};
use serde::Serialize;

/// Section inspector for diagnostics.
///
/// Read-only queries over both stores; nothing here writes.
pub struct SectionInspector;

impl SectionInspector {
    /// Summarize both rows of one section and its latest audit action.
    pub async fn summary(
        content: &dyn ContentStore,
        audit: &dyn AuditStore,
        module: &ModuleSlug,
        section: &SectionKey,
    ) -> Result<SectionSummary, StoreError> {
        let key = SectionRef::new(module.clone(), section.clone(), SectionStatus::Draft);
        let draft = content.get_section(&key).await?;
        let published = content
            .get_section(&key.with_status(SectionStatus::Published))
            .await?;
        let latest = audit.list_events(module, section, 1).await?;

        Ok(SectionSummary {
            module: module.clone(),
            section: section.clone(),
            draft: draft.as_ref().map(RowSummary::of),
            published: published.as_ref().map(RowSummary::of),
            latest_action: latest.first().map(|e| e.action),
        })
    }

    /// Every section key that has at least one row.
    pub async fn list_sections(content: &dyn ContentStore) -> Result<Vec<SectionRef>, StoreError> {
        content.list_sections().await
    }
}

/// Summary of one section for the inspector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub module: ModuleSlug,
    pub section: SectionKey,
    pub draft: Option<RowSummary>,
    pub published: Option<RowSummary>,
    pub latest_action: Option<AuditAction>,
}

impl std::fmt::Display for SectionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Section: {}/{}", self.module, self.section)?;
        for (label, row) in [("draft", &self.draft), ("published", &self.published)] {
            match row {
                Some(row) => write!(f, " {label}={}/{}", row.valid_blocks, row.blocks)?,
                None => write!(f, " {label}=none")?,
            }
        }
        match self.latest_action {
            Some(action) => write!(f, " last={action}"),
            None => write!(f, " last=none"),
        }
    }
}

/// Shape of one stored row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSummary {
    /// Raw stored elements.
    pub blocks: usize,
    /// Elements that still validate.
    pub valid_blocks: usize,
    /// PDF blocks with neither a path nor a url yet.
    pub unconfigured_pdfs: usize,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl RowSummary {
    fn of(row: &SectionRow) -> Self {
        let valid = parse_tolerant_slice(&row.blocks);
        Self {
            blocks: row.blocks.len(),
            valid_blocks: valid.len(),
            unconfigured_pdfs: valid
                .iter()
                .filter(|b| matches!(b, ContentBlock::Pdf(pdf) if !pdf.is_configured()))
                .count(),
            published_at: row.published_at,
            updated_at: row.updated_at,
        }
    }

    /// Some stored elements no longer validate.
    pub fn is_degraded(&self) -> bool {
        self.valid_blocks < self.blocks
    }
}
