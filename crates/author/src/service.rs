use chrono::{DateTime, Utc};
use folio_blocks::{ContentBlock, parse_stored, parse_tolerant_slice, to_stored, validate_strict};
use folio_common::{
    Actor, AuditAction, AuditId, CacheInvalidator, Clock, ModuleRegistry, ModuleSlug, NoopCache,
    SectionKey, SectionRef, SectionStatus, SystemClock, invalidation_paths,
};
use folio_persist::{AuditEvent, AuditStore, ContentStore, NewAuditEvent, SectionRow, SectionWrite};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{MutationError, NotFound, ValidationError};
use crate::saga::Compensation;

/// Default page size for audit listings.
pub const DEFAULT_AUDIT_LIMIT: usize = 20;
/// Largest page size for audit listings.
pub const MAX_AUDIT_LIMIT: usize = 50;

/// Result of a write that lands on the draft row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOutcome {
    pub blocks: Vec<ContentBlock>,
    pub updated_at: DateTime<Utc>,
    pub audit_event: AuditEvent,
}

/// Result of a publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub updated_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub audit_event: AuditEvent,
}

/// Read-only view of one section row, parsed tolerantly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    #[serde(flatten)]
    pub key: SectionRef,
    pub blocks: Vec<ContentBlock>,
    /// Stored elements that no longer validate and were left out of `blocks`.
    pub dropped: usize,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Clamp a requested audit page size into `[1, MAX_AUDIT_LIMIT]`.
pub fn clamp_audit_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT)
}

/// The mutation service: draft saves, publishes and restores, each applied
/// together with exactly one audit event or not at all.
///
/// Each call runs one sequence: validate identifiers, obtain the payload,
/// snapshot the target row, commit, audit. When the audit insert fails the
/// snapshot is written back (or the fresh row deleted) before the error is
/// returned.
///
/// There is no locking across calls. Two writers to the same key race at the
/// store and the later audit wins; each call's own compensation still only
/// ever restores the snapshot it took.
pub struct ContentService {
    content: Arc<dyn ContentStore>,
    audit: Arc<dyn AuditStore>,
    registry: Arc<dyn ModuleRegistry>,
    cache: Arc<dyn CacheInvalidator>,
    clock: Arc<dyn Clock>,
}

/// A committed and audited write.
struct Committed {
    row: SectionRow,
    event: AuditEvent,
}

impl ContentService {
    pub fn new(
        content: Arc<dyn ContentStore>,
        audit: Arc<dyn AuditStore>,
        registry: Arc<dyn ModuleRegistry>,
    ) -> Self {
        Self {
            content,
            audit,
            registry,
            cache: Arc::new(NoopCache),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn content_store(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    pub fn audit_store(&self) -> &Arc<dyn AuditStore> {
        &self.audit
    }

    /// Save caller-supplied blocks as the draft. The blocks are validated
    /// strictly: one bad element rejects the whole call.
    pub async fn save_draft(
        &self,
        module: &str,
        section: &str,
        raw_blocks: &Value,
        actor: &Actor,
    ) -> Result<DraftOutcome, MutationError> {
        let (module, section) = self.resolve(module, section)?;
        let blocks = validate_strict(raw_blocks).map_err(ValidationError::from)?;

        let write = SectionWrite::draft(module, section, to_stored(&blocks));
        let committed = self.apply(write, AuditAction::SaveDraft, actor).await?;
        Ok(DraftOutcome {
            blocks,
            updated_at: committed.row.updated_at,
            audit_event: committed.event,
        })
    }

    /// Copy the current draft over the published row.
    pub async fn publish(
        &self,
        module: &str,
        section: &str,
        actor: &Actor,
    ) -> Result<PublishOutcome, MutationError> {
        let (module, section) = self.resolve(module, section)?;
        let draft_key = SectionRef::new(module.clone(), section.clone(), SectionStatus::Draft);
        let draft = self
            .read_row(&draft_key)
            .await?
            .ok_or(NotFound::Draft(draft_key))?;
        let blocks = stored_payload(&draft)?;

        let published_at = self.clock.now();
        let write = SectionWrite::published(module, section, to_stored(&blocks), published_at);
        let committed = self.apply(write, AuditAction::Publish, actor).await?;
        Ok(PublishOutcome {
            updated_at: committed.row.updated_at,
            published_at,
            audit_event: committed.event,
        })
    }

    /// Replace the draft with the current published content.
    pub async fn copy_published_to_draft(
        &self,
        module: &str,
        section: &str,
        actor: &Actor,
    ) -> Result<DraftOutcome, MutationError> {
        let (module, section) = self.resolve(module, section)?;
        let published_key =
            SectionRef::new(module.clone(), section.clone(), SectionStatus::Published);
        let published = self
            .read_row(&published_key)
            .await?
            .ok_or(NotFound::Published(published_key))?;
        let blocks = stored_payload(&published)?;

        self.write_draft(module, section, blocks, actor).await
    }

    /// Replace the draft with the blocks recorded in a past audit event.
    ///
    /// The event's module and section are re-checked against the registry.
    /// Whether the blocks still suit the section's current expectations is
    /// not checked beyond block validation.
    pub async fn restore_from_audit(
        &self,
        audit_id: &str,
        actor: &Actor,
    ) -> Result<DraftOutcome, MutationError> {
        let id = AuditId::parse(audit_id).ok_or_else(|| NotFound::AuditEvent(audit_id.to_string()))?;
        let event = self
            .audit
            .get_event(id)
            .await
            .map_err(MutationError::AuditRead)?
            .ok_or_else(|| NotFound::AuditEvent(audit_id.to_string()))?;
        let (module, section) = self.resolve(event.module_slug.as_str(), event.section_key.as_str())?;
        let blocks = parse_stored(&event.blocks).map_err(|source| ValidationError::Corrupted {
            key: format!("audit event {id}"),
            source,
        })?;

        self.write_draft(module, section, blocks, actor).await
    }

    /// Audit events for one section, most recent first.
    ///
    /// `limit` defaults to [`DEFAULT_AUDIT_LIMIT`] and is clamped to
    /// `[1, MAX_AUDIT_LIMIT]`.
    pub async fn list_audit_events(
        &self,
        module: &str,
        section: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEvent>, MutationError> {
        let (module, section) = self.resolve(module, section)?;
        self.audit
            .list_events(&module, &section, clamp_audit_limit(limit))
            .await
            .map_err(MutationError::AuditRead)
    }

    /// Read one section row for rendering. Blocks that no longer validate
    /// are dropped and counted.
    pub async fn load_section(
        &self,
        module: &str,
        section: &str,
        status: SectionStatus,
    ) -> Result<Option<SectionView>, MutationError> {
        let (module, section) = self.resolve(module, section)?;
        let key = SectionRef::new(module, section, status);
        Ok(self.read_row(&key).await?.map(|row| {
            let blocks = parse_tolerant_slice(&row.blocks);
            SectionView {
                dropped: row.blocks.len() - blocks.len(),
                key: row.key,
                blocks,
                published_at: row.published_at,
                updated_at: row.updated_at,
            }
        }))
    }

    /// Syntax-check both identifiers, then ask the registry.
    fn resolve(
        &self,
        module: &str,
        section: &str,
    ) -> Result<(ModuleSlug, SectionKey), ValidationError> {
        let module = ModuleSlug::parse(module).map_err(ValidationError::ModuleSyntax)?;
        let section = SectionKey::parse(section).map_err(ValidationError::SectionSyntax)?;
        if !self.registry.is_known_module(module.as_str()) {
            return Err(ValidationError::UnknownModule(module.to_string()));
        }
        if !self.registry.is_known_section_key(section.as_str()) {
            return Err(ValidationError::UnknownSection(section.to_string()));
        }
        Ok((module, section))
    }

    async fn read_row(&self, key: &SectionRef) -> Result<Option<SectionRow>, MutationError> {
        self.content
            .get_section(key)
            .await
            .map_err(MutationError::ContentRead)
    }

    async fn write_draft(
        &self,
        module: ModuleSlug,
        section: SectionKey,
        blocks: Vec<ContentBlock>,
        actor: &Actor,
    ) -> Result<DraftOutcome, MutationError> {
        let write = SectionWrite::draft(module, section, to_stored(&blocks));
        let committed = self.apply(write, AuditAction::Restore, actor).await?;
        Ok(DraftOutcome {
            blocks,
            updated_at: committed.row.updated_at,
            audit_event: committed.event,
        })
    }

    /// Snapshot, commit, audit; compensate if the audit insert fails.
    async fn apply(
        &self,
        write: SectionWrite,
        action: AuditAction,
        actor: &Actor,
    ) -> Result<Committed, MutationError> {
        let key = write.key.clone();

        let snapshot = self.read_row(&key).await?;
        let compensation = Compensation::for_snapshot(&key, snapshot.as_ref());

        let row = self
            .content
            .upsert_section(write)
            .await
            .map_err(MutationError::ContentWrite)?;

        let pending = NewAuditEvent {
            key: key.clone(),
            action,
            blocks: row.blocks.clone(),
            actor: actor.clone(),
        };
        let event = match self.audit.insert_event(pending).await {
            Ok(event) => event,
            Err(source) => {
                let compensation = compensation.run(self.content.as_ref()).await;
                return Err(MutationError::AuditWrite {
                    source,
                    compensation,
                });
            }
        };

        tracing::info!(
            module = %key.module_slug,
            section = %key.section_key,
            status = %key.status,
            %action,
            audit_id = %event.id,
            actor = %actor.id,
            "section mutation committed"
        );
        self.invalidate(&key).await;
        Ok(Committed { row, event })
    }

    async fn invalidate(&self, key: &SectionRef) {
        let paths = invalidation_paths(&key.module_slug, &key.section_key);
        if let Err(err) = self.cache.invalidate(&paths).await {
            tracing::warn!(section = %key, error = %err, "cache invalidation failed; ignoring");
        }
    }
}

/// Tolerant parse of a stored row that must come through whole.
fn stored_payload(row: &SectionRow) -> Result<Vec<ContentBlock>, ValidationError> {
    parse_stored(&row.blocks).map_err(|source| ValidationError::Corrupted {
        key: row.key.to_string(),
        source,
    })
}
