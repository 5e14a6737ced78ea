use folio_common::{ModuleSlug, SectionKey, SectionRef, SectionStatus};
use folio_persist::{AuditStore, ContentStore, StoreError};
use serde::Serialize;

/// One disagreement between a section row and its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkageIssue {
    /// A row exists but no audit event was ever recorded for it.
    Unaudited { key: SectionRef },
    /// The row's blocks differ from its most recent audit event.
    BlocksDiffer { key: SectionRef, audit_id: String },
    /// Events exist for a key whose row is absent.
    MissingRow { key: SectionRef, audit_id: String },
}

/// Result of replaying the audit trail against the current rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkageReport {
    pub checked: usize,
    pub issues: Vec<LinkageIssue>,
}

impl LinkageReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check that each row of a section equals the blocks of the latest audit
/// event for the same status.
pub async fn check_audit_linkage(
    content: &dyn ContentStore,
    audit: &dyn AuditStore,
    module: &ModuleSlug,
    section: &SectionKey,
) -> Result<LinkageReport, StoreError> {
    let events = audit.list_events(module, section, usize::MAX).await?;
    let mut report = LinkageReport::default();

    for status in [SectionStatus::Draft, SectionStatus::Published] {
        let key = SectionRef::new(module.clone(), section.clone(), status);
        let row = content.get_section(&key).await?;
        let latest = events.iter().find(|e| e.status == status);

        let issue = match (row, latest) {
            (None, None) => continue,
            (Some(_), None) => Some(LinkageIssue::Unaudited { key }),
            (None, Some(event)) => Some(LinkageIssue::MissingRow {
                key,
                audit_id: event.id.to_string(),
            }),
            (Some(row), Some(event)) if row.blocks != event.blocks => {
                Some(LinkageIssue::BlocksDiffer {
                    key,
                    audit_id: event.id.to_string(),
                })
            }
            (Some(_), Some(_)) => None,
        };
        report.checked += 1;
        if let Some(issue) = issue {
            tracing::warn!(?issue, "audit linkage broken");
            report.issues.push(issue);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_author::ContentService;
    use folio_common::{Actor, StaticRegistry};
    use folio_persist::{InMemoryAuditStore, InMemoryContentStore, SectionWrite};
    use serde_json::json;
    use std::sync::Arc;

    fn ids() -> (ModuleSlug, SectionKey) {
        (
            ModuleSlug::parse("acme").unwrap(),
            SectionKey::parse("end-vision").unwrap(),
        )
    }

    fn service(content: Arc<InMemoryContentStore>, audit: Arc<InMemoryAuditStore>) -> ContentService {
        let (m, s) = ids();
        let registry = StaticRegistry::new().with_module(&m).with_section_key(&s);
        ContentService::new(content, audit, Arc::new(registry))
    }

    #[tokio::test]
    async fn service_writes_stay_linked() {
        let content = Arc::new(InMemoryContentStore::new());
        let audit = Arc::new(InMemoryAuditStore::new());
        let service = service(content.clone(), audit.clone());
        let actor = Actor::new("u-1");

        service
            .save_draft("acme", "end-vision", &json!([{"type": "prose", "content": "v1"}]), &actor)
            .await
            .unwrap();
        service.publish("acme", "end-vision", &actor).await.unwrap();
        service
            .save_draft("acme", "end-vision", &json!([]), &actor)
            .await
            .unwrap();

        let (m, s) = ids();
        let report = check_audit_linkage(content.as_ref(), audit.as_ref(), &m, &s)
            .await
            .unwrap();
        assert_eq!(report.checked, 2);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn direct_store_writes_are_flagged() {
        let content = Arc::new(InMemoryContentStore::new());
        let audit = Arc::new(InMemoryAuditStore::new());
        let service = service(content.clone(), audit.clone());
        let (m, s) = ids();

        service
            .save_draft("acme", "end-vision", &json!([]), &Actor::new("u-1"))
            .await
            .unwrap();
        content
            .upsert_section(SectionWrite::draft(
                m.clone(),
                s.clone(),
                vec![json!({"type": "prose", "content": "sneaky"})],
            ))
            .await
            .unwrap();
        content
            .upsert_section(SectionWrite::published(m.clone(), s.clone(), vec![], chrono::Utc::now()))
            .await
            .unwrap();

        let report = check_audit_linkage(content.as_ref(), audit.as_ref(), &m, &s)
            .await
            .unwrap();
        assert_eq!(report.issues.len(), 2);
        assert!(matches!(report.issues[0], LinkageIssue::BlocksDiffer { .. }));
        assert!(matches!(report.issues[1], LinkageIssue::Unaudited { .. }));
    }

    #[tokio::test]
    async fn empty_section_checks_nothing() {
        let (m, s) = ids();
        let report = check_audit_linkage(
            &InMemoryContentStore::new(),
            &InMemoryAuditStore::new(),
            &m,
            &s,
        )
        .await
        .unwrap();
        assert_eq!(report.checked, 0);
        assert!(report.is_clean());
    }
}
