use chrono::{DateTime, Duration, Utc};
use folio_common::{
    Actor, AuditAction, AuditId, ModuleSlug, SectionKey, SectionRef, SectionStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored section row, keyed by `(module, section, status)`.
///
/// Blocks are kept in their raw JSON form; typed access goes through the
/// block validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRow {
    #[serde(flatten)]
    pub key: SectionRef,
    pub blocks: Vec<Value>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SectionRow {
    /// The content state of this row, without the store-assigned timestamp.
    pub fn content(&self) -> SectionWrite {
        SectionWrite {
            key: self.key.clone(),
            blocks: self.blocks.clone(),
            published_at: self.published_at,
        }
    }
}

/// Content to upsert into a section row. The store assigns `updatedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionWrite {
    #[serde(flatten)]
    pub key: SectionRef,
    pub blocks: Vec<Value>,
    pub published_at: Option<DateTime<Utc>>,
}

impl SectionWrite {
    /// A draft write. Drafts never carry a publish time.
    pub fn draft(module_slug: ModuleSlug, section_key: SectionKey, blocks: Vec<Value>) -> Self {
        Self {
            key: SectionRef::new(module_slug, section_key, SectionStatus::Draft),
            blocks,
            published_at: None,
        }
    }

    pub fn published(
        module_slug: ModuleSlug,
        section_key: SectionKey,
        blocks: Vec<Value>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: SectionRef::new(module_slug, section_key, SectionStatus::Published),
            blocks,
            published_at: Some(published_at),
        }
    }

    /// Whether `publishedAt` agrees with the row's status.
    pub fn is_consistent(&self) -> bool {
        match self.key.status {
            SectionStatus::Draft => self.published_at.is_none(),
            SectionStatus::Published => self.published_at.is_some(),
        }
    }
}

/// One immutable audit record with a full blocks snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: AuditId,
    pub module_slug: ModuleSlug,
    pub section_key: SectionKey,
    pub status: SectionStatus,
    pub action: AuditAction,
    pub blocks: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub actor_id: String,
    #[serde(default)]
    pub actor_email: Option<String>,
}

impl AuditEvent {
    /// The section row this event describes.
    pub fn section_ref(&self) -> SectionRef {
        SectionRef::new(
            self.module_slug.clone(),
            self.section_key.clone(),
            self.status,
        )
    }
}

/// An audit event to insert. The store assigns `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub key: SectionRef,
    pub action: AuditAction,
    pub blocks: Vec<Value>,
    pub actor: Actor,
}

impl NewAuditEvent {
    pub(crate) fn into_event(self, id: AuditId, created_at: DateTime<Utc>) -> AuditEvent {
        AuditEvent {
            id,
            module_slug: self.key.module_slug,
            section_key: self.key.section_key,
            status: self.key.status,
            action: self.action,
            blocks: self.blocks,
            created_at,
            actor_id: self.actor.id,
            actor_email: self.actor.email,
        }
    }
}

/// Next store-assigned timestamp for a key, strictly after `previous`.
pub fn advance_timestamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids() -> (ModuleSlug, SectionKey) {
        (
            ModuleSlug::parse("acme").unwrap(),
            SectionKey::parse("end-vision").unwrap(),
        )
    }

    #[test]
    fn draft_and_published_writes_are_consistent() {
        let (m, s) = ids();
        assert!(SectionWrite::draft(m.clone(), s.clone(), vec![]).is_consistent());
        assert!(SectionWrite::published(m.clone(), s.clone(), vec![], Utc::now()).is_consistent());

        let mut bad = SectionWrite::draft(m, s, vec![]);
        bad.published_at = Some(Utc::now());
        assert!(!bad.is_consistent());
    }

    #[test]
    fn row_serializes_flat_camel_case() {
        let (m, s) = ids();
        let row = SectionRow {
            key: SectionRef::new(m, s, SectionStatus::Draft),
            blocks: vec![json!({"type": "prose", "content": "Hello"})],
            published_at: None,
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["moduleSlug"], "acme");
        assert_eq!(value["sectionKey"], "end-vision");
        assert_eq!(value["status"], "draft");
        assert!(value["publishedAt"].is_null());
        assert!(value.get("updatedAt").is_some());

        let back: SectionRow = serde_json::from_value(value).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn advance_timestamp_is_strictly_monotonic() {
        let now = Utc::now();
        assert_eq!(advance_timestamp(None, now), now);
        let later = now + Duration::seconds(1);
        assert_eq!(advance_timestamp(Some(now), later), later);
        assert!(advance_timestamp(Some(later), now) > later);
        assert!(advance_timestamp(Some(now), now) > now);
    }

    #[test]
    fn new_event_keeps_actor() {
        let (m, s) = ids();
        let event = NewAuditEvent {
            key: SectionRef::new(m, s, SectionStatus::Published),
            action: AuditAction::Publish,
            blocks: vec![],
            actor: Actor::new("u-1").with_email("ed@example.com"),
        }
        .into_event(AuditId::new(), Utc::now());
        assert_eq!(event.actor_id, "u-1");
        assert_eq!(event.actor_email.as_deref(), Some("ed@example.com"));
        assert_eq!(event.section_ref().status, SectionStatus::Published);
    }
}
