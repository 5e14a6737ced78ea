use async_trait::async_trait;
use chrono::Utc;
use folio_common::{AuditId, ModuleSlug, SectionKey, SectionRef};
use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::ports::{AuditStore, ContentStore, StoreError};
use crate::record::{AuditEvent, NewAuditEvent, SectionRow, SectionWrite, advance_timestamp};

/// In-memory section store.
///
/// Each call takes the lock once, so every single call is atomic.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    rows: Mutex<BTreeMap<SectionRef, SectionRow>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get_section(&self, key: &SectionRef) -> Result<Option<SectionRow>, StoreError> {
        Ok(self.rows.lock().get(key).cloned())
    }

    async fn upsert_section(&self, write: SectionWrite) -> Result<SectionRow, StoreError> {
        if !write.is_consistent() {
            return Err(StoreError::InconsistentWrite(write.key));
        }
        let mut rows = self.rows.lock();
        let previous = rows.get(&write.key).map(|r| r.updated_at);
        let row = SectionRow {
            updated_at: advance_timestamp(previous, Utc::now()),
            key: write.key,
            blocks: write.blocks,
            published_at: write.published_at,
        };
        rows.insert(row.key.clone(), row.clone());
        Ok(row)
    }

    async fn delete_section(&self, key: &SectionRef) -> Result<(), StoreError> {
        self.rows.lock().remove(key);
        Ok(())
    }

    async fn list_sections(&self) -> Result<Vec<SectionRef>, StoreError> {
        Ok(self.rows.lock().keys().cloned().collect())
    }
}

/// In-memory audit log, kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all sections.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn insert_event(&self, event: NewAuditEvent) -> Result<AuditEvent, StoreError> {
        let mut events = self.events.lock();
        let previous = events.last().map(|e| e.created_at);
        let event = event.into_event(AuditId::new(), advance_timestamp(previous, Utc::now()));
        events.push(event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: AuditId) -> Result<Option<AuditEvent>, StoreError> {
        Ok(self.events.lock().iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(
        &self,
        module: &ModuleSlug,
        section: &SectionKey,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .iter()
            .rev()
            .filter(|e| &e.module_slug == module && &e.section_key == section)
            .take(limit)
            .cloned()
            .collect())
    }
}
