use folio_common::SectionRef;
use folio_persist::{ContentStore, SectionRow, SectionWrite};

use crate::error::CompensationOutcome;

/// The undo step for one commit, derived from the pre-commit snapshot.
///
/// Each variant carries enough context to return the row to its prior state.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// The row existed. Undo = write its previous content back.
    Restore(SectionWrite),
    /// The row did not exist. Undo = delete it.
    Remove(SectionRef),
}

impl Compensation {
    /// Build the undo step for a write to `key`, given what was there before.
    pub fn for_snapshot(key: &SectionRef, snapshot: Option<&SectionRow>) -> Self {
        match snapshot {
            Some(row) => Self::Restore(row.content()),
            None => Self::Remove(key.clone()),
        }
    }

    pub fn key(&self) -> &SectionRef {
        match self {
            Self::Restore(write) => &write.key,
            Self::Remove(key) => key,
        }
    }

    /// Apply the undo step. Never fails; a failed undo is reported in the outcome.
    pub async fn run(self, store: &dyn ContentStore) -> CompensationOutcome {
        let key = self.key().clone();
        let result = match self {
            Self::Restore(write) => store
                .upsert_section(write)
                .await
                .map(|_| CompensationOutcome::Restored),
            Self::Remove(key) => store
                .delete_section(&key)
                .await
                .map(|()| CompensationOutcome::Removed),
        };
        match result {
            Ok(outcome) => {
                tracing::warn!(section = %key, %outcome, "compensated un-audited write");
                outcome
            }
            Err(err) => {
                tracing::error!(
                    section = %key,
                    error = %err,
                    "compensation failed; row holds content with no audit record"
                );
                CompensationOutcome::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::{ModuleSlug, SectionKey, SectionStatus};
    use folio_persist::InMemoryContentStore;
    use serde_json::json;

    fn key() -> SectionRef {
        SectionRef::new(
            ModuleSlug::parse("acme").unwrap(),
            SectionKey::parse("end-vision").unwrap(),
            SectionStatus::Draft,
        )
    }

    #[tokio::test]
    async fn remove_undoes_fresh_insert() {
        let store = InMemoryContentStore::new();
        let key = key();
        let undo = Compensation::for_snapshot(&key, None);
        assert_eq!(undo, Compensation::Remove(key.clone()));

        let write = SectionWrite::draft(key.module_slug.clone(), key.section_key.clone(), vec![]);
        store.upsert_section(write).await.unwrap();
        assert_eq!(undo.run(&store).await, CompensationOutcome::Removed);
        assert!(store.get_section(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_undoes_overwrite() {
        let store = InMemoryContentStore::new();
        let key = key();
        let before = store
            .upsert_section(SectionWrite::draft(
                key.module_slug.clone(),
                key.section_key.clone(),
                vec![json!({"type": "prose", "content": "old"})],
            ))
            .await
            .unwrap();
        let undo = Compensation::for_snapshot(&key, Some(&before));

        store
            .upsert_section(SectionWrite::draft(
                key.module_slug.clone(),
                key.section_key.clone(),
                vec![json!({"type": "prose", "content": "new"})],
            ))
            .await
            .unwrap();

        assert_eq!(undo.run(&store).await, CompensationOutcome::Restored);
        let after = store.get_section(&key).await.unwrap().unwrap();
        assert_eq!(after.content(), before.content());
    }
}
