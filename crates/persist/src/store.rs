//! File-backed section and audit store.
//!
//! Layout inside the store directory:
//! ```text
//! folio.meta.json                      - schema version and audit sequence
//! sections/<module>/<section>.<status>.json
//! audit/
//!   000001.event.json                  - one file per audit event
//! integrity/
//!   manifest.json                      - sha256 hash chain over audit files
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! single call is atomic on its own. Module slugs and section keys are
//! syntax-checked identifiers, which keeps them safe as path components.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_common::{AuditId, ModuleSlug, SectionKey, SectionRef, SectionStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::ports::{AuditStore, ContentStore, StoreError};
use crate::record::{AuditEvent, NewAuditEvent, SectionRow, SectionWrite, advance_timestamp};

/// Current on-disk schema version.
const STORE_SCHEMA_VERSION: u32 = 1;

const META_FILE: &str = "folio.meta.json";

/// Metadata stored in folio.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
    pub audit_count: u32,
}

/// A single entry in the integrity manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Integrity manifest tracking all audit file hashes in a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

/// In-memory index entry for one audit file.
#[derive(Debug, Clone)]
struct AuditIndexEntry {
    seq: u32,
    id: AuditId,
    module_slug: ModuleSlug,
    section_key: SectionKey,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct State {
    meta: StoreMeta,
    manifest: IntegrityManifest,
    index: Vec<AuditIndexEntry>,
}

/// File-backed store implementing both `ContentStore` and `AuditStore`.
///
/// The two ports still fail independently: a section write and an audit
/// write are separate files and separate calls.
pub struct FileStore {
    root: PathBuf,
    state: Mutex<State>,
}

impl FileStore {
    /// Open or create a store at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(root.join("sections")).await?;
        tokio::fs::create_dir_all(root.join("audit")).await?;
        tokio::fs::create_dir_all(root.join("integrity")).await?;

        let meta_path = root.join(META_FILE);
        let manifest_path = manifest_path(&root);

        let (meta, manifest) = if tokio::fs::try_exists(&meta_path).await? {
            let meta: StoreMeta = read_json(&meta_path).await?;
            if meta.schema_version != STORE_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: STORE_SCHEMA_VERSION,
                });
            }
            let manifest: IntegrityManifest = if tokio::fs::try_exists(&manifest_path).await? {
                read_json(&manifest_path).await?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = StoreMeta {
                schema_version: STORE_SCHEMA_VERSION,
                audit_count: 0,
            };
            let manifest = IntegrityManifest::default();
            write_json(&meta_path, &meta).await?;
            write_json(&manifest_path, &manifest).await?;
            (meta, manifest)
        };

        let mut index = Vec::with_capacity(meta.audit_count as usize);
        for seq in 1..=meta.audit_count {
            let event: AuditEvent = read_json(&audit_path(&root, seq)).await?;
            index.push(AuditIndexEntry {
                seq,
                id: event.id,
                module_slug: event.module_slug,
                section_key: event.section_key,
                created_at: event.created_at,
            });
        }
        tracing::debug!(root = %root.display(), events = index.len(), "opened file store");

        Ok(Self {
            root,
            state: Mutex::new(State {
                meta,
                manifest,
                index,
            }),
        })
    }

    /// Get the path to the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get a copy of the metadata.
    pub async fn meta(&self) -> StoreMeta {
        self.state.lock().await.meta.clone()
    }

    /// Verify every audit file against the manifest hash chain.
    pub async fn verify_integrity(&self) -> Result<(), StoreError> {
        let state = self.state.lock().await;
        let mut prev_hash: Option<String> = None;
        for entry in &state.manifest.entries {
            if entry.prev_hash != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }

            let data = tokio::fs::read(self.root.join("audit").join(&entry.filename)).await?;
            let actual_hash = sha256_hex(&data);
            if actual_hash != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    expected: entry.sha256.clone(),
                    actual: actual_hash,
                });
            }

            prev_hash = Some(entry.sha256.clone());
        }
        Ok(())
    }

    fn section_path(&self, key: &SectionRef) -> PathBuf {
        self.root
            .join("sections")
            .join(key.module_slug.as_str())
            .join(format!("{}.{}.json", key.section_key, key.status))
    }

    async fn persist_event(
        &self,
        event_path: &Path,
        bytes: &[u8],
        meta: &StoreMeta,
        manifest: &IntegrityManifest,
    ) -> Result<(), StoreError> {
        write_atomic(event_path, bytes).await?;
        write_json(&self.root.join(META_FILE), meta).await?;
        write_json(&manifest_path(&self.root), manifest).await
    }

    /// Undo a partially persisted insert. The manifest is written last, so
    /// it never needs rolling back.
    async fn discard_event(&self, event_path: &Path, committed: &StoreMeta) {
        match tokio::fs::remove_file(event_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %event_path.display(),
                error = %e,
                "failed to remove orphaned audit file"
            ),
        }
        if let Err(e) = write_json(&self.root.join(META_FILE), committed).await {
            tracing::warn!(error = %e, "failed to restore store meta after aborted insert");
        }
    }

    async fn load_event(&self, seq: u32) -> Result<AuditEvent, StoreError> {
        let filename = audit_filename(seq);
        let data = tokio::fs::read(self.root.join("audit").join(&filename)).await?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[async_trait]
impl ContentStore for FileStore {
    async fn get_section(&self, key: &SectionRef) -> Result<Option<SectionRow>, StoreError> {
        let path = self.section_path(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_section(&self, write: SectionWrite) -> Result<SectionRow, StoreError> {
        if !write.is_consistent() {
            return Err(StoreError::InconsistentWrite(write.key));
        }
        // Serialize writers so updatedAt stays monotonic per key.
        let _state = self.state.lock().await;
        let previous = self.get_section(&write.key).await?.map(|r| r.updated_at);
        let path = self.section_path(&write.key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let row = SectionRow {
            updated_at: advance_timestamp(previous, Utc::now()),
            key: write.key,
            blocks: write.blocks,
            published_at: write.published_at,
        };
        write_json(&path, &row).await?;
        Ok(row)
    }

    async fn delete_section(&self, key: &SectionRef) -> Result<(), StoreError> {
        let _state = self.state.lock().await;
        match tokio::fs::remove_file(self.section_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_sections(&self) -> Result<Vec<SectionRef>, StoreError> {
        let mut keys = Vec::new();
        let mut modules = tokio::fs::read_dir(self.root.join("sections")).await?;
        while let Some(module_dir) = modules.next_entry().await? {
            let Some(module) = module_dir
                .file_name()
                .to_str()
                .and_then(|m| ModuleSlug::parse(m).ok())
            else {
                continue;
            };
            let mut files = tokio::fs::read_dir(module_dir.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let name = file.file_name();
                if let Some(key) = name.to_str().and_then(|n| parse_section_file(&module, n)) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl AuditStore for FileStore {
    async fn insert_event(&self, event: NewAuditEvent) -> Result<AuditEvent, StoreError> {
        let mut state = self.state.lock().await;
        let previous = state.index.last().map(|e| e.created_at);
        let event = event.into_event(AuditId::new(), advance_timestamp(previous, Utc::now()));

        let seq = state.meta.audit_count + 1;
        let filename = audit_filename(seq);
        let bytes = serde_json::to_vec_pretty(&event)?;

        let mut meta = state.meta.clone();
        meta.audit_count = seq;
        let mut manifest = state.manifest.clone();
        manifest.entries.push(ManifestEntry {
            filename,
            sha256: sha256_hex(&bytes),
            prev_hash: state.manifest.entries.last().map(|e| e.sha256.clone()),
        });

        // In-memory state only moves once all three files are on disk.
        let event_path = audit_path(&self.root, seq);
        if let Err(err) = self.persist_event(&event_path, &bytes, &meta, &manifest).await {
            self.discard_event(&event_path, &state.meta).await;
            return Err(err);
        }

        state.meta = meta;
        state.manifest = manifest;
        state.index.push(AuditIndexEntry {
            seq,
            id: event.id,
            module_slug: event.module_slug.clone(),
            section_key: event.section_key.clone(),
            created_at: event.created_at,
        });
        Ok(event)
    }

    async fn get_event(&self, id: AuditId) -> Result<Option<AuditEvent>, StoreError> {
        let seq = {
            let state = self.state.lock().await;
            state.index.iter().find(|e| e.id == id).map(|e| e.seq)
        };
        match seq {
            Some(seq) => Ok(Some(self.load_event(seq).await?)),
            None => Ok(None),
        }
    }

    async fn list_events(
        &self,
        module: &ModuleSlug,
        section: &SectionKey,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        let seqs: Vec<u32> = {
            let state = self.state.lock().await;
            state
                .index
                .iter()
                .rev()
                .filter(|e| &e.module_slug == module && &e.section_key == section)
                .take(limit)
                .map(|e| e.seq)
                .collect()
        };
        let mut events = Vec::with_capacity(seqs.len());
        for seq in seqs {
            events.push(self.load_event(seq).await?);
        }
        Ok(events)
    }
}

fn parse_section_file(module: &ModuleSlug, name: &str) -> Option<SectionRef> {
    let stem = name.strip_suffix(".json")?;
    let (section, status) = stem.rsplit_once('.')?;
    let status = match status {
        "draft" => SectionStatus::Draft,
        "published" => SectionStatus::Published,
        _ => return None,
    };
    let section = SectionKey::parse(section).ok()?;
    Some(SectionRef::new(module.clone(), section, status))
}

fn manifest_path(root: &Path) -> PathBuf {
    root.join("integrity").join("manifest.json")
}

fn audit_filename(seq: u32) -> String {
    format!("{seq:06}.event.json")
}

fn audit_path(root: &Path, seq: u32) -> PathBuf {
    root.join("audit").join(audit_filename(seq))
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StoreError> {
    let data = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&data)?)
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).await
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
