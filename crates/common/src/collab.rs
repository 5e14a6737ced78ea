//! Collaborators consumed by the mutation service.
//!
//! The registry, identity and cache concerns live outside this workspace.
//! Only the seams are defined here, plus small implementations used by the
//! CLI and by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{Actor, ModuleSlug, SectionKey};

/// Validates module slugs and section keys against the known page layout.
pub trait ModuleRegistry: Send + Sync {
    fn is_known_module(&self, slug: &str) -> bool;
    fn is_known_section_key(&self, key: &str) -> bool;
}

/// Registry contents as they appear in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistryConfig {
    #[serde(default)]
    pub modules: Vec<ModuleSlug>,
    #[serde(default)]
    pub section_keys: Vec<SectionKey>,
}

/// Registry backed by a fixed set of names.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    modules: BTreeSet<String>,
    section_keys: BTreeSet<String>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            modules: config.modules.iter().map(|m| m.to_string()).collect(),
            section_keys: config.section_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn with_module(mut self, slug: &ModuleSlug) -> Self {
        self.modules.insert(slug.to_string());
        self
    }

    pub fn with_section_key(mut self, key: &SectionKey) -> Self {
        self.section_keys.insert(key.to_string());
        self
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    pub fn section_keys(&self) -> impl Iterator<Item = &str> {
        self.section_keys.iter().map(String::as_str)
    }
}

impl ModuleRegistry for StaticRegistry {
    fn is_known_module(&self, slug: &str) -> bool {
        self.modules.contains(slug)
    }

    fn is_known_section_key(&self, key: &str) -> bool {
        self.section_keys.contains(key)
    }
}

/// Supplies the actor for the current request.
pub trait IdentityProvider: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;
}

/// Identity provider returning one configured actor.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    actor: Option<Actor>,
}

impl StaticIdentity {
    pub fn new(actor: Actor) -> Self {
        Self { actor: Some(actor) }
    }

    /// No signed-in actor.
    pub fn anonymous() -> Self {
        Self { actor: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_actor(&self) -> Option<Actor> {
        self.actor.clone()
    }
}

/// Errors reported by a cache-invalidation hook.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cache invalidation failed: {0}")]
pub struct CacheError(pub String);

/// Best-effort cache invalidation after a successful mutation.
///
/// Callers ignore failures; the hook is not part of the correctness contract.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, paths: &[String]) -> Result<(), CacheError>;
}

/// Paths invalidated for a changed section.
pub fn invalidation_paths(module: &ModuleSlug, section: &SectionKey) -> Vec<String> {
    vec![format!("/{module}"), format!("/{module}/{section}")]
}

/// Cache hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheInvalidator for NoopCache {
    async fn invalidate(&self, _paths: &[String]) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Cache hook that records every invalidated path.
#[derive(Debug, Default)]
pub struct RecordingCache {
    paths: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths recorded so far, in call order.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingCache {
    async fn invalidate(&self, paths: &[String]) -> Result<(), CacheError> {
        self.paths.lock().extend_from_slice(paths);
        Ok(())
    }
}

/// Source of wall-clock time (for testability).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock over the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
