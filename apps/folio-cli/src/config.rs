use anyhow::{Context, Result};
use folio_author::{DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT};
use folio_common::{ModuleSlug, RegistryConfig, SectionKey};
use folio_tools::SampleSection;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};

/// CLI configuration, read from YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub registry: RegistryConfig,
    /// Store directory used when `--store` is not given.
    pub store_dir: Option<PathBuf>,
    pub audit_limit_default: usize,
    pub samples: Vec<SampleSection>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        let ident = |raw: &str| ModuleSlug::parse(raw).ok();
        let key = |raw: &str| SectionKey::parse(raw).ok();
        Self {
            registry: RegistryConfig {
                modules: ["acme"].into_iter().filter_map(ident).collect(),
                section_keys: ["end-vision", "overview", "metrics"]
                    .into_iter()
                    .filter_map(key)
                    .collect(),
            },
            store_dir: None,
            audit_limit_default: DEFAULT_AUDIT_LIMIT,
            samples: vec![SampleSection {
                module: "acme".into(),
                section: "overview".into(),
                blocks: json!([
                    {"type": "prose", "title": "Overview", "content": "Sample content."},
                    {"type": "bullets", "items": ["Draft", "Publish", "Restore"]}
                ]),
                publish: true,
            }],
        }
    }
}

impl FolioConfig {
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "folio.yaml";

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `folio.yaml` in the working
    /// directory is used if present, otherwise the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        let path = Path::new(Self::DEFAULT_CONFIG_FILENAME);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config at {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: FolioConfig = serde_yaml::from_str(contents).context("failed to parse config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..=MAX_AUDIT_LIMIT).contains(&self.audit_limit_default),
            "audit_limit_default must be within 1..={MAX_AUDIT_LIMIT}"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_acme() {
        let cfg = FolioConfig::default();
        assert_eq!(cfg.registry.modules[0].as_str(), "acme");
        assert_eq!(cfg.registry.section_keys.len(), 3);
        assert_eq!(cfg.audit_limit_default, DEFAULT_AUDIT_LIMIT);
        assert_eq!(cfg.samples.len(), 1);
    }

    #[test]
    fn parse_partial_yaml() {
        let cfg = FolioConfig::parse(
            "registry:\n  modules: [globex]\n  section_keys: [pricing]\nstore_dir: /tmp/folio\n",
        )
        .unwrap();
        assert_eq!(cfg.registry.modules[0].as_str(), "globex");
        assert_eq!(cfg.store_dir, Some(PathBuf::from("/tmp/folio")));
        assert_eq!(cfg.audit_limit_default, DEFAULT_AUDIT_LIMIT);
    }

    #[test]
    fn parse_rejects_bad_identifiers_and_limits() {
        assert!(FolioConfig::parse("registry:\n  modules: [Not Valid]\n").is_err());
        assert!(FolioConfig::parse("audit_limit_default: 0\n").is_err());
        assert!(FolioConfig::parse("audit_limit_default: 51\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.yaml");
        std::fs::write(
            &path,
            "samples:\n  - module: acme\n    section: metrics\n    blocks: []\n",
        )
        .unwrap();
        let cfg = FolioConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.samples.len(), 1);
        assert!(!cfg.samples[0].publish);

        assert!(FolioConfig::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
