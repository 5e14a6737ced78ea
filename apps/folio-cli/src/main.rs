mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_author::{ContentService, MutationError};
use folio_blocks::{parse_tolerant, validate_strict};
use folio_common::{
    Actor, IdentityProvider, ModuleSlug, RecordingCache, SectionKey, SectionStatus, StaticIdentity,
    StaticRegistry,
};
use folio_persist::FileStore;
use folio_tools::{SectionInspector, check_audit_linkage, seed_samples};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::FolioConfig;

#[derive(Parser)]
#[command(name = "folio-cli", about = "Draft, publish and restore section content")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Store directory
    #[arg(long)]
    store: Option<PathBuf>,

    /// YAML config file (default: ./folio.yaml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Actor recorded on audit events
    #[arg(long, env = "FOLIO_ACTOR_ID")]
    actor_id: Option<String>,

    #[arg(long, env = "FOLIO_ACTOR_EMAIL")]
    actor_email: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, store and registry info
    Info,
    /// Validate a JSON block array without writing anything
    Validate {
        file: PathBuf,
        /// Drop invalid elements instead of rejecting the array
        #[arg(long)]
        tolerant: bool,
    },
    /// Save a JSON block array as the draft
    SaveDraft {
        module: String,
        section: String,
        file: PathBuf,
    },
    /// Publish the current draft
    Publish { module: String, section: String },
    /// Replace the draft with the published content
    CopyPublished { module: String, section: String },
    /// Replace the draft with the blocks of a past audit event
    Restore { audit_id: String },
    /// List audit events, most recent first
    History {
        module: String,
        section: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print a section row
    Show {
        module: String,
        section: String,
        /// Show the published row instead of the draft
        #[arg(long)]
        published: bool,
    },
    /// Seed configured sample content where none exists
    Seed,
    /// Summarize a section and verify its audit linkage
    Check { module: String, section: String },
}

/// Everything a command needs, built once per invocation.
struct App {
    store: Arc<FileStore>,
    registry: Arc<StaticRegistry>,
    cache: Arc<RecordingCache>,
    service: ContentService,
    identity: StaticIdentity,
    config: FolioConfig,
}

impl App {
    async fn open(cli: &Cli) -> Result<Self> {
        let config = FolioConfig::load(cli.config.as_deref())?;
        let dir = cli
            .store
            .clone()
            .or_else(|| config.store_dir.clone())
            .unwrap_or_else(|| PathBuf::from("folio-data"));
        let store = Arc::new(
            FileStore::open(&dir)
                .await
                .with_context(|| format!("failed to open store at {}", dir.display()))?,
        );
        let registry = Arc::new(StaticRegistry::from_config(&config.registry));
        let cache = Arc::new(RecordingCache::new());
        let service = ContentService::new(store.clone(), store.clone(), registry.clone())
            .with_cache(cache.clone());
        let identity = match &cli.actor_id {
            Some(id) => {
                let mut actor = Actor::new(id.clone());
                actor.email = cli.actor_email.clone();
                StaticIdentity::new(actor)
            }
            None => StaticIdentity::anonymous(),
        };
        Ok(Self {
            store,
            registry,
            cache,
            service,
            identity,
            config,
        })
    }

    fn actor(&self) -> Result<Actor> {
        self.identity
            .current_actor()
            .context("no actor: pass --actor-id or set FOLIO_ACTOR_ID")
    }

    fn log_invalidations(&self) {
        tracing::debug!(paths = ?self.cache.paths(), "cache paths invalidated");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_blocks(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Check a block file without touching the store.
fn validate(file: &Path, tolerant: bool) -> Result<()> {
    let raw = read_blocks(file)?;
    if tolerant {
        let blocks = parse_tolerant(&raw);
        let total = raw.as_array().map_or(0, Vec::len);
        tracing::info!(kept = blocks.len(), dropped = total - blocks.len(), "tolerant parse");
        return print_json(&blocks);
    }
    let blocks = validate_strict(&raw).context("blocks rejected")?;
    print_json(&blocks)
}

fn failed(op: &str, err: MutationError) -> anyhow::Error {
    let kind = err.kind();
    anyhow::Error::new(err).context(format!("{op} failed ({kind})"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Validate { file, tolerant } = &cli.command {
        return validate(file, *tolerant);
    }

    let app = App::open(&cli).await?;

    match &cli.command {
        Commands::Info => {
            let meta = app.store.meta().await;
            println!("folio-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("store: {}", app.store.root().display());
            println!(
                "schema: v{} audit_events={}",
                meta.schema_version, meta.audit_count
            );
            println!(
                "modules: {}",
                app.registry.modules().collect::<Vec<_>>().join(", ")
            );
            println!(
                "section keys: {}",
                app.registry.section_keys().collect::<Vec<_>>().join(", ")
            );
            let sections = SectionInspector::list_sections(app.store.as_ref()).await?;
            println!("rows: {}", sections.len());
        }
        Commands::Validate { file, tolerant } => validate(file, *tolerant)?,
        Commands::SaveDraft {
            module,
            section,
            file,
        } => {
            let raw = read_blocks(file)?;
            let outcome = app
                .service
                .save_draft(module, section, &raw, &app.actor()?)
                .await
                .map_err(|e| failed("save-draft", e))?;
            app.log_invalidations();
            print_json(&outcome)?;
        }
        Commands::Publish { module, section } => {
            let outcome = app
                .service
                .publish(module, section, &app.actor()?)
                .await
                .map_err(|e| failed("publish", e))?;
            app.log_invalidations();
            print_json(&outcome)?;
        }
        Commands::CopyPublished { module, section } => {
            let outcome = app
                .service
                .copy_published_to_draft(module, section, &app.actor()?)
                .await
                .map_err(|e| failed("copy-published", e))?;
            app.log_invalidations();
            print_json(&outcome)?;
        }
        Commands::Restore { audit_id } => {
            let outcome = app
                .service
                .restore_from_audit(audit_id, &app.actor()?)
                .await
                .map_err(|e| failed("restore", e))?;
            app.log_invalidations();
            print_json(&outcome)?;
        }
        Commands::History {
            module,
            section,
            limit,
        } => {
            let limit = limit.or(Some(app.config.audit_limit_default));
            let events = app
                .service
                .list_audit_events(module, section, limit)
                .await
                .map_err(|e| failed("history", e))?;
            print_json(&events)?;
        }
        Commands::Show {
            module,
            section,
            published,
        } => {
            let status = if *published {
                SectionStatus::Published
            } else {
                SectionStatus::Draft
            };
            let view = app
                .service
                .load_section(module, section, status)
                .await
                .map_err(|e| failed("show", e))?
                .with_context(|| format!("no {status} row for {module}/{section}"))?;
            if view.dropped > 0 {
                tracing::warn!(dropped = view.dropped, "stored blocks no longer validate");
            }
            print_json(&view)?;
        }
        Commands::Seed => {
            let report = seed_samples(&app.service, &app.config.samples, &app.actor()?)
                .await
                .map_err(|e| failed("seed", e))?;
            print_json(&report)?;
        }
        Commands::Check { module, section } => {
            let module = ModuleSlug::parse(module.as_str())?;
            let section = SectionKey::parse(section.as_str())?;
            let summary =
                SectionInspector::summary(app.store.as_ref(), app.store.as_ref(), &module, &section)
                    .await?;
            println!("{summary}");
            for row in [&summary.draft, &summary.published].into_iter().flatten() {
                if row.is_degraded() {
                    tracing::warn!(
                        stored = row.blocks,
                        valid = row.valid_blocks,
                        "stored blocks no longer validate"
                    );
                }
                if row.unconfigured_pdfs > 0 {
                    tracing::info!(count = row.unconfigured_pdfs, "pdf blocks not yet configured");
                }
            }
            app.store
                .verify_integrity()
                .await
                .context("audit integrity check failed")?;
            let report =
                check_audit_linkage(app.store.as_ref(), app.store.as_ref(), &module, &section)
                    .await?;
            print_json(&report)?;
            anyhow::ensure!(report.is_clean(), "audit linkage broken for {module}/{section}");
        }
    }

    Ok(())
}
