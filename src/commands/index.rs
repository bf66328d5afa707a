//! Index and retry command implementations

use crate::config::Config;
use crate::embed::{create_embedder, Embedder};
use crate::error::{Error, Result};
use crate::federation::{Scope, StoreRegistry, GLOBAL_STORE};
use crate::index::{IndexSummary, Indexer};
use crate::progress::add_spinner;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolve which store a tree indexes into: `--global`, an explicit project
/// name, or the root directory's name.
pub fn resolve_target(root: &Path, project: Option<&str>, global: bool) -> Result<String> {
    if global {
        return Ok(GLOBAL_STORE.to_string());
    }
    let name = match project {
        Some(name) => name.to_string(),
        None => root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .ok_or_else(|| {
                Error::InvalidPath(format!(
                    "Cannot derive a project name from {:?}; pass --project",
                    root
                ))
            })?,
    };

    // project scope parsing doubles as name validation
    match name.parse::<Scope>()? {
        Scope::Project(name) => Ok(name),
        // "all" cannot name a store; "global" must be requested explicitly
        other => Err(Error::InvalidScope(format!(
            "'{}' is a reserved scope name; pass --global for the global store",
            other
        ))),
    }
}

fn build_embedder(config: &Config) -> Option<Arc<dyn Embedder>> {
    if !config.embedding.enabled {
        info!("Embeddings disabled; indexing lexical-only");
        return None;
    }
    match create_embedder(&config.embedding) {
        Ok(embedder) => Some(Arc::from(embedder)),
        Err(e) => {
            warn!("Embedding provider unavailable, indexing lexical-only: {}", e);
            None
        }
    }
}

/// Index a source tree into the named store
pub async fn cmd_index(config: &Config, root: &Path, store_name: &str) -> Result<IndexSummary> {
    if !root.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{:?} is not a directory",
            root
        )));
    }

    info!("Indexing {:?} into store '{}'", root, store_name);

    let registry = StoreRegistry::new(&config.paths.stores_dir);
    let store = registry.open_or_create(store_name).await?;
    let indexer = Indexer::new(store, build_embedder(config), config.clone());

    let spinner = add_spinner();
    let summary = indexer
        .index_tree(root, |result| {
            spinner.inc(1);
            spinner.set_message(result.path.clone());
        })
        .await?;
    spinner.finish_and_clear();

    Ok(summary)
}

/// Re-run the failure queue of the named store against a tree
pub async fn cmd_retry(config: &Config, root: &Path, store_name: &str) -> Result<IndexSummary> {
    let registry = StoreRegistry::new(&config.paths.stores_dir);
    let store = registry.open_existing(store_name).await?;
    let indexer = Indexer::new(store, build_embedder(config), config.clone());

    let spinner = add_spinner();
    let summary = indexer
        .retry_failed(root, |result| {
            spinner.inc(1);
            spinner.set_message(result.path.clone());
        })
        .await?;
    spinner.finish_and_clear();

    Ok(summary)
}

pub fn print_index_summary(summary: &IndexSummary, store_name: &str) {
    println!("\n✓ Indexed into store '{}'", store_name);
    println!("  Processed: {}", summary.processed);
    println!("  Indexed:   {}", summary.indexed);
    println!("  Skipped:   {}", summary.skipped);
    println!("  Deleted:   {}", summary.deleted);
    println!("  Failed:    {}", summary.failed);
    println!("  Duration:  {}ms", summary.duration_ms);

    if summary.truncated {
        println!("\n⚠ Scan stopped at the file cap; raise indexing.max_files to cover the whole tree");
    }

    if !summary.errors.is_empty() {
        println!("\nFailures (retry with 'quarry retry'):");
        for (path, error) in &summary.errors {
            println!("  {}: {}", path, error);
        }
        if summary.failed > summary.errors.len() {
            println!("  ... and {} more", summary.failed - summary.errors.len());
        }
    }
}
