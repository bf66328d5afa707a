//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::federation::{StoreRegistry, GLOBAL_STORE};
use crate::store::{FailureRecord, StoreStats};
use serde::Serialize;
use tracing::info;

/// Per-store status line
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub name: String,
    #[serde(flatten)]
    pub stats: StoreStats,
    pub pending_retries: Vec<FailureRecord>,
}

/// Full status report
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub stores_dir: String,
    pub embedding_enabled: bool,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub stores: Vec<StoreStatus>,
}

/// Gather stats and retry queues across every store
pub async fn cmd_status(config: &Config) -> Result<StatusInfo> {
    info!("Getting status");

    let registry = StoreRegistry::new(&config.paths.stores_dir);
    let mut names = Vec::new();
    if registry.store_path(GLOBAL_STORE).is_file() {
        names.push(GLOBAL_STORE.to_string());
    }
    names.extend(registry.list_projects()?);

    let mut stores = Vec::with_capacity(names.len());
    for name in names {
        let store = registry.open_existing(&name).await?;
        stores.push(StoreStatus {
            name,
            stats: store.stats().await?,
            pending_retries: store.list_failures().await?,
        });
    }

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        stores_dir: config.paths.stores_dir.display().to_string(),
        embedding_enabled: config.embedding.enabled,
        embedding_provider: config.embedding.provider.clone(),
        embedding_model: config.embedding.model.clone(),
        stores,
    })
}

pub fn print_status(status: &StatusInfo) {
    println!("\n📊 quarry Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Stores: {}", status.stores_dir);

    if status.embedding_enabled {
        println!(
            "Embedding: {} ({})",
            status.embedding_provider, status.embedding_model
        );
    } else {
        println!("Embedding: disabled (lexical-only)");
    }

    if status.stores.is_empty() {
        println!("\nNo stores yet. Run 'quarry index <path>' to create one.");
        return;
    }

    println!("\nStores:");
    for store in &status.stores {
        println!(
            "  {}: {} files, {} chunks, {} embedded",
            store.name, store.stats.files, store.stats.chunks, store.stats.embeddings
        );
        if !store.pending_retries.is_empty() {
            println!("    {} paths pending retry:", store.pending_retries.len());
            for failure in &store.pending_retries {
                println!(
                    "      {} ({}x): {}",
                    failure.path, failure.retry_count + 1, failure.error
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_lines;
    use crate::config::PathsConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_reports_all_stores() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths = PathsConfig::for_base_dir(tmp.path().to_path_buf());

        let registry = StoreRegistry::new(&config.paths.stores_dir);
        for name in ["global", "alpha"] {
            let store = registry.open_or_create(name).await.unwrap();
            let chunks = chunk_lines("some text", 10);
            store
                .replace_file("f.rs", "h", 0, 9, &chunks)
                .await
                .unwrap();
        }
        registry
            .open_or_create("alpha")
            .await
            .unwrap()
            .record_failure("bad.rs", "io error")
            .await
            .unwrap();

        let status = cmd_status(&config).await.unwrap();
        assert_eq!(status.stores.len(), 2);
        assert_eq!(status.stores[0].name, "global");

        let alpha = status.stores.iter().find(|s| s.name == "alpha").unwrap();
        assert_eq!(alpha.stats.files, 1);
        assert_eq!(alpha.pending_retries.len(), 1);
    }

    #[tokio::test]
    async fn test_status_with_no_stores() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths = PathsConfig::for_base_dir(tmp.path().to_path_buf());

        let status = cmd_status(&config).await.unwrap();
        assert!(status.stores.is_empty());
    }
}
