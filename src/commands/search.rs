//! Search command implementation

use crate::config::Config;
use crate::embed::{create_embedder, Embedder};
use crate::error::Result;
use crate::federation::{FederatedResponse, FederatedSearch, Scope};
use crate::search::{SearchMode, SearchOptions};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SearchArgs {
    pub scope: Scope,
    pub mode: SearchMode,
    pub limit: Option<usize>,
    pub path_filter: Option<String>,
}

/// Run a federated query over the stores the scope selects
pub async fn cmd_search(
    config: &Config,
    query: &str,
    args: SearchArgs,
) -> Result<FederatedResponse> {
    info!("Searching scope '{}' for: {}", args.scope, query);

    let embedder: Option<Arc<dyn Embedder>> = if config.embedding.enabled
        && args.mode != SearchMode::Lexical
    {
        match create_embedder(&config.embedding) {
            Ok(embedder) => Some(Arc::from(embedder)),
            Err(e) => {
                warn!("Embedding provider unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    let options = SearchOptions {
        mode: args.mode,
        limit: args.limit.unwrap_or(config.search.default_limit),
        path_filter: args.path_filter,
    };

    let search = FederatedSearch::new(
        &config.paths.stores_dir,
        embedder,
        config.search.clone(),
    );
    search.search(&args.scope, query, &options).await
}

pub fn print_search_results(response: &FederatedResponse, query: &str) {
    if response.hits.is_empty() {
        println!("No results for '{}'", query);
    }

    for (rank, hit) in response.hits.iter().enumerate() {
        println!(
            "{}. [{:.3}] {}:{}-{} ({})",
            rank + 1,
            hit.hit.score,
            hit.hit.path,
            hit.hit.start_line,
            hit.hit.end_line,
            hit.source
        );
        for line in hit.hit.excerpt.lines() {
            println!("   {}", line);
        }
        println!();
    }

    for source in &response.sources {
        if let Some(error) = &source.error {
            eprintln!("⚠ Store '{}' failed: {}", source.source, error);
        }
    }
}
