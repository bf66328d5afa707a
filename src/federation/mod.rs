//! Federation over multiple index stores
//!
//! A deployment keeps one store file per project plus a shared global store,
//! all under a single stores directory. A scope selects which of them a
//! query fans out to; results are fused into one ranked list with their
//! source attached.

use crate::config::SearchConfig;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::search::{SearchEngine, SearchHit, SearchOptions};
use crate::store::IndexStore;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the shared store that is not tied to any project
pub const GLOBAL_STORE: &str = "global";

/// Which stores a query targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Only the shared global store
    Global,
    /// The global store plus every project store
    All,
    /// A single project store by name
    Project(String),
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "global" => Ok(Self::Global),
            "all" => Ok(Self::All),
            name => {
                // both `project:foo` and bare `foo` select a project store
                let name = name.strip_prefix("project:").unwrap_or(name);
                if name.is_empty()
                    || name.contains(['/', '\\'])
                    || name.starts_with('.')
                {
                    return Err(Error::InvalidScope(format!(
                        "'{}' is not a valid project name",
                        name
                    )));
                }
                Ok(Self::Project(name.to_string()))
            }
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::All => write!(f, "all"),
            Self::Project(name) => write!(f, "{}", name),
        }
    }
}

/// Maps scopes to store files under one directory
pub struct StoreRegistry {
    stores_dir: PathBuf,
}

impl StoreRegistry {
    pub fn new(stores_dir: impl Into<PathBuf>) -> Self {
        Self {
            stores_dir: stores_dir.into(),
        }
    }

    /// Path of a named store file; `global` is reserved for the shared store
    pub fn store_path(&self, name: &str) -> PathBuf {
        self.stores_dir.join(format!("{}.db", name))
    }

    /// Project names with an existing store file, sorted, global excluded
    pub fn list_projects(&self) -> Result<Vec<String>> {
        let mut projects = Vec::new();
        let entries = match std::fs::read_dir(&self.stores_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(projects),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("db") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if stem != GLOBAL_STORE {
                    projects.push(stem.to_string());
                }
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Open an existing named store; error when its file does not exist
    pub async fn open_existing(&self, name: &str) -> Result<IndexStore> {
        let path = self.store_path(name);
        if !path.is_file() {
            return Err(Error::StoreNotFound(name.to_string()));
        }
        IndexStore::open(&path).await
    }

    /// Open (creating if needed) the store a project indexes into
    pub async fn open_or_create(&self, name: &str) -> Result<IndexStore> {
        IndexStore::open(&self.store_path(name)).await
    }

    /// Resolve a scope to (name, store) pairs. `All` silently skips store
    /// files that do not exist; the other scopes require theirs.
    pub async fn resolve(&self, scope: &Scope) -> Result<Vec<(String, IndexStore)>> {
        match scope {
            Scope::Global => Ok(vec![(
                GLOBAL_STORE.to_string(),
                self.open_existing(GLOBAL_STORE).await?,
            )]),
            Scope::Project(name) => {
                Ok(vec![(name.clone(), self.open_existing(name).await?)])
            }
            Scope::All => {
                let mut stores = Vec::new();
                if self.store_path(GLOBAL_STORE).is_file() {
                    stores.push((
                        GLOBAL_STORE.to_string(),
                        self.open_existing(GLOBAL_STORE).await?,
                    ));
                }
                for project in self.list_projects()? {
                    let store = self.open_existing(&project).await?;
                    stores.push((project, store));
                }
                Ok(stores)
            }
        }
    }
}

/// A search hit tagged with the store it came from
#[derive(Debug, Clone, serde::Serialize)]
pub struct FederatedHit {
    pub source: String,
    #[serde(flatten)]
    pub hit: SearchHit,
}

/// Per-store outcome of a federated query
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceReport {
    pub source: String,
    /// Hits from this store that survived the final cut
    pub hits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fused result of a federated query
#[derive(Debug, Clone, serde::Serialize)]
pub struct FederatedResponse {
    pub hits: Vec<FederatedHit>,
    pub total_hits: usize,
    pub sources: Vec<SourceReport>,
}

impl FederatedResponse {
    /// Whether any store failed and was reported instead of searched
    pub fn degraded(&self) -> bool {
        self.sources.iter().any(|s| s.error.is_some())
    }
}

/// Fans one query out across the stores a scope resolves to
pub struct FederatedSearch {
    registry: StoreRegistry,
    embedder: Option<Arc<dyn Embedder>>,
    config: SearchConfig,
}

impl FederatedSearch {
    pub fn new(
        stores_dir: &Path,
        embedder: Option<Arc<dyn Embedder>>,
        config: SearchConfig,
    ) -> Self {
        Self {
            registry: StoreRegistry::new(stores_dir),
            embedder,
            config,
        }
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// Query every store in scope and fuse the results into one ranked list.
    ///
    /// With `fail_fast` off (the default), a failing store contributes zero
    /// hits and an error flag; with it on, the first failure aborts the
    /// whole query.
    pub async fn search(
        &self,
        scope: &Scope,
        query: &str,
        options: &SearchOptions,
    ) -> Result<FederatedResponse> {
        let stores = self.registry.resolve(scope).await?;
        debug!("Scope '{}' resolved to {} stores", scope, stores.len());

        let mut all_hits: Vec<FederatedHit> = Vec::new();
        let mut sources: Vec<SourceReport> = Vec::new();

        for (name, store) in stores {
            let engine = SearchEngine::new(
                Arc::new(store),
                self.embedder.clone(),
                self.config.clone(),
            );
            match engine.search(query, options).await {
                Ok(hits) => {
                    all_hits.extend(hits.into_iter().map(|hit| FederatedHit {
                        source: name.clone(),
                        hit,
                    }));
                    sources.push(SourceReport {
                        source: name,
                        hits: 0,
                        error: None,
                    });
                }
                Err(e) => {
                    if self.config.fail_fast {
                        return Err(e);
                    }
                    warn!("Store '{}' failed during federated query: {}", name, e);
                    sources.push(SourceReport {
                        source: name,
                        hits: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        // cross-store fusion: scores are already normalized per store
        all_hits.sort_by(|a, b| {
            b.hit
                .score
                .partial_cmp(&a.hit.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.source.cmp(&b.source))
                .then(a.hit.chunk_id.cmp(&b.hit.chunk_id))
        });
        all_hits.truncate(options.limit.clamp(1, self.config.max_limit));

        for report in &mut sources {
            report.hits = all_hits.iter().filter(|h| h.source == report.source).count();
        }

        Ok(FederatedResponse {
            total_hits: all_hits.len(),
            hits: all_hits,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_lines;
    use crate::search::SearchMode;
    use tempfile::TempDir;

    async fn seed_store(dir: &Path, name: &str, path: &str, text: &str) {
        let registry = StoreRegistry::new(dir);
        let store = registry.open_or_create(name).await.unwrap();
        let chunks = chunk_lines(text, 10);
        store
            .replace_file(path, path, 0, text.len() as i64, &chunks)
            .await
            .unwrap();
    }

    fn lexical_options() -> SearchOptions {
        SearchOptions {
            mode: SearchMode::Lexical,
            ..Default::default()
        }
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::Global);
        assert_eq!("all".parse::<Scope>().unwrap(), Scope::All);
        assert_eq!(
            "myproj".parse::<Scope>().unwrap(),
            Scope::Project("myproj".to_string())
        );
        assert_eq!(
            "project:myproj".parse::<Scope>().unwrap(),
            Scope::Project("myproj".to_string())
        );
        assert!("../etc".parse::<Scope>().is_err());
        assert!("a/b".parse::<Scope>().is_err());
        assert!("".parse::<Scope>().is_err());
    }

    #[tokio::test]
    async fn test_registry_lists_projects_without_global() {
        let tmp = TempDir::new().unwrap();
        seed_store(tmp.path(), "global", "g.rs", "global text").await;
        seed_store(tmp.path(), "alpha", "a.rs", "alpha text").await;
        seed_store(tmp.path(), "beta", "b.rs", "beta text").await;

        let registry = StoreRegistry::new(tmp.path());
        assert_eq!(registry.list_projects().unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_missing_project_store_errors() {
        let tmp = TempDir::new().unwrap();
        let registry = StoreRegistry::new(tmp.path());
        assert!(matches!(
            registry.open_existing("ghost").await,
            Err(Error::StoreNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_all_scope_searches_every_store() {
        let tmp = TempDir::new().unwrap();
        seed_store(tmp.path(), "global", "g.rs", "shared needle here").await;
        seed_store(tmp.path(), "alpha", "a.rs", "needle in alpha").await;
        seed_store(tmp.path(), "beta", "b.rs", "nothing relevant").await;

        let search = FederatedSearch::new(tmp.path(), None, SearchConfig::default());
        let response = search
            .search(&Scope::All, "needle", &lexical_options())
            .await
            .unwrap();

        assert_eq!(response.hits.len(), 2);
        let mut found: Vec<&str> = response.hits.iter().map(|h| h.source.as_str()).collect();
        found.sort();
        assert_eq!(found, vec!["alpha", "global"]);

        assert_eq!(response.sources.len(), 3);
        assert!(!response.degraded());
        let beta = response
            .sources
            .iter()
            .find(|s| s.source == "beta")
            .unwrap();
        assert_eq!(beta.hits, 0);
    }

    #[tokio::test]
    async fn test_project_scope_searches_one_store() {
        let tmp = TempDir::new().unwrap();
        seed_store(tmp.path(), "global", "g.rs", "needle global").await;
        seed_store(tmp.path(), "alpha", "a.rs", "needle alpha").await;

        let search = FederatedSearch::new(tmp.path(), None, SearchConfig::default());
        let response = search
            .search(
                &Scope::Project("alpha".to_string()),
                "needle",
                &lexical_options(),
            )
            .await
            .unwrap();

        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].source, "alpha");
    }

    #[tokio::test]
    async fn test_failing_store_degrades_response() {
        let tmp = TempDir::new().unwrap();
        seed_store(tmp.path(), "global", "g.rs", "needle global").await;
        seed_store(tmp.path(), "alpha", "a.rs", "needle alpha").await;

        // semantic mode without an embedder fails inside each engine

        let search = FederatedSearch::new(tmp.path(), None, SearchConfig::default());
        let response = search
            .search(
                &Scope::All,
                "needle",
                &SearchOptions {
                    mode: SearchMode::Semantic,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(response.hits.is_empty());
        assert!(response.degraded());
        assert!(response.sources.iter().all(|s| s.error.is_some()));
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_on_store_error() {
        let tmp = TempDir::new().unwrap();
        seed_store(tmp.path(), "global", "g.rs", "needle").await;

        let mut config = SearchConfig::default();
        config.fail_fast = true;
        let search = FederatedSearch::new(tmp.path(), None, config);
        let result = search
            .search(
                &Scope::All,
                "needle",
                &SearchOptions {
                    mode: SearchMode::Semantic,
                    ..Default::default()
                },
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_all_scope_with_empty_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let search = FederatedSearch::new(tmp.path(), None, SearchConfig::default());
        let response = search
            .search(&Scope::All, "anything", &lexical_options())
            .await
            .unwrap();

        assert!(response.hits.is_empty());
        assert!(response.sources.is_empty());
    }
}
