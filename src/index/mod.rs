//! Incremental indexing pipeline
//!
//! Drives scan -> change detection -> chunking -> storage -> embedding for
//! one tree. Each file is an independent unit of work: its chunk replacement
//! commits atomically, and a failure quarantines the path in the retry queue
//! without aborting the batch.
//!
//! Embedding happens after the chunk transaction commits and is best-effort;
//! a chunk without a vector is still reachable through full-text search.

use crate::chunk::chunk_lines;
use crate::config::Config;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::Result;
use crate::scan::{classify, FileChange, FileSnapshot, ScanOptions, TreeScanner};
use crate::store::IndexStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Terminal state of one file within an indexing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    /// New or modified content was (re)indexed
    Indexed,
    /// Content hash unchanged, nothing written
    Skipped,
    /// File vanished; its chunks and vectors were removed
    Deleted,
    /// The per-file transaction failed; path queued for retry
    Failed,
}

/// Outcome for a single file
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexResult {
    pub path: String,
    pub status: IndexStatus,
    pub chunks_created: usize,
    pub chunks_deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counters for a whole run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IndexSummary {
    pub processed: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failed: usize,
    /// First few (path, error) pairs, capped by `max_error_details`
    pub errors: Vec<(String, String)>,
    pub duration_ms: u64,
    /// Whether the scan stopped early at the file cap
    pub truncated: bool,
}

impl IndexSummary {
    fn absorb(&mut self, result: &IndexResult, max_error_details: usize) {
        self.processed += 1;
        match result.status {
            IndexStatus::Indexed => self.indexed += 1,
            IndexStatus::Skipped => self.skipped += 1,
            IndexStatus::Deleted => self.deleted += 1,
            IndexStatus::Failed => {
                self.failed += 1;
                if self.errors.len() < max_error_details {
                    self.errors.push((
                        result.path.clone(),
                        result.error.clone().unwrap_or_default(),
                    ));
                }
            }
        }
    }
}

/// Indexer bound to one store
pub struct Indexer {
    store: IndexStore,
    embedder: Option<Arc<dyn Embedder>>,
    config: Config,
}

impl Indexer {
    pub fn new(store: IndexStore, embedder: Option<Arc<dyn Embedder>>, config: Config) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Index a whole tree incrementally.
    ///
    /// Files are processed in batches with a cooperative yield between
    /// batches. Paths previously indexed but absent from this scan are
    /// treated as deletions. `on_file` fires once per processed file.
    pub async fn index_tree(
        &self,
        root: &Path,
        mut on_file: impl FnMut(&IndexResult),
    ) -> Result<IndexSummary> {
        let started = Instant::now();
        let scanner = TreeScanner::new(root, ScanOptions::from_config(&self.config.indexing));

        let mut iter = scanner.scan();
        let scanned: Vec<_> = iter.by_ref().collect();
        let truncated = iter.truncated();
        debug!(
            "Scan of {:?} found {} files ({} skipped)",
            root,
            scanned.len(),
            iter.skipped()
        );

        let mut summary = IndexSummary {
            truncated,
            ..Default::default()
        };

        for batch in scanned.chunks(self.config.indexing.batch_size) {
            for rel in batch {
                let result = self.index_file(root, rel).await;
                summary.absorb(&result, self.config.indexing.max_error_details);
                on_file(&result);
            }
            tokio::task::yield_now().await;
        }

        // A truncated scan is not a complete picture of the tree; pruning
        // on it would delete files that were never reached.
        if !truncated {
            let seen: std::collections::HashSet<String> = scanned
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            for path in self.store.list_paths().await? {
                if !seen.contains(&path) {
                    let result = self.remove_path(&path).await;
                    summary.absorb(&result, self.config.indexing.max_error_details);
                    on_file(&result);
                }
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Indexed {:?}: {} indexed, {} skipped, {} deleted, {} failed in {}ms",
            root, summary.indexed, summary.skipped, summary.deleted, summary.failed,
            summary.duration_ms
        );
        Ok(summary)
    }

    /// Index one file relative to `root` through the full state machine
    pub async fn index_file(&self, root: &Path, rel: &Path) -> IndexResult {
        let path_str = rel.to_string_lossy().into_owned();

        match self.try_index_file(root, &path_str).await {
            Ok(result) => {
                if result.status != IndexStatus::Failed {
                    if let Err(e) = self.store.clear_failure(&path_str).await {
                        warn!("Failed to clear retry entry for {}: {}", path_str, e);
                    }
                }
                result
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(record_err) = self.store.record_failure(&path_str, &message).await {
                    warn!(
                        "Failed to record failure for {}: {}",
                        path_str, record_err
                    );
                }
                IndexResult {
                    path: path_str,
                    status: IndexStatus::Failed,
                    chunks_created: 0,
                    chunks_deleted: 0,
                    error: Some(message),
                }
            }
        }
    }

    async fn try_index_file(&self, root: &Path, path_str: &str) -> Result<IndexResult> {
        let stored = self.store.get_file(path_str).await?;
        let change = classify(&root.join(path_str), stored.as_ref().map(|f| f.content_hash.as_str()))?;

        match change {
            FileChange::Unchanged => Ok(IndexResult {
                path: path_str.to_string(),
                status: IndexStatus::Skipped,
                chunks_created: 0,
                chunks_deleted: 0,
                error: None,
            }),
            FileChange::Deleted => {
                if stored.is_none() {
                    // never indexed, nothing to remove
                    return Ok(IndexResult {
                        path: path_str.to_string(),
                        status: IndexStatus::Skipped,
                        chunks_created: 0,
                        chunks_deleted: 0,
                        error: None,
                    });
                }
                Ok(self.remove_path(path_str).await)
            }
            FileChange::New(snapshot) | FileChange::Modified(snapshot) => {
                self.write_file(path_str, snapshot).await
            }
        }
    }

    async fn write_file(&self, path_str: &str, snapshot: FileSnapshot) -> Result<IndexResult> {
        let chunks = chunk_lines(&snapshot.content, self.config.indexing.chunk_max_lines);
        let outcome = self
            .store
            .replace_file(
                path_str,
                &snapshot.hash,
                snapshot.mtime,
                snapshot.size_bytes,
                &chunks,
            )
            .await?;

        if let Some(embedder) = &self.embedder {
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            match embed_in_batches(
                embedder.as_ref(),
                texts,
                self.config.embedding.sub_batch_size,
            )
            .await
            {
                Ok(vectors) => {
                    let items: Vec<(i64, Vec<f32>)> = outcome
                        .chunk_ids
                        .iter()
                        .copied()
                        .zip(vectors)
                        .collect();
                    self.store
                        .put_embeddings(&items, embedder.model_name(), embedder.dimension())
                        .await?;
                }
                Err(e) => {
                    // lexical search still works; vectors can be backfilled
                    warn!("Embedding failed for {}: {}", path_str, e);
                }
            }
        }

        Ok(IndexResult {
            path: path_str.to_string(),
            status: IndexStatus::Indexed,
            chunks_created: outcome.chunks_created,
            chunks_deleted: outcome.chunks_deleted,
            error: None,
        })
    }

    async fn remove_path(&self, path_str: &str) -> IndexResult {
        match self.store.delete_file_and_children(path_str).await {
            Ok(deleted) => IndexResult {
                path: path_str.to_string(),
                status: IndexStatus::Deleted,
                chunks_created: 0,
                chunks_deleted: deleted,
                error: None,
            },
            Err(e) => IndexResult {
                path: path_str.to_string(),
                status: IndexStatus::Failed,
                chunks_created: 0,
                chunks_deleted: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Re-run every path in the retry queue against `root`
    pub async fn retry_failed(
        &self,
        root: &Path,
        mut on_file: impl FnMut(&IndexResult),
    ) -> Result<IndexSummary> {
        let started = Instant::now();
        let failures = self.store.list_failures().await?;
        let mut summary = IndexSummary::default();

        for failure in failures {
            let result = self.index_file(root, Path::new(&failure.path)).await;
            summary.absorb(&result, self.config.indexing.max_error_details);
            on_file(&result);
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }
}
