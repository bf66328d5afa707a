//! Durable index storage using SQLite
//!
//! Each store is a single SQLite database holding:
//! - Files (path, content hash, stat metadata)
//! - Chunks (line-ranged text, replaced atomically per file)
//! - A full-text index kept in lockstep with chunk content
//! - Embedding vectors stored alongside chunks
//! - A pull-based retry queue of failed paths
//!
//! Every mutating operation is transactional: a failure mid-operation
//! leaves the store in its pre-operation state.

mod schema;

pub use schema::*;

use crate::chunk::TextChunk;
use crate::error::{Error, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};
use std::path::Path;
use tracing::debug;

/// A stored file row
#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub content_hash: String,
    pub mtime: i64,
    pub size_bytes: i64,
    pub indexed_at: String,
}

/// A stored chunk row
#[derive(Debug, Clone, FromRow)]
pub struct ChunkRecord {
    pub id: i64,
    pub file_id: i64,
    pub start_line: i64,
    pub end_line: i64,
    pub content: String,
}

/// A queued indexing failure
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct FailureRecord {
    pub path: String,
    pub error: String,
    pub retry_count: i64,
    pub last_retry_at: String,
}

/// A full-text match. `raw_score` is the engine's BM25 value where lower
/// scores denote better matches; callers normalize it before display.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub chunk_id: i64,
    pub path: String,
    pub start_line: i64,
    pub end_line: i64,
    pub content: String,
    pub raw_score: f64,
}

/// A chunk joined with its stored embedding vector
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk_id: i64,
    pub path: String,
    pub start_line: i64,
    pub end_line: i64,
    pub content: String,
    pub vector: Vec<f32>,
    pub model: String,
}

/// Result of replacing a file's chunk set
#[derive(Debug, Clone, Default)]
pub struct ReplaceOutcome {
    pub file_id: i64,
    pub chunks_created: usize,
    pub chunks_deleted: usize,
    /// Ids of the newly inserted chunks, in start_line order
    pub chunk_ids: Vec<i64>,
}

/// Row counts for status reporting
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreStats {
    pub files: i64,
    pub chunks: i64,
    pub embeddings: i64,
    pub failures: i64,
}

/// Handle to a single index store
#[derive(Clone)]
pub struct IndexStore {
    pool: SqlitePool,
}

impl IndexStore {
    /// Open (or create) a store at the given path
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true);

        debug!("Opening index store at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store (tests and throwaway indexes)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    // ===== File operations =====

    /// Get file by path
    pub async fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(file)
    }

    /// List all indexed paths
    pub async fn list_paths(&self) -> Result<Vec<String>> {
        let paths: Vec<String> = sqlx::query_scalar("SELECT path FROM files ORDER BY path")
            .fetch_all(&self.pool)
            .await?;
        Ok(paths)
    }

    /// Upsert a file row on its own; most callers use `replace_file` which
    /// does this inside the same transaction as the chunk replacement.
    pub async fn upsert_file(
        &self,
        path: &str,
        content_hash: &str,
        mtime: i64,
        size_bytes: i64,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let file_id = upsert_file_tx(&mut tx, path, content_hash, mtime, size_bytes).await?;
        tx.commit().await?;
        Ok(file_id)
    }

    /// Atomically upsert the file row and replace its entire chunk set.
    /// Old chunks, their full-text entries, and their embeddings are deleted
    /// and the new set inserted within one transaction; on failure nothing
    /// changes.
    pub async fn replace_file(
        &self,
        path: &str,
        content_hash: &str,
        mtime: i64,
        size_bytes: i64,
        chunks: &[TextChunk],
    ) -> Result<ReplaceOutcome> {
        let mut tx = self.pool.begin().await?;

        let file_id = upsert_file_tx(&mut tx, path, content_hash, mtime, size_bytes).await?;
        let (created, deleted, chunk_ids) = replace_chunks_tx(&mut tx, file_id, chunks).await?;

        tx.commit().await?;

        Ok(ReplaceOutcome {
            file_id,
            chunks_created: created,
            chunks_deleted: deleted,
            chunk_ids,
        })
    }

    /// Replace the chunk set of an existing file in one transaction
    pub async fn replace_chunks(
        &self,
        file_id: i64,
        chunks: &[TextChunk],
    ) -> Result<ReplaceOutcome> {
        let mut tx = self.pool.begin().await?;
        let (created, deleted, chunk_ids) = replace_chunks_tx(&mut tx, file_id, chunks).await?;
        tx.commit().await?;
        Ok(ReplaceOutcome {
            file_id,
            chunks_created: created,
            chunks_deleted: deleted,
            chunk_ids,
        })
    }

    /// Delete a file and everything it owns (chunks, full-text entries,
    /// embeddings). Returns how many chunks were removed; 0 when the path
    /// was not indexed.
    pub async fn delete_file_and_children(&self, path: &str) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let file_id: Option<i64> = sqlx::query_scalar("SELECT id FROM files WHERE path = ?")
            .bind(path)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(file_id) = file_id else {
            return Ok(0);
        };

        let deleted = delete_chunks_tx(&mut tx, file_id).await?;

        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }

    // ===== Full-text query =====

    /// Run a full-text query. Results are ordered best-first by the raw
    /// BM25 score (lower is better), ties broken by chunk id.
    pub async fn full_text_query(
        &self,
        query: &str,
        limit: usize,
        path_filter: Option<&str>,
    ) -> Result<Vec<LexicalHit>> {
        let match_expr = sanitize_fts_query(query);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }

        let sql = if path_filter.is_some() {
            "SELECT c.id, f.path, c.start_line, c.end_line, c.content, bm25(chunks_fts) AS raw \
             FROM chunks_fts \
             JOIN chunks c ON c.id = chunks_fts.rowid \
             JOIN files f ON f.id = c.file_id \
             WHERE chunks_fts MATCH ? AND f.path LIKE ? \
             ORDER BY bm25(chunks_fts), c.id \
             LIMIT ?"
        } else {
            "SELECT c.id, f.path, c.start_line, c.end_line, c.content, bm25(chunks_fts) AS raw \
             FROM chunks_fts \
             JOIN chunks c ON c.id = chunks_fts.rowid \
             JOIN files f ON f.id = c.file_id \
             WHERE chunks_fts MATCH ? \
             ORDER BY bm25(chunks_fts), c.id \
             LIMIT ?"
        };

        let mut q = sqlx::query_as::<_, (i64, String, i64, i64, String, f64)>(sql).bind(match_expr);
        if let Some(filter) = path_filter {
            q = q.bind(glob_to_like(filter));
        }
        let rows = q.bind(limit as i64).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(
                |(chunk_id, path, start_line, end_line, content, raw_score)| LexicalHit {
                    chunk_id,
                    path,
                    start_line,
                    end_line,
                    content,
                    raw_score,
                },
            )
            .collect())
    }

    // ===== Embedding operations =====

    /// Store one vector per chunk, replacing any existing vector
    pub async fn put_embeddings(
        &self,
        items: &[(i64, Vec<f32>)],
        model: &str,
        dimension: usize,
    ) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for (chunk_id, vector) in items {
            if vector.len() != dimension {
                return Err(Error::Embedding(format!(
                    "Vector for chunk {} has dimension {}, expected {}",
                    chunk_id,
                    vector.len(),
                    dimension
                )));
            }
            sqlx::query(
                "INSERT OR REPLACE INTO embeddings (chunk_id, vector, model, dimension) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(chunk_id)
            .bind(encode_vector(vector))
            .bind(model)
            .bind(dimension as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Load every chunk that has a stored vector, optionally restricted to
    /// paths matching a glob
    pub async fn embedded_chunks(&self, path_filter: Option<&str>) -> Result<Vec<EmbeddedChunk>> {
        let sql = if path_filter.is_some() {
            "SELECT c.id, f.path, c.start_line, c.end_line, c.content, e.vector, e.model \
             FROM embeddings e \
             JOIN chunks c ON c.id = e.chunk_id \
             JOIN files f ON f.id = c.file_id \
             WHERE f.path LIKE ?"
        } else {
            "SELECT c.id, f.path, c.start_line, c.end_line, c.content, e.vector, e.model \
             FROM embeddings e \
             JOIN chunks c ON c.id = e.chunk_id \
             JOIN files f ON f.id = c.file_id"
        };

        let mut q = sqlx::query_as::<_, (i64, String, i64, i64, String, Vec<u8>, String)>(sql);
        if let Some(filter) = path_filter {
            q = q.bind(glob_to_like(filter));
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|(chunk_id, path, start_line, end_line, content, blob, model)| {
                Ok(EmbeddedChunk {
                    chunk_id,
                    path,
                    start_line,
                    end_line,
                    content,
                    vector: decode_vector(&blob)?,
                    model,
                })
            })
            .collect()
    }

    /// Chunk ids for a file that have no stored vector yet
    pub async fn unembedded_chunk_ids(&self, file_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT c.id FROM chunks c \
             LEFT JOIN embeddings e ON e.chunk_id = c.id \
             WHERE c.file_id = ? AND e.chunk_id IS NULL \
             ORDER BY c.start_line",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    // ===== Failure queue =====

    /// Record a failed per-file transaction, incrementing the retry count
    /// for a path that already failed before
    pub async fn record_failure(&self, path: &str, error: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO index_failures (path, error, retry_count, last_retry_at) \
             VALUES (?, ?, 0, ?) \
             ON CONFLICT(path) DO UPDATE SET \
                 error = excluded.error, \
                 retry_count = retry_count + 1, \
                 last_retry_at = excluded.last_retry_at",
        )
        .bind(path)
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a path from the failure queue after a successful retry
    pub async fn clear_failure(&self, path: &str) -> Result<()> {
        sqlx::query("DELETE FROM index_failures WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All queued failures, oldest retry first
    pub async fn list_failures(&self) -> Result<Vec<FailureRecord>> {
        let failures = sqlx::query_as::<_, FailureRecord>(
            "SELECT * FROM index_failures ORDER BY last_retry_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(failures)
    }

    // ===== Statistics =====

    pub async fn stats(&self) -> Result<StoreStats> {
        let files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let embeddings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await?;
        let failures: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_failures")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            files,
            chunks,
            embeddings,
            failures,
        })
    }

    /// Chunks for a file in line order (test and debugging helper)
    pub async fn chunks_for_file(&self, file_id: i64) -> Result<Vec<ChunkRecord>> {
        let chunks = sqlx::query_as::<_, ChunkRecord>(
            "SELECT * FROM chunks WHERE file_id = ? ORDER BY start_line",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chunks)
    }
}

async fn upsert_file_tx(
    tx: &mut Transaction<'_, Sqlite>,
    path: &str,
    content_hash: &str,
    mtime: i64,
    size_bytes: i64,
) -> Result<i64> {
    sqlx::query(
        "INSERT INTO files (path, content_hash, mtime, size_bytes, indexed_at) \
         VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(path) DO UPDATE SET \
             content_hash = excluded.content_hash, \
             mtime = excluded.mtime, \
             size_bytes = excluded.size_bytes, \
             indexed_at = excluded.indexed_at",
    )
    .bind(path)
    .bind(content_hash)
    .bind(mtime)
    .bind(size_bytes)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;

    let file_id: i64 = sqlx::query_scalar("SELECT id FROM files WHERE path = ?")
        .bind(path)
        .fetch_one(&mut **tx)
        .await?;
    Ok(file_id)
}

/// Delete a file's chunks along with their full-text entries and embeddings
async fn delete_chunks_tx(tx: &mut Transaction<'_, Sqlite>, file_id: i64) -> Result<usize> {
    let old_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM chunks WHERE file_id = ?")
        .bind(file_id)
        .fetch_all(&mut **tx)
        .await?;

    for chunk_id in &old_ids {
        sqlx::query("DELETE FROM chunks_fts WHERE rowid = ?")
            .bind(chunk_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM embeddings WHERE chunk_id = ?")
            .bind(chunk_id)
            .execute(&mut **tx)
            .await?;
    }

    sqlx::query("DELETE FROM chunks WHERE file_id = ?")
        .bind(file_id)
        .execute(&mut **tx)
        .await?;

    Ok(old_ids.len())
}

async fn replace_chunks_tx(
    tx: &mut Transaction<'_, Sqlite>,
    file_id: i64,
    chunks: &[TextChunk],
) -> Result<(usize, usize, Vec<i64>)> {
    let deleted = delete_chunks_tx(tx, file_id).await?;

    let mut chunk_ids = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let result = sqlx::query(
            "INSERT INTO chunks (file_id, start_line, end_line, content) VALUES (?, ?, ?, ?)",
        )
        .bind(file_id)
        .bind(chunk.start_line as i64)
        .bind(chunk.end_line as i64)
        .bind(&chunk.content)
        .execute(&mut **tx)
        .await?;

        let chunk_id = result.last_insert_rowid();
        sqlx::query("INSERT INTO chunks_fts (rowid, content) VALUES (?, ?)")
            .bind(chunk_id)
            .bind(&chunk.content)
            .execute(&mut **tx)
            .await?;
        chunk_ids.push(chunk_id);
    }

    Ok((chunks.len(), deleted, chunk_ids))
}

/// Sanitize a user query for safe use in FTS5 MATCH expressions.
///
/// Each whitespace-delimited token is escaped, wrapped in double quotes,
/// and suffixed with `*` for prefix matching; tokens are joined with spaces
/// (implicit AND).
pub fn sanitize_fts_query(input: &str) -> String {
    input
        .split_whitespace()
        .map(|token| {
            let escaped = token.replace('"', "\"\"");
            format!("\"{}\"*", escaped)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a `*`/`?` path glob into a SQL LIKE pattern
fn glob_to_like(glob: &str) -> String {
    let mut like = String::with_capacity(glob.len() + 2);
    for ch in glob.chars() {
        match ch {
            '*' => like.push('%'),
            '?' => like.push('_'),
            other => like.push(other),
        }
    }
    like
}

/// Encode an embedding vector as little-endian f32 bytes
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a little-endian f32 blob back into a vector
pub fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::Other(format!(
            "Embedding blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_lines;

    async fn store_with_file(path: &str, text: &str) -> (IndexStore, ReplaceOutcome) {
        let store = IndexStore::in_memory().await.unwrap();
        let chunks = chunk_lines(text, 2);
        let outcome = store
            .replace_file(path, "hash1", 0, text.len() as i64, &chunks)
            .await
            .unwrap();
        (store, outcome)
    }

    #[tokio::test]
    async fn test_replace_file_creates_chunks_and_fts() {
        let (store, outcome) = store_with_file("src/lib.rs", "alpha\nbeta\ngamma").await;
        assert_eq!(outcome.chunks_created, 2);
        assert_eq!(outcome.chunks_deleted, 0);

        let hits = store.full_text_query("beta", 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "src/lib.rs");
        assert!(hits[0].raw_score <= 0.0);
    }

    #[tokio::test]
    async fn test_replace_removes_stale_fts_entries() {
        let (store, outcome) = store_with_file("a.txt", "needle in here").await;

        let chunks = chunk_lines("completely different", 2);
        let second = store
            .replace_file("a.txt", "hash2", 1, 20, &chunks)
            .await
            .unwrap();
        assert_eq!(second.file_id, outcome.file_id);
        assert_eq!(second.chunks_deleted, 1);

        assert!(store
            .full_text_query("needle", 10, None)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .full_text_query("different", 10, None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_replace_chunks_is_atomic_on_failure() {
        let (store, outcome) = store_with_file("a.txt", "one\ntwo\nthree\nfour").await;
        let before = store.chunks_for_file(outcome.file_id).await.unwrap();
        assert_eq!(before.len(), 2);

        // start_line 0 violates the CHECK constraint mid-insert
        let bad = vec![
            TextChunk {
                start_line: 1,
                end_line: 2,
                content: "ok".to_string(),
            },
            TextChunk {
                start_line: 0,
                end_line: 0,
                content: "bad".to_string(),
            },
        ];
        let err = store.replace_chunks(outcome.file_id, &bad).await;
        assert!(err.is_err());

        let after = store.chunks_for_file(outcome.file_id).await.unwrap();
        assert_eq!(after.len(), before.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.content, b.content);
            assert_eq!(a.start_line, b.start_line);
        }
        // the failed attempt must not leave phantom full-text entries
        assert!(store
            .full_text_query("bad", 10, None)
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .full_text_query("ok", 10, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_file_cascades() {
        let (store, outcome) = store_with_file("a.txt", "hello world").await;
        store
            .put_embeddings(&[(outcome.chunk_ids[0], vec![0.1, 0.2])], "m", 2)
            .await
            .unwrap();

        let deleted = store.delete_file_and_children("a.txt").await.unwrap();
        assert_eq!(deleted, 1);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.files, 0);
        assert_eq!(stats.chunks, 0);
        assert_eq!(stats.embeddings, 0);
        assert!(store
            .full_text_query("hello", 10, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_noop() {
        let store = IndexStore::in_memory().await.unwrap();
        assert_eq!(store.delete_file_and_children("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_path_filter() {
        let store = IndexStore::in_memory().await.unwrap();
        for path in ["src/a.rs", "docs/a.md"] {
            let chunks = chunk_lines("shared token", 5);
            store.replace_file(path, "h", 0, 10, &chunks).await.unwrap();
        }

        let hits = store
            .full_text_query("shared", 10, Some("src/*"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "src/a.rs");
    }

    #[tokio::test]
    async fn test_embedding_roundtrip() {
        let (store, outcome) = store_with_file("a.txt", "vector me").await;

        let pending = store.unembedded_chunk_ids(outcome.file_id).await.unwrap();
        assert_eq!(pending, outcome.chunk_ids);

        store
            .put_embeddings(
                &[(outcome.chunk_ids[0], vec![1.0, -2.5, 0.0])],
                "test-model",
                3,
            )
            .await
            .unwrap();

        let embedded = store.embedded_chunks(None).await.unwrap();
        assert_eq!(embedded.len(), 1);
        assert_eq!(embedded[0].vector, vec![1.0, -2.5, 0.0]);
        assert_eq!(embedded[0].model, "test-model");
        assert!(store
            .unembedded_chunk_ids(outcome.file_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_put_embeddings_rejects_dimension_mismatch() {
        let (store, outcome) = store_with_file("a.txt", "x").await;
        let err = store
            .put_embeddings(&[(outcome.chunk_ids[0], vec![0.1])], "m", 2)
            .await;
        assert!(matches!(err, Err(Error::Embedding(_))));
        assert_eq!(store.stats().await.unwrap().embeddings, 0);
    }

    #[tokio::test]
    async fn test_failure_queue() {
        let store = IndexStore::in_memory().await.unwrap();

        store.record_failure("bad.rs", "io error").await.unwrap();
        store
            .record_failure("bad.rs", "io error again")
            .await
            .unwrap();

        let failures = store.list_failures().await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].retry_count, 1);
        assert_eq!(failures[0].error, "io error again");

        store.clear_failure("bad.rs").await.unwrap();
        assert!(store.list_failures().await.unwrap().is_empty());
    }

    #[test]
    fn test_sanitize_fts_query() {
        assert_eq!(sanitize_fts_query("hello world"), "\"hello\"* \"world\"*");
        assert_eq!(sanitize_fts_query("say \"hi\""), "\"say\"* \"\"\"hi\"\"\"*");
        assert_eq!(sanitize_fts_query("   "), "");
    }

    #[test]
    fn test_vector_codec() {
        let vector = vec![0.5_f32, -1.25, 3.0];
        let blob = encode_vector(&vector);
        assert_eq!(decode_vector(&blob).unwrap(), vector);
        assert!(decode_vector(&blob[..5]).is_err());
    }
}
