//! SQLite schema definition

/// SQL schema for a single index store.
///
/// `chunks_fts` is a standalone FTS5 table whose rowid mirrors `chunks.id`;
/// the store's write path updates both inside the same transaction so the
/// full-text index is always consistent with chunk content.
pub const SCHEMA_SQL: &str = r#"
-- Files: one row per indexed path
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    content_hash TEXT NOT NULL,
    mtime INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

-- Chunks: contiguous line ranges, replaced as a set per indexing transaction
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files(id),
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    content TEXT NOT NULL,
    CHECK (start_line >= 1 AND start_line <= end_line)
);

-- Full-text index over chunk content, rowid = chunks.id
CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(content);

-- Embeddings: one vector per chunk, owned by the chunk
CREATE TABLE IF NOT EXISTS embeddings (
    chunk_id INTEGER PRIMARY KEY REFERENCES chunks(id),
    vector BLOB NOT NULL,
    model TEXT NOT NULL,
    dimension INTEGER NOT NULL
);

-- Failed per-file transactions, retried on demand
CREATE TABLE IF NOT EXISTS index_failures (
    path TEXT PRIMARY KEY,
    error TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    last_retry_at TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(file_id);
CREATE INDEX IF NOT EXISTS idx_files_path ON files(path);
"#;
