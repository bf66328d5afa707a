//! Default values for configuration

use std::path::PathBuf;

/// Default ignore patterns applied on every scan
pub fn default_ignore_patterns() -> Vec<String> {
    [
        ".git",
        "node_modules",
        "target",
        "dist",
        "build",
        ".venv",
        "__pycache__",
        "*.min.js",
        "*.lock",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Default maximum number of files per scan
pub fn default_max_files() -> usize {
    10_000
}

/// Default maximum file size in bytes (1 MiB)
pub fn default_max_file_size() -> u64 {
    1_048_576
}

/// Default maximum recursion depth
pub fn default_max_depth() -> usize {
    20
}

/// Default maximum lines per chunk
pub fn default_chunk_max_lines() -> usize {
    50
}

/// Default number of files per indexing batch
pub fn default_index_batch_size() -> usize {
    32
}

/// Default number of error details kept in an index summary
pub fn default_max_error_details() -> usize {
    10
}

/// Default embedding provider
pub fn default_embedding_provider() -> String {
    "openai".to_string()
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Default embedding dimension (text-embedding-3-small)
pub fn default_embedding_dimension() -> usize {
    1536
}

/// Default embedding API base URL
pub fn default_embedding_base_url() -> String {
    std::env::var("QUARRY_EMBEDDING_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1/".to_string())
}

/// Default environment variable holding the embedding API key
pub fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default texts per embedding request
pub fn default_embedding_sub_batch() -> usize {
    8
}

/// Default embedding request timeout in seconds
pub fn default_embedding_timeout() -> u64 {
    30
}

/// Embeddings enabled by default
pub fn default_embedding_enabled() -> bool {
    true
}

/// Default number of search results
pub fn default_search_limit() -> usize {
    10
}

/// Default maximum search results
pub fn default_search_max_limit() -> usize {
    100
}

/// Default semantic weight for hybrid fusion
pub fn default_semantic_weight() -> f32 {
    0.7
}

/// Default BM25 score normalizer
pub fn default_bm25_normalizer() -> f32 {
    10.0
}

/// Default excerpt length in characters
pub fn default_excerpt_max_chars() -> usize {
    240
}

/// Fail-fast disabled by default: a failing store in federated queries
/// reports zero hits plus an error flag instead of aborting the merge
pub fn default_fail_fast() -> bool {
    false
}

/// Default base directory (~/.quarry)
pub fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quarry")
}
