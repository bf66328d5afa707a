//! Configuration management for quarry
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Patterns skipped during the scan, matched against the path relative
    /// to the root and against the bare filename
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Maximum number of files per scan
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum file size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum recursion depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum lines per chunk
    #[serde(default = "default_chunk_max_lines")]
    pub chunk_max_lines: usize,

    /// Files per indexing batch
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,

    /// Error details retained in an index summary
    #[serde(default = "default_max_error_details")]
    pub max_error_details: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
            max_depth: default_max_depth(),
            chunk_max_lines: default_chunk_max_lines(),
            batch_size: default_index_batch_size(),
            max_error_details: default_max_error_details(),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Whether embeddings are generated at all (lexical-only when false)
    #[serde(default = "default_embedding_enabled")]
    pub enabled: bool,

    /// Provider name ("openai" or "ollama")
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Provider API base URL
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,

    /// Texts per embedding request
    #[serde(default = "default_embedding_sub_batch")]
    pub sub_batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: default_embedding_enabled(),
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            base_url: default_embedding_base_url(),
            api_key_env: default_embedding_api_key_env(),
            sub_batch_size: default_embedding_sub_batch(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env).ok()
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Maximum results allowed
    #[serde(default = "default_search_max_limit")]
    pub max_limit: usize,

    /// Semantic weight for hybrid fusion (0.0 - 1.0)
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// BM25 raw-score normalizer
    #[serde(default = "default_bm25_normalizer")]
    pub bm25_normalizer: f32,

    /// Maximum excerpt length in characters
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,

    /// Fail the whole federated query when one store fails
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            max_limit: default_search_max_limit(),
            semantic_weight: default_semantic_weight(),
            bm25_normalizer: default_bm25_normalizer(),
            excerpt_max_chars: default_excerpt_max_chars(),
            fail_fast: default_fail_fast(),
        }
    }
}

/// Filesystem layout derived from the base directory
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Base directory (~/.quarry by default)
    pub base_dir: PathBuf,
    /// Directory holding one store file per project plus global.db
    pub stores_dir: PathBuf,
    /// Config file path
    pub config_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::for_base_dir(default_base_dir())
    }
}

impl PathsConfig {
    pub fn for_base_dir(base_dir: PathBuf) -> Self {
        let stores_dir = base_dir.join("stores");
        let config_file = base_dir.join("config.toml");
        Self {
            base_dir,
            stores_dir,
            config_file,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_config_path() -> PathBuf {
        default_base_dir().join("config.toml")
    }

    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base_dir = path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(default_base_dir);
        config.paths = PathsConfig::for_base_dir(base_dir);

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration; errors here are fatal at startup
    pub fn validate(&self) -> Result<()> {
        match self.embedding.provider.as_str() {
            "openai" | "ollama" => {}
            other => {
                return Err(Error::Config(format!(
                    "Unknown embedding provider '{}'; expected 'openai' or 'ollama'",
                    other
                )));
            }
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config("Embedding dimension must be > 0".to_string()));
        }

        if self.embedding.sub_batch_size == 0 {
            return Err(Error::Config(
                "Embedding sub-batch size must be > 0".to_string(),
            ));
        }

        if self.indexing.chunk_max_lines == 0 {
            return Err(Error::Config("chunk_max_lines must be > 0".to_string()));
        }

        if self.indexing.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.search.semantic_weight) {
            return Err(Error::Config(format!(
                "semantic_weight must be between 0 and 1, got {}",
                self.search.semantic_weight
            )));
        }

        if self.search.bm25_normalizer <= 0.0 {
            return Err(Error::Config("bm25_normalizer must be > 0".to_string()));
        }

        Ok(())
    }
}
