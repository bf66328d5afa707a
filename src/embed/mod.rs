//! Embedding generation
//!
//! This module provides an abstraction over embedding providers with:
//! - A trait for different embedding backends
//! - OpenAI-compatible and Ollama HTTP backends
//! - Batch processing for efficiency
//!
//! Embedding is best-effort: chunks whose vectors cannot be produced stay
//! searchable through the full-text index.

mod ollama;
mod openai;

pub use ollama::*;
pub use openai::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Provider returned no embedding".to_string()))
    }

    /// Embed a batch of texts, one vector per input in order
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        other => Err(Error::Config(format!(
            "Unknown embedding provider '{}'; expected 'openai' or 'ollama'",
            other
        ))),
    }
}

/// Helper to embed in provider-sized sub-batches
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let embeddings = embedder.embed_batch(batch_texts).await?;
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}

/// Check every returned vector against the configured dimension
fn validate_dimensions(embeddings: &[Vec<f32>], model: &str, dimension: usize) -> Result<()> {
    if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != dimension) {
        return Err(Error::Embedding(format!(
            "Embedding dimension mismatch for model '{}': expected {}, got {}",
            model,
            dimension,
            mismatch.len()
        )));
    }
    Ok(())
}

/// Send an HTTP request with retries and linear backoff
async fn send_with_retry<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    retries: usize,
) -> Result<T> {
    let mut last_err: Option<Error> = None;
    for attempt in 0..=retries {
        let req = request
            .try_clone()
            .ok_or_else(|| Error::Embedding("Failed to clone embedding request".to_string()))?;
        match req.send().await {
            Ok(response) => match response.error_for_status() {
                Ok(ok) => return Ok(ok.json::<T>().await?),
                Err(e) => last_err = Some(Error::Embedding(e.to_string())),
            },
            Err(e) => last_err = Some(Error::Embedding(e.to_string())),
        }

        if attempt < retries {
            tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
        }
    }

    Err(last_err
        .unwrap_or_else(|| Error::Embedding("Embedding provider request failed".to_string())))
}
