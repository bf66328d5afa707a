//! OpenAI-compatible embedding backend
//!
//! Talks to any server exposing the `/embeddings` endpoint shape
//! (OpenAI, Azure, vLLM, LM Studio, ...). Supports true batching: one
//! request carries the whole sub-batch.

use super::{send_with_retry, validate_dimensions, Embedder};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const RETRIES: usize = 2;

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
    dimension: usize,
    api_key: Option<String>,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        let endpoint = base
            .join("embeddings")
            .map_err(|e| Error::Config(format!("Invalid embedding base URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            dimension: config.dimension,
            api_key: config.api_key(),
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let count = texts.len();
        let body = EmbeddingsRequest {
            model: self.model.clone(),
            input: texts,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: EmbeddingsResponse = send_with_retry(request, RETRIES).await?;
        if response.data.len() != count {
            return Err(Error::Embedding(format!(
                "Provider returned {} embeddings for {} inputs",
                response.data.len(),
                count
            )));
        }

        // the API may return items out of order; index restores input order
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();

        validate_dimensions(&embeddings, &self.model, self.dimension)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
