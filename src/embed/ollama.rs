//! Ollama embedding backend
//!
//! Ollama's `/api/embeddings` endpoint takes a single prompt per request,
//! so batches are processed as a sequential loop behind the same batch
//! interface the indexer uses for every provider.

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
struct OllamaRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaResponse {
    embedding: Vec<f32>,
}

pub struct OllamaEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        let endpoint = base
            .join("api/embeddings")
            .map_err(|e| Error::Config(format!("Invalid embedding base URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for text in texts {
            let body = OllamaRequest {
                model: self.model.clone(),
                prompt: text,
            };
            let request = self.client.post(self.endpoint.clone()).json(&body);
            let response: OllamaResponse = send_with_retry(request, RETRIES).await?;
            embeddings.push(response.embedding);
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> EmbeddingConfig {
        let mut config = EmbeddingConfig::default();
        config.provider = "ollama".to_string();
        config.base_url = format!("{}/", server.uri());
        config.model = "nomic-embed-text".to_string();
        config.dimension = 2;
        config
    }

    #[tokio::test]
    async fn test_sequential_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(json!({ "prompt": "alpha" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "embedding": [1.0, 0.0] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(json!({ "prompt": "beta" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.0, 1.0] })),
            )
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&config_for(&server)).unwrap();
        let vectors = embedder
            .embed_batch(vec!["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_server_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&config_for(&server)).unwrap();
        assert!(matches!(
            embedder.embed("x").await,
            Err(Error::Embedding(_))
        ));
    }
}
