//! Hybrid retrieval
//!
//! One pipeline serves three modes: a lexical leg over the full-text index,
//! a semantic leg over stored vectors, and a weighted fusion of the two.
//! Modes differ only in which legs run.
//!
//! Scores are normalized to 0..=1 before fusion:
//! - Lexical: the raw BM25 value (<= 0, lower is better) becomes
//!   `(-raw / normalizer).clamp(0, 1)`
//! - Semantic: cosine similarity in -1..=1 becomes `(cos + 1) / 2`

use crate::config::SearchConfig;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::store::IndexStore;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Candidate pool multiplier for the lexical leg; fusion reranks the pool
/// before the final cut
const LEXICAL_POOL_FACTOR: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Lexical,
    Semantic,
    Hybrid,
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "lexical" | "keyword" | "fts" => Ok(Self::Lexical),
            "semantic" | "vector" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(Error::Config(format!(
                "Unknown search mode '{}'; expected 'lexical', 'semantic' or 'hybrid'",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Semantic => write!(f, "semantic"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Per-query knobs; unset fields fall back to `SearchConfig`
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub limit: usize,
    pub path_filter: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Hybrid,
            limit: 10,
            path_filter: None,
        }
    }
}

/// A ranked search result
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub chunk_id: i64,
    pub path: String,
    pub start_line: i64,
    pub end_line: i64,
    pub excerpt: String,
    /// Final score after fusion, in 0..=1
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,
}

#[derive(Debug, Default)]
struct Candidate {
    path: String,
    start_line: i64,
    end_line: i64,
    content: String,
    lexical: Option<f32>,
    semantic: Option<f32>,
}

/// Query engine over one store
pub struct SearchEngine {
    store: Arc<IndexStore>,
    embedder: Option<Arc<dyn Embedder>>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(
        store: Arc<IndexStore>,
        embedder: Option<Arc<dyn Embedder>>,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run a query in the requested mode. Hybrid mode silently degrades to
    /// lexical when no embedding provider is configured; semantic mode does
    /// not.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let limit = options.limit.clamp(1, self.config.max_limit);
        let run_lexical = options.mode != SearchMode::Semantic;
        let semantic_embedder = if options.mode == SearchMode::Lexical {
            None
        } else {
            self.embedder.as_ref()
        };

        if options.mode == SearchMode::Semantic && semantic_embedder.is_none() {
            return Err(Error::Config(
                "Semantic search requires an embedding provider".to_string(),
            ));
        }

        let mut candidates: HashMap<i64, Candidate> = HashMap::new();

        if run_lexical {
            let pool = limit.saturating_mul(LEXICAL_POOL_FACTOR);
            let hits = self
                .store
                .full_text_query(query, pool, options.path_filter.as_deref())
                .await?;
            debug!("Lexical leg matched {} chunks", hits.len());

            for hit in hits {
                let normalized =
                    ((-hit.raw_score as f32) / self.config.bm25_normalizer).clamp(0.0, 1.0);
                let entry = candidates.entry(hit.chunk_id).or_default();
                entry.path = hit.path;
                entry.start_line = hit.start_line;
                entry.end_line = hit.end_line;
                entry.content = hit.content;
                entry.lexical = Some(normalized);
            }
        }

        if let Some(embedder) = semantic_embedder {
            let query_vector = embedder.embed(query).await?;
            let embedded = self
                .store
                .embedded_chunks(options.path_filter.as_deref())
                .await?;
            debug!("Semantic leg scored {} embedded chunks", embedded.len());

            let mut stale = 0_usize;
            for chunk in embedded {
                // vectors left behind by a different provider are not
                // comparable to the query embedding
                if chunk.model != embedder.model_name()
                    || chunk.vector.len() != query_vector.len()
                {
                    stale += 1;
                    continue;
                }
                let cosine = cosine_similarity(&query_vector, &chunk.vector);
                let normalized = ((cosine + 1.0) / 2.0).clamp(0.0, 1.0);
                let entry = candidates.entry(chunk.chunk_id).or_default();
                entry.path = chunk.path;
                entry.start_line = chunk.start_line;
                entry.end_line = chunk.end_line;
                entry.content = chunk.content;
                entry.semantic = Some(normalized);
            }
            if stale > 0 {
                debug!("Skipped {} vectors from a different embedding model", stale);
            }
        }

        let weight = self.config.semantic_weight;
        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .map(|(chunk_id, c)| {
                let score = match (c.semantic, c.lexical) {
                    (Some(sem), Some(lex)) => weight * sem + (1.0 - weight) * lex,
                    (Some(sem), None) => sem,
                    (None, Some(lex)) => lex,
                    (None, None) => 0.0,
                };
                SearchHit {
                    chunk_id,
                    path: c.path,
                    start_line: c.start_line,
                    end_line: c.end_line,
                    excerpt: build_excerpt(&c.content, query, self.config.excerpt_max_chars),
                    score,
                    lexical_score: c.lexical,
                    semantic_score: c.semantic,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Cosine similarity with a zero-norm guard
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Pick the excerpt window: the sub-span with the highest density of
/// query-term occurrences, or the chunk head when no term appears literally.
/// All positions are char indices so the cut never splits a code point.
fn build_excerpt(content: &str, query: &str, max_chars: usize) -> String {
    let trimmed = content.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= max_chars {
        return trimmed.to_string();
    }

    let matches = term_positions(&chars, query);
    let start = if matches.is_empty() {
        0
    } else {
        densest_window_start(&matches, max_chars).min(chars.len() - max_chars)
    };

    let mut excerpt: String = chars[start..start + max_chars].iter().collect();
    if start > 0 {
        excerpt = format!("...{}", excerpt);
    }
    if start + max_chars < chars.len() {
        excerpt.push_str("...");
    }
    excerpt
}

/// Char positions where any query term occurs, case-insensitive, sorted
fn term_positions(chars: &[char], query: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    for term in query.split_whitespace() {
        let term_chars: Vec<char> = term.chars().collect();
        if term_chars.is_empty() || term_chars.len() > chars.len() {
            continue;
        }
        for start in 0..=chars.len() - term_chars.len() {
            let matched = chars[start..start + term_chars.len()]
                .iter()
                .zip(&term_chars)
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()));
            if matched {
                positions.push(start);
            }
        }
    }
    positions.sort_unstable();
    positions
}

/// Start of the `max_chars` window covering the most term matches, with the
/// matched cluster centered inside it
fn densest_window_start(matches: &[usize], max_chars: usize) -> usize {
    let mut best_lo = 0;
    let mut best_hi = 0;
    let mut best_count = 0;
    let mut lo = 0;
    for hi in 0..matches.len() {
        while matches[hi] - matches[lo] >= max_chars {
            lo += 1;
        }
        let count = hi - lo + 1;
        if count > best_count {
            best_count = count;
            best_lo = lo;
            best_hi = hi;
        }
    }
    let span = matches[best_hi] - matches[best_lo];
    matches[best_lo].saturating_sub((max_chars - span) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_lines;
    use async_trait::async_trait;

    /// Embeds to a fixed vocabulary axis so similarity is predictable
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("network") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "axis"
        }
    }

    async fn seeded_store() -> Arc<IndexStore> {
        let store = IndexStore::in_memory().await.unwrap();
        let files = [
            ("net.rs", "network socket retry logic"),
            ("math.rs", "matrix multiplication kernel"),
        ];
        for (path, text) in files {
            let chunks = chunk_lines(text, 10);
            let outcome = store
                .replace_file(path, path, 0, text.len() as i64, &chunks)
                .await
                .unwrap();
            let vector = if text.contains("network") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            };
            store
                .put_embeddings(&[(outcome.chunk_ids[0], vector)], "axis", 2)
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    fn engine(store: Arc<IndexStore>, embedder: Option<Arc<dyn Embedder>>) -> SearchEngine {
        SearchEngine::new(store, embedder, SearchConfig::default())
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("lexical".parse::<SearchMode>().unwrap(), SearchMode::Lexical);
        assert_eq!("Hybrid".parse::<SearchMode>().unwrap(), SearchMode::Hybrid);
        assert_eq!("vector".parse::<SearchMode>().unwrap(), SearchMode::Semantic);
        assert!("psychic".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_lexical_mode() {
        let store = seeded_store().await;
        let hits = engine(store, None)
            .search(
                "socket",
                &SearchOptions {
                    mode: SearchMode::Lexical,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "net.rs");
        assert!(hits[0].lexical_score.is_some());
        assert!(hits[0].semantic_score.is_none());
        assert!(hits[0].score > 0.0 && hits[0].score <= 1.0);
    }

    #[tokio::test]
    async fn test_semantic_mode_ranks_by_cosine() {
        let store = seeded_store().await;
        let hits = engine(store, Some(Arc::new(AxisEmbedder)))
            .search(
                "network things",
                &SearchOptions {
                    mode: SearchMode::Semantic,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, "net.rs");
        assert!(hits[0].score > hits[1].score);
        assert!(hits[0].lexical_score.is_none());
    }

    #[tokio::test]
    async fn test_semantic_mode_requires_embedder() {
        let store = seeded_store().await;
        let result = engine(store, None)
            .search(
                "anything",
                &SearchOptions {
                    mode: SearchMode::Semantic,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_hybrid_degrades_to_lexical_without_embedder() {
        let store = seeded_store().await;
        let hits = engine(store, None)
            .search("socket", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert!(hits[0].semantic_score.is_none());
    }

    #[tokio::test]
    async fn test_hybrid_fuses_both_legs() {
        let store = seeded_store().await;
        let hits = engine(store, Some(Arc::new(AxisEmbedder)))
            .search("network", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(hits[0].path, "net.rs");
        assert!(hits[0].lexical_score.is_some());
        assert!(hits[0].semantic_score.is_some());

        // a hit with both legs beats the semantic-only straggler
        let weight = SearchConfig::default().semantic_weight;
        let expected = weight * hits[0].semantic_score.unwrap()
            + (1.0 - weight) * hits[0].lexical_score.unwrap();
        assert!((hits[0].score - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ties_break_by_chunk_id() {
        let store = IndexStore::in_memory().await.unwrap();
        for path in ["a.rs", "b.rs"] {
            let chunks = chunk_lines("identical token", 10);
            store.replace_file(path, path, 0, 10, &chunks).await.unwrap();
        }

        let hits = engine(Arc::new(store), None)
            .search(
                "identical",
                &SearchOptions {
                    mode: SearchMode::Lexical,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits[0].chunk_id < hits[1].chunk_id);
    }

    /// Embeds "socket" and anything mentioning "gamma" onto one axis,
    /// everything else onto the other
    struct GaugeEmbedder;

    #[async_trait]
    impl Embedder for GaugeEmbedder {
        async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.as_str() == "socket" || t.contains("gamma") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "gauge"
        }
    }

    #[tokio::test]
    async fn test_vectors_from_other_models_are_skipped() {
        let store = seeded_store().await;

        // a leftover vector with the wrong model and dimension must not
        // contribute a semantic score
        let chunks = chunk_lines("network drivers", 10);
        let outcome = store
            .replace_file("stale.rs", "stale", 0, 15, &chunks)
            .await
            .unwrap();
        store
            .put_embeddings(&[(outcome.chunk_ids[0], vec![0.1, 0.2, 0.3])], "old", 3)
            .await
            .unwrap();

        let hits = engine(store, Some(Arc::new(AxisEmbedder)))
            .search(
                "network",
                &SearchOptions {
                    mode: SearchMode::Semantic,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(hits[0].path, "net.rs");
        assert!(hits.iter().all(|h| h.path != "stale.rs"));
    }

    #[tokio::test]
    async fn test_semantic_weight_shifts_ranking() {
        let store = IndexStore::in_memory().await.unwrap();
        let docs = [
            ("freq.rs", "socket socket socket socket socket"),
            ("topic.rs", "socket gamma"),
        ];
        let embedder = GaugeEmbedder;
        for (path, text) in docs {
            let chunks = chunk_lines(text, 10);
            let outcome = store
                .replace_file(path, path, 0, text.len() as i64, &chunks)
                .await
                .unwrap();
            let vector = embedder
                .embed_batch(vec![text.to_string()])
                .await
                .unwrap()
                .remove(0);
            store
                .put_embeddings(&[(outcome.chunk_ids[0], vector)], "gauge", 2)
                .await
                .unwrap();
        }
        let store = Arc::new(store);

        let search_at = |weight: f32| {
            let store = store.clone();
            async move {
                let config = SearchConfig {
                    semantic_weight: weight,
                    ..Default::default()
                };
                SearchEngine::new(store, Some(Arc::new(GaugeEmbedder)), config)
                    .search("socket", &SearchOptions::default())
                    .await
                    .unwrap()
            }
        };

        // the term-frequency winner leads when only lexical scores count
        let lexical_only = search_at(0.0).await;
        assert_eq!(lexical_only[0].path, "freq.rs");

        // at full semantic weight the on-topic document overtakes it
        let semantic_only = search_at(1.0).await;
        assert_eq!(semantic_only[0].path, "topic.rs");
        assert!((semantic_only[0].semantic_score.unwrap() - 1.0).abs() < 1e-6);

        let rank = |hits: &[SearchHit]| {
            hits.iter().position(|h| h.path == "topic.rs").unwrap()
        };
        assert!(rank(&semantic_only) <= rank(&lexical_only));
    }

    #[test]
    fn test_excerpt_short_content_unchanged() {
        assert_eq!(build_excerpt("short text", "query", 240), "short text");
    }

    #[test]
    fn test_excerpt_centers_on_match() {
        let filler = "x".repeat(500);
        let content = format!("{} needle {}", filler, filler);
        let excerpt = build_excerpt(&content, "needle", 60);

        assert!(excerpt.contains("needle"));
        assert!(excerpt.chars().count() <= 66); // window plus ellipses
    }

    #[test]
    fn test_excerpt_falls_back_to_head() {
        let content = format!("head marker {}", "y".repeat(500));
        let excerpt = build_excerpt(&content, "absent", 40);
        assert!(excerpt.starts_with("head marker"));
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_excerpt_handles_multibyte_content() {
        // 'İ' lowercases to two code points, so byte offsets derived from a
        // lowercased copy do not line up with the original text
        let content = format!("{} needle tail", "İ".repeat(300));
        let excerpt = build_excerpt(&content, "needle", 40);
        assert!(excerpt.contains("needle"));
    }

    #[test]
    fn test_excerpt_picks_densest_cluster() {
        let content = format!(
            "needle {} needle needle needle {}",
            "x".repeat(200),
            "y".repeat(100)
        );
        let excerpt = build_excerpt(&content, "needle", 60);
        assert_eq!(excerpt.matches("needle").count(), 3);
    }
}
