//! Query driver: free-text question → ranked capabilities plus an overview.
//!
//! [`search`] never fails. Problems degrade the answer instead:
//!
//! | Situation | Result |
//! |-----------|--------|
//! | blank query, empty store, no hits | canned [`NO_MATCHES`] overview, generator not called |
//! | embedding or store failure | overview `Search failed: {error}`, `error` set |
//! | generator failure | matches kept, overview `Analysis failed. ...` |
//! | summary failure | that match's summary says so, others unaffected |

use anyhow::{bail, Result};
use chrono::Utc;

use crate::config::Config;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::generation::TextGenerator;
use crate::models::{CapabilityMatch, QueryResult};
use crate::prompts;
use crate::store::{ScoredChunk, VectorStore};

pub const NO_MATCHES: &str = "No matching capabilities found for the given query.";

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub limit: usize,
    /// Generate a short summary for every match.
    pub summaries: bool,
}

pub fn source_link(file_path: &str, sheet_name: &str, row_index: i64) -> String {
    format!("file://{}#sheet={}&row={}", file_path, sheet_name, row_index)
}

fn to_match(rank: usize, hit: ScoredChunk) -> CapabilityMatch {
    let m = hit.metadata;
    CapabilityMatch {
        rank,
        source_link: source_link(&m.file_path, &m.sheet_name, m.row_index),
        capability: m.capability,
        business_description: m.scope_description,
        system_changes: m.system_changes,
        similarity_score: 1.0 - hit.distance,
        distance: hit.distance,
        file_name: m.file_name,
        summary: None,
    }
}

fn analysis_failed(query: &str, found: usize) -> String {
    format!(
        "Analysis failed. Found {} matching capabilities for '{}'.",
        found, query
    )
}

fn summary_failed(capability: &str) -> String {
    format!("Summary generation failed for capability: {}", capability)
}

fn result(query: &str, overview: String, matches: Vec<CapabilityMatch>) -> QueryResult {
    QueryResult {
        query: query.to_string(),
        overview,
        total_found: matches.len(),
        matches,
        timestamp: Utc::now().to_rfc3339(),
        error: None,
    }
}

/// Nearest capabilities to `query`, closest first.
///
/// A query that embeds to the zero vector has no direction and matches
/// nothing. A query vector whose length differs from every stored vector
/// means the store was built with another model and is an error.
pub async fn find_matches(
    query: &str,
    limit: usize,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> Result<Vec<CapabilityMatch>> {
    if store.count().await? == 0 {
        return Ok(Vec::new());
    }
    let vector = embed_query(embedder, query).await?;
    if vector.iter().all(|v| *v == 0.0) {
        tracing::debug!(query, "query embedding is the zero vector");
        return Ok(Vec::new());
    }

    let stored_dims = store.dims().await?;
    if !stored_dims.contains(&vector.len()) {
        bail!(
            "Query embedding from '{}' has {} dimensions but stored chunks have {:?}; \
             re-index with the current embedding model",
            embedder.model_name(),
            vector.len(),
            stored_dims
        );
    }

    let hits = store.query(&vector, limit).await?;
    Ok(hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| to_match(i + 1, hit))
        .collect())
}

pub async fn search(
    config: &Config,
    query: &str,
    options: SearchOptions,
    embedder: &dyn EmbeddingProvider,
    generator: &dyn TextGenerator,
    store: &dyn VectorStore,
) -> QueryResult {
    let query = query.trim();
    if query.is_empty() {
        return result(query, NO_MATCHES.to_string(), Vec::new());
    }

    let started = std::time::Instant::now();
    let mut matches = match find_matches(query, options.limit, embedder, store).await {
        Ok(matches) => matches,
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::error!(query, error = %message, "search failed");
            let mut failed = result(query, format!("Search failed: {}", message), Vec::new());
            failed.error = Some(message);
            return failed;
        }
    };
    tracing::info!(
        query,
        found = matches.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "retrieved matches"
    );

    if matches.is_empty() {
        return result(query, NO_MATCHES.to_string(), matches);
    }

    let request = prompts::overview_request(
        query,
        &matches,
        config.retrieval.overview_matches,
        config.retrieval.source_links,
        &config.generation,
    );
    let overview = match generator.generate(&request).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            tracing::warn!(query, "generator returned an empty overview");
            analysis_failed(query, matches.len())
        }
        Err(e) => {
            tracing::warn!(query, error = %format!("{:#}", e), "overview generation failed");
            analysis_failed(query, matches.len())
        }
    };

    if options.summaries {
        for m in matches.iter_mut() {
            let request = prompts::summary_request(m, &config.generation);
            m.summary = Some(match generator.generate(&request).await {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => summary_failed(&m.capability),
                Err(e) => {
                    tracing::warn!(capability = %m.capability, error = %e, "summary failed");
                    summary_failed(&m.capability)
                }
            });
        }
    }

    result(query, overview, matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::embedding::HashProvider;
    use crate::generation::GenerationRequest;
    use crate::store::memory::InMemoryStore;
    use crate::store::test_support::record;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeGenerator {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        fn model_name(&self) -> &str {
            "fake"
        }
        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("model unavailable");
            }
            Ok(format!("generated ({} chars)", request.prompt.len()))
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        fn model_name(&self) -> &str {
            "broken"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            bail!("connection refused")
        }
    }

    fn config() -> Config {
        parse_config("[db]\npath = \"x.sqlite\"\n[workbooks]\nroot = \".\"\n").unwrap()
    }

    fn options(summaries: bool) -> SearchOptions {
        SearchOptions {
            limit: 5,
            summaries,
        }
    }

    async fn seeded(embedder: &HashProvider) -> InMemoryStore {
        let store = InMemoryStore::new();
        let rows = [
            ("a.xlsx", 2, "Customer Consent Review"),
            ("a.xlsx", 3, "Ledger Posting"),
            ("b.xlsx", 5, "Mutual Funds Selection"),
        ];
        let records: Vec<_> = rows
            .iter()
            .map(|(f, r, c)| record(f, *r, c, embedder.embed_one(c)))
            .collect();
        store.upsert(&records).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_empty_store_skips_generation() {
        let embedder = HashProvider::new(64);
        let generator = FakeGenerator::new(false);
        let store = InMemoryStore::new();
        let res = search(&config(), "anything", options(true), &embedder, &generator, &store).await;
        assert_eq!(res.total_found, 0);
        assert_eq!(res.overview, NO_MATCHES);
        assert!(res.error.is_none());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_query_is_no_matches() {
        let embedder = HashProvider::new(64);
        let generator = FakeGenerator::new(false);
        let store = seeded(&embedder).await;
        let res = search(&config(), "   ", options(false), &embedder, &generator, &store).await;
        assert_eq!(res.overview, NO_MATCHES);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_ranked_matches_with_overview() {
        let embedder = HashProvider::new(256);
        let generator = FakeGenerator::new(false);
        let store = seeded(&embedder).await;
        let res = search(
            &config(),
            "customer consent",
            options(false),
            &embedder,
            &generator,
            &store,
        )
        .await;

        assert_eq!(res.total_found, 3);
        assert_eq!(res.matches[0].capability, "Customer Consent Review");
        assert_eq!(res.matches[0].rank, 1);
        assert_eq!(
            res.matches[0].source_link,
            "file:///data/a.xlsx#sheet=Capability List&row=2"
        );
        let m = &res.matches[0];
        assert!((m.similarity_score - (1.0 - m.distance)).abs() < 1e-9);
        assert!(res.overview.starts_with("generated"));
        assert!(m.summary.is_none());
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_degrades() {
        let embedder = HashProvider::new(64);
        let generator = FakeGenerator::new(true);
        let store = seeded(&embedder).await;
        let res = search(&config(), "ledger", options(true), &embedder, &generator, &store).await;
        assert_eq!(res.total_found, 3);
        assert_eq!(
            res.overview,
            "Analysis failed. Found 3 matching capabilities for 'ledger'."
        );
        assert!(res.error.is_none());
        let summary = res.matches[0].summary.as_deref().unwrap();
        assert!(summary.starts_with("Summary generation failed for capability: "));
        assert_eq!(generator.calls(), 4);
    }

    #[tokio::test]
    async fn test_embedding_failure_sets_error() {
        let generator = FakeGenerator::new(false);
        let store = seeded(&HashProvider::new(4)).await;
        let res = search(
            &config(),
            "consent",
            options(false),
            &BrokenEmbedder,
            &generator,
            &store,
        )
        .await;
        assert_eq!(res.total_found, 0);
        assert!(res.overview.starts_with("Search failed: "));
        assert!(res.error.unwrap().contains("connection refused"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_sets_error() {
        let generator = FakeGenerator::new(false);
        let store = seeded(&HashProvider::new(128)).await;
        let res = search(
            &config(),
            "login",
            options(false),
            &HashProvider::new(64),
            &generator,
            &store,
        )
        .await;
        assert_eq!(res.total_found, 0);
        assert!(res.matches.is_empty());
        assert!(res.overview.starts_with("Search failed: "));
        assert!(res.error.unwrap().contains("64 dimensions"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_punctuation_query_matches_nothing() {
        let embedder = HashProvider::new(64);
        let generator = FakeGenerator::new(false);
        let store = seeded(&embedder).await;
        let res = search(&config(), "???", options(true), &embedder, &generator, &store).await;
        assert_eq!(res.total_found, 0);
        assert_eq!(res.overview, NO_MATCHES);
        assert!(res.error.is_none());
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn test_source_link_format() {
        assert_eq!(
            source_link("/x/Estimate 1.xlsx", "Capability List", 7),
            "file:///x/Estimate 1.xlsx#sheet=Capability List&row=7"
        );
    }
}
