//! Embedding cache
//!
//! Keyword ranking and distractor filtering embed the same phrases and the
//! same summary many times within a run. `CachedEmbedder` wraps any
//! `Embedder` with a moka cache so repeats cost nothing.
//!
//! Author: hephaex@gmail.com

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcq_core::{CacheConfig, Embedder, McqError, Result};
use moka::future::Cache;
use serde::{Deserialize, Serialize};

// ============================================================================
// Embedding Cache
// ============================================================================

/// Text -> embedding cache with hit/miss accounting
#[derive(Clone)]
pub struct EmbeddingCache {
    cache: Cache<String, Arc<Vec<f32>>>,
    stats: Arc<CacheStats>,
}

impl EmbeddingCache {
    /// Create a new embedding cache with default configuration
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    /// Create a new embedding cache with custom configuration
    pub fn with_config(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.embedding_max_capacity)
            .time_to_live(Duration::from_secs(config.embedding_ttl_seconds))
            .build();

        Self {
            cache,
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let result = self.cache.get(text).await;

        if result.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }

        result.map(|v| v.as_ref().clone())
    }

    pub async fn put(&self, text: &str, embedding: Vec<f32>) {
        self.cache.insert(text.to_string(), Arc::new(embedding)).await;
        self.stats.record_write();
    }

    /// Clear all cached embeddings
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        // Wait for all pending invalidations to complete
        self.cache.run_pending_tasks().await;
        self.stats.reset();
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Cache Statistics
// ============================================================================

/// Statistics for cache performance monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    pub fn report(&self) -> CacheStatsReport {
        CacheStatsReport {
            hits: self.hits(),
            misses: self.misses(),
            writes: self.writes(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Serializable cache statistics report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub hit_rate: f64,
}

// ============================================================================
// Cached Embedder
// ============================================================================

/// An `Embedder` that consults an `EmbeddingCache` first
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: EmbeddingCache,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: EmbeddingCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.cache.get(text).await {
            return Ok(hit);
        }

        let embedding = self.inner.embed(text).await?;
        self.cache.put(text, embedding.clone()).await;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing: Vec<String> = Vec::new();

        for text in texts {
            let hit = self.cache.get(text).await;
            if hit.is_none() && !missing.contains(text) {
                missing.push(text.clone());
            }
            results.push(hit);
        }

        if !missing.is_empty() {
            let computed = self.inner.embed_batch(&missing).await?;
            if computed.len() != missing.len() {
                return Err(McqError::EmbeddingFailure(format!(
                    "Expected {} embeddings, got {}",
                    missing.len(),
                    computed.len()
                )));
            }
            for (text, embedding) in missing.iter().zip(computed) {
                self.cache.put(text, embedding.clone()).await;
                for (slot, t) in results.iter_mut().zip(texts) {
                    if slot.is_none() && t == text {
                        *slot = Some(embedding.clone());
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| McqError::EmbeddingFailure("Missing embedding".to_string())))
            .collect()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn counting() -> Arc<CountingEmbedder> {
        Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_embedding_cache_basic() {
        let cache = EmbeddingCache::new();

        let text = "Paris";
        let embedding = vec![0.1, 0.2, 0.3, 0.4];

        assert!(cache.get(text).await.is_none());
        assert_eq!(cache.stats().misses(), 1);

        cache.put(text, embedding.clone()).await;
        assert_eq!(cache.get(text).await, Some(embedding));
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().writes(), 1);
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = EmbeddingCache::new();
        cache.put("text1", vec![1.0]).await;
        cache.clear().await;

        assert!(cache.get("text1").await.is_none());
        assert_eq!(cache.stats().hits(), 0);
    }

    #[tokio::test]
    async fn test_cached_embedder_reuses_results() {
        let inner = counting();
        let embedder = CachedEmbedder::new(inner.clone(), EmbeddingCache::new());

        let first = embedder.embed("France").await.unwrap();
        let second = embedder.embed("France").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert!((embedder.cache().stats().hit_rate() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cached_batch_only_embeds_misses() {
        let inner = counting();
        let embedder = CachedEmbedder::new(inner.clone(), EmbeddingCache::new());
        embedder.embed("Paris").await.unwrap();

        let texts = vec![
            "Paris".to_string(),
            "Berlin".to_string(),
            "Berlin".to_string(),
            "Madrid".to_string(),
        ];
        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), 4);
        assert_eq!(vectors[1], vec![6.0, 1.0]);
        assert_eq!(vectors[1], vectors[2]);
        // Paris once, then Berlin and Madrid
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }
}
