pub mod analytics;
pub mod cache;
pub mod client;
pub mod enrichment;
mod error;
pub mod index;
mod job;
pub mod matching;
mod processor;
pub mod sanitize;
mod search_options;
pub mod r#static;
pub mod store;
pub mod tracker;

pub mod generation;

#[cfg(test)]
mod tests;

use analytics::{CacheAnalytics, CacheMetrics};
use cache::{CacheConfig, CacheStats, TtlCache};
use chrono::Duration;
use client::{JobProvider, RawJob};
use enrichment::{Enricher, EnrichmentFields};
use generation::{RateLimitedGenerator, TextGenerator};
use index::{FilterBuilder, IndexQuery, SearchIndex};
use matching::SubstringMatcher;
use processor::{free_text, JobProcessor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use store::JobStore;
use tracker::{RequestTracker, TrackerConfig};

pub use error::{Error, ErrorKind, Result};
pub use job::{derive_job_id, JobRecord};
pub use processor::PipelineConfig;
pub use search_options::contract_type::ContractType;
pub use search_options::{SearchKey, SearchQuery};

/// Top-level configuration for the client. Every TTL, timeout, and
/// threshold is an input here rather than a constant buried in the code.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub cache: CacheConfig,
    pub tracker: TrackerConfig,
    pub pipeline: PipelineConfig,
    /// Default index page size for `get_jobs`.
    pub page_size: usize,
    /// Upper bound a caller-supplied limit is clamped to.
    pub max_page_size: usize,
    /// Analytics ring-buffer capacity.
    pub max_events: usize,
    /// Minimum spacing between text-generation calls.
    pub min_generation_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            tracker: TrackerConfig::default(),
            pipeline: PipelineConfig::default(),
            page_size: 3,
            max_page_size: 10,
            max_events: 1000,
            min_generation_interval: Duration::seconds(4),
        }
    }
}

/// Whether the response is a synchronous result or a poll-again marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    Ok,
    Pending,
}

impl SearchStatus {
    /// HTTP status the transport layer above this crate should emit.
    pub fn code(&self) -> u16 {
        match self {
            SearchStatus::Ok => 200,
            SearchStatus::Pending => 202,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub total_results: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub search_in_progress: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: SearchStatus,
    pub data: Vec<JobRecord>,
    pub metadata: SearchMetadata,
}

impl SearchResponse {
    fn ok(data: Vec<JobRecord>, metadata: SearchMetadata) -> Self {
        Self {
            status: SearchStatus::Ok,
            data,
            metadata,
        }
    }

    fn pending(message: &str) -> Self {
        Self {
            status: SearchStatus::Pending,
            data: vec![],
            metadata: SearchMetadata {
                message: Some(message.to_string()),
                search_in_progress: true,
                ..Default::default()
            },
        }
    }
}

struct Inner {
    config: ClientConfig,
    index: Arc<dyn SearchIndex>,
    tracker: Arc<RequestTracker>,
    analytics: Arc<CacheAnalytics>,
    response_cache: Arc<TtlCache<SearchResponse>>,
    processor: Arc<JobProcessor>,
    sweepers: Vec<tokio::task::JoinHandle<()>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for handle in &self.sweepers {
            handle.abort();
        }
    }
}

/// Single entry point for job searches.
///
/// The index is authoritative for results; when it has nothing, the
/// population pipeline is spawned detached and callers poll. Cheap to
/// clone; all state is shared behind one `Arc`.
#[derive(Clone)]
pub struct JobSearchClient {
    inner: Arc<Inner>,
}

impl JobSearchClient {
    /// Build a client from its collaborators. Must be called within a
    /// tokio runtime: the cache sweepers are spawned here.
    pub fn new(
        config: ClientConfig,
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn JobStore>,
        provider: Arc<dyn JobProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let generator: Arc<dyn TextGenerator> = Arc::new(RateLimitedGenerator::new(
            generator,
            config.min_generation_interval,
        ));

        let response_cache: Arc<TtlCache<SearchResponse>> = Arc::new(TtlCache::new(
            config.cache.response_ttl,
            config.cache.max_entries,
            config.cache.enabled,
        ));
        let enrichment_cache: Arc<TtlCache<EnrichmentFields>> = Arc::new(TtlCache::new(
            config.cache.enrichment_ttl,
            config.cache.max_entries,
            config.cache.enabled,
        ));
        let raw_cache: Arc<TtlCache<Vec<RawJob>>> = Arc::new(TtlCache::new(
            config.cache.raw_jobs_ttl,
            config.cache.max_entries,
            config.cache.enabled,
        ));

        let sweepers = vec![
            TtlCache::spawn_sweeper(response_cache.clone(), config.cache.sweep_interval),
            TtlCache::spawn_sweeper(enrichment_cache.clone(), config.cache.sweep_interval),
            TtlCache::spawn_sweeper(raw_cache.clone(), config.cache.sweep_interval),
        ];

        let processor = Arc::new(JobProcessor::new(
            index.clone(),
            store,
            provider,
            sanitize::Sanitizer::new(generator.clone()),
            Enricher::new(
                generator,
                enrichment_cache,
                config.pipeline.max_enrichments_per_pass,
            ),
            Arc::new(SubstringMatcher::new()),
            raw_cache,
            config.pipeline.clone(),
        ));

        log::info!(
            "initialized JobSearchClient (response TTL: {}min, negative TTL: {}min)",
            config.cache.response_ttl.num_minutes(),
            config.tracker.negative_ttl.num_minutes()
        );

        Self {
            inner: Arc::new(Inner {
                tracker: Arc::new(RequestTracker::new(config.tracker.clone())),
                analytics: Arc::new(CacheAnalytics::new(config.max_events)),
                config,
                index,
                response_cache,
                processor,
                sweepers,
            }),
        }
    }

    /// Serve a search from cache or the index; on empty, decide between
    /// "still searching", "known empty", and spawning the population
    /// pipeline. Never errors toward the caller: worst case is an empty
    /// `Ok` or a `Pending`.
    pub async fn get_jobs(&self, query: &SearchQuery) -> SearchResponse {
        self.get_jobs_page(query, 0, None).await
    }

    pub async fn get_jobs_page(
        &self,
        query: &SearchQuery,
        page: usize,
        limit: Option<usize>,
    ) -> SearchResponse {
        let inner = &self.inner;
        let key = query.search_key();
        let limit = limit
            .unwrap_or(inner.config.page_size)
            .clamp(1, inner.config.max_page_size);
        let cache_key = format!("{}:{}:{}", key, page, limit);

        if let Some(cached) = inner.response_cache.get(&cache_key) {
            inner.analytics.record_hit(key.as_str());
            return cached;
        }
        inner.analytics.record_miss(key.as_str());

        let index_query = IndexQuery {
            query: free_text(query),
            filters: Self::index_filters(query),
            page,
            hits_per_page: limit,
        };

        let started = std::time::Instant::now();
        let result = inner.index.search(&index_query).await;
        inner
            .analytics
            .record_external_query(key.as_str(), started.elapsed().as_millis() as u64);

        match result {
            Ok(index_page) if index_page.nb_hits > 0 => {
                // A positive result always wins over a remembered empty one.
                inner.tracker.clear_negative(key.as_str());

                let total = index_page.nb_hits;
                let data: Vec<JobRecord> =
                    index_page.hits.into_iter().map(|hit| hit.job).collect();
                let response = SearchResponse::ok(
                    data,
                    SearchMetadata {
                        total_results: total,
                        page,
                        limit,
                        has_more: (page + 1) * limit < total,
                        ..Default::default()
                    },
                );
                inner.response_cache.set(cache_key, response.clone());
                response
            }
            Ok(_) => self.no_results(query, &key, &cache_key, page, limit).await,
            Err(err) => {
                // An index failure is handled exactly like an empty result.
                log::warn!("index query failed for key {}: {}", key, err);
                self.no_results(query, &key, &cache_key, page, limit).await
            }
        }
    }

    async fn no_results(
        &self,
        query: &SearchQuery,
        key: &SearchKey,
        cache_key: &str,
        page: usize,
        limit: usize,
    ) -> SearchResponse {
        let inner = &self.inner;

        // Coalescing guarantee: a live population task means no new work.
        if inner.tracker.is_processing(key.as_str()) {
            return SearchResponse::pending("Still searching for matching jobs, check back shortly");
        }

        if inner.tracker.is_cached_empty(key.as_str()) {
            let response = SearchResponse::ok(
                vec![],
                SearchMetadata {
                    total_results: 0,
                    page,
                    limit,
                    cached: true,
                    ..Default::default()
                },
            );
            // Short-circuits future identical calls without re-touching
            // the tracker.
            inner.response_cache.set(cache_key.to_string(), response.clone());
            return response;
        }

        // Atomic claim: concurrent no-hit searches on the same key get
        // exactly one winner, the rest answer "still searching".
        if !inner.tracker.try_start_processing(key.as_str()) {
            return SearchResponse::pending("Still searching for matching jobs, check back shortly");
        }
        inner.analytics.record_background_population(key.as_str());

        let processor = inner.processor.clone();
        let tracker = inner.tracker.clone();
        let query = query.clone();
        let key = key.clone();
        // Fire and forget: the triggering request has already answered by
        // the time this resolves; its outcome lives in the tracker.
        tokio::spawn(async move {
            let success = processor.fetch_and_process(&query, &key).await;
            tracker.finish_processing(key.as_str(), success);
            if !success {
                tracker.cache_empty_result(key.as_str());
            }
        });

        SearchResponse::pending("No results yet, a background search has been started")
    }

    fn index_filters(query: &SearchQuery) -> Option<String> {
        let mut builder = FilterBuilder::new();
        if let Some(min) = query.salary_min() {
            builder = builder.ge("salaryMin", *min as i64);
        }
        if let Some(max) = query.salary_max() {
            builder = builder.le("salaryMax", *max as i64);
        }
        if *query.remote() {
            builder = builder.eq_bool("remote", true);
        }
        builder.build()
    }

    /// Run the population pipeline synchronously, bypassing the tracker.
    /// Intended for cache warming. Returns true iff at least one job was
    /// usefully stored.
    pub async fn fetch_and_process_job(
        &self,
        query: &SearchQuery,
        search_key: Option<SearchKey>,
    ) -> bool {
        let key = search_key.unwrap_or_else(|| query.search_key());
        self.inner.processor.fetch_and_process(query, &key).await
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.analytics.metrics()
    }

    pub fn efficiency_report(&self) -> f64 {
        self.inner.analytics.efficiency_report()
    }

    pub fn hourly_stats(&self) -> CacheMetrics {
        self.inner.analytics.hourly_stats()
    }

    pub fn reset_metrics(&self) {
        self.inner.analytics.reset();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.response_cache.stats()
    }

    /// Wipe the positive cache and tracker state, for one key or all.
    pub fn clear_caches(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.inner.response_cache.remove_prefix(key);
                self.inner.tracker.clear(Some(key));
            }
            None => {
                self.inner.response_cache.clear();
                self.inner.tracker.clear(None);
            }
        }
    }
}
