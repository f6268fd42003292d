use crate::client::{FetchFilter, JobProvider, RawJob};
use crate::error::{Error, Result};
use crate::generation::TextGenerator;
use crate::index::memory::InMemoryIndex;
use crate::index::{IndexPage, IndexQuery, IndexedJob, SearchIndex};
use crate::store::memory::InMemoryStore;
use crate::store::JobStore;
use crate::{ClientConfig, JobRecord, JobSearchClient, SearchQuery, SearchStatus};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

struct StubProvider {
    jobs: Vec<RawJob>,
    calls: AtomicUsize,
    delay: StdDuration,
}

#[async_trait]
impl JobProvider for StubProvider {
    async fn fetch(&self, _filter: &FetchFilter) -> Result<Vec<RawJob>> {
        tokio::time::sleep(self.delay).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.jobs.clone())
    }
}

struct ProseGenerator;

#[async_trait]
impl TextGenerator for ProseGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        // Never valid JSON: every record takes the fallback transform.
        Ok("happy to help! the posting looks fine as is.".to_string())
    }
}

struct FailingIndex;

#[async_trait]
impl SearchIndex for FailingIndex {
    async fn search(&self, _query: &IndexQuery) -> Result<IndexPage> {
        Err(Error::Index("index unavailable".to_string()))
    }

    async fn save_objects(&self, _objects: &[IndexedJob]) -> Result<()> {
        Err(Error::Index("index unavailable".to_string()))
    }

    async fn delete_objects(&self, _object_ids: &[String]) -> Result<()> {
        Err(Error::Index("index unavailable".to_string()))
    }
}

fn remote_raw_job() -> RawJob {
    RawJob {
        title: "Software Engineer".to_string(),
        company: "Acme".to_string(),
        description: "Build services in Rust.".to_string(),
        location: "Remote".to_string(),
        remote: true,
        url: "https://example.com/jobs/1".to_string(),
        date_posted: "2026-08-01".to_string(),
        ..Default::default()
    }
}

fn fast_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    // Keep tests fast: no generation spacing, no enrichment calls.
    config.min_generation_interval = Duration::zero();
    config.pipeline.max_enrichments_per_pass = 0;
    config
}

struct Fixture {
    client: JobSearchClient,
    index: Arc<InMemoryIndex>,
    store: Arc<InMemoryStore>,
    provider: Arc<StubProvider>,
}

fn fixture(jobs: Vec<RawJob>, delay_ms: u64) -> Fixture {
    let index = Arc::new(InMemoryIndex::new());
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(StubProvider {
        jobs,
        calls: AtomicUsize::new(0),
        delay: StdDuration::from_millis(delay_ms),
    });
    let client = JobSearchClient::new(
        fast_config(),
        index.clone(),
        store.clone(),
        provider.clone(),
        Arc::new(ProseGenerator),
    );
    Fixture {
        client,
        index,
        store,
        provider,
    }
}

fn indexed(id: &str, title: &str, location: &str) -> IndexedJob {
    IndexedJob {
        job: JobRecord {
            id: id.to_string(),
            title: title.to_string(),
            location: location.to_string(),
            date_posted: "2026-08-01".to_string(),
            ..Default::default()
        },
        ingested_at: Utc::now().timestamp(),
    }
}

#[tokio::test]
async fn test_cold_cache_poll_scenario() {
    let f = fixture(vec![remote_raw_job()], 80);
    let query = SearchQuery::new("Software Engineer", "Remote");

    // First caller pays nothing but gets a pending marker.
    let first = f.client.get_jobs(&query).await;
    assert_eq!(first.status, SearchStatus::Pending);
    assert_eq!(first.status.code(), 202);

    // An immediate repeat is coalesced onto the same task.
    let second = f.client.get_jobs(&query).await;
    assert_eq!(second.status, SearchStatus::Pending);
    assert!(second.metadata.search_in_progress);

    tokio::time::sleep(StdDuration::from_millis(400)).await;
    assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);

    // The ingested record is now visible through the index.
    let third = f.client.get_jobs(&query).await;
    assert_eq!(third.status, SearchStatus::Ok);
    assert_eq!(third.data.len(), 1);
    assert_eq!(third.data[0].title, "Software Engineer");
    assert_eq!(third.metadata.total_results, 1);
}

#[tokio::test]
async fn test_concurrent_no_hit_searches_coalesce() {
    let f = fixture(vec![], 80);
    let query = SearchQuery::new("Underwater Basket Weaver", "Atlantis");

    let futures: Vec<_> = (0..5).map(|_| f.client.get_jobs(&query)).collect();
    let responses = futures::future::join_all(futures).await;
    for response in &responses {
        assert_eq!(response.status, SearchStatus::Pending);
    }

    tokio::time::sleep(StdDuration::from_millis(300)).await;
    assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.client.metrics().background_populations, 1);
}

#[tokio::test]
async fn test_failed_population_hits_negative_cache() {
    let f = fixture(vec![], 10);
    let query = SearchQuery::new("Software Engineer", "Nowhere Springs");

    let first = f.client.get_jobs(&query).await;
    assert_eq!(first.status, SearchStatus::Pending);

    tokio::time::sleep(StdDuration::from_millis(200)).await;

    // Within the negative-TTL window: explicit empty, no new task.
    let second = f.client.get_jobs(&query).await;
    assert_eq!(second.status, SearchStatus::Ok);
    assert_eq!(second.metadata.total_results, 0);
    assert!(second.metadata.cached);
    assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.client.metrics().background_populations, 1);

    // The empty response was promoted into the positive cache.
    let before_hits = f.client.metrics().hits;
    let third = f.client.get_jobs(&query).await;
    assert_eq!(third.status, SearchStatus::Ok);
    assert_eq!(f.client.metrics().hits, before_hits + 1);
}

#[tokio::test]
async fn test_index_hit_clears_negative_cache() {
    let f = fixture(vec![], 10);
    let query = SearchQuery::new("Software Engineer", "Lisbon");
    let key = query.search_key();

    f.client.get_jobs(&query).await;
    tokio::time::sleep(StdDuration::from_millis(200)).await;
    assert!(f.client.inner.tracker.is_cached_empty(key.as_str()));

    // The corpus catches up out of band.
    f.index
        .save_objects(&[indexed("a", "Software Engineer", "Lisbon")])
        .await
        .unwrap();

    let response = f.client.get_jobs(&query).await;
    assert_eq!(response.status, SearchStatus::Ok);
    assert_eq!(response.data.len(), 1);
    assert!(!response.metadata.cached);
    assert!(!f.client.inner.tracker.is_cached_empty(key.as_str()));
}

#[tokio::test]
async fn test_positive_cache_serves_verbatim() {
    let f = fixture(vec![], 10);
    f.index
        .save_objects(&[indexed("a", "Data Engineer", "Berlin")])
        .await
        .unwrap();
    let query = SearchQuery::new("Data Engineer", "Berlin");

    let first = f.client.get_jobs(&query).await;
    assert_eq!(first.status, SearchStatus::Ok);

    let second = f.client.get_jobs(&query).await;
    assert_eq!(second.data, first.data);
    assert_eq!(second.metadata.total_results, first.metadata.total_results);

    let metrics = f.client.metrics();
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.misses, 1);
    // Only the miss touched the index.
    assert_eq!(metrics.external_queries, 1);
}

#[tokio::test]
async fn test_index_error_treated_as_empty() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(StubProvider {
        jobs: vec![],
        calls: AtomicUsize::new(0),
        delay: StdDuration::from_millis(10),
    });
    let client = JobSearchClient::new(
        fast_config(),
        Arc::new(FailingIndex),
        store,
        provider,
        Arc::new(ProseGenerator),
    );

    // The caller never sees the index failure, only a pending marker.
    let response = client.get_jobs(&SearchQuery::new("Engineer", "Remote")).await;
    assert_eq!(response.status, SearchStatus::Pending);
}

#[tokio::test]
async fn test_direct_fetch_for_cache_warming() {
    let f = fixture(vec![remote_raw_job()], 0);
    let query = SearchQuery::new("Software Engineer", "Remote");

    assert!(f.client.fetch_and_process_job(&query, None).await);
    assert_eq!(f.store.count().await.unwrap(), 1);
    assert_eq!(f.index.len(), 1);
}

#[tokio::test]
async fn test_reset_metrics_isolates_runs() {
    let f = fixture(vec![], 10);
    f.index
        .save_objects(&[indexed("a", "Engineer", "Oslo")])
        .await
        .unwrap();
    f.client.get_jobs(&SearchQuery::new("Engineer", "Oslo")).await;
    assert!(f.client.metrics().misses > 0);

    f.client.reset_metrics();
    let metrics = f.client.metrics();
    assert_eq!(metrics.hits, 0);
    assert_eq!(metrics.misses, 0);
    assert_eq!(metrics.external_queries, 0);
    assert!((f.client.efficiency_report() - 0.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_clear_caches_forgets_key_state() {
    let f = fixture(vec![], 10);
    let query = SearchQuery::new("Engineer", "Quiet Hamlet");
    let key = query.search_key();

    f.client.get_jobs(&query).await;
    tokio::time::sleep(StdDuration::from_millis(200)).await;
    assert!(f.client.inner.tracker.is_cached_empty(key.as_str()));

    f.client.clear_caches(Some(key.as_str()));
    assert!(!f.client.inner.tracker.is_cached_empty(key.as_str()));
}
