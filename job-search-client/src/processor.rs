use crate::cache::TtlCache;
use crate::client::{FetchFilter, JobProvider, RawJob};
use crate::enrichment::Enricher;
use crate::index::{FilterBuilder, IndexQuery, IndexedJob, SearchIndex};
use crate::job::JobRecord;
use crate::matching::{should_skip_location, LocationMatcher};
use crate::sanitize::Sanitizer;
use crate::search_options::{SearchKey, SearchQuery};
use crate::store::JobStore;
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Tuning for the population pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Upstream max-age window, in days.
    pub max_age_days: u32,
    /// Batch size requested from the upstream provider.
    pub fetch_limit: usize,
    /// Postings ingested within this window count as "recently served".
    pub smart_dup_window: Duration,
    /// Recent hits at or above this count short-circuit the upstream call.
    pub smart_dup_threshold: usize,
    /// Hard cap on enrichment generation calls per pass.
    pub max_enrichments_per_pass: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_age_days: 30,
            fetch_limit: 50,
            smart_dup_window: Duration::hours(4),
            smart_dup_threshold: 3,
            max_enrichments_per_pass: 5,
        }
    }
}

/// The population pipeline: fetch → dedupe → sanitize → enrich → persist →
/// index. Runs detached from the orchestrator; its only caller-visible
/// output is the boolean outcome written back into the tracker.
pub struct JobProcessor {
    index: Arc<dyn SearchIndex>,
    store: Arc<dyn JobStore>,
    provider: Arc<dyn JobProvider>,
    sanitizer: Sanitizer,
    enricher: Enricher,
    matcher: Arc<dyn LocationMatcher>,
    raw_cache: Arc<TtlCache<Vec<RawJob>>>,
    config: PipelineConfig,
}

impl JobProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn JobStore>,
        provider: Arc<dyn JobProvider>,
        sanitizer: Sanitizer,
        enricher: Enricher,
        matcher: Arc<dyn LocationMatcher>,
        raw_cache: Arc<TtlCache<Vec<RawJob>>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            index,
            store,
            provider,
            sanitizer,
            enricher,
            matcher,
            raw_cache,
            config,
        }
    }

    /// Returns true iff at least one job was usefully stored.
    ///
    /// Two-phase persistence: every fetched candidate is sanitized and
    /// persisted (building the corpus for other locations), while only the
    /// location-matching subset is what the triggering search will see
    /// once indexed.
    pub async fn fetch_and_process(&self, query: &SearchQuery, search_key: &SearchKey) -> bool {
        let started = std::time::Instant::now();

        if self.recently_served(query).await {
            log::info!(
                "skipping upstream fetch for key {}: enough recent postings indexed",
                search_key
            );
            return true;
        }

        if should_skip_location(query) {
            log::info!(
                "skipping unlikely location `{}` for key {}",
                query.location(),
                search_key
            );
            return false;
        }

        let raw_jobs = self.fetch_raw(query, search_key).await;
        if raw_jobs.is_empty() {
            log::info!("no raw jobs fetched for key {}", search_key);
            return false;
        }

        let tokens = query.location_tokens();
        let matching = raw_jobs
            .iter()
            .filter(|raw| self.matcher.matches(raw, &tokens))
            .count();
        log::info!(
            "fetched {} raw jobs for key {} ({} match the requested location)",
            raw_jobs.len(),
            search_key,
            matching
        );

        let mut records = self.sanitize_new(&raw_jobs).await;
        if records.is_empty() {
            log::info!("all fetched jobs already persisted for key {}", search_key);
            return false;
        }

        self.enricher.enrich_batch(&mut records).await;

        let stored = self.persist(&records).await;
        log::info!(
            "persisted {}/{} records for key {} in {}ms",
            stored,
            records.len(),
            search_key,
            started.elapsed().as_millis()
        );
        stored > 0
    }

    /// Smart-duplicate short-circuit: enough postings matching this query
    /// were ingested recently, so skip the upstream call and accept
    /// slightly stale results.
    async fn recently_served(&self, query: &SearchQuery) -> bool {
        let floor = (Utc::now() - self.config.smart_dup_window).timestamp();
        let index_query = IndexQuery {
            query: free_text(query),
            filters: FilterBuilder::new().ge("ingested_at", floor).build(),
            page: 0,
            hits_per_page: self.config.smart_dup_threshold,
        };

        match self.index.search(&index_query).await {
            Ok(page) => page.nb_hits >= self.config.smart_dup_threshold,
            Err(err) => {
                log::warn!("recent-duplicate check failed, continuing: {}", err);
                false
            }
        }
    }

    /// Fetch raw candidates, reusing the raw-job cache before spending an
    /// upstream call. Provider errors degrade to an empty batch; the next
    /// cache-miss cycle is the retry.
    async fn fetch_raw(&self, query: &SearchQuery, search_key: &SearchKey) -> Vec<RawJob> {
        if let Some(cached) = self.raw_cache.get(search_key.as_str()) {
            log::debug!("reusing cached raw jobs for key {}", search_key);
            return cached;
        }

        let filter =
            FetchFilter::from_query(query, self.config.max_age_days, 0, self.config.fetch_limit);
        let raw_jobs = match self.provider.fetch(&filter).await {
            Ok(jobs) => jobs,
            Err(err) => {
                log::warn!("upstream fetch failed, treating as empty: {}", err);
                vec![]
            }
        };

        if !raw_jobs.is_empty() {
            self.raw_cache.set(search_key.as_str(), raw_jobs.clone());
        }
        raw_jobs
    }

    /// Sanitize candidates that are not already persisted. Existing-by-URL
    /// then existing-by-(title,company) are checked before any generation
    /// work; duplicates are skipped silently so re-ingestion is idempotent.
    async fn sanitize_new(&self, raw_jobs: &[RawJob]) -> Vec<JobRecord> {
        let mut records = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for raw in raw_jobs {
            let url = raw.url.trim().to_lowercase();
            if !url.is_empty() && !seen_urls.insert(url) {
                continue;
            }

            if self.already_persisted(raw).await {
                continue;
            }

            records.push(self.sanitizer.sanitize(raw).await);
        }

        records
    }

    async fn already_persisted(&self, raw: &RawJob) -> bool {
        if !raw.url.trim().is_empty() {
            match self.store.find_by_url(&raw.url).await {
                Ok(Some(_)) => return true,
                Ok(None) => {}
                Err(err) => log::warn!("url dedup lookup failed: {}", err),
            }
        }

        match self.store.find_by_title_company(&raw.title, &raw.company).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(err) => {
                log::warn!("title/company dedup lookup failed: {}", err);
                false
            }
        }
    }

    /// Persist to the store and the index. A single record's failure is
    /// logged and skipped; the batch continues.
    async fn persist(&self, records: &[JobRecord]) -> usize {
        let ingested_at = Utc::now().timestamp();
        let mut stored = 0;

        for record in records {
            if let Err(err) = self.store.upsert(record.clone()).await {
                log::error!("store upsert failed for job {}: {}", record.id, err);
                continue;
            }

            let indexed = IndexedJob {
                job: record.clone(),
                ingested_at,
            };
            if let Err(err) = self.index.save_objects(std::slice::from_ref(&indexed)).await {
                log::error!("index write failed for job {}: {}", record.id, err);
                continue;
            }

            stored += 1;
        }

        stored
    }
}

/// Free-text relevance term: role and location together, so location
/// fuzzy-matches instead of filtering exact.
pub fn free_text(query: &SearchQuery) -> String {
    format!("{} {}", query.what().trim(), query.location().trim())
        .trim()
        .to_string()
}
