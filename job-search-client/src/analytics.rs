use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use strum_macros::{Display, EnumString};

/// What a recorded cache event was.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Hit,
    Miss,
    ExternalQuery,
    BackgroundPopulation,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub key: String,
    pub duration_ms: Option<u64>,
}

/// Point-in-time counter snapshot with the derived efficiency ratio.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub external_queries: u64,
    pub background_populations: u64,
    pub efficiency: f64,
}

/// Observability only; nothing here affects correctness.
///
/// Counters are atomics; the event log is a bounded ring buffer (oldest
/// dropped first, insertion order preserved, length never exceeds the
/// configured maximum).
pub struct CacheAnalytics {
    hits: AtomicU64,
    misses: AtomicU64,
    external_queries: AtomicU64,
    background_populations: AtomicU64,
    events: Mutex<VecDeque<AnalyticsEvent>>,
    max_events: usize,
}

impl CacheAnalytics {
    pub fn new(max_events: usize) -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            external_queries: AtomicU64::new(0),
            background_populations: AtomicU64::new(0),
            events: Mutex::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    pub fn record_hit(&self, key: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.push_event(EventKind::Hit, key, None);
    }

    pub fn record_miss(&self, key: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.push_event(EventKind::Miss, key, None);
    }

    pub fn record_external_query(&self, key: &str, duration_ms: u64) {
        self.external_queries.fetch_add(1, Ordering::Relaxed);
        self.push_event(EventKind::ExternalQuery, key, Some(duration_ms));
    }

    pub fn record_background_population(&self, key: &str) {
        self.background_populations.fetch_add(1, Ordering::Relaxed);
        self.push_event(EventKind::BackgroundPopulation, key, None);
    }

    fn push_event(&self, kind: EventKind, key: &str, duration_ms: Option<u64>) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(AnalyticsEvent {
            timestamp: Utc::now(),
            kind,
            key: key.to_string(),
            duration_ms,
        });
    }

    pub fn metrics(&self) -> CacheMetrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheMetrics {
            hits,
            misses,
            external_queries: self.external_queries.load(Ordering::Relaxed),
            background_populations: self.background_populations.load(Ordering::Relaxed),
            efficiency: Self::efficiency(hits, misses),
        }
    }

    /// Hit ratio as a percentage; 0 when nothing has been recorded.
    pub fn efficiency_report(&self) -> f64 {
        let metrics = self.metrics();
        metrics.efficiency
    }

    /// Same ratios recomputed over the events of the trailing 60 minutes.
    pub fn hourly_stats(&self) -> CacheMetrics {
        let cutoff = Utc::now() - Duration::minutes(60);
        let events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut hits = 0;
        let mut misses = 0;
        let mut external_queries = 0;
        let mut background_populations = 0;
        for event in events.iter().filter(|e| e.timestamp >= cutoff) {
            match event.kind {
                EventKind::Hit => hits += 1,
                EventKind::Miss => misses += 1,
                EventKind::ExternalQuery => external_queries += 1,
                EventKind::BackgroundPopulation => background_populations += 1,
            }
        }

        CacheMetrics {
            hits,
            misses,
            external_queries,
            background_populations,
            efficiency: Self::efficiency(hits, misses),
        }
    }

    /// Clear counters and the event buffer. Used for test isolation.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.external_queries.store(0, Ordering::Relaxed);
        self.background_populations.store(0, Ordering::Relaxed);
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn efficiency(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efficiency_ratio() {
        let analytics = CacheAnalytics::new(100);
        for _ in 0..3 {
            analytics.record_hit("k");
        }
        analytics.record_miss("k");

        let metrics = analytics.metrics();
        assert_eq!(metrics.hits, 3);
        assert_eq!(metrics.misses, 1);
        assert!((metrics.efficiency - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ring_buffer_stays_bounded() {
        let analytics = CacheAnalytics::new(5);
        for i in 0..20 {
            analytics.record_hit(&format!("k{}", i));
        }

        let events = analytics.events.lock().unwrap();
        assert_eq!(events.len(), 5);
        // Oldest dropped first, insertion order preserved.
        assert_eq!(events.front().unwrap().key, "k15");
        assert_eq!(events.back().unwrap().key, "k19");
    }

    #[test]
    fn test_hourly_stats_counts_recent_events() {
        let analytics = CacheAnalytics::new(100);
        analytics.record_hit("k");
        analytics.record_miss("k");
        analytics.record_external_query("k", 12);

        let hourly = analytics.hourly_stats();
        assert_eq!(hourly.hits, 1);
        assert_eq!(hourly.misses, 1);
        assert_eq!(hourly.external_queries, 1);
        assert!((hourly.efficiency - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hourly_stats_exclude_stale_events() {
        let analytics = CacheAnalytics::new(100);
        analytics.record_hit("k");
        analytics.record_miss("k");

        // Age the miss past the trailing window.
        {
            let mut events = analytics.events.lock().unwrap();
            let miss = events
                .iter_mut()
                .find(|e| e.kind == EventKind::Miss)
                .unwrap();
            miss.timestamp = Utc::now() - Duration::minutes(90);
        }

        let hourly = analytics.hourly_stats();
        assert_eq!(hourly.hits, 1);
        assert_eq!(hourly.misses, 0);
        assert!((hourly.efficiency - 100.0).abs() < f64::EPSILON);

        // The lifetime counters still see both events.
        assert_eq!(analytics.metrics().misses, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let analytics = CacheAnalytics::new(100);
        analytics.record_hit("k");
        analytics.record_background_population("k");
        analytics.reset();

        let metrics = analytics.metrics();
        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.background_populations, 0);
        assert_eq!(analytics.events.lock().unwrap().len(), 0);
    }
}
