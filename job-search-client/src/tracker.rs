use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Configuration for the request tracker.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// A `processing` entry older than this is treated as stale; a crashed
    /// worker therefore self-heals without explicit cleanup.
    pub processing_timeout: Duration,
    /// How long a "nothing found" outcome suppresses new background work.
    pub negative_ttl: Duration,
    /// How long a finished state stays visible before the slot frees, so a
    /// near-simultaneous caller can still observe the outcome.
    pub finish_grace: Duration,
    /// Whether tracking is enabled.
    pub enabled: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            processing_timeout: Duration::seconds(60),
            negative_ttl: Duration::minutes(30),
            finish_grace: Duration::seconds(5),
            enabled: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingStatus {
    Processing,
    Completed,
    Failed,
}

/// In-flight state for one normalized search key.
#[derive(Clone, Debug)]
pub struct ProcessingState {
    pub status: ProcessingStatus,
    pub started_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct NegativeResult {
    cached_at: DateTime<Utc>,
}

/// Serializes background population per logical query and remembers recent
/// "nothing found" outcomes.
///
/// At most one `processing` entry exists per key at any instant; the
/// correctness of the single-flight guarantee rests on timeout discipline,
/// not on exceptions. Pure in-memory, no I/O.
pub struct RequestTracker {
    processing: DashMap<String, ProcessingState>,
    negative: DashMap<String, NegativeResult>,
    config: TrackerConfig,
}

impl RequestTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            processing: DashMap::new(),
            negative: DashMap::new(),
            config,
        }
    }

    /// True iff a live `processing` entry exists for `key`. Stale entries
    /// (older than the timeout) are treated as absent and lazily removed.
    pub fn is_processing(&self, key: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        if let Some(state) = self.processing.get(key) {
            let live = state.status == ProcessingStatus::Processing
                && Utc::now() - state.started_at < self.config.processing_timeout;
            if live {
                return true;
            }
            if state.status == ProcessingStatus::Processing {
                drop(state);
                log::warn!("removing stale processing entry for key: {}", key);
                self.processing.remove(key);
            }
        }

        false
    }

    /// Insert or overwrite a `processing` entry with the current timestamp.
    /// Idempotent.
    pub fn start_processing(&self, key: &str) {
        if !self.config.enabled {
            return;
        }

        self.processing.insert(
            key.to_string(),
            ProcessingState {
                status: ProcessingStatus::Processing,
                started_at: Utc::now(),
            },
        );
        log::debug!("started processing for key: {}", key);
    }

    /// Atomically claim the processing slot for `key`. Returns false when
    /// another live attempt already holds it; concurrent callers racing on
    /// the same key therefore get exactly one winner.
    pub fn try_start_processing(&self, key: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        let fresh = ProcessingState {
            status: ProcessingStatus::Processing,
            started_at: Utc::now(),
        };
        match self.processing.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let state = occupied.get();
                let live = state.status == ProcessingStatus::Processing
                    && Utc::now() - state.started_at < self.config.processing_timeout;
                if live {
                    return false;
                }
                occupied.insert(fresh);
                log::debug!("reclaimed processing slot for key: {}", key);
                true
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                log::debug!("started processing for key: {}", key);
                true
            }
        }
    }

    /// Transition the entry to completed/failed, then free the slot after
    /// the grace window.
    pub fn finish_processing(self: &Arc<Self>, key: &str, success: bool) {
        if !self.config.enabled {
            return;
        }

        let status = if success {
            ProcessingStatus::Completed
        } else {
            ProcessingStatus::Failed
        };

        if let Some(mut state) = self.processing.get_mut(key) {
            state.status = status;
        } else {
            // The stale-timeout path may already have removed the entry.
            return;
        }
        log::debug!("finished processing for key: {} (success: {})", key, success);

        let tracker = Arc::clone(self);
        let key = key.to_string();
        let grace = self
            .config
            .finish_grace
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(5));
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            // Only remove if no new attempt has claimed the slot meanwhile.
            if let Some(state) = tracker.processing.get(&key) {
                if state.status != ProcessingStatus::Processing {
                    drop(state);
                    tracker.processing.remove(&key);
                }
            }
        });
    }

    /// True iff a live negative result exists for `key`; expired entries
    /// are evicted on read.
    pub fn is_cached_empty(&self, key: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        if let Some(entry) = self.negative.get(key) {
            if Utc::now() - entry.cached_at < self.config.negative_ttl {
                return true;
            }
            drop(entry);
            self.negative.remove(key);
        }

        false
    }

    /// Record that a search for `key` recently yielded nothing.
    pub fn cache_empty_result(&self, key: &str) {
        if !self.config.enabled {
            return;
        }

        self.negative.insert(
            key.to_string(),
            NegativeResult {
                cached_at: Utc::now(),
            },
        );
        log::debug!("cached empty result for key: {}", key);
    }

    /// Drop only the negative entry for `key`. A positive index result
    /// always wins over a remembered empty outcome.
    pub fn clear_negative(&self, key: &str) {
        if self.negative.remove(key).is_some() {
            log::debug!("cleared negative cache for key: {}", key);
        }
    }

    /// Remove negative and processing state for `key`, or everything when
    /// `key` is `None`.
    pub fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.negative.remove(key);
                self.processing.remove(key);
            }
            None => {
                self.negative.clear();
                self.processing.clear();
                log::info!("request tracker cleared");
            }
        }
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            processing_entries: self.processing.len(),
            negative_entries: self.negative.len(),
        }
    }

    #[cfg(test)]
    fn backdate_processing(&self, key: &str, age: Duration) {
        if let Some(mut state) = self.processing.get_mut(key) {
            state.started_at = Utc::now() - age;
        }
    }

    #[cfg(test)]
    fn backdate_negative(&self, key: &str, age: Duration) {
        if let Some(mut entry) = self.negative.get_mut(key) {
            entry.cached_at = Utc::now() - age;
        }
    }
}

/// Statistics for the request tracker.
#[derive(Debug, Clone)]
pub struct TrackerStats {
    pub processing_entries: usize,
    pub negative_entries: usize,
}

pub type SharedRequestTracker = Arc<RequestTracker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_then_is_processing() {
        let tracker = RequestTracker::new(TrackerConfig::default());
        assert!(!tracker.is_processing("k"));
        tracker.start_processing("k");
        assert!(tracker.is_processing("k"));
    }

    #[test]
    fn test_stale_processing_treated_as_absent() {
        let tracker = RequestTracker::new(TrackerConfig::default());
        tracker.start_processing("k");
        tracker.backdate_processing("k", Duration::seconds(120));

        assert!(!tracker.is_processing("k"));
        // The stale entry was lazily removed, so a new attempt can claim it.
        assert_eq!(tracker.stats().processing_entries, 0);
    }

    #[tokio::test]
    async fn test_finish_frees_slot_after_grace() {
        let config = TrackerConfig {
            finish_grace: Duration::milliseconds(20),
            ..Default::default()
        };
        let tracker = Arc::new(RequestTracker::new(config));
        tracker.start_processing("k");
        tracker.finish_processing("k", true);

        // Transitioned but not yet removed.
        assert!(!tracker.is_processing("k"));
        assert_eq!(tracker.stats().processing_entries, 1);

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        assert_eq!(tracker.stats().processing_entries, 0);
    }

    #[test]
    fn test_try_start_has_one_winner() {
        let tracker = RequestTracker::new(TrackerConfig::default());
        assert!(tracker.try_start_processing("k"));
        assert!(!tracker.try_start_processing("k"));

        // A stale slot can be reclaimed.
        tracker.backdate_processing("k", Duration::seconds(120));
        assert!(tracker.try_start_processing("k"));
    }

    #[test]
    fn test_negative_cache_expiry() {
        let tracker = RequestTracker::new(TrackerConfig::default());
        tracker.cache_empty_result("k");
        assert!(tracker.is_cached_empty("k"));

        tracker.backdate_negative("k", Duration::minutes(31));
        assert!(!tracker.is_cached_empty("k"));
        assert_eq!(tracker.stats().negative_entries, 0);
    }

    #[test]
    fn test_clear_single_key() {
        let tracker = RequestTracker::new(TrackerConfig::default());
        tracker.cache_empty_result("a");
        tracker.cache_empty_result("b");
        tracker.start_processing("a");

        tracker.clear(Some("a"));
        assert!(!tracker.is_cached_empty("a"));
        assert!(!tracker.is_processing("a"));
        assert!(tracker.is_cached_empty("b"));
    }
}
