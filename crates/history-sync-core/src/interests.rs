use history_sync_config::DoubanConfig;
use history_sync_models::InterestMap;
use history_sync_sources::InterestFeed;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Paging settings for one interest-feed pull.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub statuses: Vec<String>,
    pub page_size: u32,
    pub max_empty_pages: u32,
    pub page_delay: Duration,
}

impl FeedOptions {
    pub fn from_config(config: &DoubanConfig, page_delay: Duration) -> Self {
        Self {
            statuses: config.statuses.clone(),
            page_size: config.page_size.max(1),
            max_empty_pages: config.max_empty_pages.max(1),
            page_delay,
        }
    }
}

/// Pull every configured status into one read-only subject map.
///
/// Each status pages from zero. `start` only advances after a page that came
/// back fine; an empty or failed page counts as a miss, and the status ends
/// after `max_empty_pages` misses in a row.
pub async fn collect_interest_map(feed: &dyn InterestFeed, options: &FeedOptions) -> InterestMap {
    let mut collected = Vec::new();

    for status in &options.statuses {
        let mut start = 0u32;
        let mut misses = 0u32;
        let mut pages = 0usize;

        while misses < options.max_empty_pages {
            match feed.fetch_interests(status, start, options.page_size).await {
                Ok(entries) => {
                    if entries.is_empty() {
                        misses += 1;
                    } else {
                        misses = 0;
                        pages += 1;
                        debug!(status = %status, start, count = entries.len(), "Fetched interest page");
                        collected.extend(entries);
                    }
                    start += options.page_size;
                }
                Err(e) => {
                    misses += 1;
                    warn!(status = %status, start, error = %e, "Interest page failed");
                }
            }

            if misses < options.max_empty_pages && !options.page_delay.is_zero() {
                tokio::time::sleep(options.page_delay).await;
            }
        }

        debug!(status = %status, pages, "Finished interest status");
    }

    let map = InterestMap::from_entries(collected);
    info!(
        subjects = map.subject_count(),
        entries = map.entry_count(),
        "Collected interest feed"
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use history_sync_models::{InterestEntry, SubjectId};
    use history_sync_sources::SourceError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Pages keyed by (status, start); missing keys are empty pages. Each
    /// entry in `failures` fails exactly once.
    #[derive(Default)]
    struct FakeFeed {
        pages: HashMap<(String, u32), Vec<InterestEntry>>,
        failures: Mutex<Vec<(String, u32)>>,
        calls: Mutex<Vec<(String, u32)>>,
    }

    impl FakeFeed {
        fn page(mut self, status: &str, start: u32, entries: Vec<InterestEntry>) -> Self {
            self.pages.insert((status.to_string(), start), entries);
            self
        }

        fn fail_once(self, status: &str, start: u32) -> Self {
            self.failures.lock().unwrap().push((status.to_string(), start));
            self
        }

        fn starts(&self, status: &str) -> Vec<u32> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(s, _)| s == status)
                .map(|(_, start)| *start)
                .collect()
        }
    }

    #[async_trait]
    impl InterestFeed for FakeFeed {
        async fn fetch_interests(&self, status: &str, start: u32, _count: u32) -> Result<Vec<InterestEntry>, SourceError> {
            let key = (status.to_string(), start);
            self.calls.lock().unwrap().push(key.clone());
            let mut failures = self.failures.lock().unwrap();
            if let Some(pos) = failures.iter().position(|k| *k == key) {
                failures.remove(pos);
                return Err(SourceError::Status {
                    service: "douban",
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(self.pages.get(&key).cloned().unwrap_or_default())
        }
    }

    fn entry(subject: &str, created_at: &str) -> InterestEntry {
        InterestEntry {
            subject_id: SubjectId::new(subject).unwrap(),
            status: "done".to_string(),
            kind: None,
            created_at: NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S").unwrap(),
        }
    }

    fn options(statuses: &[&str], max_empty_pages: u32) -> FeedOptions {
        FeedOptions {
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            page_size: 2,
            max_empty_pages,
            page_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_single_status_stops_on_first_empty_page() {
        let feed = FakeFeed::default()
            .page("done", 0, vec![entry("1", "2020-01-01 10:00:00"), entry("2", "2020-01-02 10:00:00")])
            .page("done", 2, vec![entry("3", "2020-01-03 10:00:00")]);

        let map = collect_interest_map(&feed, &options(&["done"], 1)).await;
        assert_eq!(map.subject_count(), 3);
        assert_eq!(feed.starts("done"), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_all_statuses_retry_failed_page() {
        let feed = FakeFeed::default()
            .page("done", 0, vec![entry("1", "2020-01-01 10:00:00")])
            .fail_once("done", 2)
            .page("done", 2, vec![entry("2", "2020-01-02 10:00:00")])
            .page("wish", 0, vec![entry("1", "2021-05-05 10:00:00")]);

        let map = collect_interest_map(&feed, &options(&["done", "wish"], 3)).await;

        // The failed page is retried at the same offset
        assert_eq!(feed.starts("done"), vec![0, 2, 2, 4, 6, 8]);
        assert_eq!(feed.starts("wish"), vec![0, 2, 4, 6]);

        assert_eq!(map.subject_count(), 2);
        let entries = map.entries_for(&SubjectId::new("1").unwrap());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].created_at.to_string(), "2021-05-05 10:00:00");
    }

    #[tokio::test]
    async fn test_miss_counter_resets_on_data() {
        let feed = FakeFeed::default()
            .page("done", 0, vec![entry("1", "2020-01-01 10:00:00")])
            .fail_once("done", 2)
            .page("done", 2, vec![entry("2", "2020-01-02 10:00:00")]);

        let map = collect_interest_map(&feed, &options(&["done"], 2)).await;
        assert_eq!(map.subject_count(), 2);
        assert_eq!(feed.starts("done"), vec![0, 2, 2, 4, 6]);
    }
}
