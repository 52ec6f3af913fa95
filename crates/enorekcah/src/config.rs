use std::time::Duration;

/// Crawl settings, built once and passed by reference into the
/// harvesters. Never mutated during a run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Site origin relative hrefs are resolved against.
    pub base_url: String,
    pub user_agent: String,
    /// Hard cap on scroll-and-recount cycles for one listing session.
    pub max_scroll_attempts: u32,
    /// Pause after each scroll so lazy-loaded items can render.
    pub settle_delay: Duration,
    /// Per page-session budget for navigation and wait conditions.
    pub page_timeout: Duration,
    /// Concurrent detail-page sessions. Each holds a browser tab, so
    /// this ceiling is stricter than anything used for listings.
    pub detail_concurrency: usize,
    /// Extra attempts per detail URL after a transient fetch failure.
    pub fetch_retries: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        CrawlConfig {
            base_url: crate::BASE_URL.to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            max_scroll_attempts: 100,
            settle_delay: Duration::from_millis(2000),
            page_timeout: Duration::from_secs(30),
            detail_concurrency: 2,
            fetch_retries: 2,
        }
    }
}
