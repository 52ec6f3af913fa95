use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;

use crate::browser::{FetchError, HeadlessBrowser};
use crate::config::CrawlConfig;
use crate::extract::extract_report_body;
use crate::types::ReportBody;

/// Either body tier satisfies the detail page's readiness condition,
/// so fallback-template reports don't burn the whole timeout.
const DETAIL_WAIT_SELECTOR: &str = "div#report-information, div.spec-full-summary-content";

const RETRY_BACKOFF: Duration = Duration::from_millis(2000);

/// Fetch every report URL independently and return one body record per
/// page whose content could be located. Failed URLs (timeout, network
/// error, or no matching tier) produce no record at all, so a missing
/// URL in the output means "not fetched or not found", while an empty
/// body means "fetched but empty". No per-URL failure aborts the
/// harvest, and completion order is not significant — the merge step
/// re-establishes summary order.
pub async fn harvest_bodies(
    browser: &HeadlessBrowser,
    config: &CrawlConfig,
    urls: &[String],
) -> Vec<ReportBody> {
    let semaphore = Semaphore::new(config.detail_concurrency.max(1));

    let mut sessions: FuturesUnordered<_> = urls
        .iter()
        .map(|url| {
            let semaphore = &semaphore;
            async move {
                match semaphore.acquire().await {
                    Ok(_permit) => (url, fetch_body_with_retry(browser, config, url).await),
                    Err(_) => (url, Err(FetchError::PoolClosed)),
                }
            }
        })
        .collect();

    let mut bodies = Vec::new();
    while let Some((url, result)) = sessions.next().await {
        match result {
            Ok(Some(body)) => bodies.push(ReportBody {
                url: url.clone(),
                body,
            }),
            Ok(None) => log::warn!("No report content found for {}", url),
            Err(e) => log::warn!("Skipping report {}: {}", url, e),
        }
    }

    log::info!("Harvested {} bodies from {} report URLs", bodies.len(), urls.len());
    bodies
}

async fn fetch_body_with_retry(
    browser: &HeadlessBrowser,
    config: &CrawlConfig,
    url: &str,
) -> Result<Option<String>, FetchError> {
    let mut attempt = 0u32;
    loop {
        match fetch_body(browser, config, url).await {
            Ok(body) => return Ok(body),
            Err(e) if attempt < config.fetch_retries => {
                attempt += 1;
                log::warn!(
                    "Fetch failed for {} (attempt {}/{}): {}",
                    url,
                    attempt,
                    config.fetch_retries,
                    e
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_body(
    browser: &HeadlessBrowser,
    config: &CrawlConfig,
    url: &str,
) -> Result<Option<String>, FetchError> {
    log::info!("Processing report URL: {}", url);

    let page = browser
        .open(url, DETAIL_WAIT_SELECTOR, config.page_timeout)
        .await?;

    // Snapshot first, release the tab on every path, then parse.
    let html = page.content().await;
    page.close().await;

    Ok(extract_report_body(&html?))
}
