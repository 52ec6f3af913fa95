use std::time::{Duration, Instant};

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use tokio::task::JoinHandle;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("browser config error: {0}")]
    Config(String),
    #[error("browser error: {0}")]
    Browser(#[from] CdpError),
    #[error("timed out after {timeout:?} loading {url}")]
    Timeout { url: String, timeout: Duration },
    #[error("timed out waiting for '{selector}' on {url}")]
    WaitCondition { url: String, selector: String },
    #[error("script evaluation error: {0}")]
    Eval(String),
    #[error("page session pool closed")]
    PoolClosed,
}

/// The slice of a page session the scroll stabilization loop needs.
#[allow(async_fn_in_trait)]
pub trait ScrollablePage {
    /// Number of nodes currently matching `selector`.
    async fn item_count(&self, selector: &str) -> Result<usize, FetchError>;
    /// Trigger the site's lazy loading by scrolling to the page end.
    async fn scroll_to_bottom(&self) -> Result<(), FetchError>;
}

/// Headless Chromium instance shared by all page sessions of one run.
pub struct HeadlessBrowser {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl HeadlessBrowser {
    pub async fn launch(config: &crate::CrawlConfig) -> Result<Self, FetchError> {
        let browser_cfg = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", config.user_agent))
            .build()
            .map_err(FetchError::Config)?;

        let (browser, mut handler) = Browser::launch(browser_cfg).await?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Navigate a fresh tab to `url` and wait until `wait_selector`
    /// matches at least one node. The page is closed before returning
    /// an error, so a failed open never leaks a tab.
    pub async fn open(
        &self,
        url: &str,
        wait_selector: &str,
        timeout: Duration,
    ) -> Result<ReportPage, FetchError> {
        let page = tokio::time::timeout(timeout, self.browser.new_page(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                timeout,
            })??;

        // Navigation settling is best-effort; the selector wait below
        // is the real readiness condition.
        let _ = tokio::time::timeout(timeout, page.wait_for_navigation()).await;

        let page = ReportPage {
            page,
            url: url.to_string(),
        };

        if let Err(e) = page.wait_for_selector(wait_selector, timeout).await {
            page.close().await;
            return Err(e);
        }

        Ok(page)
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            log::warn!("Browser close error: {}", e);
        }
        self.handler_task.abort();
    }
}

/// One exclusively-owned page session. Callers must invoke
/// [`ReportPage::close`] on every exit path; close failures are
/// logged and swallowed so they never mask the item's result.
pub struct ReportPage {
    page: Page,
    url: String,
}

impl ReportPage {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Full serialized HTML of the current DOM.
    pub async fn content(&self) -> Result<String, FetchError> {
        Ok(self.page.content().await?)
    }

    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            log::warn!("Page close error for {}: {}", self.url, e);
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), FetchError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.item_count(selector).await {
                Ok(n) if n > 0 => return Ok(()),
                Ok(_) => {}
                Err(e) => log::debug!("Selector poll error on {}: {}", self.url, e),
            }
            if Instant::now() >= deadline {
                return Err(FetchError::WaitCondition {
                    url: self.url.clone(),
                    selector: selector.to_string(),
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }
}

impl ScrollablePage for ReportPage {
    async fn item_count(&self, selector: &str) -> Result<usize, FetchError> {
        let js = format!("document.querySelectorAll({selector:?}).length");
        self.page
            .evaluate(js)
            .await?
            .into_value()
            .map_err(|e| FetchError::Eval(e.to_string()))
    }

    async fn scroll_to_bottom(&self) -> Result<(), FetchError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await?;
        Ok(())
    }
}
