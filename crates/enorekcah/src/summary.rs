use std::collections::BTreeMap;

use scraper::{Html, Selector};

use crate::browser::{FetchError, HeadlessBrowser};
use crate::config::CrawlConfig;
use crate::extract::{DETAIL_URL_SPEC, METADATA_SPECS, TITLE_SPEC, extract_field};
use crate::scroll::stabilize;
use crate::types::ReportSummary;

/// One disclosed report entry on the hacktivity listing.
pub const ITEM_SELECTOR: &str = r#"div[data-testid="hacktivity-item"]"#;

/// Load a team's hacktivity listing, scroll it until it stops growing,
/// and return one summary per item in DOM order.
pub async fn harvest_summaries(
    browser: &HeadlessBrowser,
    config: &CrawlConfig,
    team: &str,
) -> Result<Vec<ReportSummary>, FetchError> {
    let listing_url = format!(
        "{}/{}/hacktivity?type=team",
        config.base_url.trim_end_matches('/'),
        team
    );
    log::info!("Fetching hacktivity listing: {}", listing_url);

    let page = browser
        .open(&listing_url, ITEM_SELECTOR, config.page_timeout)
        .await?;

    let item_count = stabilize(
        &page,
        ITEM_SELECTOR,
        config.max_scroll_attempts,
        config.settle_delay,
    )
    .await;
    log::info!("Listing stabilized at {} items for team {}", item_count, team);

    let html = page.content().await;
    page.close().await;

    let summaries = parse_listing(&html?, team, &config.base_url);
    log::info!("Harvested {} summaries for team {}", summaries.len(), team);
    Ok(summaries)
}

/// Parse a stabilized listing snapshot. Title and metadata are
/// best-effort per item; an item that yields no usable report link is
/// dropped with a warning, never aborting the rest of the harvest.
pub fn parse_listing(html: &str, team: &str, base_url: &str) -> Vec<ReportSummary> {
    let document = Html::parse_document(html);
    let item_sel = Selector::parse(ITEM_SELECTOR).expect("invalid selector: hacktivity item");

    let mut summaries = Vec::new();

    for item in document.select(&item_sel) {
        let Some(href) = extract_field(item, &DETAIL_URL_SPEC) else {
            log::warn!("Dropping hacktivity item with no report link (team {})", team);
            continue;
        };
        let url = absolutize(base_url, &href);

        let title = extract_field(item, &TITLE_SPEC).unwrap_or_default();

        let mut metadata = BTreeMap::new();
        for spec in METADATA_SPECS {
            if let Some(value) = extract_field(item, spec) {
                metadata.insert(spec.name.to_string(), value);
            }
        }

        summaries.push(ReportSummary {
            team: team.to_string(),
            title,
            url,
            metadata,
        });
    }

    summaries
}

/// Join keys must be fully qualified, so relative hrefs are resolved
/// against the site origin at extraction time.
fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href)
    }
}
