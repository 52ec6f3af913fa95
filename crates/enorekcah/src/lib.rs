pub mod browser;
pub mod config;
pub mod detail;
mod extract;
pub mod merge;
pub mod scroll;
pub mod store;
pub mod summary;
pub mod types;

pub use browser::HeadlessBrowser;
pub use config::CrawlConfig;

pub(crate) const BASE_URL: &str = "https://hackerone.com";
