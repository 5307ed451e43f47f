pub mod http;
pub mod webdriver;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{FetchConfig, FetchMode};
use crate::error::{FetchError, Result};

pub use http::HttpFetcher;
pub use webdriver::WebDriverFetcher;

/// Renders a URL into the document the extractor reads.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// Build the fetcher selected by FETCH_MODE.
pub fn from_config(cfg: &FetchConfig) -> Result<Arc<dyn PageFetcher>> {
    Ok(match cfg.mode {
        FetchMode::WebDriver => Arc::new(WebDriverFetcher::new(cfg)?),
        FetchMode::Http => Arc::new(HttpFetcher::new(cfg)?),
    })
}
