use async_trait::async_trait;
use tracing::debug;

use crate::config::{FetchConfig, USER_AGENT};
use crate::error::{FetchError, Result};
use crate::fetcher::PageFetcher;

/// Plain GET. Fields filled in by page scripts will be missing, so this mode
/// only suits pages that render prices server-side.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), url: url.to_string() });
        }

        let body = resp.text().await.map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(url, bytes = body.len(), "HTTP fetch complete");
        Ok(body)
    }
}
