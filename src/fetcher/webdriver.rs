use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::fetcher::PageFetcher;

/// Extra room on top of the page-load timeout so the driver reports its own
/// timeout before the HTTP request gives up.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Drives headless Chrome through a WebDriver server (chromedriver or a
/// Selenium endpoint) using the W3C WebDriver HTTP protocol.
///
/// Every fetch gets its own browser session, which is deleted afterwards
/// whether or not navigation succeeded.
pub struct WebDriverFetcher {
    client: reqwest::Client,
    base_url: String,
    settle_delay: Duration,
    page_load_timeout: Duration,
}

impl WebDriverFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout + REQUEST_TIMEOUT_MARGIN)
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.webdriver_url.clone(),
            settle_delay: cfg.settle_delay,
            page_load_timeout: cfg.timeout,
        })
    }

    async fn new_session(&self, url: &str) -> std::result::Result<String, FetchError> {
        let body = session_request(self.page_load_timeout);
        let req = self.client.post(format!("{}/session", self.base_url)).json(&body);
        let value = self.call(req, url).await?;
        parse_session_id(&value)
            .ok_or_else(|| FetchError::Render("WebDriver returned no sessionId".to_string()))
    }

    async fn render(&self, session_id: &str, url: &str) -> std::result::Result<String, FetchError> {
        let nav = self
            .client
            .post(format!("{}/session/{session_id}/url", self.base_url))
            .json(&json!({ "url": url }));
        self.call(nav, url).await?;

        tokio::time::sleep(self.settle_delay).await;

        let source = self
            .client
            .get(format!("{}/session/{session_id}/source", self.base_url));
        match self.call(source, url).await? {
            Value::String(html) => Ok(html),
            other => Err(FetchError::Render(format!(
                "page source was not a string: {}",
                truncate(&other.to_string(), 80)
            ))),
        }
    }

    async fn delete_session(&self, session_id: &str, url: &str) -> std::result::Result<(), FetchError> {
        let req = self
            .client
            .delete(format!("{}/session/{session_id}", self.base_url));
        self.call(req, url).await.map(|_| ())
    }

    /// Send a WebDriver command and unwrap the `value` member of the reply.
    async fn call(
        &self,
        req: reqwest::RequestBuilder,
        url: &str,
    ) -> std::result::Result<Value, FetchError> {
        let resp = req.send().await.map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = resp.status();
        let mut body: Value = resp.json().await.map_err(|e| FetchError::from_reqwest(url, e))?;

        if !status.is_success() {
            let (error, message) = parse_error(&body);
            return Err(if error == "timeout" {
                FetchError::Timeout { url: url.to_string() }
            } else {
                FetchError::Render(format!("{error}: {}", truncate(&message, 200)))
            });
        }

        Ok(body.get_mut("value").map(Value::take).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let session_id = self.new_session(url).await?;
        debug!(url, session_id = %session_id, "WebDriver session opened");

        let result = self.render(&session_id, url).await;

        if let Err(e) = self.delete_session(&session_id, url).await {
            warn!(session_id = %session_id, "Failed to close WebDriver session: {e}");
        }

        if let Ok(html) = &result {
            debug!(url, bytes = html.len(), "WebDriver fetch complete");
        }
        result
    }
}

/// New-session payload: headless Chrome with a page-load timeout.
fn session_request(page_load_timeout: Duration) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "pageLoadStrategy": "normal",
                "timeouts": { "pageLoad": page_load_timeout.as_millis() as u64 },
                "goog:chromeOptions": {
                    "args": ["--headless=new", "--disable-gpu", "--no-sandbox", "--lang=pt-BR"]
                }
            }
        }
    })
}

fn parse_session_id(value: &Value) -> Option<String> {
    value
        .get("sessionId")
        .and_then(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// `(error, message)` from a W3C error body `{"value": {"error": .., "message": ..}}`.
fn parse_error(body: &Value) -> (String, String) {
    let value = body.get("value");
    let field = |name: &str| {
        value
            .and_then(|v| v.get(name))
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_string()
    };
    (field("error"), field("message"))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_request_is_headless_with_timeout() {
        let body = session_request(Duration::from_secs(30));
        let caps = &body["capabilities"]["alwaysMatch"];
        assert_eq!(caps["browserName"], "chrome");
        assert_eq!(caps["timeouts"]["pageLoad"], 30_000);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn session_id_from_new_session_reply() {
        let value = json!({ "sessionId": "abc123", "capabilities": {} });
        assert_eq!(parse_session_id(&value).as_deref(), Some("abc123"));
        assert_eq!(parse_session_id(&json!({ "sessionId": "" })), None);
        assert_eq!(parse_session_id(&Value::Null), None);
    }

    #[test]
    fn error_body_fields() {
        let body = json!({
            "value": { "error": "unknown error", "message": "net::ERR_NAME_NOT_RESOLVED", "stacktrace": "" }
        });
        assert_eq!(
            parse_error(&body),
            ("unknown error".to_string(), "net::ERR_NAME_NOT_RESOLVED".to_string())
        );
        assert_eq!(parse_error(&json!({})), ("unknown".to_string(), "unknown".to_string()));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("preço", 4), "preç");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
