use std::time::Duration;

use crate::error::{AppError, Result};
use crate::types::Target;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const WEBDRIVER_URL: &str = "http://localhost:9515";

/// Delay between the end of one poll cycle and the start of the next (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Wait after navigation so client-side scripts can fill in the price fields.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3000;

/// Upper bound for a single page fetch (seconds).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Sent with plain HTTP fetches; the retailer serves a stripped page to unknown agents.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// CSS selectors for the product page fields.
pub mod selectors {
    pub const TITLE: &str = "span#productTitle";
    pub const DISCOUNT: &str = "span.savingsPercentage";
    pub const PRICE_WHOLE: &str = "span.a-price-whole";
    pub const PRICE_FRACTION: &str = "span.a-price-fraction";
    pub const LIST_PRICE: &str = "span.a-size-small.aok-offscreen";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Headless browser over the WebDriver protocol; page scripts execute.
    WebDriver,
    /// Plain HTTP GET; no script execution.
    Http,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub mode: FetchMode,
    pub webdriver_url: String,
    pub settle_delay: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Monitored pages in polling order (TARGET_URLS, see `split_target_list`).
    pub targets: Vec<Target>,
    /// POLL_INTERVAL_SECS
    pub poll_interval: Duration,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub fetch: FetchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Every missing required
    /// key is reported in a single error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut missing = Vec::new();
        let mut required = |key: &'static str| {
            get(key).unwrap_or_else(|| {
                missing.push(key);
                String::new()
            })
        };

        let target_urls = required("TARGET_URLS");
        let host = required("POSTGRES_HOST");
        let name = required("POSTGRES_DB");
        let user = required("POSTGRES_USER");
        let password = required("POSTGRES_PASSWORD");
        let token = required("TELEGRAM_TOKEN");
        let chat_id = required("TELEGRAM_CHAT_ID");

        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let targets = parse_targets(&target_urls)?;

        let mode = match get("FETCH_MODE").as_deref() {
            None | Some("webdriver") => FetchMode::WebDriver,
            Some("http") => FetchMode::Http,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "FETCH_MODE must be `webdriver` or `http`, got `{other}`"
                )))
            }
        };

        Ok(Self {
            targets,
            poll_interval: Duration::from_secs(parse_or(
                get("POLL_INTERVAL_SECS"),
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            database: DatabaseConfig {
                host,
                port: parse_or(get("POSTGRES_PORT"), "POSTGRES_PORT", DEFAULT_POSTGRES_PORT)?,
                name,
                user,
                password,
            },
            telegram: TelegramConfig {
                api_url: get("TELEGRAM_API_URL")
                    .unwrap_or_else(|| TELEGRAM_API_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                token,
                chat_id,
            },
            fetch: FetchConfig {
                mode,
                webdriver_url: get("WEBDRIVER_URL")
                    .unwrap_or_else(|| WEBDRIVER_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                settle_delay: Duration::from_millis(parse_or(
                    get("SETTLE_DELAY_MS"),
                    "SETTLE_DELAY_MS",
                    DEFAULT_SETTLE_DELAY_MS,
                )?),
                timeout: Duration::from_secs(parse_or(
                    get("FETCH_TIMEOUT_SECS"),
                    "FETCH_TIMEOUT_SECS",
                    DEFAULT_FETCH_TIMEOUT_SECS,
                )?),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} must be a valid number, got `{v}`"))),
    }
}

/// Load `.env` into the process environment. A missing file is fine; an
/// unreadable or malformed one is a configuration error.
pub fn load_dotenv() -> Result<()> {
    dotenv_outcome(dotenvy::dotenv().map(|_| ()))
}

fn dotenv_outcome(result: std::result::Result<(), dotenvy::Error>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(AppError::Config(format!(".env could not be loaded: {e}"))),
    }
}

/// Split TARGET_URLS into entries. Whitespace (including newlines) always
/// separates entries; a comma only does when the next piece starts a new
/// `http://` or `https://` URL, so commas inside a query string stay put.
fn split_target_list(raw: &str) -> Vec<String> {
    let mut entries = Vec::new();
    for token in raw.split_whitespace() {
        let mut current = String::new();
        for piece in token.split(',') {
            let starts_url = piece.starts_with("http://") || piece.starts_with("https://");
            if starts_url && !current.is_empty() {
                entries.push(std::mem::take(&mut current));
            } else if !current.is_empty() {
                current.push(',');
            }
            current.push_str(piece);
        }
        entries.push(current);
    }

    entries
        .into_iter()
        .map(|e| e.trim_matches(',').to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

fn parse_targets(raw: &str) -> Result<Vec<Target>> {
    let urls = split_target_list(raw);
    if urls.is_empty() {
        return Err(AppError::Config("TARGET_URLS must list at least one URL".to_string()));
    }

    urls.into_iter()
        .enumerate()
        .map(|(i, url)| match reqwest::Url::parse(&url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(Target::new(url, i)),
            _ => Err(AppError::Config(format!("TARGET_URLS entry {} is not an http(s) URL: {url}", i + 1))),
        })
        .collect()
}
