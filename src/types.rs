use chrono::{DateTime, Utc};

/// Substituted when the product title cannot be located on the page.
pub const TITLE_PLACEHOLDER: &str = "Título não encontrado";

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// One monitored product page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub url: String,
}

impl Target {
    /// Build a target for `url`, the `position`-th entry (0-based) in the configured list.
    /// The id is the product code from the URL path when one is present.
    pub fn new(url: impl Into<String>, position: usize) -> Self {
        let url = url.into();
        let id = product_code(&url).unwrap_or_else(|| format!("target-{}", position + 1));
        Self { id, url }
    }
}

/// Product code from `/dp/<code>` or `/gp/product/<code>` path segments.
/// `https://www.amazon.com.br/Livro/dp/8576089726/?x=1` → `8576089726`.
pub fn product_code(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == "dp" || pair[0] == "product")
        .map(|pair| pair[1].to_string())
}

// ---------------------------------------------------------------------------
// PriceRecord
// ---------------------------------------------------------------------------

/// A single price observation. Built only by the extractor, with every field
/// populated; there are no setters.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    product_name: String,
    list_price: f64,
    discount_ratio: f64,
    current_price: f64,
    observed_at: DateTime<Utc>,
}

impl PriceRecord {
    pub(crate) fn new(
        product_name: String,
        list_price: f64,
        discount_ratio: f64,
        current_price: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let product_name = if product_name.trim().is_empty() {
            TITLE_PLACEHOLDER.to_string()
        } else {
            product_name
        };
        Self {
            product_name,
            list_price,
            discount_ratio,
            current_price,
            observed_at,
        }
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn list_price(&self) -> f64 {
        self.list_price
    }

    pub fn discount_ratio(&self) -> f64 {
        self.discount_ratio
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Same observation restamped. Used by the poller to keep stamps monotonic.
    pub(crate) fn with_observed_at(self, observed_at: DateTime<Utc>) -> Self {
        Self { observed_at, ..self }
    }

    /// True when the page shows a current price above the list price.
    pub fn is_anomalous(&self) -> bool {
        self.current_price > self.list_price
    }
}
