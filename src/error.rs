use thiserror::Error;

/// Startup and fatal errors. Anything that reaches `main` as an `AppError`
/// ends the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

// ---------------------------------------------------------------------------
// Per-cycle errors: caught at the target boundary, logged, never fatal.
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("render error: {0}")]
    Render(String),
}

impl FetchError {
    /// Classify a reqwest failure for `url`.
    pub fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else if let Some(status) = e.status() {
            FetchError::Status { status: status.as_u16(), url: url.to_string() }
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Which price field an extraction failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Discount,
    CurrentPrice,
    ListPrice,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Field::Discount => "discount",
            Field::CurrentPrice => "current_price",
            Field::ListPrice => "list_price",
        };
        write!(f, "{s}")
    }
}

/// A fatal field failure. Absence and a present-but-unparsable value are
/// distinct so operators can tell a layout change from a formatting change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("missing field `{field}`")]
    MissingField { field: Field },

    #[error("malformed value for `{field}`: {raw_text:?}")]
    MalformedValue { field: Field, raw_text: String },
}

impl ExtractionFailure {
    pub fn missing(field: Field) -> Self {
        ExtractionFailure::MissingField { field }
    }

    pub fn malformed(field: Field, raw_text: impl Into<String>) -> Self {
        ExtractionFailure::MalformedValue { field, raw_text: raw_text.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionFailure::MissingField { .. } => "missing_field",
            ExtractionFailure::MalformedValue { .. } => "malformed_value",
        }
    }

    pub fn field(&self) -> Field {
        match self {
            ExtractionFailure::MissingField { field }
            | ExtractionFailure::MalformedValue { field, .. } => *field,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Delivery failures. The bot token is part of the request URL, so transport
/// errors are stored with the URL removed.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request error: {0}")]
    Http(reqwest::Error),

    #[error("message rejected (status {status}): {description}")]
    Rejected { status: u16, description: String },
}

impl NotifyError {
    pub fn http(e: reqwest::Error) -> Self {
        NotifyError::Http(e.without_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_failure_exposes_kind_and_field() {
        let missing = ExtractionFailure::missing(Field::Discount);
        assert_eq!(missing.kind(), "missing_field");
        assert_eq!(missing.field(), Field::Discount);
        assert_eq!(missing.to_string(), "missing field `discount`");

        let malformed = ExtractionFailure::malformed(Field::ListPrice, "R$ abc");
        assert_eq!(malformed.kind(), "malformed_value");
        assert_eq!(malformed.field(), Field::ListPrice);
        assert_eq!(
            malformed.to_string(),
            "malformed value for `list_price`: \"R$ abc\""
        );
    }
}
