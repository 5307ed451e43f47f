pub mod price;

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};

use crate::config::selectors;
use crate::error::{AppError, ExtractionFailure, Field, Result};
use crate::types::{PriceRecord, TITLE_PLACEHOLDER};

/// Turns a rendered product page into a `PriceRecord`.
/// Holds only compiled selectors, so one instance serves every target.
pub struct Extractor {
    title: Selector,
    discount: Selector,
    price_whole: Selector,
    price_fraction: Selector,
    list_price: Selector,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            title: compile(selectors::TITLE)?,
            discount: compile(selectors::DISCOUNT)?,
            price_whole: compile(selectors::PRICE_WHOLE)?,
            price_fraction: compile(selectors::PRICE_FRACTION)?,
            list_price: compile(selectors::LIST_PRICE)?,
        })
    }

    /// Extract a record stamped with the current time.
    pub fn extract(&self, document: &str) -> std::result::Result<PriceRecord, ExtractionFailure> {
        self.extract_at(document, Utc::now())
    }

    /// Extract a record stamped with `observed_at`.
    ///
    /// Title absence is tolerated; discount, current price and list price are
    /// required and the first one that fails aborts the extraction.
    pub fn extract_at(
        &self,
        document: &str,
        observed_at: DateTime<Utc>,
    ) -> std::result::Result<PriceRecord, ExtractionFailure> {
        let html = Html::parse_document(document);

        let product_name = first_text(&html, &self.title)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string());

        let discount_text =
            first_text(&html, &self.discount).ok_or(ExtractionFailure::missing(Field::Discount))?;
        let discount_ratio = price::parse_discount_ratio(&discount_text)
            .ok_or_else(|| ExtractionFailure::malformed(Field::Discount, &discount_text))?;

        let whole = first_text(&html, &self.price_whole);
        let fraction = first_text(&html, &self.price_fraction);
        let (whole, fraction) = match (whole, fraction) {
            (Some(w), Some(f)) => (w, f),
            _ => return Err(ExtractionFailure::missing(Field::CurrentPrice)),
        };
        let current_price = price::parse_split_price(&whole, &fraction).ok_or_else(|| {
            ExtractionFailure::malformed(Field::CurrentPrice, format!("{whole}{fraction}"))
        })?;

        let list_text =
            first_text(&html, &self.list_price).ok_or(ExtractionFailure::missing(Field::ListPrice))?;
        let list_price = price::parse_list_price(&list_text)
            .ok_or_else(|| ExtractionFailure::malformed(Field::ListPrice, &list_text))?;

        Ok(PriceRecord::new(
            product_name,
            list_price,
            discount_ratio,
            current_price,
            observed_at,
        ))
    }
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Selector(format!("{css}: {e:?}")))
}

/// Trimmed text content of the first element matching `selector`.
fn first_text(html: &Html, selector: &Selector) -> Option<String> {
    html.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DISCOUNT_SPAN: &str = r#"<span class="a-size-large a-color-price savingPriceOverride aok-align-center reinventPriceSavingsPercentageMargin savingsPercentage">-10%</span>"#;

    fn page(title: Option<&str>, discount: Option<&str>, whole: Option<&str>, fraction: Option<&str>, list: Option<&str>) -> String {
        let mut body = String::new();
        if let Some(t) = title {
            body.push_str(&format!(r#"<span id="productTitle" class="a-size-large product-title-word-break">  {t}  </span>"#));
        }
        if let Some(d) = discount {
            body.push_str(&DISCOUNT_SPAN.replace("-10%", d));
        }
        body.push_str(r#"<span class="a-price aok-align-center"><span class="a-offscreen">R$134,90</span><span aria-hidden="true">"#);
        if let Some(w) = whole {
            body.push_str(&format!(r#"<span class="a-price-whole">{w}<span class="a-price-decimal">,</span></span>"#));
        }
        if let Some(f) = fraction {
            body.push_str(&format!(r#"<span class="a-price-fraction">{f}</span>"#));
        }
        body.push_str("</span></span>");
        if let Some(l) = list {
            body.push_str(&format!(r#"<span class="a-size-small aok-offscreen"> {l} </span>"#));
        }
        format!("<html><head><title>Amazon.com.br</title></head><body>{body}</body></html>")
    }

    fn full_page() -> String {
        page(Some("Livro X"), Some("-10%"), Some("134"), Some("90"), Some("De: R$ 150,00"))
    }

    fn extractor() -> Extractor {
        Extractor::new().unwrap()
    }

    #[test]
    fn end_to_end_record() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let record = extractor().extract_at(&full_page(), at).unwrap();
        assert_eq!(record.product_name(), "Livro X");
        assert_eq!(record.list_price(), 150.0);
        assert!((record.discount_ratio() - 0.10).abs() < 1e-9);
        assert_eq!(record.current_price(), 134.90);
        assert_eq!(record.observed_at(), at);
        assert!(!record.is_anomalous());
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let doc = page(None, Some("-10%"), Some("134"), Some("90"), Some("De: R$ 150,00"));
        let record = extractor().extract(&doc).unwrap();
        assert_eq!(record.product_name(), TITLE_PLACEHOLDER);
    }

    #[test]
    fn missing_discount_is_fatal() {
        let doc = page(Some("Livro X"), None, Some("134"), Some("90"), Some("De: R$ 150,00"));
        assert_eq!(
            extractor().extract(&doc),
            Err(ExtractionFailure::MissingField { field: Field::Discount })
        );
    }

    #[test]
    fn missing_discount_wins_even_when_everything_else_is_absent() {
        let doc = page(None, None, None, None, None);
        assert_eq!(
            extractor().extract(&doc),
            Err(ExtractionFailure::missing(Field::Discount))
        );
    }

    #[test]
    fn malformed_discount_carries_raw_text() {
        let doc = page(Some("Livro X"), Some("Oferta"), Some("134"), Some("90"), Some("De: R$ 150,00"));
        assert_eq!(
            extractor().extract(&doc),
            Err(ExtractionFailure::malformed(Field::Discount, "Oferta"))
        );
    }

    #[test]
    fn missing_either_price_part_is_fatal() {
        let no_fraction = page(Some("Livro X"), Some("-10%"), Some("134"), None, Some("De: R$ 150,00"));
        let no_whole = page(Some("Livro X"), Some("-10%"), None, Some("90"), Some("De: R$ 150,00"));
        for doc in [no_fraction, no_whole] {
            assert_eq!(
                extractor().extract(&doc),
                Err(ExtractionFailure::missing(Field::CurrentPrice))
            );
        }
    }

    #[test]
    fn malformed_current_price() {
        let doc = page(Some("Livro X"), Some("-10%"), Some("abc"), Some("90"), Some("De: R$ 150,00"));
        let err = extractor().extract(&doc).unwrap_err();
        assert_eq!(err.kind(), "malformed_value");
        assert_eq!(err.field(), Field::CurrentPrice);
    }

    #[test]
    fn missing_list_price_is_fatal() {
        let doc = page(Some("Livro X"), Some("-10%"), Some("134"), Some("90"), None);
        assert_eq!(
            extractor().extract(&doc),
            Err(ExtractionFailure::missing(Field::ListPrice))
        );
    }

    #[test]
    fn malformed_list_price() {
        let doc = page(Some("Livro X"), Some("-10%"), Some("134"), Some("90"), Some("De: R$ --"));
        assert_eq!(
            extractor().extract(&doc),
            Err(ExtractionFailure::malformed(Field::ListPrice, "De: R$ --"))
        );
    }

    #[test]
    fn thousands_separator_in_prices() {
        let doc = page(Some("Notebook"), Some("-5%"), Some("1.299"), Some("00"), Some("De: R$ 1.367,37"));
        let record = extractor().extract(&doc).unwrap();
        assert_eq!(record.current_price(), 1299.0);
        assert_eq!(record.list_price(), 1367.37);
    }

    #[test]
    fn current_above_list_is_kept_and_flagged() {
        let doc = page(Some("Livro X"), Some("-0%"), Some("160"), Some("00"), Some("De: R$ 150,00"));
        let record = extractor().extract(&doc).unwrap();
        assert!(record.is_anomalous());
    }

    #[test]
    fn extracting_twice_differs_only_in_timestamp() {
        let ex = extractor();
        let doc = full_page();
        let a = ex.extract_at(&doc, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()).unwrap();
        let b = ex.extract_at(&doc, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 10).unwrap()).unwrap();
        assert_eq!(a.product_name(), b.product_name());
        assert_eq!(a.list_price(), b.list_price());
        assert_eq!(a.discount_ratio(), b.discount_ratio());
        assert_eq!(a.current_price(), b.current_price());
        assert_ne!(a, b);
    }
}
