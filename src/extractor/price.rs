//! pt-BR number parsing for the price fields.
//!
//! The retailer renders `R$ 1.299,90`: `.` groups thousands and `,` is the
//! decimal separator. Every helper returns `None` when the text does not hold
//! a usable number; callers turn that into a `MalformedValue` failure.

/// Parse a pt-BR decimal such as `"1.299,90"` or `"134,90"`.
/// Only digits, `.` and `,` are accepted; anything else yields `None`.
pub fn parse_locale_decimal(text: &str) -> Option<f64> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }
    if text.matches(',').count() > 1 {
        return None;
    }
    let canonical = text.replace('.', "").replace(',', ".");
    if canonical.is_empty() || canonical == "." {
        return None;
    }
    canonical.parse::<f64>().ok()
}

/// Discount badge text (`"-15%"`, `"12,5%"`) to a ratio in [0, 1].
///
/// A percentage never needs a thousands group, so a lone `.` with no `,` is
/// read as the decimal point (`"-12.5%"` is 12.5 %).
pub fn parse_discount_ratio(text: &str) -> Option<f64> {
    let mut numeric: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if !numeric.contains(',') && numeric.matches('.').count() == 1 {
        numeric = numeric.replace('.', ",");
    }
    let percent = parse_locale_decimal(&numeric)?;
    if !(0.0..=100.0).contains(&percent) {
        return None;
    }
    Some(percent / 100.0)
}

/// Join the whole and fraction sub-fields of a split price and parse the result.
///
/// The whole part is rendered with its decimal comma attached (`"134,"`), the
/// fraction without it (`"90"`). Both `"134,"` and `"134"` are accepted.
pub fn parse_split_price(whole: &str, fraction: &str) -> Option<f64> {
    let whole: String = whole.chars().filter(|c| !c.is_whitespace()).collect();
    let whole = whole.trim_end_matches(',');
    let fraction: String = fraction.chars().filter(|c| !c.is_whitespace()).collect();
    if whole.is_empty() || fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    positive(parse_locale_decimal(&format!("{whole},{fraction}"))?)
}

/// Strikethrough list price (`"De: R$ 150,00"`) with prefix, currency symbol
/// and whitespace removed before parsing.
pub fn parse_list_price(text: &str) -> Option<f64> {
    let stripped: String = text
        .replace("De:", "")
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    positive(parse_locale_decimal(&stripped)?)
}

fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}
