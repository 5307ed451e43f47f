use chrono::NaiveDateTime;

use crate::types::PriceRecord;

/// Column values for one row of the `prices` table (see `migrations/`).
/// `timestamp` is the observation time in UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub product_name: String,
    pub old_price: f64,
    pub discount: f64,
    pub new_price: f64,
    pub timestamp: NaiveDateTime,
}

impl From<&PriceRecord> for PriceRow {
    fn from(r: &PriceRecord) -> Self {
        Self {
            product_name: r.product_name().to_string(),
            old_price: r.list_price(),
            discount: r.discount_ratio(),
            new_price: r.current_price(),
            timestamp: r.observed_at().naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn record_maps_onto_price_columns() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap();
        let record = PriceRecord::new("Livro X".to_string(), 150.0, 0.10, 134.90, at);
        let row = PriceRow::from(&record);
        assert_eq!(row.product_name, "Livro X");
        assert_eq!(row.old_price, 150.0);
        assert_eq!(row.discount, 0.10);
        assert_eq!(row.new_price, 134.90);
        assert_eq!(row.timestamp.to_string(), "2024-06-01 15:30:00");
    }
}
