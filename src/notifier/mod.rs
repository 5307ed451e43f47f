pub mod telegram;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::types::PriceRecord;

pub use telegram::TelegramNotifier;

/// Delivers a text message. Fire-and-forget from the poller's side: only
/// success or failure is observed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Human-readable price update for one record.
pub fn render_message(record: &PriceRecord) -> String {
    format!(
        "Atualização do preço do produto '{}'\nPreço atual: R${:.2}\nDesconto: {:.0}%",
        record.product_name(),
        record.current_price(),
        record.discount_ratio() * 100.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn message_matches_template() {
        let record = PriceRecord::new("Livro X".to_string(), 150.0, 0.10, 134.90, Utc::now());
        assert_eq!(
            render_message(&record),
            "Atualização do preço do produto 'Livro X'\nPreço atual: R$134.90\nDesconto: 10%"
        );
    }

    #[test]
    fn message_pads_price_and_rounds_discount() {
        let record = PriceRecord::new("Caneca".to_string(), 50.0, 0.0, 42.5, Utc::now());
        assert_eq!(
            render_message(&record),
            "Atualização do preço do produto 'Caneca'\nPreço atual: R$42.50\nDesconto: 0%"
        );
    }
}
