pub mod models;
pub mod writer;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::PriceRecord;

pub use writer::PgRecordStore;

/// Append-only sink for observations. Every call records a new observation,
/// even for a record equal to one already stored.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn persist(&self, record: &PriceRecord) -> Result<(), StoreError>;
}
