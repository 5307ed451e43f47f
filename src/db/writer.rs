use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::db::models::PriceRow;
use crate::db::RecordStore;
use crate::error::StoreError;
use crate::types::PriceRecord;

/// Persists observations to the `prices` table in PostgreSQL.
/// The pool is opened once at startup and closed once at shutdown.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .database(&cfg.name)
            .username(&cfg.user)
            .password(&cfg.password);
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;
        info!("Database connected at {}:{}/{}", cfg.host, cfg.port, cfg.name);
        Ok(Self { pool })
    }

    /// Create the `prices` table if it does not exist yet. Safe to run on every start.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn persist(&self, record: &PriceRecord) -> Result<(), StoreError> {
        let row = PriceRow::from(record);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO prices (product_name, old_price, discount, new_price, "timestamp")
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&row.product_name)
        .bind(row.old_price)
        .bind(row.discount)
        .bind(row.new_price)
        .bind(row.timestamp)
        .fetch_one(&self.pool)
        .await?;

        debug!(id, product = %row.product_name, "Price row inserted");
        Ok(())
    }
}
