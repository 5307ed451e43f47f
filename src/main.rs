mod config;
mod db;
mod error;
mod extractor;
mod fetcher;
mod notifier;
mod poller;
mod shutdown;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::PgRecordStore;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::notifier::TelegramNotifier;
use crate::poller::Poller;

#[tokio::main]
async fn main() {
    let cfg = match config::load_dotenv().and_then(|()| Config::from_env()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // Everything that can fail on bad settings is built before the database is touched.
    let extractor = Extractor::new()?;
    let fetcher = fetcher::from_config(&cfg.fetch)?;
    let notifier = Arc::new(TelegramNotifier::new(&cfg.telegram)?);

    // --- Database setup ---
    let store = Arc::new(PgRecordStore::connect(&cfg.database).await?);
    let result = poll(&cfg, Arc::clone(&store), fetcher, notifier, extractor).await;
    store.close().await;
    result
}

async fn poll(
    cfg: &Config,
    store: Arc<PgRecordStore>,
    fetcher: Arc<dyn fetcher::PageFetcher>,
    notifier: Arc<TelegramNotifier>,
    extractor: Extractor,
) -> Result<()> {
    store.ensure_schema().await?;

    for target in &cfg.targets {
        info!(target_id = %target.id, url = %target.url, "Monitoring {}", target.id);
    }

    let shutdown = shutdown::listen();
    let mut poller = Poller::new(fetcher, store, notifier, extractor);
    poller.run(&cfg.targets, cfg.poll_interval, shutdown).await;

    Ok(())
}
