use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::db::RecordStore;
use crate::error::ExtractionFailure;
use crate::extractor::Extractor;
use crate::fetcher::PageFetcher;
use crate::notifier::{render_message, Notifier};
use crate::types::{PriceRecord, Target};

/// Where a target iteration was when it stopped. Logged with every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Extracting,
    Persisting,
    Notifying,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Persisting => "persisting",
            Stage::Notifying => "notifying",
            Stage::Done => "done",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// A record was extracted; persist and notify were both attempted.
    Completed { persisted: bool, notified: bool },
    FetchFailed,
    ExtractionFailed(ExtractionFailure),
}

/// What happened to each target in one pass.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(String, TargetOutcome)>,
    /// True when cancellation stopped the cycle before the last target.
    pub cancelled: bool,
}

impl CycleReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Targets whose record was both stored and announced.
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TargetOutcome::Completed { persisted: true, notified: true }))
            .count()
    }

    /// Targets skipped before a record existed.
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| !matches!(o, TargetOutcome::Completed { .. }))
            .count()
    }
}

/// Drives fetch → extract → persist + notify over the configured targets.
///
/// Collaborators are injected so each can be replaced independently. Every
/// per-target error is logged and contained; the loop only ends on
/// cancellation.
pub struct Poller {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    extractor: Extractor,
    /// Latest stamp handed out, so `observed_at` never goes backwards within a run.
    last_observed: Option<DateTime<Utc>>,
}

impl Poller {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        extractor: Extractor,
    ) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            extractor,
            last_observed: None,
        }
    }

    /// Poll until `shutdown` turns true. The `interval` wait starts when a
    /// cycle ends, so a slow cycle always finishes before the delay begins.
    pub async fn run(
        &mut self,
        targets: &[Target],
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            targets = targets.len(),
            interval_secs = interval.as_secs(),
            "Poller started: {} target(s), {}s between cycles",
            targets.len(),
            interval.as_secs(),
        );

        let mut cycle: u64 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }
            cycle += 1;

            let started = Instant::now();
            let report = self.run_cycle(targets, &shutdown).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            info!(
                cycle,
                attempted = report.attempted(),
                completed = report.completed(),
                skipped = report.skipped(),
                elapsed_ms,
                "Cycle {cycle} done | attempted: {} | completed: {} | skipped: {} | {elapsed_ms}ms",
                report.attempted(),
                report.completed(),
                report.skipped(),
            );

            if report.cancelled {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancelled(&mut shutdown) => break,
            }
        }

        info!("Poller stopped after {cycle} cycle(s)");
    }

    /// One pass over `targets` in order. Cancellation is checked before each target;
    /// a target already in progress runs to the end.
    pub async fn run_cycle(
        &mut self,
        targets: &[Target],
        shutdown: &watch::Receiver<bool>,
    ) -> CycleReport {
        let mut report = CycleReport::default();
        for target in targets {
            if *shutdown.borrow() {
                report.cancelled = true;
                break;
            }
            let outcome = self.process_target(target).await;
            report.outcomes.push((target.id.clone(), outcome));
        }
        report
    }

    async fn process_target(&mut self, target: &Target) -> TargetOutcome {
        let document = match self.fetcher.fetch(&target.url).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    target_id = %target.id,
                    url = %target.url,
                    stage = %Stage::Fetching,
                    "Fetch failed, skipping {} this cycle: {e}",
                    target.id,
                );
                return TargetOutcome::FetchFailed;
            }
        };

        let record = match self.extractor.extract(&document) {
            Ok(r) => self.stamp(r),
            Err(e) => {
                warn!(
                    target_id = %target.id,
                    stage = %Stage::Extracting,
                    kind = e.kind(),
                    field = %e.field(),
                    "Extraction failed, skipping {} this cycle: {e}",
                    target.id,
                );
                return TargetOutcome::ExtractionFailed(e);
            }
        };

        if record.is_anomalous() {
            warn!(
                target_id = %target.id,
                current_price = record.current_price(),
                list_price = record.list_price(),
                "Price anomaly: current R${:.2} above list R${:.2}",
                record.current_price(),
                record.list_price(),
            );
        }

        let message = render_message(&record);
        let (persisted, notified) = tokio::join!(
            self.store.persist(&record),
            self.notifier.notify(&message),
        );

        if let Err(e) = &persisted {
            error!(target_id = %target.id, stage = %Stage::Persisting, "Persist failed: {e}");
        }
        if let Err(e) = &notified {
            error!(target_id = %target.id, stage = %Stage::Notifying, "Notify failed: {e}");
        }

        info!(
            target_id = %target.id,
            stage = %Stage::Done,
            product = %record.product_name(),
            current_price = record.current_price(),
            discount = record.discount_ratio(),
            "{} | R${:.2} | -{:.0}%",
            record.product_name(),
            record.current_price(),
            record.discount_ratio() * 100.0,
        );

        TargetOutcome::Completed {
            persisted: persisted.is_ok(),
            notified: notified.is_ok(),
        }
    }

    /// Clamp the record's stamp to the last one issued if the wall clock stepped back.
    fn stamp(&mut self, record: PriceRecord) -> PriceRecord {
        let record = match self.last_observed {
            Some(last) if record.observed_at() < last => record.with_observed_at(last),
            _ => record,
        };
        self.last_observed = Some(record.observed_at());
        record
    }
}

/// Resolves once the flag is true. A dropped sender means no cancellation can
/// arrive, so the future then never resolves.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
