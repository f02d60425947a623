//! Crawl counters and the periodic stats reporter

use crate::queue::OutQueue;
use crate::state::{FetchController, RunState};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Seconds between reporter snapshots
const REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Lock-free counters shared by the feeder, workers, and reporter
#[derive(Debug)]
pub struct CrawlCounters {
    processed: AtomicU64,
    bytes: AtomicU64,
    store_errors: AtomicU64,
    seo_issues: AtomicU64,
    /// Signed: a worker may observe its pull before the feeder's matching
    /// push lands, so the gauge can dip below zero transiently
    in_depth: AtomicI64,
    /// Terminal responses per engine index
    per_engine: Vec<AtomicU64>,
}

impl CrawlCounters {
    pub fn new(engine_count: usize) -> Self {
        Self {
            processed: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
            seo_issues: AtomicU64::new(0),
            in_depth: AtomicI64::new(0),
            per_engine: (0..engine_count.max(1)).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn record_response(&self, engine: usize, content_len: usize) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(content_len as u64, Ordering::Relaxed);
        if let Some(counter) = self.per_engine.get(engine) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_seo_issues(&self, count: usize) {
        self.seo_issues.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn in_queue_pushed(&self) {
        self.in_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn in_queue_pulled(&self, count: usize) {
        self.in_depth.fetch_sub(count as i64, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn store_errors(&self) -> u64 {
        self.store_errors.load(Ordering::Relaxed)
    }

    pub fn seo_issues(&self) -> u64 {
        self.seo_issues.load(Ordering::Relaxed)
    }

    pub fn in_queue_depth(&self) -> u64 {
        self.in_depth.load(Ordering::Relaxed).max(0) as u64
    }

    pub fn per_engine(&self) -> Vec<u64> {
        self.per_engine
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }
}

/// Point-in-time view of the crawl, also served to the control surface
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub processed: u64,
    pub bytes_fetched: u64,
    pub in_queue_depth: u64,
    pub out_queue_depth: usize,
    pub registered_domains: usize,
    pub finished_domains: usize,
    pub store_errors: u64,
    pub per_engine_processed: Vec<u64>,
}

impl StatusSnapshot {
    pub fn capture(
        counters: &CrawlCounters,
        controller: &FetchController,
        out: &OutQueue,
    ) -> Self {
        Self {
            processed: counters.processed(),
            bytes_fetched: counters.bytes(),
            in_queue_depth: counters.in_queue_depth(),
            out_queue_depth: out.len(),
            registered_domains: controller.registered_count(),
            finished_domains: controller.finished_count(),
            store_errors: counters.store_errors(),
            per_engine_processed: counters.per_engine(),
        }
    }
}

/// Periodic reporter task
///
/// Logs throughput and queue depth every interval; per-engine rates are a
/// moving average over the last window. Exits after one final snapshot when
/// shutdown is requested.
pub async fn run_reporter(
    counters: Arc<CrawlCounters>,
    controller: Arc<FetchController>,
    out: Arc<OutQueue>,
    run_state: Arc<RunState>,
    engine_names: Vec<String>,
) {
    let mut last_per_engine = counters.per_engine();

    loop {
        let shutting_down = tokio::select! {
            _ = tokio::time::sleep(REPORT_INTERVAL) => false,
            _ = run_state.shutdown_requested() => true,
        };

        let snapshot = StatusSnapshot::capture(&counters, &controller, &out);
        let per_engine = counters.per_engine();
        let rates: Vec<String> = engine_names
            .iter()
            .zip(per_engine.iter().zip(last_per_engine.iter()))
            .map(|(name, (now, before))| {
                let rate = (now - before) as f64 / REPORT_INTERVAL.as_secs_f64();
                format!("{}={:.1}/s", name, rate)
            })
            .collect();
        last_per_engine = per_engine;

        tracing::info!(
            "processed={} queues in/out={}/{} domains finished={}/{} bytes={} store_errors={} [{}]",
            snapshot.processed,
            snapshot.in_queue_depth,
            snapshot.out_queue_depth,
            snapshot.finished_domains,
            snapshot.registered_domains,
            snapshot.bytes_fetched,
            snapshot.store_errors,
            rates.join(" "),
        );

        if shutting_down {
            return;
        }
    }
}
