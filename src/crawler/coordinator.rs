//! Stage orchestration
//!
//! Owns the lifecycle of one crawl stage: reconcile storage, seed the
//! domains, start the background tasks and the worker pool, wait for
//! completion or cancellation, then shut everything down in order
//! (workers → feeder → checkpointer → reporter) with a final checkpoint.

use crate::config::Config;
use crate::crawler::engine::build_engines;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::stats::{run_reporter, CrawlCounters, StatusSnapshot};
use crate::crawler::worker::{run_worker, WorkerContext};
use crate::crawler::{FetchRequest, LinkExtractor, RequestKind, Stage};
use crate::queue::{in_queue, run_feeder, OutQueue};
use crate::robots::RobotsCache;
use crate::seo::SeoRunner;
use crate::sources::ExclusionSet;
use crate::state::{DomainInbox, FetchController, RunState};
use crate::storage::{reconcile, run_checkpoint_writer, save_checkpoint, DumpStore, StorageLayout};
use crate::url::{domain_key, normalize_url, sub_domain_key};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// End-of-stage accounting returned to the caller
#[derive(Debug, Clone)]
pub struct StageSummary {
    pub stage: Stage,
    pub processed: u64,
    pub bytes_fetched: u64,
    pub registered_domains: usize,
    pub finished_domains: usize,
    pub duration: Duration,
}

/// Seconds between orchestrator ticks (dynamic-domain inbox drain)
const INBOX_TICK: Duration = Duration::from_secs(1);

/// Runs one stage end-to-end
pub async fn run_stage(
    config: Arc<Config>,
    stage: Stage,
    inbox: Arc<DomainInbox>,
) -> Result<StageSummary> {
    let started = Instant::now();
    tracing::info!("*** BEGIN STAGE {} ***", stage.as_str());

    let layout = StorageLayout::new(&config.storage.user_folder, stage);
    layout.ensure()?;

    // Exclusion list: absence is fatal only when the config demands one
    let exclusions = if config.storage.use_exclusion_list {
        Arc::new(ExclusionSet::load(&layout.exclusion_file())?)
    } else {
        Arc::new(ExclusionSet::empty())
    };

    // Resume reconciliation, or a fresh start for this stage
    let finished_previously: HashSet<String> = if config.storage.resume {
        reconcile(&layout)?.finished
    } else {
        layout.clear_stage()?;
        HashSet::new()
    };

    let engines = build_engines(&config)?;
    let engine_names: Vec<String> = engines.iter().map(|e| e.name().to_string()).collect();

    let controller = Arc::new(FetchController::new(config.crawler.max_pages_per_domain));
    let run_state = Arc::new(RunState::new());
    let out = Arc::new(OutQueue::new());
    let counters = Arc::new(CrawlCounters::new(engines.len()));
    let robots = Arc::new(RobotsCache::new());
    let store = Arc::new(DumpStore::new(
        layout.clone(),
        config.storage.max_dump_size,
        config.crawler.pools as usize,
    ));
    let seo = Arc::new(SeoRunner::from_config(&config.seo));
    let extractor = Arc::new(LinkExtractor::new(
        &config,
        stage,
        Arc::clone(&robots),
        Arc::clone(&controller),
        Arc::clone(&out),
        Arc::clone(&run_state),
    )?);

    // Seed every configured domain up front
    let mut seeded = 0usize;
    for domain in &config.domains {
        if seed_domain(domain, &config, &controller, &out, &exclusions, &finished_previously) {
            seeded += 1;
        }
    }
    tracing::info!(
        "Seeded {} domains ({} skipped as finished/excluded)",
        seeded,
        config.domains.len() - seeded
    );

    if controller.registered_count() == 0 && inbox.is_empty() {
        tracing::warn!("Nothing to crawl for stage {}", stage.as_str());
        return Ok(summary(stage, &counters, &controller, started));
    }

    // Background tasks
    let (in_tx, in_rx) = in_queue(config.crawler.queue_max_size);
    let feeder = tokio::spawn(run_feeder(
        Arc::clone(&out),
        in_tx,
        Arc::clone(&controller),
        Arc::clone(&run_state),
        Arc::clone(&counters),
    ));
    let reporter = tokio::spawn(run_reporter(
        Arc::clone(&counters),
        Arc::clone(&controller),
        Arc::clone(&out),
        Arc::clone(&run_state),
        engine_names,
    ));
    let checkpointer = tokio::spawn(run_checkpoint_writer(
        layout.clone(),
        Arc::clone(&controller),
        Arc::clone(&run_state),
        Duration::from_secs(config.storage.checkpoint_interval),
    ));

    let ctx = Arc::new(WorkerContext {
        engines,
        retry: RetryPolicy::new(
            config.crawler.maximum_retries,
            config.crawler.codes_to_retry.clone(),
            config.crawler.engines.len(),
        ),
        async_block_size: config.crawler.async_block_size as usize,
        out: Arc::clone(&out),
        controller: Arc::clone(&controller),
        run_state: Arc::clone(&run_state),
        counters: Arc::clone(&counters),
        extractor,
        store: Arc::clone(&store),
        seo,
    });

    let workers: Vec<_> = (0..config.crawler.pools as usize)
        .map(|worker_id| tokio::spawn(run_worker(worker_id, Arc::clone(&in_rx), Arc::clone(&ctx))))
        .collect();
    // The workers hold the only receiver handles from here on: once they all
    // exit, a feeder blocked on a full IN queue sees the channel close
    drop(in_rx);

    // Main wait loop: completion, interrupt, or inbox activity
    loop {
        tokio::select! {
            _ = controller.wait_all_finished() => {
                drain_inbox(&inbox, &config, &controller, &out, &exclusions, &finished_previously);
                if controller.total_outstanding() == 0 {
                    tracing::info!("All domains finished");
                    break;
                }
            }
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => tracing::info!("Interrupt received, stopping"),
                    Err(e) => tracing::warn!("Signal listener failed ({}), stopping", e),
                }
                break;
            }
            _ = tokio::time::sleep(INBOX_TICK) => {
                drain_inbox(&inbox, &config, &controller, &out, &exclusions, &finished_previously);
            }
        }
    }

    // Ordered shutdown
    run_state.begin_shutdown();
    for worker in workers {
        let _ = worker.await;
    }
    let _ = feeder.await;
    let _ = checkpointer.await;
    let _ = reporter.await;
    store.finalize();

    // Belt-and-braces final checkpoint from the coordinator itself
    if let Err(e) = save_checkpoint(&layout, &controller.finished_domains()) {
        tracing::warn!("Final checkpoint failed: {}", e);
    }
    run_state.mark_stopped();

    let summary = summary(stage, &counters, &controller, started);
    let secs = summary.duration.as_secs_f64();
    tracing::info!(
        "*** ENDS STAGE {} - {} items in {:.2}s; average speed: {:.2} items/s ***",
        stage.as_str(),
        summary.processed,
        secs,
        if secs > 0.0 { summary.processed as f64 / secs } else { 0.0 },
    );
    Ok(summary)
}

/// Captures a point-in-time status view (served to the control surface)
pub fn status_snapshot(
    counters: &CrawlCounters,
    controller: &FetchController,
    out: &OutQueue,
) -> StatusSnapshot {
    StatusSnapshot::capture(counters, controller, out)
}

fn summary(
    stage: Stage,
    counters: &CrawlCounters,
    controller: &FetchController,
    started: Instant,
) -> StageSummary {
    StageSummary {
        stage,
        processed: counters.processed(),
        bytes_fetched: counters.bytes(),
        registered_domains: controller.registered_count(),
        finished_domains: controller.finished_count(),
        duration: started.elapsed(),
    }
}

/// Registers and enqueues the seed requests of one domain
///
/// Returns false when the domain was skipped: unparseable, excluded,
/// already finished in a previous run, or already registered.
fn seed_domain(
    raw_domain: &str,
    config: &Config,
    controller: &FetchController,
    out: &OutQueue,
    exclusions: &ExclusionSet,
    finished_previously: &HashSet<String>,
) -> bool {
    // A seed may be a bare dom_tld or a full URL (scheme and port kept)
    let (dom_tld, base) = match (domain_key(raw_domain), normalize_url(raw_domain)) {
        (Ok(dom_tld), Ok(base)) => (dom_tld, base),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Skipping seed '{}': {}", raw_domain, e);
            return false;
        }
    };

    if exclusions.contains(&dom_tld) {
        tracing::debug!("Skipping excluded domain {}", dom_tld);
        return false;
    }
    if finished_previously.contains(&dom_tld) {
        tracing::debug!("Skipping finished domain {}", dom_tld);
        return false;
    }
    if controller.is_registered(&dom_tld) {
        return false;
    }

    let sub_dom_tld = sub_domain_key(raw_domain).unwrap_or_else(|_| dom_tld.clone());
    let mut seeds = vec![FetchRequest::seed(
        base.as_str(),
        RequestKind::Landing,
        &dom_tld,
        &sub_dom_tld,
    )];
    let push_seed = |path: &str, kind: RequestKind, seeds: &mut Vec<FetchRequest>| {
        if let Ok(url) = base.join(path) {
            seeds.push(FetchRequest::seed(url.as_str(), kind, &dom_tld, &sub_dom_tld));
        }
    };
    if config.crawler.crawl_methods.iter().any(|m| m == "robots") {
        push_seed("/robots.txt", RequestKind::Robots, &mut seeds);
    }
    if config.crawler.crawl_methods.iter().any(|m| m == "sitemaps") {
        push_seed("/sitemap.xml", RequestKind::Sitemap, &mut seeds);
    }

    if let Err(e) = controller.register_seed(&dom_tld, seeds.len() as u32) {
        tracing::warn!("Could not register {}: {}", dom_tld, e);
        return false;
    }
    for seed in &seeds {
        controller.mark_seen(&dom_tld, &seed.url);
    }
    out.push_many(seeds);
    true
}

/// Registers domains offered through the dynamic inbox; known domains are
/// silently ignored
fn drain_inbox(
    inbox: &DomainInbox,
    config: &Config,
    controller: &FetchController,
    out: &OutQueue,
    exclusions: &ExclusionSet,
    finished_previously: &HashSet<String>,
) {
    for domain in inbox.drain() {
        if seed_domain(&domain, config, controller, out, exclusions, finished_previously) {
            tracing::info!("Dynamically added domain {}", domain);
        }
    }
}
