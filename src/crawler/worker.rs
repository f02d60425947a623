//! Worker pool
//!
//! Each worker pulls a block of requests from the IN queue, dispatches the
//! whole block concurrently through the engines, then resolves every
//! completed fetch: re-enqueue per the retry state machine, or emit: store,
//! SEO, link extraction, and exactly one `complete` per terminal response.
//! This is the only place `complete` is ever called.

use crate::crawler::engine::FetchEngine;
use crate::crawler::retry::{RetryPolicy, RetryVerdict};
use crate::crawler::stats::CrawlCounters;
use crate::crawler::{FetchRequest, FetchResponse, LinkExtractor};
use crate::queue::{OutQueue, SharedInReceiver};
use crate::seo::SeoRunner;
use crate::state::{FetchController, RunState};
use crate::storage::DumpStore;
use std::sync::Arc;

/// Everything a worker needs, shared across the pool
pub struct WorkerContext {
    pub engines: Vec<Arc<dyn FetchEngine>>,
    pub retry: RetryPolicy,
    pub async_block_size: usize,
    pub out: Arc<OutQueue>,
    pub controller: Arc<FetchController>,
    pub run_state: Arc<RunState>,
    pub counters: Arc<CrawlCounters>,
    pub extractor: Arc<LinkExtractor>,
    pub store: Arc<DumpStore>,
    pub seo: Arc<SeoRunner>,
}

/// Runs one worker until the IN queue closes or shutdown is requested
pub async fn run_worker(worker_id: usize, in_rx: SharedInReceiver, ctx: Arc<WorkerContext>) {
    tracing::debug!("Worker {} started", worker_id);

    loop {
        if !ctx.run_state.is_running() {
            break;
        }

        let Some(block) = pull_block(&in_rx, ctx.async_block_size).await else {
            break;
        };
        ctx.counters.in_queue_pulled(block.len());

        let responses =
            futures::future::join_all(block.into_iter().map(|request| dispatch(request, &ctx)))
                .await;

        for response in responses {
            resolve(worker_id, response, &ctx);
        }
    }

    tracing::debug!("Worker {} exiting", worker_id);
}

/// Pulls up to `block_size` requests: blocks for the first, then takes
/// whatever else is immediately available. Returns None when IN is closed
/// and drained.
async fn pull_block(in_rx: &SharedInReceiver, block_size: usize) -> Option<Vec<FetchRequest>> {
    let mut rx = in_rx.lock().await;
    let first = rx.recv().await?;

    let mut block = Vec::with_capacity(block_size);
    block.push(first);
    while block.len() < block_size {
        match rx.try_recv() {
            Ok(request) => block.push(request),
            Err(_) => break,
        }
    }
    Some(block)
}

async fn dispatch(request: FetchRequest, ctx: &WorkerContext) -> FetchResponse {
    // A shrunken engine list between runs clamps to the last engine
    let engine_idx = request.engine.min(ctx.engines.len() - 1);
    let outcome = ctx.engines[engine_idx].fetch(&request.url).await;
    tracing::trace!(
        "{} [{}] -> {} in {}ms",
        request.url,
        ctx.engines[engine_idx].name(),
        outcome.status_code,
        outcome.elapsed_ms
    );
    FetchResponse::new(request, outcome)
}

/// Applies the retry state machine to one completed fetch
fn resolve(worker_id: usize, response: FetchResponse, ctx: &WorkerContext) {
    match ctx.retry.assess(&response) {
        RetryVerdict::Reenqueue(next) => {
            tracing::debug!(
                "Re-enqueue {} (attempt {}, engine {})",
                next.url,
                next.attempt,
                next.engine
            );
            ctx.out.push(next);
        }
        RetryVerdict::Terminal => emit(worker_id, response, ctx),
    }
}

/// Emits a terminal response: store, SEO, extraction, completion
fn emit(worker_id: usize, response: FetchResponse, ctx: &WorkerContext) {
    ctx.counters
        .record_response(response.request.engine, response.content.len());

    let issues = ctx.seo.run(&response);
    if !issues.is_empty() {
        ctx.counters.record_seo_issues(issues.len());
    }

    // Store errors are logged and counted; the crawl keeps going
    if let Err(e) = ctx.store.append(worker_id, &response, &issues) {
        tracing::warn!("Store error for {}: {}", response.request.url, e);
        ctx.counters.record_store_error();
    }

    ctx.extractor.process(&response);

    if let Err(e) = ctx.controller.complete(&response.request.domain_key) {
        // Accounting must stay consistent; this path firing means a bug
        tracing::error!("Completion failed for {}: {}", response.request.domain_key, e);
    }
}
