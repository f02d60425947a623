//! The fetch/crawl engine
//!
//! Seed domains fan out into landing/robots/sitemap requests; workers fetch
//! them concurrently under per-domain quotas; extracted links feed back into
//! the queue until every domain's outstanding counter reaches zero.

mod coordinator;
pub mod engine;
mod extractor;
mod request;
mod retry;
pub mod stats;
mod worker;

pub use coordinator::{run_stage, status_snapshot, StageSummary};
pub use engine::{build_engines, CurlEngine, FetchEngine, HttpEngine};
pub use extractor::LinkExtractor;
pub use request::{EngineOutcome, FetchRequest, FetchResponse, RequestKind};
pub use retry::{RetryPolicy, RetryVerdict};
pub use worker::{run_worker, WorkerContext};

use crate::state::DomainInbox;
use crate::Result;
use std::sync::Arc;

/// The crawl stages, each with its own checkpoint/metadata prefix
///
/// `Crawl` fetches landing pages, robots, and sitemaps (plus the pages the
/// sitemaps list); `Spider` additionally follows in-domain HTML links to
/// the configured depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Crawl,
    Spider,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Crawl => "crawl",
            Stage::Spider => "spider",
        }
    }

    /// Whether HTML link extraction runs in this stage
    pub fn follows_html_links(&self) -> bool {
        matches!(self, Stage::Spider)
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "crawl" => Ok(Stage::Crawl),
            "spider" => Ok(Stage::Spider),
            other => Err(format!("unknown stage '{}', expected crawl|spider", other)),
        }
    }
}

/// Runs a single stage with a private dynamic-domain inbox
pub async fn crawl(config: crate::Config, stage: Stage) -> Result<StageSummary> {
    let inbox = Arc::new(DomainInbox::new(1024));
    run_stage(Arc::new(config), stage, inbox).await
}
