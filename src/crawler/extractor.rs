//! Link-extraction feedback loop
//!
//! Consumes terminal responses and turns them into new work: HTML links and
//! sitemap entries that survive the domain, robots, filter, and dedupe
//! gates, truncated to whatever quota `reserve` grants. Candidates in
//! excess of the remaining quota are dropped, never deferred.

use crate::config::Config;
use crate::crawler::{FetchRequest, FetchResponse, RequestKind, Stage};
use crate::parsers;
use crate::queue::OutQueue;
use crate::robots::RobotsCache;
use crate::state::{FetchController, RunState};
use crate::url::{host_matches, normalize_url, UrlFilters};
use crate::Result;
use std::sync::Arc;
use url::Url;

pub struct LinkExtractor {
    stage: Stage,
    websites_max_depth: u32,
    sitemaps_max_depth: u32,
    follow_subdomains: bool,
    fetch_sitemaps: bool,
    user_agent: String,
    filters: UrlFilters,
    robots: Arc<RobotsCache>,
    controller: Arc<FetchController>,
    out: Arc<OutQueue>,
    run_state: Arc<RunState>,
}

impl LinkExtractor {
    pub fn new(
        config: &Config,
        stage: Stage,
        robots: Arc<RobotsCache>,
        controller: Arc<FetchController>,
        out: Arc<OutQueue>,
        run_state: Arc<RunState>,
    ) -> Result<Self> {
        let filters = UrlFilters::from_config(&config.filters)
            .map_err(|e| crate::ConfigError::InvalidExpression(e.to_string()))?;

        Ok(Self {
            stage,
            websites_max_depth: config.crawler.websites_max_depth,
            sitemaps_max_depth: config.crawler.sitemaps_max_depth,
            follow_subdomains: config.crawler.follow_subdomains,
            fetch_sitemaps: config
                .crawler
                .crawl_methods
                .iter()
                .any(|m| m == "sitemaps"),
            user_agent: config.user_agent.header_value(),
            filters,
            robots,
            controller,
            out,
            run_state,
        })
    }

    /// Feeds one terminal response back into the queue
    pub fn process(&self, response: &FetchResponse) {
        // Cooperative cancellation: new candidates are dropped outright
        if !self.run_state.is_running() {
            return;
        }
        if response.status_code != 200 {
            return;
        }

        match response.request.kind {
            RequestKind::Landing | RequestKind::Internal => self.queue_html_links(response),
            RequestKind::Robots => self.handle_robots(response),
            RequestKind::Sitemap => self.queue_sitemap_links(response),
        }
    }

    fn queue_html_links(&self, response: &FetchResponse) {
        if !self.stage.follows_html_links() {
            return;
        }
        if response.request.depth + 1 > self.websites_max_depth {
            return;
        }
        let Ok(base) = Url::parse(&response.request.url) else {
            return;
        };

        let request = &response.request;
        let candidates: Vec<(String, RequestKind)> =
            parsers::extract_urls(&base, &response.content)
                .into_iter()
                .filter_map(|raw| self.admit_page(request, &raw))
                .map(|url| (url, RequestKind::Internal))
                .collect();

        self.enqueue(request, candidates);
    }

    /// Caches the robots policy and queues its declared sitemaps
    fn handle_robots(&self, response: &FetchResponse) {
        let body = String::from_utf8_lossy(&response.content);
        let request = &response.request;
        self.robots.update(&request.domain_key, &body);

        if !self.fetch_sitemaps || request.depth + 1 > self.sitemaps_max_depth {
            return;
        }

        let policy = match self.robots.get(&request.domain_key) {
            Some(policy) => policy,
            None => return,
        };

        let candidates: Vec<(String, RequestKind)> = policy
            .sitemaps()
            .iter()
            .filter_map(|raw| self.admit_sitemap(request, raw))
            .map(|url| (url, RequestKind::Sitemap))
            .collect();

        self.enqueue(request, candidates);
    }

    fn queue_sitemap_links(&self, response: &FetchResponse) {
        let request = &response.request;
        if request.depth + 1 > self.sitemaps_max_depth {
            return;
        }

        let links = parsers::extract_all_links(&response.content);
        if !links.is_empty() {
            tracing::debug!(
                "Sitemap {} listed {} sitemaps / {} pages",
                request.url,
                links.sitemaps.len(),
                links.pages.len()
            );
        }

        let mut candidates: Vec<(String, RequestKind)> = Vec::new();
        for raw in &links.sitemaps {
            if let Some(url) = self.admit_sitemap(request, raw) {
                candidates.push((url, RequestKind::Sitemap));
            }
        }
        for raw in &links.pages {
            if let Some(url) = self.admit_page(request, raw) {
                candidates.push((url, RequestKind::Internal));
            }
        }

        self.enqueue(request, candidates);
    }

    /// Gatekeeper for page candidates: normalize, same-domain, configured
    /// filters, robots policy, then the per-domain seen-set
    fn admit_page(&self, request: &FetchRequest, raw: &str) -> Option<String> {
        let url = normalize_url(raw).ok()?;
        if !host_matches(url.host_str()?, &request.domain_key, self.follow_subdomains) {
            return None;
        }
        let url = url.to_string();
        if !self.filters.allows(&url) {
            return None;
        }
        if !self
            .robots
            .is_allowed(&request.domain_key, &url, &self.user_agent)
        {
            return None;
        }
        self.controller
            .mark_seen(&request.domain_key, &url)
            .then_some(url)
    }

    /// Gatekeeper for sitemap candidates: normalize, same-domain, seen-set.
    /// Extension and expression filters target pages, not sitemaps.
    fn admit_sitemap(&self, request: &FetchRequest, raw: &str) -> Option<String> {
        let url = normalize_url(raw).ok()?;
        if !host_matches(url.host_str()?, &request.domain_key, self.follow_subdomains) {
            return None;
        }
        let url = url.to_string();
        self.controller
            .mark_seen(&request.domain_key, &url)
            .then_some(url)
    }

    /// Reserves quota and pushes the granted prefix to OUT
    fn enqueue(&self, request: &FetchRequest, candidates: Vec<(String, RequestKind)>) {
        if candidates.is_empty() {
            return;
        }

        let wanted = candidates.len() as u32;
        let granted = match self.controller.reserve(&request.domain_key, wanted) {
            Ok(granted) => granted,
            Err(e) => {
                tracing::warn!("Reservation failed for {}: {}", request.domain_key, e);
                return;
            }
        };

        if granted < wanted {
            tracing::debug!(
                "Quota truncation for {}: {} of {} candidates kept",
                request.domain_key,
                granted,
                wanted
            );
        }

        self.out.push_many(
            candidates
                .into_iter()
                .take(granted as usize)
                .map(|(url, kind)| request.child(&url, kind)),
        );
    }
}
