//! Per-domain fetch accounting
//!
//! The fetch controller is the single authority over how much work exists
//! per domain. Quota is claimed *before* URLs are enqueued (`reserve`), and
//! released exactly once per terminal response (`complete`), so the queues
//! can never hold more than the remaining budget of any domain.

use crate::{CrawlError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::Notify;

/// Counters for one domain
#[derive(Debug)]
struct DomainEntry {
    /// URLs enqueued but not yet terminally resolved
    outstanding: u32,
    /// Total quota slots ever granted for this domain
    tot_pages: u32,
    /// Set once, when outstanding first reaches zero
    finished: bool,
    /// URLs already enqueued for this domain (duplicate suppression)
    seen: HashSet<String>,
}

/// Read-only view of one domain's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSnapshot {
    pub dom_tld: String,
    pub outstanding: u32,
    pub tot_pages: u32,
    pub finished: bool,
}

/// Tracks outstanding work and page quota for every registered domain
///
/// All counter movement goes through `register_seed` / `reserve` /
/// `complete`; any other mutation path is a bug. A single mutex guards the
/// whole table; cross-domain consistency is not required, and the critical
/// sections are tiny and the table is touched once per URL, not per byte.
pub struct FetchController {
    entries: Mutex<HashMap<String, DomainEntry>>,
    max_pages_per_domain: u32,
    /// Signaled on every completion that zeroes a domain
    completion: Notify,
}

impl FetchController {
    pub fn new(max_pages_per_domain: u32) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_pages_per_domain,
            completion: Notify::new(),
        }
    }

    /// Registers a domain with its seed URL count
    ///
    /// Initializes `outstanding = tot_pages = seed_count`. Fails if the
    /// domain is already registered.
    pub fn register_seed(&self, dom_tld: &str, seed_count: u32) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(dom_tld) {
            return Err(CrawlError::DomainAlreadyRegistered(dom_tld.to_string()));
        }
        entries.insert(
            dom_tld.to_string(),
            DomainEntry {
                outstanding: seed_count,
                tot_pages: seed_count,
                finished: seed_count == 0,
                seen: HashSet::new(),
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, dom_tld: &str) -> bool {
        self.entries.lock().unwrap().contains_key(dom_tld)
    }

    /// Atomically claims up to `wanted` quota slots for a domain
    ///
    /// Returns the granted count: `min(wanted, max_pages_per_domain -
    /// tot_pages)`. The caller must enqueue exactly that many URLs.
    pub fn reserve(&self, dom_tld: &str, wanted: u32) -> Result<u32> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(dom_tld)
            .ok_or_else(|| CrawlError::UnknownDomain(dom_tld.to_string()))?;

        let remaining = self.max_pages_per_domain.saturating_sub(entry.tot_pages);
        let granted = wanted.min(remaining);
        entry.tot_pages += granted;
        entry.outstanding += granted;
        Ok(granted)
    }

    /// Records one terminal response for a domain
    ///
    /// Decrements `outstanding`; when it reaches zero the domain flips to
    /// finished (monotonic, exactly once) and the completion condition is
    /// signaled. Errors on an unknown domain or an underflow.
    pub fn complete(&self, dom_tld: &str) -> Result<bool> {
        let finished = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .get_mut(dom_tld)
                .ok_or_else(|| CrawlError::UnknownDomain(dom_tld.to_string()))?;

            if entry.outstanding == 0 {
                return Err(CrawlError::CompletionUnderflow(dom_tld.to_string()));
            }
            entry.outstanding -= 1;
            if entry.outstanding == 0 {
                entry.finished = true;
            }
            entry.finished
        };

        if finished {
            self.completion.notify_waiters();
        }
        Ok(finished)
    }

    /// Records a URL as enqueued for the domain
    ///
    /// Returns true when the URL was not seen before (and is therefore safe
    /// to enqueue). Unknown domains report false, which drops the candidate.
    pub fn mark_seen(&self, dom_tld: &str, url: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(dom_tld) {
            Some(entry) => entry.seen.insert(url.to_string()),
            None => false,
        }
    }

    /// Sum of outstanding counters across all domains
    pub fn total_outstanding(&self) -> u64 {
        self.entries
            .lock()
            .unwrap()
            .values()
            .map(|e| e.outstanding as u64)
            .sum()
    }

    /// Domains whose outstanding counter has reached zero
    pub fn finished_domains(&self) -> Vec<String> {
        let mut finished: Vec<String> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e)| e.finished)
            .map(|(d, _)| d.clone())
            .collect();
        finished.sort();
        finished
    }

    /// Consistent view of all entries, for the reporter and checkpointer
    pub fn snapshot(&self) -> Vec<DomainSnapshot> {
        let mut all: Vec<DomainSnapshot> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(d, e)| DomainSnapshot {
                dom_tld: d.clone(),
                outstanding: e.outstanding,
                tot_pages: e.tot_pages,
                finished: e.finished,
            })
            .collect();
        all.sort_by(|a, b| a.dom_tld.cmp(&b.dom_tld));
        all
    }

    pub fn registered_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn finished_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.finished)
            .count()
    }

    /// Waits until every registered domain is finished
    ///
    /// The notified-future is armed before the condition check, so a
    /// completion landing between the two cannot be lost.
    pub async fn wait_all_finished(&self) {
        loop {
            let notified = self.completion.notified();
            if self.total_outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_snapshot() {
        let controller = FetchController::new(10);
        controller.register_seed("example.com", 3).unwrap();

        let snap = controller.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].outstanding, 3);
        assert_eq!(snap[0].tot_pages, 3);
        assert!(!snap[0].finished);
    }

    #[test]
    fn test_double_register_fails() {
        let controller = FetchController::new(10);
        controller.register_seed("example.com", 1).unwrap();
        assert!(matches!(
            controller.register_seed("example.com", 1),
            Err(CrawlError::DomainAlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_reserve_respects_quota() {
        let controller = FetchController::new(5);
        controller.register_seed("example.com", 1).unwrap();

        // 1 seed already counted; 4 slots remain
        assert_eq!(controller.reserve("example.com", 100).unwrap(), 4);
        // Quota exhausted
        assert_eq!(controller.reserve("example.com", 1).unwrap(), 0);

        let snap = controller.snapshot();
        assert_eq!(snap[0].tot_pages, 5);
        assert_eq!(snap[0].outstanding, 5);
    }

    #[test]
    fn test_reserve_unknown_domain_fails() {
        let controller = FetchController::new(5);
        assert!(matches!(
            controller.reserve("nowhere.net", 1),
            Err(CrawlError::UnknownDomain(_))
        ));
    }

    #[test]
    fn test_complete_flips_finished_exactly_once() {
        let controller = FetchController::new(5);
        controller.register_seed("example.com", 2).unwrap();

        assert!(!controller.complete("example.com").unwrap());
        assert!(controller.complete("example.com").unwrap());
        assert_eq!(controller.finished_domains(), vec!["example.com"]);

        // Underflow is an error, not a silent no-op
        assert!(matches!(
            controller.complete("example.com"),
            Err(CrawlError::CompletionUnderflow(_))
        ));
    }

    #[test]
    fn test_conservation_of_grants_and_completions() {
        let controller = FetchController::new(100);
        controller.register_seed("example.com", 1).unwrap();
        let granted = controller.reserve("example.com", 7).unwrap();
        assert_eq!(granted, 7);

        for _ in 0..8 {
            controller.complete("example.com").unwrap();
        }
        assert_eq!(controller.total_outstanding(), 0);
        assert_eq!(controller.finished_count(), 1);
    }

    #[test]
    fn test_mark_seen_dedupes() {
        let controller = FetchController::new(10);
        controller.register_seed("example.com", 1).unwrap();

        assert!(controller.mark_seen("example.com", "https://example.com/a"));
        assert!(!controller.mark_seen("example.com", "https://example.com/a"));
        assert!(controller.mark_seen("example.com", "https://example.com/b"));
        // Unknown domains never admit URLs
        assert!(!controller.mark_seen("ghost.net", "https://ghost.net/"));
    }

    #[tokio::test]
    async fn test_wait_all_finished() {
        use std::sync::Arc;

        let controller = Arc::new(FetchController::new(10));
        controller.register_seed("example.com", 1).unwrap();

        let waiter = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.wait_all_finished().await })
        };

        controller.complete("example.com").unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("wait_all_finished should resolve")
            .unwrap();
    }
}
