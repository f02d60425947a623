//! Per-domain robots policy cache
//!
//! Robots responses arrive through the normal fetch pipeline; the extractor
//! deposits the parsed policy here and later consults it when filtering
//! extracted candidates. A domain without a cached policy is treated as
//! allow-all: the robots fetch may still be in flight, and politeness
//! filtering is best-effort by design.

use crate::robots::RobotsPolicy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct RobotsCache {
    policies: Mutex<HashMap<String, Arc<RobotsPolicy>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the policy for a domain, replacing any earlier one
    pub fn update(&self, dom_tld: &str, content: &str) {
        let policy = Arc::new(RobotsPolicy::from_content(content));
        self.policies
            .lock()
            .unwrap()
            .insert(dom_tld.to_string(), policy);
    }

    pub fn get(&self, dom_tld: &str) -> Option<Arc<RobotsPolicy>> {
        self.policies.lock().unwrap().get(dom_tld).cloned()
    }

    /// Allow check against the cached policy; allow when none is cached
    pub fn is_allowed(&self, dom_tld: &str, url: &str, user_agent: &str) -> bool {
        match self.get(dom_tld) {
            Some(policy) => policy.is_allowed(url, user_agent),
            None => true,
        }
    }
}
