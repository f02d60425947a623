//! SEO checks: pure functions over a response record
//!
//! Each check inspects one terminal response and yields zero or more issues.
//! Checks never perform I/O and a misbehaving check is isolated to the
//! response it was looking at; issues ride along in the stored metadata row.

pub mod checks;
mod runner;

pub use runner::SeoRunner;

use serde::{Deserialize, Serialize};

/// Issue severity, ordered from informational to blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One finding produced by a check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoIssue {
    /// Stable machine-readable code, e.g. `HTTP_503`
    pub code: String,
    pub severity: Severity,
    pub message: String,
    /// Name of the check that produced this issue
    pub check: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<serde_json::Value>,
}

impl SeoIssue {
    pub fn new(
        code: &str,
        severity: Severity,
        message: impl Into<String>,
        check: &str,
        url: &str,
    ) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message: message.into(),
            check: check.to_string(),
            url: url.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Contract implemented by every check
pub trait SeoCheck: Send + Sync {
    fn name(&self) -> &'static str;

    /// Inspects one response; idempotent and I/O-free
    fn run(&self, response: &crate::crawler::FetchResponse) -> Vec<SeoIssue>;
}
