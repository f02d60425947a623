//! Request and response records flowing through the crawl engine

use serde::{Deserialize, Serialize};

/// The four kinds of requests the crawler produces, distinguished by origin
/// and by which parser consumes the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// The seed landing page of a domain
    Landing,
    /// The domain's robots.txt
    Robots,
    /// A sitemap (seeded, robots-declared, or nested)
    Sitemap,
    /// An in-domain URL discovered by link extraction
    Internal,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Landing => "landing",
            RequestKind::Robots => "robots",
            RequestKind::Sitemap => "sitemap",
            RequestKind::Internal => "internal",
        }
    }
}

/// One unit of work: a URL to fetch, with its accounting context
///
/// Created by seeding or link extraction, destroyed when its terminal
/// response is emitted and the domain's outstanding counter decremented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Absolute URL
    pub url: String,
    pub kind: RequestKind,
    /// Canonical dom_tld of the owning domain
    pub domain_key: String,
    /// Host-level key (sub-domain kept), carried for parser context
    pub sub_domain_key: String,
    /// Retry attempt on the current engine; starts at 0
    pub attempt: u32,
    /// 0 for seeds, +1 per link-extraction hop
    pub depth: u32,
    /// Index into the ordered engine list
    pub engine: usize,
}

impl FetchRequest {
    /// Builds a depth-0 seed request on the first engine
    pub fn seed(url: &str, kind: RequestKind, domain_key: &str, sub_domain_key: &str) -> Self {
        Self {
            url: url.to_string(),
            kind,
            domain_key: domain_key.to_string(),
            sub_domain_key: sub_domain_key.to_string(),
            attempt: 0,
            depth: 0,
            engine: 0,
        }
    }

    /// Builds a request one hop deeper, inheriting domain and engine
    pub fn child(&self, url: &str, kind: RequestKind) -> Self {
        Self {
            url: url.to_string(),
            kind,
            domain_key: self.domain_key.clone(),
            sub_domain_key: self.sub_domain_key.clone(),
            attempt: 0,
            depth: self.depth + 1,
            engine: self.engine,
        }
    }

    /// The same URL, next attempt on the same engine
    pub fn retried(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    /// The same URL, first attempt on the following engine
    pub fn on_next_engine(&self) -> Self {
        Self {
            attempt: 0,
            engine: self.engine + 1,
            ..self.clone()
        }
    }
}

/// Raw outcome of one engine fetch, before it is tied back to a request
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// HTTP status, or -1 for a transport failure
    pub status_code: i32,
    /// Response headers in wire order
    pub headers: Vec<(String, String)>,
    pub content: Vec<u8>,
    pub num_redirects: u32,
    pub is_timeout: bool,
    pub elapsed_ms: u64,
}

impl EngineOutcome {
    /// A transport-level failure (DNS, connect, TLS, deadline)
    pub fn transport_failure(is_timeout: bool, elapsed_ms: u64) -> Self {
        Self {
            status_code: -1,
            headers: Vec::new(),
            content: Vec::new(),
            num_redirects: 0,
            is_timeout,
            elapsed_ms,
        }
    }
}

/// A completed fetch: the request echoed plus everything the wire returned
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub request: FetchRequest,
    pub status_code: i32,
    pub headers: Vec<(String, String)>,
    pub content: Vec<u8>,
    pub num_redirects: u32,
    pub is_timeout: bool,
    pub elapsed_ms: u64,
}

impl FetchResponse {
    pub fn new(request: FetchRequest, outcome: EngineOutcome) -> Self {
        Self {
            request,
            status_code: outcome.status_code,
            headers: outcome.headers,
            content: outcome.content,
            num_redirects: outcome.num_redirects,
            is_timeout: outcome.is_timeout,
            elapsed_ms: outcome.elapsed_ms,
        }
    }

    /// Serialized name of the request kind
    pub fn request_discriminator(&self) -> &'static str {
        self.request.kind.as_str()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_starts_at_zero() {
        let req = FetchRequest::seed(
            "https://example.com/",
            RequestKind::Landing,
            "example.com",
            "example.com",
        );
        assert_eq!(req.attempt, 0);
        assert_eq!(req.depth, 0);
        assert_eq!(req.engine, 0);
    }

    #[test]
    fn test_child_increments_depth_only() {
        let seed = FetchRequest::seed(
            "https://example.com/",
            RequestKind::Landing,
            "example.com",
            "example.com",
        );
        let child = seed.child("https://example.com/about", RequestKind::Internal);
        assert_eq!(child.depth, 1);
        assert_eq!(child.attempt, 0);
        assert_eq!(child.domain_key, "example.com");
        assert_eq!(child.kind, RequestKind::Internal);
    }

    #[test]
    fn test_retried_and_next_engine() {
        let req = FetchRequest::seed(
            "https://example.com/",
            RequestKind::Landing,
            "example.com",
            "example.com",
        );
        let retried = req.retried();
        assert_eq!(retried.attempt, 1);
        assert_eq!(retried.engine, 0);

        let fallback = retried.on_next_engine();
        assert_eq!(fallback.attempt, 0);
        assert_eq!(fallback.engine, 1);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&RequestKind::Landing).unwrap();
        assert_eq!(json, "\"landing\"");
        assert_eq!(RequestKind::Internal.as_str(), "internal");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let req = FetchRequest::seed(
            "https://example.com/",
            RequestKind::Landing,
            "example.com",
            "example.com",
        );
        let response = FetchResponse::new(
            req,
            EngineOutcome {
                status_code: 200,
                headers: vec![("Content-Type".to_string(), "text/html".to_string())],
                content: Vec::new(),
                num_redirects: 0,
                is_timeout: false,
                elapsed_ms: 5,
            },
        );
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.request_discriminator(), "landing");
    }
}
