//! Webtrawl: a polite, resumable multi-domain web crawler
//!
//! This crate implements the fetch/crawl engine: a concurrent dispatcher that
//! turns a set of seed domains into a stream of stored HTTP responses under
//! per-domain page quotas, retry/engine-fallback rules, and checkpointed
//! resumption.

pub mod config;
pub mod crawler;
pub mod parsers;
pub mod queue;
pub mod robots;
pub mod seo;
pub mod sources;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for webtrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Exclusion list error: {0}")]
    ExclusionList(String),

    #[error("Unknown domain in fetch controller: {0}")]
    UnknownDomain(String),

    #[error("Completion underflow for domain {0}: outstanding already zero")]
    CompletionUnderflow(String),

    #[error("Domain already registered: {0}")]
    DomainAlreadyRegistered(String),

    #[error("Unknown fetch engine: {0}")]
    UnknownEngine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL expression: {0}")]
    InvalidExpression(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for webtrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{FetchRequest, FetchResponse, RequestKind, Stage};
pub use state::{FetchController, RunState};
pub use url::{domain_key, normalize_url, sub_domain_key};
