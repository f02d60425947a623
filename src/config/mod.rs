//! Configuration module for webtrawl
//!
//! Handles loading, parsing, and validating TOML configuration files.
//! Every tunable carries a default mirroring a conservative production
//! setup, so a minimal config only needs storage, user-agent, and seeds.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    Config, CrawlerConfig, FilterConfig, SeoConfig, StorageConfig, UserAgentConfig,
};
pub use validation::{KNOWN_CRAWL_METHODS, KNOWN_ENGINES};
