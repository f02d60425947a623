//! Content parsers: pure functions from raw bytes to URL lists
//!
//! No I/O and no crawl policy lives here; the extractor applies domain,
//! robots, filter, and quota rules to whatever these return.

pub mod html;
pub mod sitemap;

pub use html::extract_urls;
pub use sitemap::{extract_all_links, SitemapLinks};
