use serde::Deserialize;

/// Main configuration structure for webtrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    pub storage: StorageConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub seo: SeoConfig,
    /// Seed domains (dom_tld form); more can be supplied on the command line
    /// or through the dynamic-domain inbox.
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of parallel workers
    #[serde(default = "default_pools")]
    pub pools: u32,

    /// Concurrent in-flight requests per worker
    #[serde(rename = "async-block-size", default = "default_async_block_size")]
    pub async_block_size: u32,

    /// Capacity of the bounded IN queue consumed by workers
    #[serde(rename = "queue-max-size", default = "default_queue_max_size")]
    pub queue_max_size: usize,

    /// Retry attempts per engine before falling through to the next one
    #[serde(rename = "maximum-retries", default = "default_maximum_retries")]
    pub maximum_retries: u32,

    /// HTTP status codes that trigger a retry
    #[serde(rename = "codes-to-retry", default = "default_codes_to_retry")]
    pub codes_to_retry: Vec<i32>,

    /// Ordered list of fetch engines ("http", "curl")
    #[serde(default = "default_engines")]
    pub engines: Vec<String>,

    /// Per-request deadline in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Quota ceiling per domain, enforced by the fetch controller
    #[serde(rename = "max-pages-per-domain", default = "default_max_pages_per_domain")]
    pub max_pages_per_domain: u32,

    /// Depth limit for HTML link extraction
    #[serde(rename = "websites-max-depth", default = "default_websites_max_depth")]
    pub websites_max_depth: u32,

    /// Depth limit for sitemap recursion
    #[serde(rename = "sitemaps-max-depth", default = "default_sitemaps_max_depth")]
    pub sitemaps_max_depth: u32,

    /// Extra seed kinds fetched per domain ("robots", "sitemaps")
    #[serde(rename = "crawl-methods", default = "default_crawl_methods")]
    pub crawl_methods: Vec<String>,

    /// Whether extracted links on sub-domains of the seed dom_tld are followed
    #[serde(rename = "follow-subdomains", default)]
    pub follow_subdomains: bool,

    /// Pass --insecure to the curl fallback engine
    #[serde(rename = "curl-insecure", default)]
    pub curl_insecure: bool,
}

/// Candidate URL filtering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// File extensions dropped from extracted candidates
    #[serde(rename = "excluded-extensions", default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,

    /// Regexes that reject a candidate URL when any of them matches
    #[serde(rename = "excluded-expressions-url", default)]
    pub excluded_expressions_url: Vec<String>,

    /// When non-empty, a candidate must match at least one of these regexes
    #[serde(rename = "included-expressions-url", default)]
    pub included_expressions_url: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_extensions: default_excluded_extensions(),
            excluded_expressions_url: Vec::new(),
            included_expressions_url: Vec::new(),
        }
    }
}

/// Storage and resumption configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base folder for data/, dumps/ and sources/
    #[serde(rename = "user-folder")]
    pub user_folder: String,

    /// Dump file rotation threshold in bytes
    #[serde(rename = "max-dump-size", default = "default_max_dump_size")]
    pub max_dump_size: u64,

    /// Enable the resume reconciler at startup
    #[serde(default)]
    pub resume: bool,

    /// Seconds between finished-domain checkpoint ticks
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,

    /// Require and load sources/exclude_domains.csv; absence is then fatal
    #[serde(rename = "use-exclusion-list", default)]
    pub use_exclusion_list: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full user agent string: `Name/Version (+URL; email)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// SEO check configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SeoConfig {
    #[serde(rename = "checks-enabled", default = "default_true")]
    pub checks_enabled: bool,

    /// When non-empty, only these checks run
    #[serde(rename = "enabled-checks", default)]
    pub enabled_checks: Vec<String>,

    #[serde(rename = "disabled-checks", default)]
    pub disabled_checks: Vec<String>,

    #[serde(rename = "h1-max-chars", default = "default_h1_max_chars")]
    pub h1_max_chars: usize,
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            checks_enabled: true,
            enabled_checks: Vec::new(),
            disabled_checks: Vec::new(),
            h1_max_chars: default_h1_max_chars(),
        }
    }
}

fn default_pools() -> u32 {
    4
}

fn default_async_block_size() -> u32 {
    5
}

fn default_queue_max_size() -> usize {
    100_000
}

fn default_maximum_retries() -> u32 {
    2
}

fn default_codes_to_retry() -> Vec<i32> {
    vec![430, 503, 500, 429]
}

fn default_engines() -> Vec<String> {
    vec!["http".to_string(), "curl".to_string()]
}

fn default_timeout() -> u64 {
    30
}

fn default_max_pages_per_domain() -> u32 {
    5000
}

fn default_websites_max_depth() -> u32 {
    2
}

fn default_sitemaps_max_depth() -> u32 {
    2
}

fn default_crawl_methods() -> Vec<String> {
    vec!["robots".to_string(), "sitemaps".to_string()]
}

fn default_max_dump_size() -> u64 {
    52_428_800
}

fn default_checkpoint_interval() -> u64 {
    120
}

fn default_h1_max_chars() -> usize {
    70
}

fn default_true() -> bool {
    true
}

fn default_excluded_extensions() -> Vec<String> {
    [
        "pdf", "csv", "mp3", "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "svg", "ico",
        "tif", "jfif", "eps", "raw", "heif", "avif", "psd", "ai", "ics", "ogv", "mpg", "mp4",
        "mov", "m4v", "zip", "rar",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
