use crate::config::types::{Config, CrawlerConfig, FilterConfig, UserAgentConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Valid engine names, in the order the default config lists them
pub const KNOWN_ENGINES: &[&str] = &["http", "curl"];

/// Valid crawl-methods entries
pub const KNOWN_CRAWL_METHODS: &[&str] = &["robots", "sitemaps"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_filter_config(&config.filters)?;
    validate_user_agent_config(&config.user_agent)?;

    if config.storage.user_folder.is_empty() {
        return Err(ConfigError::Validation(
            "user-folder cannot be empty".to_string(),
        ));
    }

    for domain in &config.domains {
        if domain.trim().is_empty() {
            return Err(ConfigError::Validation(
                "seed domain entries cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.pools < 1 || config.pools > 128 {
        return Err(ConfigError::Validation(format!(
            "pools must be between 1 and 128, got {}",
            config.pools
        )));
    }

    if config.async_block_size < 1 || config.async_block_size > 256 {
        return Err(ConfigError::Validation(format!(
            "async-block-size must be between 1 and 256, got {}",
            config.async_block_size
        )));
    }

    if config.queue_max_size < 1 {
        return Err(ConfigError::Validation(
            "queue-max-size must be >= 1".to_string(),
        ));
    }

    if config.timeout < 1 {
        return Err(ConfigError::Validation(
            "timeout must be >= 1 second".to_string(),
        ));
    }

    if config.max_pages_per_domain < 1 {
        return Err(ConfigError::Validation(
            "max-pages-per-domain must be >= 1".to_string(),
        ));
    }

    if config.engines.is_empty() {
        return Err(ConfigError::Validation(
            "engines cannot be empty".to_string(),
        ));
    }

    for engine in &config.engines {
        if !KNOWN_ENGINES.contains(&engine.as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown engine '{}', expected one of {:?}",
                engine, KNOWN_ENGINES
            )));
        }
    }

    for method in &config.crawl_methods {
        if !KNOWN_CRAWL_METHODS.contains(&method.as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown crawl method '{}', expected one of {:?}",
                method, KNOWN_CRAWL_METHODS
            )));
        }
    }

    Ok(())
}

/// Checks that every configured URL expression compiles
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    for pattern in config
        .excluded_expressions_url
        .iter()
        .chain(config.included_expressions_url.iter())
    {
        Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidExpression(format!("'{}': {}", pattern, e)))?;
    }
    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::Validation(format!("invalid contact-url: {}", e)))?;

    if !config.contact_email.contains('@') {
        return Err(ConfigError::Validation(format!(
            "invalid contact-email: '{}'",
            config.contact_email
        )));
    }

    Ok(())
}
