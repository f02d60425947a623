use crate::config::SeoConfig;
use crate::crawler::FetchResponse;
use crate::seo::checks::{
    BrokenLinkCheck, H1TooLongCheck, HttpStatus503Check, ResponseCrawlabilityCheck,
    TitleMetaQualityCheck,
};
use crate::seo::{SeoCheck, SeoIssue};

/// Runs the configured set of checks against each terminal response
///
/// Selection: start from every available check, restrict to
/// `enabled-checks` when that list is non-empty, then remove
/// `disabled-checks`. With `checks-enabled = false` the runner is inert.
pub struct SeoRunner {
    enabled: bool,
    checks: Vec<Box<dyn SeoCheck>>,
}

impl SeoRunner {
    pub fn from_config(config: &SeoConfig) -> Self {
        let available: Vec<Box<dyn SeoCheck>> = vec![
            Box::new(BrokenLinkCheck),
            Box::new(HttpStatus503Check),
            Box::new(ResponseCrawlabilityCheck),
            Box::new(H1TooLongCheck::new(config.h1_max_chars)),
            Box::new(TitleMetaQualityCheck::default()),
        ];

        let checks: Vec<Box<dyn SeoCheck>> = available
            .into_iter()
            .filter(|check| {
                let name = check.name();
                let selected = config.enabled_checks.is_empty()
                    || config.enabled_checks.iter().any(|c| c == name);
                selected && !config.disabled_checks.iter().any(|c| c == name)
            })
            .collect();

        if config.checks_enabled {
            tracing::info!(
                "SEO checks enabled: {}",
                checks
                    .iter()
                    .map(|c| c.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Self {
            enabled: config.checks_enabled,
            checks,
        }
    }

    /// A runner that produces no issues
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            checks: Vec::new(),
        }
    }

    pub fn run(&self, response: &FetchResponse) -> Vec<SeoIssue> {
        if !self.enabled {
            return Vec::new();
        }

        self.checks
            .iter()
            .flat_map(|check| check.run(response))
            .collect()
    }
}
