use crate::config::FilterConfig;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Compiled candidate-URL filters
///
/// Built once from the validated configuration; applied to every extracted
/// candidate before quota reservation. A URL passes when its extension is
/// not excluded, no exclusion expression matches, and (when inclusion
/// expressions are configured) at least one of them matches.
#[derive(Debug)]
pub struct UrlFilters {
    excluded_extensions: HashSet<String>,
    excluded: Vec<Regex>,
    included: Vec<Regex>,
}

impl UrlFilters {
    /// Compiles the filters from configuration
    ///
    /// Expressions are pre-validated at config load, so compilation failures
    /// here indicate a config bypass and are surfaced as-is.
    pub fn from_config(config: &FilterConfig) -> Result<Self, regex::Error> {
        let excluded = config
            .excluded_expressions_url
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let included = config
            .included_expressions_url
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            excluded_extensions: config
                .excluded_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            excluded,
            included,
        })
    }

    /// Returns true when the candidate URL survives all filters
    pub fn allows(&self, url: &str) -> bool {
        if let Some(ext) = extension_of(url) {
            if self.excluded_extensions.contains(&ext) {
                return false;
            }
        }

        if self.excluded.iter().any(|re| re.is_match(url)) {
            return false;
        }

        if !self.included.is_empty() && !self.included.iter().any(|re| re.is_match(url)) {
            return false;
        }

        true
    }
}

/// Extracts the lowercase file extension from a URL path, if any
fn extension_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path();
    let last_segment = path.rsplit('/').next()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    if ext.is_empty() || ext.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_lowercase())
}
