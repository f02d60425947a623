//! Exclusion-list loading
//!
//! The exclusion set is an immutable set of domain keys loaded once at
//! startup from `sources/exclude_domains.csv`. Domains in this set are never
//! seeded and their extracted candidates are dropped.

use crate::url::domain_key;
use crate::{CrawlError, Result};
use std::collections::HashSet;
use std::path::Path;

/// Column names accepted in the exclusion CSV header
const VALID_COLUMNS: &[&str] = &["domain", "dom_tld"];

/// Immutable set of excluded domain keys
#[derive(Debug, Default)]
pub struct ExclusionSet {
    domains: HashSet<String>,
}

impl ExclusionSet {
    /// An empty set; used when the exclusion list is disabled
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the exclusion set from a CSV file
    ///
    /// The file must carry a header row with a `domain` or `dom_tld` column.
    /// Rows that do not parse as a domain are skipped; a missing file or a
    /// missing column is fatal, per the startup error policy.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CrawlError::ExclusionList(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut lines = content.lines();
        let header = lines
            .next()
            .ok_or_else(|| CrawlError::ExclusionList(format!("{} is empty", path.display())))?;

        let columns: Vec<String> = split_csv_row(header);
        let column_idx = columns
            .iter()
            .position(|c| VALID_COLUMNS.contains(&c.trim().to_lowercase().as_str()))
            .ok_or_else(|| {
                CrawlError::ExclusionList(format!(
                    "missing required column, expected one of {:?}",
                    VALID_COLUMNS
                ))
            })?;

        let mut domains = HashSet::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_csv_row(line);
            let Some(raw) = fields.get(column_idx) else {
                continue;
            };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            // Canonicalize each row to a dom_tld; skip rows that don't parse
            if let Ok(key) = domain_key(raw) {
                domains.insert(key);
            }
        }

        tracing::info!("Loaded {} excluded domains from {}", domains.len(), path.display());
        Ok(Self { domains })
    }

    /// Returns true when the domain key is excluded
    pub fn contains(&self, dom_tld: &str) -> bool {
        self.domains.contains(dom_tld)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Splits one CSV row on commas, stripping optional double quotes
///
/// The exclusion file format is a flat two-column export; embedded commas in
/// quoted fields do not occur in it.
fn split_csv_row(line: &str) -> Vec<String> {
    line.split(',')
        .map(|f| f.trim().trim_matches('"').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_domain_column() {
        let file = write_csv("domain\nexample.com\nspam.net\n");
        let set = ExclusionSet::load(file.path()).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("example.com"));
        assert!(set.contains("spam.net"));
        assert!(!set.contains("other.org"));
    }

    #[test]
    fn test_load_dom_tld_column_with_extra_columns() {
        let file = write_csv("id,dom_tld,notes\n1,example.com,first\n2,\"quoted.org\",second\n");
        let set = ExclusionSet::load(file.path()).unwrap();
        assert!(set.contains("example.com"));
        assert!(set.contains("quoted.org"));
    }

    #[test]
    fn test_rows_canonicalized() {
        let file = write_csv("domain\nWWW.Example.COM\nblog.example.net\n");
        let set = ExclusionSet::load(file.path()).unwrap();
        assert!(set.contains("example.com"));
        assert!(set.contains("example.net"));
    }

    #[test]
    fn test_invalid_rows_skipped() {
        let file = write_csv("domain\nexample.com\n\nnot a domain at all !!\n");
        let set = ExclusionSet::load(file.path()).unwrap();
        assert!(set.contains("example.com"));
    }

    #[test]
    fn test_missing_column_fatal() {
        let file = write_csv("url,notes\nhttps://example.com,oops\n");
        assert!(matches!(
            ExclusionSet::load(file.path()),
            Err(CrawlError::ExclusionList(_))
        ));
    }

    #[test]
    fn test_missing_file_fatal() {
        assert!(matches!(
            ExclusionSet::load(Path::new("/nonexistent/exclude.csv")),
            Err(CrawlError::ExclusionList(_))
        ));
    }
}
