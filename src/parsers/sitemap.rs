//! Sitemap parsing
//!
//! Accepts the two formats seen in the wild: XML (`<urlset>` /
//! `<sitemapindex>`) and plain text (one URL per line). The XML path is a
//! `<loc>` scan rather than a full XML parse; sitemaps are frequently
//! malformed in ways a strict parser rejects, and the only payload this
//! crawler needs is the location list.

/// Links extracted from one sitemap document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SitemapLinks {
    /// Nested sitemaps to fetch (from an index, or .xml-suffixed entries)
    pub sitemaps: Vec<String>,
    /// Page URLs listed for crawling
    pub pages: Vec<String>,
}

impl SitemapLinks {
    pub fn is_empty(&self) -> bool {
        self.sitemaps.is_empty() && self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sitemaps.len() + self.pages.len()
    }
}

/// Extracts all links from sitemap content, XML or plain text
pub fn extract_all_links(content: &[u8]) -> SitemapLinks {
    let text = String::from_utf8_lossy(content);

    if text.contains("<sitemapindex") {
        SitemapLinks {
            sitemaps: scan_loc_entries(&text),
            pages: Vec::new(),
        }
    } else if text.contains("<urlset") || text.contains("<loc") {
        partition(scan_loc_entries(&text))
    } else {
        partition(scan_plain_lines(&text))
    }
}

/// Collects the text content of every `<loc>...</loc>` element
fn scan_loc_entries(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("<loc") {
        let after_tag = &rest[start..];
        let Some(open_end) = after_tag.find('>') else {
            break;
        };
        let value_start = &after_tag[open_end + 1..];
        let Some(close) = value_start.find("</loc") else {
            break;
        };
        let value = value_start[..close].trim();
        // CDATA wrappers show up in generated sitemaps
        let value = value
            .strip_prefix("<![CDATA[")
            .and_then(|v| v.strip_suffix("]]>"))
            .unwrap_or(value)
            .trim();
        if !value.is_empty() {
            entries.push(value.to_string());
        }
        rest = &value_start[close..];
    }

    entries
}

/// One URL per non-empty, non-comment line
fn scan_plain_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            line.starts_with("http://") || line.starts_with("https://") || line.contains('.')
        })
        .map(str::to_string)
        .collect()
}

/// Splits a flat URL list into nested sitemaps and page entries
fn partition(entries: Vec<String>) -> SitemapLinks {
    let mut links = SitemapLinks::default();
    for entry in entries {
        let path = entry.split(['?', '#']).next().unwrap_or(&entry);
        if path.ends_with(".xml") || path.ends_with(".xml.gz") {
            links.sitemaps.push(entry);
        } else {
            links.pages.push(entry);
        }
    }
    links
}
