//! HTML link extraction
//!
//! Pulls followable URLs out of a fetched page: anchors and the canonical
//! link, resolved against the page URL. Pure over the input bytes; all
//! policy (domain matching, filters, quota) is applied by the caller.

use scraper::{Html, Selector};
use url::Url;

/// Extracts absolute candidate URLs from HTML content
///
/// Rules, in the order they apply:
/// - `<a href>` and `<link rel="canonical" href>` elements contribute
/// - anchors carrying a `download` attribute are skipped
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only hrefs are
///   skipped
/// - relative hrefs resolve against `base_url`
/// - only http(s) results survive
pub fn extract_urls(base_url: &Url, content: &[u8]) -> Vec<String> {
    let html = String::from_utf8_lossy(content);
    let document = Html::parse_document(&html);
    let mut links = Vec::new();

    if let Ok(anchor_selector) = Selector::parse("a[href]") {
        for element in document.select(&anchor_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

/// Resolves one href to an absolute http(s) URL, or rejects it
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
