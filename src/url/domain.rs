use crate::{UrlError, UrlResult};
use url::Url;

/// Second-level public suffixes that take three labels to form a
/// registrable domain (e.g. `example.co.uk`). Not the full public-suffix
/// list; covers the suffixes that show up in practice for this crawler.
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.nz", "com.br",
    "com.mx", "co.jp", "co.in", "co.za", "com.ar", "com.tr", "com.cn",
];

/// Extracts the canonical registrable domain key (`dom_tld`) from a URL
///
/// The key groups every URL of one site: host lowercased, `www.` stripped,
/// reduced to the registrable tail (`example.com`, `example.co.uk`).
///
/// # Examples
///
/// ```
/// use webtrawl::url::domain_key;
///
/// assert_eq!(domain_key("https://blog.Example.com/post").unwrap(), "example.com");
/// assert_eq!(domain_key("https://www.shop.example.co.uk/").unwrap(), "example.co.uk");
/// ```
pub fn domain_key(url: &str) -> UrlResult<String> {
    let host = host_of(url)?;
    Ok(registrable_tail(&host))
}

/// Extracts the sub-domain key: the full lowercased host minus any `www.`
/// prefix. For `https://blog.example.com/x` this is `blog.example.com`.
pub fn sub_domain_key(url: &str) -> UrlResult<String> {
    let host = host_of(url)?;
    Ok(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Returns true when `candidate_host` belongs to `dom_tld`, honoring the
/// sub-domain policy flag.
pub fn host_matches(candidate_host: &str, dom_tld: &str, follow_subdomains: bool) -> bool {
    let tail = registrable_tail(candidate_host);
    if tail != dom_tld {
        return false;
    }
    if follow_subdomains {
        return true;
    }
    let bare = candidate_host.strip_prefix("www.").unwrap_or(candidate_host);
    bare == dom_tld
}

/// Prefixes `https://` when the string has no scheme (sitemap entries and
/// exclusion-list rows frequently omit it)
pub fn add_https_protocol(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn host_of(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(&add_https_protocol(url)).map_err(|e| UrlError::Parse(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }
    parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)
}

fn registrable_tail(host: &str) -> String {
    let host = host.to_lowercase();
    // IP literals have no registrable tail
    if host.parse::<std::net::IpAddr>().is_ok() {
        return host;
    }
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let take = if SECOND_LEVEL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    if labels.len() <= take {
        host.to_string()
    } else {
        labels[labels.len() - take..].join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_key_simple() {
        assert_eq!(domain_key("https://example.com/").unwrap(), "example.com");
    }

    #[test]
    fn test_domain_key_subdomain_collapses() {
        assert_eq!(
            domain_key("https://api.v2.example.com/endpoint").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn test_domain_key_strips_www_and_case() {
        assert_eq!(
            domain_key("https://WWW.Example.COM/page").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn test_domain_key_second_level_suffix() {
        assert_eq!(
            domain_key("https://shop.example.co.uk/cart").unwrap(),
            "example.co.uk"
        );
    }

    #[test]
    fn test_domain_key_without_scheme() {
        assert_eq!(domain_key("example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_sub_domain_key_keeps_subdomain() {
        assert_eq!(
            sub_domain_key("https://blog.example.com/post").unwrap(),
            "blog.example.com"
        );
        assert_eq!(
            sub_domain_key("https://www.example.com/").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        assert!(matches!(
            domain_key("ftp://example.com/file"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_host_matches_exact() {
        assert!(host_matches("example.com", "example.com", false));
        assert!(host_matches("www.example.com", "example.com", false));
        assert!(!host_matches("blog.example.com", "example.com", false));
        assert!(!host_matches("other.com", "example.com", true));
    }

    #[test]
    fn test_host_matches_subdomain_policy() {
        assert!(host_matches("blog.example.com", "example.com", true));
        assert!(host_matches("a.b.example.com", "example.com", true));
    }

    #[test]
    fn test_ip_hosts_kept_whole() {
        assert_eq!(domain_key("http://127.0.0.1:8080/x").unwrap(), "127.0.0.1");
        assert!(host_matches("127.0.0.1", "127.0.0.1", false));
    }

    #[test]
    fn test_add_https_protocol() {
        assert_eq!(add_https_protocol("example.com"), "https://example.com");
        assert_eq!(
            add_https_protocol("http://example.com"),
            "http://example.com"
        );
        assert_eq!(
            add_https_protocol(" example.com/page "),
            "https://example.com/page"
        );
    }
}
