use crate::UrlError;
use url::Url;

/// Normalizes a URL for enqueueing and deduplication
///
/// Steps:
/// 1. Parse (prefixing `https://` when the scheme is missing); reject
///    non-HTTP(S) schemes.
/// 2. Lowercase the host.
/// 3. Drop the fragment.
/// 4. Empty path becomes `/`.
///
/// Query strings are kept as-is: many of the sites this crawler targets key
/// real pages off query parameters.
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let candidate = super::add_https_protocol(url_str);
    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    url.set_fragment(None);

    if url.path().is_empty() {
        url.set_path("/");
    }

    Ok(url)
}
