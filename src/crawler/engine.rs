//! Fetch engines
//!
//! An engine is one pluggable HTTP adapter behind the uniform contract
//! `fetch(url) -> EngineOutcome`: HTTP error statuses are data, only
//! transport failures collapse to `status_code = -1`. The retry state
//! machine walks the configured engine list without knowing what is behind
//! each name.

use crate::config::{Config, UserAgentConfig};
use crate::crawler::request::EngineOutcome;
use crate::{CrawlError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Redirect hop ceiling shared by both engines
const MAX_REDIRECTS: u32 = 10;

/// Uniform fetch contract implemented by every engine
pub trait FetchEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches the URL under the engine's configured deadline. Never fails:
    /// every problem is encoded in the returned outcome.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, EngineOutcome>;
}

/// Instantiates the configured engine list, in order
pub fn build_engines(config: &Config) -> Result<Vec<Arc<dyn FetchEngine>>> {
    let mut engines: Vec<Arc<dyn FetchEngine>> = Vec::new();
    for name in &config.crawler.engines {
        match name.as_str() {
            "http" => engines.push(Arc::new(HttpEngine::new(
                &config.user_agent,
                config.crawler.timeout,
            )?)),
            "curl" => engines.push(Arc::new(CurlEngine::new(
                &config.user_agent,
                config.crawler.timeout,
                config.crawler.curl_insecure,
            ))),
            other => return Err(CrawlError::UnknownEngine(other.to_string())),
        }
    }
    Ok(engines)
}

/// Primary engine: reqwest with rustls, gzip/brotli, manual redirects
///
/// Redirects are followed by hand so the hop count lands in the outcome and
/// loops are detected instead of silently exhausted.
pub struct HttpEngine {
    client: Client,
}

impl HttpEngine {
    pub fn new(user_agent: &UserAgentConfig, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .redirect(Policy::none())
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_inner(&self, url: &str) -> EngineOutcome {
        let started = Instant::now();
        let mut current = url.to_string();
        let mut visited: HashSet<String> = HashSet::new();
        let mut redirects: u32 = 0;

        loop {
            if !visited.insert(current.clone()) {
                // Redirect loop; report as a transport failure
                return EngineOutcome::transport_failure(false, elapsed_ms(started));
            }

            let response = match self.client.get(&current).send().await {
                Ok(response) => response,
                Err(e) => {
                    return EngineOutcome::transport_failure(e.is_timeout(), elapsed_ms(started))
                }
            };

            let status = response.status();
            if status.is_redirection() && redirects < MAX_REDIRECTS {
                if let Some(next) = redirect_target(&current, &response) {
                    redirects += 1;
                    tracing::trace!("Redirect {} -> {}", current, next);
                    current = next;
                    continue;
                }
                // Redirect without a usable Location: emit the 3xx as-is
            }

            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect();

            return match response.bytes().await {
                Ok(body) => EngineOutcome {
                    status_code: status.as_u16() as i32,
                    headers,
                    content: body.to_vec(),
                    num_redirects: redirects,
                    is_timeout: false,
                    elapsed_ms: elapsed_ms(started),
                },
                Err(e) => EngineOutcome::transport_failure(e.is_timeout(), elapsed_ms(started)),
            };
        }
    }
}

impl FetchEngine for HttpEngine {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, EngineOutcome> {
        self.fetch_inner(url).boxed()
    }
}

/// Resolves the Location header of a redirect against the current URL
fn redirect_target(current: &str, response: &reqwest::Response) -> Option<String> {
    let location = response.headers().get("location")?.to_str().ok()?;
    if location.starts_with("http://") || location.starts_with("https://") {
        return Some(location.to_string());
    }
    let base = Url::parse(current).ok()?;
    base.join(location).ok().map(|u| u.to_string())
}

/// Fallback engine: an external `curl` process
///
/// Some servers reject rustls handshakes or fingerprint the client; curl
/// with its own TLS stack (optionally `--insecure`) gets through. Headers
/// arrive inline via `-i` and are split from the body here.
pub struct CurlEngine {
    user_agent: String,
    timeout_secs: u64,
    insecure: bool,
}

/// curl exit code for an exceeded `-m` deadline
const CURL_EXIT_TIMEOUT: i32 = 28;

impl CurlEngine {
    pub fn new(user_agent: &UserAgentConfig, timeout_secs: u64, insecure: bool) -> Self {
        Self {
            user_agent: user_agent.header_value(),
            timeout_secs,
            insecure,
        }
    }

    async fn fetch_inner(&self, url: &str) -> EngineOutcome {
        let started = Instant::now();

        let mut command = tokio::process::Command::new("curl");
        command
            .arg("-sS")
            .arg("-i")
            .arg("-L")
            .arg("--max-redirs")
            .arg(MAX_REDIRECTS.to_string())
            .arg("-m")
            .arg(self.timeout_secs.to_string())
            .arg("-A")
            .arg(&self.user_agent);
        if self.insecure {
            command.arg("--insecure");
        }
        command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match command.output().await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Failed to spawn curl: {}", e);
                return EngineOutcome::transport_failure(false, elapsed_ms(started));
            }
        };

        if !output.status.success() {
            let timed_out = output.status.code() == Some(CURL_EXIT_TIMEOUT);
            return EngineOutcome::transport_failure(timed_out, elapsed_ms(started));
        }

        match parse_curl_response(&output.stdout) {
            Some((status_code, headers, num_redirects, content)) => EngineOutcome {
                status_code,
                headers,
                content,
                num_redirects,
                is_timeout: false,
                elapsed_ms: elapsed_ms(started),
            },
            None => EngineOutcome::transport_failure(false, elapsed_ms(started)),
        }
    }
}

impl FetchEngine for CurlEngine {
    fn name(&self) -> &'static str {
        "curl"
    }

    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, EngineOutcome> {
        self.fetch_inner(url).boxed()
    }
}

/// Splits `curl -i -L` output into (status, headers, redirect count, body)
///
/// With `-L`, every hop contributes its own header block; the last block
/// describes the final response and the blocks before it are redirects.
fn parse_curl_response(raw: &[u8]) -> Option<(i32, Vec<(String, String)>, u32, Vec<u8>)> {
    let mut rest = raw;
    let mut blocks: u32 = 0;
    let mut status_code: Option<i32> = None;
    let mut headers: Vec<(String, String)> = Vec::new();

    while rest.starts_with(b"HTTP/") {
        let end = find_header_end(rest)?;
        let block = std::str::from_utf8(&rest[..end]).ok()?;
        let mut lines = block.lines();

        // Status line: "HTTP/1.1 200 OK" or "HTTP/2 200"
        let status_line = lines.next()?;
        status_code = Some(status_line.split_whitespace().nth(1)?.parse().ok()?);

        headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        blocks += 1;
        rest = &rest[end + 4..];

        // 1xx informational blocks precede the real response; curl prints
        // them too, but they carry no redirect hop
        if let Some(code) = status_code {
            if (100..200).contains(&code) {
                blocks -= 1;
            }
        }
    }

    let status_code = status_code?;
    Some((status_code, headers, blocks.saturating_sub(1), rest.to_vec()))
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
