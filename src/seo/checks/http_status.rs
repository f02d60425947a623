use crate::crawler::FetchResponse;
use crate::seo::{Severity, SeoCheck, SeoIssue};

/// Flags any response with a 4xx/5xx status as a broken link
pub struct BrokenLinkCheck;

impl SeoCheck for BrokenLinkCheck {
    fn name(&self) -> &'static str {
        "broken_links"
    }

    fn run(&self, response: &FetchResponse) -> Vec<SeoIssue> {
        let status = response.status_code;
        if status < 400 {
            return Vec::new();
        }

        vec![SeoIssue::new(
            "BROKEN_LINK",
            Severity::Medium,
            format!("URL returned status {}", status),
            self.name(),
            &response.request.url,
        )
        .with_details(serde_json::json!({ "status_code": status }))]
    }
}

/// Flags 503 specifically: the server asked to come back later
pub struct HttpStatus503Check;

impl SeoCheck for HttpStatus503Check {
    fn name(&self) -> &'static str {
        "http_status_503"
    }

    fn run(&self, response: &FetchResponse) -> Vec<SeoIssue> {
        if response.status_code != 503 {
            return Vec::new();
        }

        vec![SeoIssue::new(
            "HTTP_503",
            Severity::High,
            "Service unavailable (503)",
            self.name(),
            &response.request.url,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{EngineOutcome, FetchRequest, RequestKind};

    fn response(status_code: i32) -> FetchResponse {
        let request = FetchRequest::seed(
            "https://example.com/x",
            RequestKind::Internal,
            "example.com",
            "example.com",
        );
        FetchResponse::new(
            request,
            EngineOutcome {
                status_code,
                headers: Vec::new(),
                content: Vec::new(),
                num_redirects: 0,
                is_timeout: false,
                elapsed_ms: 1,
            },
        )
    }

    #[test]
    fn test_broken_link_on_4xx_and_5xx() {
        let check = BrokenLinkCheck;
        assert_eq!(check.run(&response(404)).len(), 1);
        assert_eq!(check.run(&response(500)).len(), 1);
        assert!(check.run(&response(200)).is_empty());
        assert!(check.run(&response(301)).is_empty());
        // Transport failures are not link health signals
        assert!(check.run(&response(-1)).is_empty());
    }

    #[test]
    fn test_503_check() {
        let check = HttpStatus503Check;
        let issues = check.run(&response(503));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "HTTP_503");
        assert!(check.run(&response(500)).is_empty());
    }
}
