use crate::crawler::FetchResponse;
use crate::seo::{Severity, SeoCheck, SeoIssue};

/// Crawlability signals read off the response envelope: status class,
/// redirect chain length, timeouts
pub struct ResponseCrawlabilityCheck;

impl SeoCheck for ResponseCrawlabilityCheck {
    fn name(&self) -> &'static str {
        "response_crawlability"
    }

    fn run(&self, response: &FetchResponse) -> Vec<SeoIssue> {
        let mut issues = Vec::new();
        let status = response.status_code;
        let url = &response.request.url;

        if status >= 500 {
            issues.push(SeoIssue::new(
                "HTTP_5XX",
                Severity::High,
                format!("Server error {}", status),
                self.name(),
                url,
            ));
        } else if status >= 400 {
            issues.push(SeoIssue::new(
                "HTTP_4XX",
                Severity::High,
                format!("Client error {}", status),
                self.name(),
                url,
            ));
        } else if (300..400).contains(&status) {
            issues.push(SeoIssue::new(
                "HTTP_3XX",
                Severity::Low,
                format!("Redirect response {}", status),
                self.name(),
                url,
            ));
        }

        if response.num_redirects > 1 {
            issues.push(
                SeoIssue::new(
                    "REDIRECT_CHAIN",
                    Severity::Medium,
                    format!("Redirect chain length is {}", response.num_redirects),
                    self.name(),
                    url,
                )
                .with_details(serde_json::json!({
                    "num_redirects": response.num_redirects,
                })),
            );
        }

        if response.is_timeout {
            issues.push(SeoIssue::new(
                "REQUEST_TIMEOUT",
                Severity::High,
                "Request timed out",
                self.name(),
                url,
            ));
        }

        issues
    }
}
