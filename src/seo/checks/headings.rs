use crate::crawler::FetchResponse;
use crate::seo::{Severity, SeoCheck, SeoIssue};
use scraper::{Html, Selector};

/// Flags H1 headings longer than the configured character budget
pub struct H1TooLongCheck {
    max_chars: usize,
}

impl H1TooLongCheck {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl SeoCheck for H1TooLongCheck {
    fn name(&self) -> &'static str {
        "h1_too_long"
    }

    fn run(&self, response: &FetchResponse) -> Vec<SeoIssue> {
        if response.status_code != 200 || response.content.is_empty() {
            return Vec::new();
        }

        let html = String::from_utf8_lossy(&response.content);
        let document = Html::parse_document(&html);
        let Ok(selector) = Selector::parse("h1") else {
            return Vec::new();
        };

        let mut issues = Vec::new();
        for h1 in document.select(&selector) {
            let text = h1.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let length = text.chars().count();
            if length > self.max_chars {
                issues.push(
                    SeoIssue::new(
                        "H1_TOO_LONG",
                        Severity::Low,
                        format!("H1 has {} chars (max {})", length, self.max_chars),
                        self.name(),
                        &response.request.url,
                    )
                    .with_details(serde_json::json!({
                        "length": length,
                        "max_chars": self.max_chars,
                    })),
                );
            }
        }
        issues
    }
}
