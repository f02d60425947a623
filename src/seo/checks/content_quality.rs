use crate::crawler::FetchResponse;
use crate::seo::{Severity, SeoCheck, SeoIssue};
use scraper::{Html, Selector};

/// Title and meta-description quality heuristics
pub struct TitleMetaQualityCheck {
    title_min: usize,
    title_max: usize,
    description_min: usize,
    description_max: usize,
}

impl Default for TitleMetaQualityCheck {
    fn default() -> Self {
        Self {
            title_min: 30,
            title_max: 60,
            description_min: 70,
            description_max: 160,
        }
    }
}

impl SeoCheck for TitleMetaQualityCheck {
    fn name(&self) -> &'static str {
        "title_meta_quality"
    }

    fn run(&self, response: &FetchResponse) -> Vec<SeoIssue> {
        if response.status_code != 200 || response.content.is_empty() {
            return Vec::new();
        }

        let html = String::from_utf8_lossy(&response.content);
        let document = Html::parse_document(&html);
        let url = &response.request.url;
        let mut issues = Vec::new();

        let title = select_text(&document, "title");
        let h1 = select_text(&document, "h1");
        let description = select_attr(&document, "meta[name='description']", "content");

        if title.is_empty() {
            issues.push(SeoIssue::new(
                "TITLE_MISSING",
                Severity::High,
                "Missing <title>",
                self.name(),
                url,
            ));
        } else {
            let length = title.chars().count();
            if length < self.title_min || length > self.title_max {
                issues.push(
                    SeoIssue::new(
                        "TITLE_LENGTH",
                        Severity::Medium,
                        format!(
                            "Title length is {} chars (recommended {}-{})",
                            length, self.title_min, self.title_max
                        ),
                        self.name(),
                        url,
                    )
                    .with_details(serde_json::json!({ "length": length })),
                );
            }
            if !h1.is_empty() && title == h1 {
                issues.push(SeoIssue::new(
                    "TITLE_EQUALS_H1",
                    Severity::Low,
                    "Title is identical to H1",
                    self.name(),
                    url,
                ));
            }
        }

        if description.is_empty() {
            issues.push(SeoIssue::new(
                "DESCRIPTION_MISSING",
                Severity::Medium,
                "Missing meta description",
                self.name(),
                url,
            ));
        } else {
            let length = description.chars().count();
            if length < self.description_min || length > self.description_max {
                issues.push(
                    SeoIssue::new(
                        "DESCRIPTION_LENGTH",
                        Severity::Low,
                        format!(
                            "Meta description is {} chars (recommended {}-{})",
                            length, self.description_min, self.description_max
                        ),
                        self.name(),
                        url,
                    )
                    .with_details(serde_json::json!({ "length": length })),
                );
            }
        }

        issues
    }
}

/// Collapsed text content of the first matching element
fn select_text(document: &Html, selector: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| {
            el.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{EngineOutcome, FetchRequest, RequestKind};

    fn response(body: &str) -> FetchResponse {
        let request = FetchRequest::seed(
            "https://example.com/",
            RequestKind::Landing,
            "example.com",
            "example.com",
        );
        FetchResponse::new(
            request,
            EngineOutcome {
                status_code: 200,
                headers: Vec::new(),
                content: body.as_bytes().to_vec(),
                num_redirects: 0,
                is_timeout: false,
                elapsed_ms: 1,
            },
        )
    }

    fn codes(issues: &[SeoIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn test_well_formed_page_passes() {
        let check = TitleMetaQualityCheck::default();
        let body = format!(
            r#"<html><head><title>A perfectly reasonable page title here</title>
            <meta name="description" content="{}"></head>
            <body><h1>Different heading</h1></body></html>"#,
            "d".repeat(100)
        );
        assert!(check.run(&response(&body)).is_empty());
    }

    #[test]
    fn test_missing_title_and_description() {
        let check = TitleMetaQualityCheck::default();
        let issues = check.run(&response("<html><body>bare</body></html>"));
        assert!(codes(&issues).contains(&"TITLE_MISSING"));
        assert!(codes(&issues).contains(&"DESCRIPTION_MISSING"));
    }

    #[test]
    fn test_short_title_flagged() {
        let check = TitleMetaQualityCheck::default();
        let issues = check.run(&response("<head><title>Tiny</title></head>"));
        assert!(codes(&issues).contains(&"TITLE_LENGTH"));
    }

    #[test]
    fn test_title_equals_h1() {
        let check = TitleMetaQualityCheck::default();
        let body = r#"<head><title>Same text used in both places okay</title></head>
            <body><h1>Same text used in both places okay</h1></body>"#;
        let issues = check.run(&response(body));
        assert!(codes(&issues).contains(&"TITLE_EQUALS_H1"));
    }
}
