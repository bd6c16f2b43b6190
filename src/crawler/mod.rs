//! The incremental harvesting loop.

use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::CrawlConfig;
use crate::error::FetchError;
use crate::extract::UrlExtractor;
use crate::sink::DedupSink;

/// End-of-run totals. Per-page counts are logged as the run goes; only the
/// aggregate comes back to the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_attempted: u32,
    pub pages_failed: u32,
    pub urls_seen: u64,
    pub urls_new: u64,
}

pub struct PaginationCrawler {
    client: Client,
    extractor: UrlExtractor,
    trailing_page: Regex,
}

impl PaginationCrawler {
    pub fn new(client: Client, extractor: UrlExtractor) -> Self {
        Self {
            client,
            extractor,
            trailing_page: Regex::new(r"/\d+$").unwrap(),
        }
    }

    /// Walks pages `start..=end` of the listing, feeding every extracted
    /// URL to the sink. One failed page is logged and skipped; the loop is
    /// strictly bounded by the page range and never extended.
    pub async fn run(&self, config: &CrawlConfig, sink: &mut DedupSink) -> CrawlSummary {
        let mut summary = CrawlSummary::default();

        info!(
            "Crawling pages {} to {} of {}",
            config.start_page, config.end_page, config.template
        );

        for page in config.start_page..=config.end_page {
            summary.pages_attempted += 1;
            let page_url = self.build_page_url(&config.template, page);

            let body = match self.fetch_page(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Error fetching page {page}: {e}");
                    summary.pages_failed += 1;
                    continue;
                }
            };

            let urls = self.extractor.extract(&body);
            let mut page_new = 0u64;
            for url in &urls {
                if sink.record(url, Some(page)).await {
                    page_new += 1;
                }
            }
            summary.urls_seen += urls.len() as u64;
            summary.urls_new += page_new;

            info!(
                "Page {page}: found {} urls, {page_new} new (total new: {})",
                urls.len(),
                summary.urls_new
            );

            if page < config.end_page {
                tokio::time::sleep(config.delay).await;
            }
        }

        summary
    }

    /// A template already ending in a numeric path segment has that segment
    /// replaced; anything else gets `/<page>` appended.
    fn build_page_url(&self, template: &str, page: u32) -> String {
        let template = template.trim_end_matches('/');
        if self.trailing_page.is_match(template) {
            self.trailing_page
                .replace(template, format!("/{page}"))
                .into_owned()
        } else {
            format!("{template}/{page}")
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Builds the HTTP client the crawler and fetcher share: browser-ish user
/// agent, bounded per-request timeout.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36")
        .timeout(timeout)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::SiteRules;

    fn crawler() -> PaginationCrawler {
        let client = http_client(Duration::from_millis(200)).unwrap();
        let extractor = UrlExtractor::new(SiteRules::new("https://example.com"));
        PaginationCrawler::new(client, extractor)
    }

    #[test]
    fn template_with_trailing_number_is_replaced() {
        let crawler = crawler();
        assert_eq!(
            crawler.build_page_url("https://example.com/1", 7),
            "https://example.com/7"
        );
        assert_eq!(
            crawler.build_page_url("https://example.com/newest/42", 3),
            "https://example.com/newest/3"
        );
    }

    #[test]
    fn template_without_page_number_gets_one_appended() {
        let crawler = crawler();
        assert_eq!(
            crawler.build_page_url("https://example.com", 1),
            "https://example.com/1"
        );
        assert_eq!(
            crawler.build_page_url("https://example.com/newest/", 5),
            "https://example.com/newest/5"
        );
    }

    #[test]
    fn numeric_segment_in_the_middle_is_left_alone() {
        let crawler = crawler();
        assert_eq!(
            crawler.build_page_url("https://example.com/2024/newest", 2),
            "https://example.com/2024/newest/2"
        );
    }

    // Nothing listens on this port, so every page fails fast; the loop must
    // still visit the whole range and nothing more.
    #[tokio::test]
    async fn failed_pages_are_skipped_and_the_range_is_exact() {
        let crawler = crawler();
        let config = CrawlConfig {
            template: "http://127.0.0.1:9/newest".to_string(),
            start_page: 5,
            end_page: 7,
            delay: Duration::from_millis(0),
            output_path: None,
        };
        let mut sink = DedupSink::new(None, None).unwrap();

        let summary = crawler.run(&config, &mut sink).await;
        assert_eq!(summary.pages_attempted, 3);
        assert_eq!(summary.pages_failed, 3);
        assert_eq!(summary.urls_new, 0);
    }

    #[tokio::test]
    async fn single_page_range_attempts_exactly_one_fetch() {
        let crawler = crawler();
        let config = CrawlConfig {
            template: "http://127.0.0.1:9/newest".to_string(),
            start_page: 5,
            end_page: 5,
            delay: Duration::from_secs(30),
            output_path: None,
        };
        let mut sink = DedupSink::new(None, None).unwrap();

        // The 30s delay proves the last page skips the sleep.
        let summary =
            tokio::time::timeout(Duration::from_secs(5), crawler.run(&config, &mut sink))
                .await
                .expect("run should finish without sleeping after the last page");
        assert_eq!(summary.pages_attempted, 1);
    }
}
