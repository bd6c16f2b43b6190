//! URL extraction from listing-page HTML.
//!
//! Two independent strategies run over the same body: a structured scan of
//! anchor elements, and a regex sweep over the raw text for item URLs that
//! only appear in data attributes or script-embedded JSON. Results are
//! merged into one validated, first-seen-ordered list.

use std::collections::HashSet;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::validator::SiteRules;

pub struct UrlExtractor {
    rules: SiteRules,
    anchor_selector: Selector,
    fallback_pattern: Regex,
}

impl UrlExtractor {
    pub fn new(rules: SiteRules) -> Self {
        // `a[href]` is a fixed selector, parse failure would be a typo here
        let anchor_selector = Selector::parse("a[href]").unwrap();

        let marker = rules.item_marker.trim_matches('/');
        let pattern = format!(
            r#"https?://[\w.-]*{}/{}/[\w~().!*'-]+"#,
            regex::escape(&rules.host),
            regex::escape(marker),
        );
        let fallback_pattern = Regex::new(&pattern).unwrap();

        Self {
            rules,
            anchor_selector,
            fallback_pattern,
        }
    }

    /// Scans `body` and returns validated item URLs in first-seen order,
    /// deduplicated within this call. Malformed HTML degrades to whatever
    /// the lenient parser recovers; an empty body yields an empty vec.
    pub fn extract(&self, body: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        self.scan_anchors(body, &mut seen, &mut results);
        self.scan_raw(body, &mut seen, &mut results);

        debug!("extracted {} item urls", results.len());
        results
    }

    fn scan_anchors(&self, body: &str, seen: &mut HashSet<String>, results: &mut Vec<String>) {
        let document = Html::parse_document(body);

        for anchor in document.select(&self.anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let href = href.trim();

            if !href.contains(&self.rules.item_marker) {
                continue;
            }
            if href.starts_with("javascript:") || href.starts_with("mailto:") {
                continue;
            }

            let url = self.absolutize(href);
            if self.rules.is_item_url(&url) && seen.insert(url.clone()) {
                results.push(url);
            }
        }
    }

    fn scan_raw(&self, body: &str, seen: &mut HashSet<String>, results: &mut Vec<String>) {
        for m in self.fallback_pattern.find_iter(body) {
            let url = m.as_str().to_string();
            if self.rules.is_item_url(&url) && seen.insert(url.clone()) {
                results.push(url);
            }
        }
    }

    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("//") {
            format!("https:{href}")
        } else if href.starts_with('/') {
            format!("{}{href}", self.rules.domain)
        } else if !href.starts_with("http") {
            format!("{}/{}", self.rules.domain, href.trim_start_matches('/'))
        } else {
            href.to_string()
        }
    }
}
