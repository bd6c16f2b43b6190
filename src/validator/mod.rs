//! Site-specific rules for telling genuine item pages apart from decoys.

/// URL conventions for one target site.
///
/// Everything the validator checks against is data on this struct, so new
/// preview CDNs or listing paths are added here without touching the
/// validation code.
#[derive(Debug, Clone)]
pub struct SiteRules {
    /// Canonical domain, scheme included (e.g. `https://example.com`).
    pub domain: String,
    /// Bare host part of `domain`, used for the membership check.
    pub host: String,
    /// URL fragments that mark thumbnails, preview CDNs and external embeds.
    pub exclude_fragments: Vec<String>,
    /// Path segment every real item page contains.
    pub item_marker: String,
    /// Path segments that look like item paths but are per-creator listings.
    pub listing_markers: Vec<String>,
}

impl SiteRules {
    pub fn new(domain: &str) -> Self {
        let host = domain
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        Self {
            domain: domain.trim_end_matches('/').to_string(),
            host,
            exclude_fragments: vec![
                "xhpingcdn.com".to_string(),
                "ic-vt-nss.xhpingcdn.com".to_string(),
                "ic-tt-nss.xhpingcdn.com".to_string(),
                "ic-vrm-nss.xhpingcdn.com".to_string(),
                "thumb-v".to_string(),
                "video.flirtify.com".to_string(),
            ],
            item_marker: "/videos/".to_string(),
            listing_markers: vec![
                "/creators/videos/".to_string(),
                "/channels/videos/".to_string(),
            ],
        }
    }

    /// Whether `url` points at a real item page.
    ///
    /// Rules apply in order and the first failing one rejects: wrong host,
    /// excluded fragment, missing item marker, listing-page marker.
    pub fn is_item_url(&self, url: &str) -> bool {
        if !url.contains(&self.host) {
            return false;
        }

        if self
            .exclude_fragments
            .iter()
            .any(|fragment| url.contains(fragment.as_str()))
        {
            return false;
        }

        if !url.contains(&self.item_marker) {
            return false;
        }

        if self
            .listing_markers
            .iter()
            .any(|marker| url.contains(marker.as_str()))
        {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> SiteRules {
        SiteRules::new("https://example.com")
    }

    #[test]
    fn accepts_well_formed_item_url() {
        assert!(rules().is_item_url("https://example.com/videos/foo-bar"));
    }

    #[test]
    fn rejects_wrong_host() {
        assert!(!rules().is_item_url("https://other-site.net/videos/foo-bar"));
    }

    #[test]
    fn rejects_excluded_fragments() {
        let rules = rules();
        assert!(!rules.is_item_url("https://cdn.thumb-v.example.com/videos/x"));
        assert!(!rules.is_item_url("https://ic-vt-nss.xhpingcdn.com/videos/preview.example.com"));
    }

    #[test]
    fn rejects_missing_item_marker() {
        assert!(!rules().is_item_url("https://example.com/photos/foo-bar"));
    }

    #[test]
    fn rejects_listing_pages() {
        let rules = rules();
        assert!(!rules.is_item_url("https://example.com/creators/videos/somebody"));
        assert!(!rules.is_item_url("https://example.com/channels/videos/somebody"));
    }

    #[test]
    fn exclusion_list_is_extensible() {
        let mut rules = rules();
        rules.exclude_fragments.push("bad-mirror.example".to_string());
        assert!(!rules.is_item_url("https://bad-mirror.example.com/videos/foo"));
    }
}
