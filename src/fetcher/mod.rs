//! The metadata-fetch seam.
//!
//! The migration job only needs one capability from the outside world:
//! given an item URL, return its rich metadata. Everything behind that
//! (site client, parsing, manifest resolution) stays on the other side of
//! the trait.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::FetchError;

/// Rich metadata for one item, as returned by the external fetcher.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemMetadata {
    pub title: String,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    pub stream_base_url: Option<String>,
}

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ItemMetadata, FetchError>;
}

/// Fetcher backed by a metadata HTTP endpoint that answers with JSON.
///
/// The endpoint template holds a `{url}` placeholder for the item URL.
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    endpoint_template: String,
}

impl HttpMetadataFetcher {
    pub fn new(client: reqwest::Client, endpoint_template: String) -> Self {
        Self {
            client,
            endpoint_template,
        }
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, url: &str) -> Result<ItemMetadata, FetchError> {
        let endpoint = self.endpoint_template.replace("{url}", url);

        let response = self.client.get(&endpoint).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status(),
                url: endpoint,
            });
        }

        Ok(response.json::<ItemMetadata>().await?)
    }
}
