//! Single-pass migration of harvested URLs into the destination store.
//!
//! Each run re-queries the records still pending, so a record whose fetch
//! failed is simply picked up again next time; the job itself never
//! retries.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::MigrationConfig;
use crate::database::Store;
use crate::fetcher::{ItemMetadata, MetadataFetcher};
use crate::normalize::{DocumentNormalizer, Node};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSummary {
    pub processed: u32,
    pub failed: u32,
    pub skipped: u32,
}

pub struct MigrationJob {
    store: Store,
    fetcher: Box<dyn MetadataFetcher>,
    normalizer: DocumentNormalizer,
    config: MigrationConfig,
}

impl MigrationJob {
    pub fn new(
        store: Store,
        fetcher: Box<dyn MetadataFetcher>,
        normalizer: DocumentNormalizer,
        config: MigrationConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            normalizer,
            config,
        }
    }

    /// Processes pending source records once. A failed record is logged,
    /// counted, and left pending for the next run; a recordless URL is
    /// logged and skipped without counting as a failure.
    pub async fn run_once(&self) -> anyhow::Result<MigrationSummary> {
        let pending = self.store.pending_urls(self.config.batch_limit).await?;
        info!("Migrating {} pending records", pending.len());

        let mut summary = MigrationSummary::default();

        for (index, record) in pending.iter().enumerate() {
            if record.url.trim().is_empty() {
                warn!("Skipping record with empty url");
                summary.skipped += 1;
                continue;
            }

            match self.migrate_one(&record.url).await {
                Ok(()) => summary.processed += 1,
                Err(e) => {
                    warn!("Failed to migrate {}: {e}", record.url);
                    summary.failed += 1;
                }
            }

            if index + 1 < pending.len() {
                tokio::time::sleep(self.config.delay).await;
            }
        }

        info!(
            "Migration done: {} processed, {} failed, {} skipped",
            summary.processed, summary.failed, summary.skipped
        );
        Ok(summary)
    }

    async fn migrate_one(&self, url: &str) -> anyhow::Result<()> {
        let metadata = self.fetcher.fetch(url).await?;

        let doc = self.normalizer.normalize(build_document(url, &metadata));
        self.store.insert_video(&doc).await?;
        self.store.mark_success(url).await?;

        Ok(())
    }
}

/// Builds the destination document in the source convention, tag wrappers
/// included, ready for normalization. The category and author references
/// are intentionally null: the destination assigns them later.
fn build_document(url: &str, metadata: &ItemMetadata) -> Node {
    let mut doc = BTreeMap::new();

    doc.insert("Title".to_string(), Node::str(&metadata.title));
    doc.insert("Url".to_string(), Node::str(url));
    doc.insert(
        "ThumbnailUrl".to_string(),
        match &metadata.thumbnail_url {
            Some(thumb) => Node::str(thumb),
            None => Node::Null,
        },
    );
    doc.insert(
        "Cast".to_string(),
        Node::Seq(metadata.cast.iter().map(Node::str).collect()),
    );
    doc.insert(
        "StreamBaseUrl".to_string(),
        match &metadata.stream_base_url {
            Some(stream) => Node::str(stream),
            None => Node::Null,
        },
    );
    doc.insert("Category".to_string(), Node::Null);
    doc.insert("SubCategory".to_string(), Node::Null);
    doc.insert("SubSubCategory".to_string(), Node::Null);
    doc.insert("Author".to_string(), Node::Null);
    doc.insert(
        "CreatedOn".to_string(),
        Node::date_tag(Utc::now().to_rfc3339()),
    );

    Node::Map(doc)
}
