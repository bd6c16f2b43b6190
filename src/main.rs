use anyhow::{anyhow, Context, Result};
use tracing::info;

mod config;
mod crawler;
mod database;
mod error;
mod extract;
mod fetcher;
mod migration;
mod normalize;
mod sink;
mod validator;

use config::{AppConfig, CrawlConfig, MigrationConfig};
use crawler::PaginationCrawler;
use database::Store;
use extract::UrlExtractor;
use fetcher::HttpMetadataFetcher;
use migration::MigrationJob;
use normalize::{DocumentNormalizer, NormalizerRules};
use sink::DedupSink;
use validator::SiteRules;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let app = AppConfig::from_env();

    let command = std::env::args().nth(1).unwrap_or_else(|| "crawl".to_string());
    match command.as_str() {
        "crawl" => crawl(&app).await,
        "migrate" => migrate(&app).await,
        "extract" => {
            let path = std::env::args()
                .nth(2)
                .ok_or_else(|| anyhow!("usage: vidharvest extract <html-file>"))?;
            extract_file(&app, &path).await
        }
        other => Err(anyhow!("unknown command: {other} (crawl | migrate | extract)")),
    }
}

/// Connects the store if configured. Failing to connect is the one fatal
/// precondition; a run never starts against a half-open store.
async fn open_store(app: &AppConfig) -> Result<Option<Store>> {
    match &app.database_url {
        Some(url) => {
            let store = Store::connect(url)
                .await
                .with_context(|| format!("opening store at {url}"))?;
            Ok(Some(store))
        }
        None => Ok(None),
    }
}

async fn crawl(app: &AppConfig) -> Result<()> {
    let config = CrawlConfig::from_env(&app.domain);
    let store = open_store(app).await?;

    let client = crawler::http_client(app.request_timeout)?;
    let extractor = UrlExtractor::new(SiteRules::new(&app.domain));
    let crawler = PaginationCrawler::new(client, extractor);
    let mut sink = DedupSink::new(config.output_path.as_deref(), store)?;

    let summary = crawler.run(&config, &mut sink).await;
    sink.finish()?;

    info!(
        "Crawl finished: {} pages attempted, {} failed, {} urls seen, {} new",
        summary.pages_attempted, summary.pages_failed, summary.urls_seen, summary.urls_new
    );
    Ok(())
}

async fn migrate(app: &AppConfig) -> Result<()> {
    let config = MigrationConfig::from_env()
        .ok_or_else(|| anyhow!("VIDHARVEST_METADATA_ENDPOINT is required for migrate"))?;
    let store = open_store(app)
        .await?
        .ok_or_else(|| anyhow!("VIDHARVEST_DATABASE_URL is required for migrate"))?;

    let client = crawler::http_client(app.request_timeout)?;
    let fetcher = HttpMetadataFetcher::new(client, config.metadata_endpoint.clone());
    let normalizer = DocumentNormalizer::new(NormalizerRules::default());

    let job = MigrationJob::new(store.clone(), Box::new(fetcher), normalizer, config);
    let summary = job.run_once().await?;

    info!(
        "Destination now holds {} documents ({} processed, {} failed, {} skipped this run)",
        store.video_count().await?,
        summary.processed,
        summary.failed,
        summary.skipped
    );
    Ok(())
}

/// One-shot extraction from a local HTML file, no crawling.
async fn extract_file(app: &AppConfig, path: &str) -> Result<()> {
    let config = CrawlConfig::from_env(&app.domain);
    let store = open_store(app).await?;

    let body = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let extractor = UrlExtractor::new(SiteRules::new(&app.domain));
    let mut sink = DedupSink::new(config.output_path.as_deref(), store)?;

    let urls = extractor.extract(&body);
    for url in &urls {
        sink.record(url, None).await;
    }
    sink.finish()?;

    info!("Extracted {} urls from {path}", urls.len());
    Ok(())
}
