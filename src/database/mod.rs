use chrono::Utc;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use tracing::info;

use crate::error::StoreError;
use crate::normalize::Node;

/// Constant tag written on every harvest record.
const SOURCE_TAG: &str = "vidharvest";

/// One pending URL from the harvest table, as seen by the migration job.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub url: String,
}

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens the SQLite store, creating the database file and applying
    /// migrations. This is the run's only fatal precondition; any later
    /// store failure is handled per unit by the callers.
    pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
        if !db_url.contains(":memory:") && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database file");
            Sqlite::create_database(db_url)
                .await
                .map_err(StoreError::Connection)?;
        }

        let pool = SqlitePool::connect(db_url)
            .await
            .map_err(StoreError::Connection)?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Store initialized");
        Ok(Self { pool })
    }

    /// Inserts a harvest record for a newly discovered URL.
    ///
    /// Returns `Err(StoreError::Duplicate)` when the URL already exists from
    /// a prior run; the unique constraint on `url` is what enforces
    /// cross-run dedup.
    pub async fn insert_url(&self, url: &str, page: Option<u32>) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO video_urls (url, page, scraped_at, source)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(url)
        .bind(page.map(i64::from))
        .bind(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string())
        .bind(SOURCE_TAG)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Harvest records not yet migrated: `success` absent or false.
    pub async fn pending_urls(&self, limit: i64) -> Result<Vec<SourceRecord>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT url FROM video_urls
            WHERE success IS NULL OR success = 0
            ORDER BY scraped_at, url
            LIMIT ?
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SourceRecord {
                url: row.get::<String, _>("url"),
            })
            .collect())
    }

    /// Flips a source record to migrated. The record's `url` is never
    /// rewritten by this system.
    pub async fn mark_success(&self, url: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE video_urls SET success = 1 WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Total documents in the destination table.
    pub async fn video_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM videos")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }

    /// Inserts a normalized document into the destination table.
    pub async fn insert_video(&self, doc: &Node) -> Result<(), StoreError> {
        let json = serde_json::to_string(doc)?;

        sqlx::query(
            r"
            INSERT INTO videos (doc, inserted_at)
            VALUES (?, ?)
            ",
        )
        .bind(json)
        .bind(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}
