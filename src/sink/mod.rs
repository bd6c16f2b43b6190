//! Write-once-per-URL persistence façade.
//!
//! The in-memory seen-set is authoritative for the current run; behind it
//! sit two optional backends, a flat file and the SQLite store. A URL goes
//! out to the file exactly once per run, line-flushed so a crash loses at
//! most the in-flight line. Store duplicates from earlier runs are benign.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::database::Store;
use crate::error::{SinkError, StoreError};

enum FileSink {
    /// Newline-delimited output, flushed after every URL.
    Lines(File),
    /// JSON array output, buffered in memory and written by `finish`.
    JsonArray { path: PathBuf, urls: Vec<String> },
}

pub struct DedupSink {
    seen: HashSet<String>,
    file: Option<FileSink>,
    store: Option<Store>,
}

impl DedupSink {
    pub fn new(output_path: Option<&Path>, store: Option<Store>) -> Result<Self, SinkError> {
        let file = match output_path {
            Some(path) if has_json_extension(path) => Some(FileSink::JsonArray {
                path: path.to_path_buf(),
                urls: Vec::new(),
            }),
            Some(path) => Some(FileSink::Lines(File::create(path)?)),
            None => None,
        };

        Ok(Self {
            seen: HashSet::new(),
            file,
            store,
        })
    }

    /// Whether this run has already emitted `url`.
    pub fn seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Records a discovered URL. Returns `true` when the URL is new to this
    /// run; a persistence failure on one backend is logged and does not
    /// change the result or stop the crawl.
    pub async fn record(&mut self, url: &str, page: Option<u32>) -> bool {
        if !self.seen.insert(url.to_string()) {
            return false;
        }

        match self.file.as_mut() {
            Some(FileSink::Lines(file)) => {
                if let Err(e) = writeln!(file, "{url}").and_then(|()| file.flush()) {
                    error!("failed to append url to output file: {e}");
                }
            }
            Some(FileSink::JsonArray { urls, .. }) => urls.push(url.to_string()),
            None => {}
        }

        if let Some(store) = &self.store {
            match store.insert_url(url, page).await {
                Ok(_) | Err(StoreError::Duplicate) => {}
                Err(e) => warn!("failed to save url to store: {e}"),
            }
        }

        true
    }

    /// Count of distinct URLs recorded this run.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Completes the file sink. Only the JSON-array format has anything left
    /// to write; line output was flushed per URL.
    pub fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(FileSink::JsonArray { path, urls }) = self.file.take() {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(file, &urls)?;
        }
        Ok(())
    }
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_occurrence_inserts_later_ones_do_not() {
        let mut sink = DedupSink::new(None, None).unwrap();

        let mut inserted = Vec::new();
        for url in ["a", "b", "a", "c"] {
            inserted.push(sink.record(url, Some(1)).await);
        }

        assert_eq!(inserted, vec![true, true, false, true]);
        assert_eq!(sink.len(), 3);
        assert!(sink.seen("b"));
        assert!(!sink.seen("d"));
    }

    #[tokio::test]
    async fn line_sink_writes_each_url_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");

        let mut sink = DedupSink::new(Some(&path), None).unwrap();
        sink.record("https://example.com/videos/a", Some(1)).await;
        sink.record("https://example.com/videos/a", Some(2)).await;
        sink.record("https://example.com/videos/b", Some(2)).await;
        sink.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "https://example.com/videos/a\nhttps://example.com/videos/b\n"
        );
    }

    #[tokio::test]
    async fn json_extension_selects_array_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.json");

        let mut sink = DedupSink::new(Some(&path), None).unwrap();
        sink.record("https://example.com/videos/a", None).await;
        sink.record("https://example.com/videos/b", None).await;
        sink.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&contents).unwrap();
        assert_eq!(
            parsed,
            vec![
                "https://example.com/videos/a".to_string(),
                "https://example.com/videos/b".to_string(),
            ]
        );
    }
}
