//! Append-only record sinks

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::error::{ScrapeError, ScrapeResult};
use crate::extraction::ProductRecord;

/// Destination for extracted records
///
/// Records are only ever appended; there is no update or delete.
pub trait DatasetSink {
    /// Append one record
    fn push(
        &mut self,
        record: ProductRecord,
    ) -> impl std::future::Future<Output = ScrapeResult<()>> + Send;

    /// Flush anything buffered
    fn flush(&mut self) -> impl std::future::Future<Output = ScrapeResult<()>> + Send {
        async { Ok(()) }
    }

    /// Records accepted so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<ProductRecord>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }
}

impl DatasetSink for MemorySink {
    async fn push(&mut self, record: ProductRecord) -> ScrapeResult<()> {
        self.records.push(record);
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Sink`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> ScrapeResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScrapeError::Sink(format!("create {}: {e}", parent.display())))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ScrapeError::Sink(format!("open {}: {e}", path.display())))?;

        info!("Writing records to {}", path.display());
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSink for JsonLinesSink {
    async fn push(&mut self, record: ProductRecord) -> ScrapeResult<()> {
        let mut line = serde_json::to_vec(&record)
            .map_err(|e| ScrapeError::Sink(format!("serialize record: {e}")))?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|e| ScrapeError::Sink(format!("write {}: {e}", self.path.display())))?;
        self.written += 1;
        debug!(name = record.name(), total = self.written, "record written");
        Ok(())
    }

    async fn flush(&mut self) -> ScrapeResult<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| ScrapeError::Sink(format!("flush {}: {e}", self.path.display())))
    }

    fn len(&self) -> usize {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PageType;
    use crate::document::HtmlDocument;
    use crate::extraction::extract_records;

    fn sample_records() -> Vec<ProductRecord> {
        let doc = HtmlDocument::parse_with_url(
            r#"<html><body>
                <div class="wine-card"><h3>Opus One 2018</h3><span class="price">$420</span></div>
                <div class="wine-card"><h3>House Red</h3></div>
            </body></html>"#,
            "https://www.example.com/find/opus",
        )
        .expect("valid url");
        extract_records(&doc, PageType::SearchResults)
    }

    #[tokio::test]
    async fn memory_sink_appends() {
        let mut sink = MemorySink::new();
        for record in sample_records() {
            sink.push(record).await.expect("push");
        }
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[1].name(), "House Red");
    }

    #[tokio::test]
    async fn json_lines_sink_writes_one_record_per_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("records.jsonl");

        let mut sink = JsonLinesSink::open(&path).await.expect("open");
        for record in sample_records() {
            sink.push(record).await.expect("push");
        }
        sink.flush().await.expect("flush");
        assert_eq!(sink.len(), 2);

        let contents = tokio::fs::read_to_string(&path).await.expect("read back");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["name"], "Opus One 2018");
        assert_eq!(first["price"]["currency"], "USD");
        assert_eq!(first["vintage"], 2018);
    }
}
