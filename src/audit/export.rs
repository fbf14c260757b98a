//! Chunked audit export: splitter → fetcher → filter → writer.

use crate::audit::fetcher::{AuditSource, ChunkFetcher, RetryPolicy};
use crate::audit::filter::EventFilter;
use crate::audit::range::{Chunk, Chunks};
use crate::audit::writer::JsonArrayWriter;
use crate::error::Result;
use crate::utils::format::format_number;
use crate::utils::progress::ProgressBar;
use crate::utils::time::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;

/// JSON pointer to the event timestamp of an OCI audit event.
const EVENT_TIME_FIELD: &str = "/eventTime";

/// Outcome of a single chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    /// 1-based position in the plan
    pub index: usize,
    pub range: Chunk,
    pub pages: usize,
    pub events_fetched: usize,
    pub events_written: usize,
    /// Set when a page request failed and the chunk ended early
    pub error: Option<String>,
}

/// Result of a whole export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub chunks: Vec<ChunkReport>,
    pub events_fetched: usize,
    pub events_written: usize,
    /// Events per event-type value, over everything fetched
    pub event_types: BTreeMap<String, usize>,
    pub first_event_time: Option<DateTime<Utc>>,
    pub last_event_time: Option<DateTime<Utc>>,
}

impl ExportSummary {
    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkReport> {
        self.chunks.iter().filter(|c| c.error.is_some())
    }

    /// False when any chunk ended early.
    pub fn is_complete(&self) -> bool {
        self.failed_chunks().next().is_none()
    }

    fn observe(&mut self, event: &Value, filter: &EventFilter) {
        self.events_fetched += 1;

        let event_type = filter.event_type(event).unwrap_or("<unknown>");
        *self.event_types.entry(event_type.to_string()).or_insert(0) += 1;

        if let Some(ts) = event
            .pointer(EVENT_TIME_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| parse_timestamp(s).ok())
        {
            self.first_event_time = Some(self.first_event_time.map_or(ts, |t| t.min(ts)));
            self.last_event_time = Some(self.last_event_time.map_or(ts, |t| t.max(ts)));
        }
    }

    /// Serializable form for the `--summary` side file.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "complete": self.is_complete(),
            "events_fetched": self.events_fetched,
            "events_written": self.events_written,
            "first_event_time": self.first_event_time,
            "last_event_time": self.last_event_time,
            "event_types": self.event_types,
            "chunks": self.chunks,
        })
    }
}

/// Drives an export against one compartment.
pub struct Exporter<'a, S: AuditSource> {
    source: &'a S,
    compartment_id: &'a str,
    filter: EventFilter,
    retry: RetryPolicy,
    progress: ProgressBar,
}

impl<'a, S: AuditSource> Exporter<'a, S> {
    pub fn new(source: &'a S, compartment_id: &'a str, filter: EventFilter) -> Self {
        Self {
            source,
            compartment_id,
            filter,
            retry: RetryPolicy::none(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch every chunk in order and stream the accepted events into `writer`.
    ///
    /// Per-chunk provider failures are recorded in the summary and the run
    /// moves on; write failures abort the run.
    pub async fn run<W: Write>(
        &self,
        chunks: Chunks,
        writer: &mut JsonArrayWriter<W>,
    ) -> Result<ExportSummary> {
        let total = chunks.len();
        let mut summary = ExportSummary::default();

        writer.open()?;

        for (idx, chunk) in chunks.enumerate() {
            let index = idx + 1;
            self.progress
                .println(format!("[{}/{}] Fetching {}", index, total, chunk));

            let mut fetcher = ChunkFetcher::new(self.source, self.compartment_id, chunk, self.retry);
            let mut fetched = 0;
            let mut written = 0;

            while let Some(event) = fetcher.next_event().await {
                fetched += 1;
                summary.observe(&event, &self.filter);
                if self.filter.matches(&event) {
                    writer.write_record(&event)?;
                    written += 1;
                }
            }

            let pages = fetcher.pages();
            let error = fetcher.into_error().map(|e| e.to_string());
            match &error {
                Some(message) => self.progress.println(format!(
                    "  Chunk {} ({}) failed after {} events: {}",
                    index,
                    chunk,
                    format_number(fetched),
                    message
                )),
                None => self.progress.println(format!(
                    "  Chunk {} complete: {} events, {} written",
                    index,
                    format_number(fetched),
                    format_number(written)
                )),
            }

            summary.events_written += written;
            summary.chunks.push(ChunkReport {
                index,
                range: chunk,
                pages,
                events_fetched: fetched,
                events_written: written,
                error,
            });
            self.progress.inc();
            self.progress
                .set_message(format!("{} events", format_number(summary.events_written)));
        }

        writer.close()?;
        self.progress.finish_with_message(&format!(
            "{} events written",
            format_number(summary.events_written)
        ));

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::fetcher::EventPage;
    use crate::audit::range::split_range;
    use crate::audit::writer::Layout;
    use crate::error::Error;
    use serde_json::json;

    /// One page per chunk; chunks are told apart by their start day.
    struct PerChunkSource {
        failing_day: Option<u32>,
    }

    impl AuditSource for PerChunkSource {
        async fn list_events(
            &self,
            _compartment_id: &str,
            chunk: &Chunk,
            _page: Option<&str>,
        ) -> Result<EventPage> {
            use chrono::Datelike;
            let day = chunk.start.day();
            if Some(day) == self.failing_day {
                return Err(Error::provider("connection reset"));
            }
            Ok(EventPage {
                events: vec![json!({
                    "eventTime": chunk.start.to_rfc3339(),
                    "data": { "eventName": format!("Day{}", day) }
                })],
                next_page: None,
            })
        }
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let source = PerChunkSource { failing_day: None };
        let filter = EventFilter::parse(Some("Day1$")).unwrap();
        let exporter = Exporter::new(&source, "ocid1.tenancy", filter);
        let mut writer = JsonArrayWriter::new(Vec::new(), Layout::Compact);

        let chunks = split_range("2025-01-01", "2025-01-20", 7).unwrap();
        let summary = exporter.run(chunks, &mut writer).await.unwrap();

        assert_eq!(summary.chunks.len(), 3);
        assert_eq!(summary.events_fetched, 3);
        assert_eq!(summary.events_written, 1);
        assert_eq!(summary.event_types.get("Day8"), Some(&1));
        assert!(summary.is_complete());
        assert_eq!(
            summary.first_event_time.unwrap().to_rfc3339(),
            "2025-01-01T00:00:00+00:00"
        );
        assert_eq!(
            summary.last_event_time.unwrap().to_rfc3339(),
            "2025-01-15T00:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_failed_chunk_is_reported() {
        let source = PerChunkSource {
            failing_day: Some(8),
        };
        let exporter = Exporter::new(&source, "ocid1.tenancy", EventFilter::accept_all());
        let mut writer = JsonArrayWriter::new(Vec::new(), Layout::Compact);

        let chunks = split_range("2025-01-01", "2025-01-20", 7).unwrap();
        let summary = exporter.run(chunks, &mut writer).await.unwrap();

        assert!(!summary.is_complete());
        let failed: Vec<usize> = summary.failed_chunks().map(|c| c.index).collect();
        assert_eq!(failed, vec![2]);
        assert_eq!(summary.to_json()["complete"], json!(false));

        let output: Vec<Value> = serde_json::from_slice(&writer.into_inner()).unwrap();
        assert_eq!(output.len(), 2);
    }
}
