/// End-to-end tests for the chunked audit export
/// These run the full splitter -> fetcher -> filter -> writer pipeline
/// against in-memory event sources and a file on disk.
use chrono::{Duration, NaiveDate};
use oci_ops_tools::audit::{
    split_range, AuditSource, Chunk, EventFilter, EventPage, Exporter, JsonArrayWriter, Layout,
    TimeRange,
};
use oci_ops_tools::error::{Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serves pages per chunk start, keyed by `(start, page token)`.
/// A `None` page is a failed request.
#[derive(Default)]
struct PagedSource {
    pages: HashMap<(String, Option<String>), Option<EventPage>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl PagedSource {
    fn page(mut self, start: &str, token: Option<&str>, events: Vec<Value>, next: Option<&str>) -> Self {
        self.pages.insert(
            (start.to_string(), token.map(str::to_string)),
            Some(EventPage {
                events,
                next_page: next.map(str::to_string),
            }),
        );
        self
    }

    fn failure(mut self, start: &str, token: Option<&str>) -> Self {
        self.pages
            .insert((start.to_string(), token.map(str::to_string)), None);
        self
    }
}

impl AuditSource for PagedSource {
    async fn list_events(
        &self,
        _compartment_id: &str,
        chunk: &Chunk,
        page: Option<&str>,
    ) -> Result<EventPage> {
        let key = (
            chunk.start.format("%Y-%m-%d").to_string(),
            page.map(str::to_string),
        );
        self.calls.lock().unwrap().push(key.clone());
        match self.pages.get(&key) {
            Some(Some(page)) => Ok(page.clone()),
            Some(None) => Err(Error::ProviderQuery {
                status: Some(500),
                code: Some("InternalServerError".to_string()),
                message: "backend unavailable".to_string(),
            }),
            None => Ok(EventPage::default()),
        }
    }
}

fn event(id: usize, name: &str) -> Value {
    json!({
        "eventId": format!("evt-{}", id),
        "eventTime": "2025-01-02T10:00:00.000Z",
        "data": { "eventName": name }
    })
}

fn read_output(path: &std::path::Path) -> Vec<Value> {
    let text = fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn ids(records: &[Value]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r["eventId"].as_str().unwrap())
        .collect()
}

#[test]
fn test_twenty_days_in_weekly_chunks() {
    let chunks: Vec<Chunk> = split_range("2025-01-01", "2025-01-20", 7).unwrap().collect();
    let days: Vec<i64> = chunks.iter().map(|c| c.duration().num_days()).collect();
    assert_eq!(days, vec![7, 7, 6]);

    let range = TimeRange::parse("2025-01-01", "2025-01-20").unwrap();
    assert_eq!(chunks.first().unwrap().start, range.start);
    assert_eq!(chunks.last().unwrap().end, range.end);
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
}

#[test]
fn test_single_day_with_wide_span() {
    let chunks: Vec<Chunk> = split_range("2025-03-05", "2025-03-05", 14).unwrap().collect();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].duration(), Duration::days(1));
    assert_eq!(
        chunks[0].last_day(),
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
    );
}

#[test]
fn test_partition_over_many_spans() {
    let range = TimeRange::parse("2024-02-20", "2024-03-10").unwrap();
    for span in 1..=25 {
        let chunks: Vec<Chunk> = range.chunks(Duration::days(span)).unwrap().collect();
        assert_eq!(chunks[0].start, range.start, "span {}", span);
        assert_eq!(chunks.last().unwrap().end, range.end, "span {}", span);
        assert!(chunks.iter().all(|c| c.duration() <= Duration::days(span)));
        assert!(chunks.windows(2).all(|w| w[0].end == w[1].start));
    }
}

#[test]
fn test_inverted_range_rejected() {
    assert!(matches!(
        split_range("2025-02-01", "2025-01-01", 7),
        Err(Error::InvalidRange(_))
    ));
}

#[tokio::test]
async fn test_filter_keeps_matching_records_in_order() {
    let source = PagedSource::default().page(
        "2025-01-01",
        None,
        vec![
            event(1, "InteractiveLogin"),
            event(2, "UpdateUser"),
            event(3, "LoginFailed"),
        ],
        None,
    );
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");

    let filter = EventFilter::parse(Some("Login.*")).unwrap();
    let mut writer = JsonArrayWriter::create(&path, Layout::Pretty).unwrap();
    let summary = Exporter::new(&source, "ocid1.tenancy.oc1..t", filter)
        .run(split_range("2025-01-01", "2025-01-03", 7).unwrap(), &mut writer)
        .await
        .unwrap();
    drop(writer);

    let records = read_output(&path);
    assert_eq!(ids(&records), vec!["evt-1", "evt-3"]);
    assert_eq!(summary.events_fetched, 3);
    assert_eq!(summary.events_written, 2);
}

#[tokio::test]
async fn test_pages_are_followed_until_no_token() {
    let source = PagedSource::default()
        .page("2025-01-01", None, vec![event(1, "A")], Some("p2"))
        .page("2025-01-01", Some("p2"), vec![event(2, "B")], Some("p3"))
        .page("2025-01-01", Some("p3"), vec![event(3, "C")], None);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");

    let mut writer = JsonArrayWriter::create(&path, Layout::Compact).unwrap();
    let summary = Exporter::new(&source, "c", EventFilter::accept_all())
        .run(split_range("2025-01-01", "2025-01-01", 7).unwrap(), &mut writer)
        .await
        .unwrap();
    drop(writer);

    assert_eq!(ids(&read_output(&path)), vec!["evt-1", "evt-2", "evt-3"]);
    assert_eq!(summary.chunks[0].pages, 3);
    assert_eq!(source.calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_middle_chunk_keeps_the_rest() {
    let source = PagedSource::default()
        .page("2025-01-01", None, vec![event(1, "A")], None)
        .failure("2025-01-08", None)
        .page("2025-01-15", None, vec![event(3, "C")], None);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");

    let mut writer = JsonArrayWriter::create(&path, Layout::Pretty).unwrap();
    let summary = Exporter::new(&source, "c", EventFilter::accept_all())
        .run(split_range("2025-01-01", "2025-01-20", 7).unwrap(), &mut writer)
        .await
        .unwrap();
    drop(writer);

    assert_eq!(ids(&read_output(&path)), vec!["evt-1", "evt-3"]);
    assert!(!summary.is_complete());
    let failed: Vec<usize> = summary.failed_chunks().map(|c| c.index).collect();
    assert_eq!(failed, vec![2]);
    assert!(summary.chunks[1]
        .error
        .as_deref()
        .unwrap()
        .contains("backend unavailable"));
}

#[tokio::test]
async fn test_failure_mid_chunk_keeps_earlier_pages() {
    let source = PagedSource::default()
        .page("2025-01-01", None, vec![event(1, "A"), event(2, "B")], Some("p2"))
        .failure("2025-01-01", Some("p2"));
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");

    let mut writer = JsonArrayWriter::create(&path, Layout::Pretty).unwrap();
    let summary = Exporter::new(&source, "c", EventFilter::accept_all())
        .run(split_range("2025-01-01", "2025-01-02", 7).unwrap(), &mut writer)
        .await
        .unwrap();
    drop(writer);

    assert_eq!(ids(&read_output(&path)), vec!["evt-1", "evt-2"]);
    assert_eq!(summary.chunks[0].events_fetched, 2);
    assert!(summary.chunks[0].error.is_some());
}

#[tokio::test]
async fn test_no_matches_yield_empty_array() {
    let source = PagedSource::default().page(
        "2025-01-01",
        None,
        vec![event(1, "UpdateUser")],
        None,
    );
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");

    let filter = EventFilter::parse(Some("^Login$")).unwrap();
    let mut writer = JsonArrayWriter::create(&path, Layout::Pretty).unwrap();
    let summary = Exporter::new(&source, "c", filter)
        .run(split_range("2025-01-01", "2025-01-01", 7).unwrap(), &mut writer)
        .await
        .unwrap();
    drop(writer);

    assert!(read_output(&path).is_empty());
    assert!(summary.is_complete());
    assert_eq!(summary.event_types.get("UpdateUser"), Some(&1));
}
