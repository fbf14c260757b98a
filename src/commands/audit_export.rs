//! Chunked export of OCI audit events to a JSON file.
//!
//! The requested day range is split into windows of at most `--chunk-days`
//! days, each window is paged through the audit API, and every event whose
//! event name matches the optional filter is appended to one JSON array.
//!
//! # Usage
//!
//! ```bash
//! # Everything the tenancy recorded in January
//! oci-ops audit-export --start 2025-01-01 --end 2025-01-31 \
//!     --output audit_jan.json --profile DEFAULT
//!
//! # Only console logins and policy changes, compact output
//! oci-ops audit-export --start 01.01.2025 --end 31.01.2025 \
//!     --output logins.json --profile ops \
//!     --event-filter "InteractiveLogin;Policy$" --compact
//!
//! # Keep a machine-readable run summary next to the export
//! oci-ops audit-export --start 2025-01-01 --end 2025-01-31 \
//!     --output audit.json --profile ops --summary audit.summary.json
//! ```
//!
//! # Output
//!
//! The output file holds the provider's event records unchanged. A chunk
//! whose page request fails ends early; what it fetched is kept and the run
//! goes on with the next chunk. Such gaps are listed in the run summary on
//! stderr and, with `--summary`, as `"complete": false` in the summary file.

use crate::audit::range::span_days;
use crate::audit::{EventFilter, ExportSummary, Exporter, JsonArrayWriter, Layout, RetryPolicy, TimeRange};
use crate::oci_api::OciClient;
use crate::utils::format::format_number;
use crate::utils::progress::ProgressBar;
use crate::utils::time::{duration_human, format_timestamp};
use anyhow::{Context, Result};
use std::fs::File;
use std::time::Duration as StdDuration;

/// Base delay of the retry backoff.
const RETRY_BASE_DELAY: StdDuration = StdDuration::from_secs(2);

/// Options of one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions<'a> {
    pub start: &'a str,
    pub end: &'a str,
    pub output: &'a str,
    pub profile: &'a str,
    pub config_file: Option<&'a str>,
    pub compartment_id: Option<&'a str>,
    pub event_filter: Option<&'a str>,
    pub event_field: Option<&'a str>,
    pub chunk_days: i64,
    pub compact: bool,
    pub summary: Option<&'a str>,
    pub max_retries: u32,
}

pub async fn run(options: &ExportOptions<'_>) -> Result<()> {
    // Argument validation happens before the config is read or any file is created.
    let range = TimeRange::parse(options.start, options.end)?;
    let chunks = range.chunks(span_days(options.chunk_days)?)?;
    let mut filter = EventFilter::parse(options.event_filter)?;
    if let Some(field) = options.event_field {
        filter = filter.with_field(field);
    }

    let (config, client) = OciClient::from_profile(options.config_file, options.profile)?;
    let compartment_id = options.compartment_id.unwrap_or(&config.tenancy);

    let layout = if options.compact {
        Layout::Compact
    } else {
        Layout::Pretty
    };
    let mut writer = JsonArrayWriter::create(options.output, layout)
        .with_context(|| format!("Failed to create output file: {}", options.output))?;

    eprintln!("=== OCI Audit Export ===");
    eprintln!("Profile: {} ({})", config.profile, client.region());
    eprintln!("Compartment: {}", compartment_id);
    eprintln!(
        "Range: {} ({} chunks of up to {} days)",
        range,
        chunks.len(),
        options.chunk_days
    );
    if !filter.is_empty() {
        eprintln!(
            "Filter: {} on {}",
            options.event_filter.unwrap_or_default(),
            filter.field()
        );
    }
    eprintln!();

    let progress = ProgressBar::new(chunks.len(), "Exporting");
    let retry = if options.max_retries > 0 {
        RetryPolicy::new(options.max_retries, RETRY_BASE_DELAY)
    } else {
        RetryPolicy::none()
    };
    let summary = Exporter::new(&client, compartment_id, filter)
        .with_retry(retry)
        .with_progress(progress)
        .run(chunks, &mut writer)
        .await
        .with_context(|| format!("Failed to write export to: {}", options.output))?;

    print_summary(&summary);
    eprintln!("\nOutput written to: {}", options.output);

    if let Some(path) = options.summary {
        let file = File::create(path)
            .with_context(|| format!("Failed to create summary file: {}", path))?;
        serde_json::to_writer_pretty(file, &summary.to_json())
            .with_context(|| format!("Failed to write summary to: {}", path))?;
        eprintln!("Summary written to: {}", path);
    }

    Ok(())
}

fn print_summary(summary: &ExportSummary) {
    eprintln!("\n=== Summary ===");
    eprintln!("Chunks: {}", summary.chunks.len());
    eprintln!("Events fetched: {}", format_number(summary.events_fetched));
    eprintln!("Events written: {}", format_number(summary.events_written));

    if let (Some(first), Some(last)) = (summary.first_event_time, summary.last_event_time) {
        eprintln!(
            "Event time span: {} to {} ({})",
            format_timestamp(&first),
            format_timestamp(&last),
            duration_human(&first, &last)
        );
    }

    if !summary.event_types.is_empty() {
        let mut types: Vec<_> = summary.event_types.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        eprintln!("\nEvents by name:");
        for (name, count) in types.iter().take(20) {
            eprintln!("  {:<50} {:>10}", name, format_number(**count));
        }
        if types.len() > 20 {
            eprintln!("  ... and {} more", types.len() - 20);
        }
    }

    if !summary.is_complete() {
        eprintln!("\n⚠️  Export is INCOMPLETE; these chunks ended early:");
        for chunk in summary.failed_chunks() {
            eprintln!(
                "  Chunk {} ({}): {} events kept, error: {}",
                chunk.index,
                chunk.range,
                format_number(chunk.events_fetched),
                chunk.error.as_deref().unwrap_or_default()
            );
        }
    }
}
