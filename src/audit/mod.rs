//! Chunked export of OCI audit events.
//!
//! A requested day range is split into query-sized [`range::Chunk`]s; each
//! chunk is fetched page by page ([`fetcher`]), passed through the optional
//! event-type [`filter`] and appended to a single JSON array on disk by the
//! streaming [`writer`]. [`export::Exporter`] wires the pieces together.
//!
//! Everything runs sequentially, chunk after chunk and page after page, so
//! the output keeps provider order and only one page is resident at a time.

pub mod export;
pub mod fetcher;
pub mod filter;
pub mod range;
pub mod writer;

pub use export::{ChunkReport, ExportSummary, Exporter};
pub use fetcher::{AuditSource, EventPage, RetryPolicy};
pub use filter::EventFilter;
pub use range::{split_range, Chunk, Chunks, TimeRange};
pub use writer::{JsonArrayWriter, Layout};
