//! Paginated retrieval of audit events for one chunk.

use crate::audit::range::Chunk;
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;

/// One page of `listEvents` results.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<Value>,
    /// Continuation token; `None` on the last page.
    pub next_page: Option<String>,
}

/// Anything that can serve audit event pages.
///
/// Implemented by [`crate::oci_api::OciClient`]; tests provide in-memory sources.
#[allow(async_fn_in_trait)]
pub trait AuditSource {
    async fn list_events(
        &self,
        compartment_id: &str,
        chunk: &Chunk,
        page: Option<&str>,
    ) -> Result<EventPage>;
}

/// Retry behaviour for transient page failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (0-based): base * 2^attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Pulls events for a single chunk, one page at a time, on demand.
///
/// A page that fails (after any retries) ends the chunk: events already
/// returned stay returned and the error is kept for [`ChunkFetcher::error`].
pub struct ChunkFetcher<'a, S: AuditSource> {
    source: &'a S,
    compartment_id: &'a str,
    chunk: Chunk,
    retry: RetryPolicy,
    buffered: VecDeque<Value>,
    next_page: Option<String>,
    exhausted: bool,
    pages: usize,
    retries: u32,
    error: Option<Error>,
}

impl<'a, S: AuditSource> ChunkFetcher<'a, S> {
    pub fn new(source: &'a S, compartment_id: &'a str, chunk: Chunk, retry: RetryPolicy) -> Self {
        Self {
            source,
            compartment_id,
            chunk,
            retry,
            buffered: VecDeque::new(),
            next_page: None,
            exhausted: false,
            pages: 0,
            retries: 0,
            error: None,
        }
    }

    /// Next event in provider order, or `None` once the chunk is done.
    pub async fn next_event(&mut self) -> Option<Value> {
        loop {
            if let Some(event) = self.buffered.pop_front() {
                return Some(event);
            }
            if self.exhausted {
                return None;
            }
            self.fetch_page().await;
        }
    }

    async fn fetch_page(&mut self) {
        let mut attempt = 0;
        loop {
            let result = self
                .source
                .list_events(self.compartment_id, &self.chunk, self.next_page.as_deref())
                .await;

            match result {
                Ok(page) => {
                    self.pages += 1;
                    self.buffered.extend(page.events);
                    self.next_page = page.next_page.filter(|token| !token.is_empty());
                    self.exhausted = self.next_page.is_none();
                    return;
                }
                Err(err) if err.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    eprintln!(
                        "  Transient error on page {} ({}), retrying in {:?}",
                        self.pages + 1,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    self.retries += 1;
                }
                Err(err) => {
                    self.error = Some(err);
                    self.exhausted = true;
                    return;
                }
            }
        }
    }

    /// Pages successfully fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// The failure that ended this chunk early, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<Error> {
        self.error
    }
}
