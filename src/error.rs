//! Error taxonomy shared by the library modules.
//!
//! Commands wrap these in [`anyhow::Error`] with context. The audit export
//! is the one place that inspects a variant: [`Error::ProviderQuery`] ends a
//! single chunk early instead of aborting the run.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inverted date range, or a non-positive chunk span.
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// An event filter pattern failed to compile.
    #[error("invalid event filter pattern '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// OCI config file, profile or API key missing or unreadable.
    #[error("OCI configuration error: {0}")]
    AuthConfig(String),

    /// A single API request failed.
    #[error("OCI request failed{}: {message}", describe_status(.status, .code))]
    ProviderQuery {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// Output destination unwritable or a write failed mid-stream.
    #[error("failed to write output: {0}")]
    Write(#[from] std::io::Error),

    /// The stream writer was used out of order.
    #[error("invalid writer state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::ProviderQuery {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Rate limiting, server-side failures and transport errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderQuery { status: None, .. } => true,
            Self::ProviderQuery {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

fn describe_status(status: &Option<u16>, code: &Option<String>) -> String {
    match (status, code) {
        (Some(status), Some(code)) => format!(" with status {} ({})", status, code),
        (Some(status), None) => format!(" with status {}", status),
        _ => String::new(),
    }
}
