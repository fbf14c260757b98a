//! # OCI Ops Tools
//!
//! Command-line tools for day-to-day Oracle Cloud Infrastructure operations:
//! exporting audit events, walking the compartment hierarchy, listing
//! resources and starting or stopping compute instances.
//!
//! ## Overview
//!
//! The audit API limits how much time a single query may span and returns
//! events in pages. [`audit`] turns an arbitrary day range into a sequence of
//! query windows, pages through each window and streams the (optionally
//! filtered) events into one JSON array on disk, so memory use does not grow
//! with the size of the export.
//!
//! ## Features
//!
//! - **Chunked audit export** with event-name filtering and a run summary
//! - **Partial failure tolerance** - a failed window is reported, the export goes on
//! - **Compartment traversal** without recursion, bounded by an optional visit limit
//! - **Resource listing** for instances, agent plugins, policies and regions
//! - **Instance start/stop** with network security group attach/detach
//! - **CSV conversion** of exported events, including `.gz` and `.zst` input
//! - **Shell completion** for bash, zsh, fish, powershell, and elvish
//!
//! ## Architecture
//!
//! - [`audit`] - Range splitting, event fetching, filtering and the streaming writer
//! - [`oci_api`] - Request signing, the HTTP client, response models, compartment walker
//! - [`config`] - OCI CLI config file profiles
//! - [`commands`] - Individual command implementations
//! - [`error`] - Library error type
//! - [`utils`] - Shared utilities (progress, time parsing, formatting, input decoding)
//!
//! ## Example Usage
//!
//! ```bash
//! # Export one month of audit events, 7-day query windows
//! oci-ops audit-export --start 2025-01-01 --end 2025-01-31 \
//!     --output audit.json --profile DEFAULT
//!
//! # Only login events
//! oci-ops audit-export --start 01.01.2025 --end 31.01.2025 \
//!     --output logins.json --profile ops --event-filter "Login"
//!
//! # Compartment tree of the tenancy
//! oci-ops compartments --profile ops
//!
//! # Stop an instance from a config file
//! oci-ops start-stop --config-file instances.json --instance runner --action stop
//! ```
//!
//! ## Installation
//!
//! ```bash
//! cargo install --path .
//! ```

pub mod audit;
pub mod commands;
pub mod config;
pub mod error;
pub mod oci_api;
pub mod utils;
