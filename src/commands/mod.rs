//! Command implementations for OCI operations.
//!
//! Each module implements one `oci-ops` subcommand; `main` only parses
//! arguments and delegates to the module's `run`.
//!
//! ## Command Categories
//!
//! ### Audit Commands
//!
//! - [`audit_export`] - Chunked, paginated export of audit events to a JSON array
//! - [`events_to_csv`] - Flatten an exported event file into CSV
//!
//! ### Inventory Commands
//!
//! Walk the compartment hierarchy of a tenancy:
//!
//! - [`compartments`] - Compartment tree as text, JSON or CSV
//! - [`list_resources`] - Compartments, instances, agent plugins, policies or regions
//! - [`list_instances`] - Instances of one compartment, optionally as start-stop config
//!
//! ### Instance Operations
//!
//! - [`start_stop`] - Start, stop or query instances with optional NSG attachment

pub mod audit_export;
pub mod compartments;
pub mod events_to_csv;
pub mod list_instances;
pub mod list_resources;
pub mod start_stop;
