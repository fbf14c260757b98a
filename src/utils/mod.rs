//! Utility functions shared by the commands.
//!
//! - [`format`] - Number and indentation formatting
//! - [`progress`] - Chunk progress bar
//! - [`reader`] - Input opener with `.gz`/`.zst` decompression
//! - [`time`] - Day parsing and timestamp formatting
//!
//! ```
//! use oci_ops_tools::utils::time::parse_day;
//!
//! let day = parse_day("05.03.25").unwrap();
//! assert_eq!(day.to_string(), "2025-03-05");
//! ```

pub mod format;
pub mod progress;
pub mod reader;
pub mod time;
