//! Input opener for exported event files.
//!
//! Exports are often archived compressed; `.gz` and `.zst` inputs are
//! decompressed transparently, anything else is read as-is.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Open `path` for reading, choosing a decoder from its extension.
pub fn open_input(path: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => Ok(Box::new(GzDecoder::new(BufReader::new(file)))),
        Some("zst") => {
            let decoder = zstd::Decoder::new(file)
                .with_context(|| format!("Failed to open zstd stream: {}", path.display()))?;
            Ok(Box::new(decoder))
        }
        _ => Ok(Box::new(BufReader::new(file))),
    }
}
