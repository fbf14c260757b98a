//! Convert an exported event file to CSV.
//!
//! Nested objects become dot-separated columns (`data.identity.principalName`),
//! arrays are kept as compact JSON in a single cell.
//!
//! # Usage
//!
//! ```bash
//! oci-ops events-to-csv audit_jan.json audit_jan.csv
//!
//! # Compressed exports are read directly
//! oci-ops events-to-csv audit_jan.json.gz audit_jan.csv
//! ```

use crate::utils::format::format_number;
use crate::utils::reader::open_input;
use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

/// Flattened records with their columns in first-seen order.
#[derive(Debug, Default)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl FlatTable {
    fn push(&mut self, record: &Value) {
        let mut row = HashMap::new();
        flatten_into(None, record, &mut row, &mut self.columns);
        self.rows.push(row);
    }

    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.columns)?;
        for row in &self.rows {
            csv.write_record(
                self.columns
                    .iter()
                    .map(|c| row.get(c).map(String::as_str).unwrap_or_default()),
            )?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// Flatten the records of an export document.
///
/// The root is either an array of records or an object with a `data` array.
pub fn flatten_document(document: &Value) -> Result<FlatTable> {
    let records = match document {
        Value::Array(records) => records,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(records)) => records,
            _ => bail!("Expected a JSON array or an object with a 'data' array"),
        },
        _ => bail!("Expected a JSON array or an object with a 'data' array"),
    };

    let mut table = FlatTable::default();
    for record in records {
        table.push(record);
    }
    Ok(table)
}

fn flatten_into(
    prefix: Option<&str>,
    value: &Value,
    row: &mut HashMap<String, String>,
    columns: &mut Vec<String>,
) {
    match value {
        Value::Object(map) => flatten_object(prefix, map, row, columns),
        other => {
            let column = prefix.unwrap_or("value").to_string();
            let cell = match other {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                // numbers, booleans and arrays as compact JSON
                _ => other.to_string(),
            };
            if !columns.contains(&column) {
                columns.push(column.clone());
            }
            row.insert(column, cell);
        }
    }
}

fn flatten_object(
    prefix: Option<&str>,
    map: &Map<String, Value>,
    row: &mut HashMap<String, String>,
    columns: &mut Vec<String>,
) {
    for (key, value) in map {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        flatten_into(Some(&name), value, row, columns);
    }
}

pub fn run(input: &str, output: &str) -> Result<()> {
    eprintln!("Reading {}...", input);
    let reader = open_input(input)?;
    let document: Value = serde_json::from_reader(BufReader::new(reader))
        .with_context(|| format!("Failed to parse JSON from: {}", input))?;

    let table = flatten_document(&document)?;
    eprintln!(
        "Flattened {} records into {} columns",
        format_number(table.rows.len()),
        format_number(table.columns.len())
    );

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output))?;
    table
        .write_csv(file)
        .with_context(|| format!("Failed to write CSV to: {}", output))?;

    eprintln!("CSV written to: {}", output);
    Ok(())
}
