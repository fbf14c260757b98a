/// Tests for converting exported event files to CSV
use flate2::write::GzEncoder;
use flate2::Compression;
use oci_ops_tools::audit::{JsonArrayWriter, Layout};
use oci_ops_tools::commands::events_to_csv;
use serde_json::json;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

fn sample_events() -> Vec<serde_json::Value> {
    vec![
        json!({
            "eventType": "com.oraclecloud.IdentitySignOn.InteractiveLogin",
            "eventTime": "2025-01-02T08:00:00.000Z",
            "data": {
                "eventName": "InteractiveLogin",
                "identity": { "principalName": "alice", "ipAddress": "10.0.0.1" }
            }
        }),
        json!({
            "eventType": "com.oraclecloud.ComputeApi.InstanceAction",
            "eventTime": "2025-01-02T09:00:00.000Z",
            "data": {
                "eventName": "InstanceAction",
                "identity": { "principalName": "bob" },
                "additionalDetails": null,
                "freeformTags": ["ops", "nightly"]
            }
        }),
    ]
}

fn read_csv(path: &std::path::Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

#[test]
fn test_exported_file_to_csv() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("export.json");
    let output = temp_dir.path().join("export.csv");

    let mut writer = JsonArrayWriter::create(&input, Layout::Pretty).unwrap();
    writer.open().unwrap();
    for event in sample_events() {
        writer.write_record(&event).unwrap();
    }
    writer.close().unwrap();
    drop(writer);

    events_to_csv::run(input.to_str().unwrap(), output.to_str().unwrap()).unwrap();

    let (headers, rows) = read_csv(&output);
    assert_eq!(
        headers,
        vec![
            "eventType",
            "eventTime",
            "data.eventName",
            "data.identity.principalName",
            "data.identity.ipAddress",
            "data.additionalDetails",
            "data.freeformTags",
        ]
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][4], "10.0.0.1");
    assert_eq!(rows[1][4], "");
    assert_eq!(rows[1][5], "");
    assert_eq!(rows[1][6], r#"["ops","nightly"]"#);
}

#[test]
fn test_gzip_input_with_data_wrapper() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("export.json.gz");
    let output = temp_dir.path().join("export.csv");

    let document = json!({ "data": sample_events() });
    let mut encoder = GzEncoder::new(fs::File::create(&input).unwrap(), Compression::default());
    encoder
        .write_all(serde_json::to_string(&document).unwrap().as_bytes())
        .unwrap();
    encoder.finish().unwrap();

    events_to_csv::run(input.to_str().unwrap(), output.to_str().unwrap()).unwrap();

    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][3], "bob");
}

#[test]
fn test_empty_export() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("empty.json");
    let output = temp_dir.path().join("empty.csv");
    fs::write(&input, "[\n]\n").unwrap();

    events_to_csv::run(input.to_str().unwrap(), output.to_str().unwrap()).unwrap();
    assert!(output.exists());
}
