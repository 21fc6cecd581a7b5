//! JSON and CSV file output.

use std::fs;

use analytics_export::report::{FlatRecord, RawReportResponse};
use analytics_export::sink::{write_csv, write_json};

fn records() -> Vec<FlatRecord> {
    vec![FlatRecord::new("US", "42"), FlatRecord::new("FR", "7")]
}

#[test]
fn test_csv_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.csv");

    write_csv(&records(), &path).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "Country,Sessions\nUS,42\nFR,7\n"
    );
}

#[test]
fn test_csv_reads_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.csv");
    let written = vec![
        FlatRecord::new("Korea, Republic of", "11"),
        FlatRecord::new("Côte d'Ivoire", "3"),
        FlatRecord::new("US", "42"),
    ];

    write_csv(&written, &path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.headers().unwrap(), vec!["Country", "Sessions"]);
    let read: Vec<FlatRecord> = reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            FlatRecord::new(&r[0], &r[1])
        })
        .collect();
    assert_eq!(read, written);
}

#[test]
fn test_csv_with_no_records_has_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");

    write_csv(&[], &path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "Country,Sessions\n");
}

#[test]
fn test_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.csv");
    fs::write(&path, "stale contents that are longer than the new file\n").unwrap();

    write_csv(&records()[..1], &path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "Country,Sessions\nUS,42\n");

    // only the target remains; the temporary file was renamed over it
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_json_is_raw_response_with_two_space_indent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let raw = r#"{"reports": [{"data": {"rows": [{"dimensions": ["US"], "metrics": [{"values": ["42"]}]}], "rowCount": 1}}], "queryCost": 1}"#;
    let response: RawReportResponse = serde_json::from_str(raw).unwrap();

    write_json(&response, &path).unwrap();
    let written = fs::read_to_string(&path).unwrap();

    assert!(written.starts_with("{\n  \"reports\": [\n    {\n"));
    assert!(written.ends_with("}\n"));

    let reparsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    let original: serde_json::Value = serde_json::from_str(raw).unwrap();
    assert_eq!(reparsed, original);
}
