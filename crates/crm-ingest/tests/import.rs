use std::fs;
use std::path::PathBuf;

use crm_ingest::{IngestError, import_csv, import_csv_with_sample, preview, read_records};
use crm_model::InferredType;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write file");
    path
}

#[test]
fn imports_columns_with_types_and_samples() {
    let dir = TempDir::new().expect("temp dir");
    let contents = "First Name,Email Addr,Amt,Loss Date,Active\n\
                    Ada,ada@example.com,\"1,200.50\",2024-01-05,yes\n\
                    Grace,,300,2024-02-10,no\n\
                    Linus,linus@example.com,$45,2024-03-15,Y\n";
    let path = write_file(&dir, "claims.csv", contents.as_bytes());

    let dataset = import_csv(&path).expect("import csv");
    assert_eq!(dataset.total_rows, 3);
    assert_eq!(dataset.encoding, "utf-8");
    assert_eq!(
        dataset.column_names(),
        vec!["First Name", "Email Addr", "Amt", "Loss Date", "Active"]
    );

    let types: Vec<InferredType> = dataset.columns.iter().map(|c| c.inferred_type).collect();
    assert_eq!(
        types,
        vec![
            InferredType::String,
            InferredType::String,
            InferredType::Number,
            InferredType::Date,
            InferredType::Boolean,
        ]
    );

    let email = dataset.column("Email Addr").expect("email column");
    assert_eq!(email.index, 1);
    assert_eq!(email.null_count, 1);
    assert_eq!(email.sample_values, vec!["ada@example.com", "", "linus@example.com"]);
}

#[test]
fn sampling_bounds_profile_but_not_row_count() {
    let dir = TempDir::new().expect("temp dir");
    let mut contents = String::from("Code\n");
    for i in 0..30 {
        contents.push_str(&format!("{i}\n"));
    }
    let path = write_file(&dir, "codes.csv", contents.as_bytes());

    let dataset = import_csv_with_sample(&path, 5).expect("import csv");
    assert_eq!(dataset.total_rows, 30);
    let code = &dataset.columns[0];
    assert_eq!(code.sample_values, vec!["0", "1", "2", "3", "4"]);

    let dataset = import_csv(&path).expect("import csv");
    assert_eq!(dataset.columns[0].sample_values.len(), 10);
}

#[test]
fn headers_are_normalized_and_encodings_detected() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "bom.csv", b"\xEF\xBB\xBF  Account   Name ,City\nAcme,Z\xC3\xBCrich\n");
    let dataset = import_csv(&path).expect("import csv");
    assert_eq!(dataset.encoding, "utf-8-sig");
    assert_eq!(dataset.column_names(), vec!["Account Name", "City"]);

    let path = write_file(&dir, "legacy.csv", b"Name,City\nCaf\xE9 Bleu,Montr\xE9al\n");
    let dataset = import_csv(&path).expect("import csv");
    assert_eq!(dataset.encoding, "windows-1252");
    let rows = read_records(&path).expect("read records");
    assert_eq!(rows[0]["City"], "Montréal");
}

#[test]
fn short_rows_are_padded_and_long_rows_truncated() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "ragged.csv", b"A,B,C\n1\n1,2,3,4\n");

    let rows = read_records(&path).expect("read records");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["A"], "1");
    assert_eq!(rows[0]["B"], "");
    assert_eq!(rows[0]["C"], "");
    assert_eq!(rows[1].len(), 3);
    assert_eq!(rows[1]["C"], "3");

    let dataset = import_csv(&path).expect("import csv");
    assert_eq!(dataset.column("B").expect("B").null_count, 1);
}

#[test]
fn preview_returns_leading_rows() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "people.csv", b"Name\nA\nB\nC\n");

    let rows = preview(&path, 2).expect("preview");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["Name"], "B");
    assert!(preview(&path, 0).expect("preview").is_empty());
}

#[test]
fn rejects_missing_empty_and_non_csv_files() {
    let dir = TempDir::new().expect("temp dir");

    let err = import_csv(&dir.path().join("missing.csv")).expect_err("missing file");
    assert!(matches!(err, IngestError::FileNotFound { .. }));

    let path = write_file(&dir, "empty.csv", b"");
    let err = import_csv(&path).expect_err("empty file");
    assert!(matches!(err, IngestError::NoHeaders { .. }));

    let path = write_file(&dir, "data.xlsx", b"A\n1\n");
    let err = import_csv(&path).expect_err("xlsx");
    assert!(matches!(err, IngestError::UnsupportedExtension { .. }));
}
