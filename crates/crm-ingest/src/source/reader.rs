//! CSV import, record reading and preview.

use std::fs;
use std::path::Path;

use crm_model::{SourceColumn, SourceDataset, SourceRecord};
use csv::{ReaderBuilder, StringRecord};

use crate::error::{IngestError, Result};
use crate::inference::infer_type;

use super::decode::{DecodedText, decode_bytes};
use super::header::normalize_header;

/// Rows sampled for type inference.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Sample values kept per column for display.
pub const SAMPLE_VALUES_KEPT: usize = 10;

/// Decoded file with its parsed header row.
struct CsvSource {
    decoded: DecodedText,
    headers: Vec<String>,
}

impl CsvSource {
    fn open(path: &Path) -> Result<Self> {
        check_extension(path)?;
        let bytes = fs::read(path).map_err(|e| IngestError::io(path, e))?;
        let decoded = decode_bytes(&bytes);

        let mut reader = csv_reader(&decoded.text);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(normalize_header)
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(IngestError::NoHeaders {
                path: path.to_path_buf(),
            });
        }

        Ok(Self { decoded, headers })
    }

    /// Data rows, padded with empty cells to the header width. Cells past
    /// the last header are dropped.
    fn rows<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = Result<Vec<String>>> + 'a {
        let width = self.headers.len();
        csv_reader(&self.decoded.text)
            .into_records()
            .map(move |record| {
                record
                    .map(|record| row_cells(&record, width))
                    .map_err(|e| csv_error(path, e))
            })
    }

    fn to_record(&self, cells: Vec<String>) -> SourceRecord {
        self.headers.iter().cloned().zip(cells).collect()
    }
}

fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn row_cells(record: &StringRecord, width: usize) -> Vec<String> {
    (0..width)
        .map(|idx| record.get(idx).unwrap_or_default().to_string())
        .collect()
}

fn csv_error(path: &Path, source: csv::Error) -> IngestError {
    IngestError::CsvParse {
        path: path.to_path_buf(),
        source,
    }
}

fn check_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if extension == "csv" {
        Ok(())
    } else {
        Err(IngestError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension,
        })
    }
}

/// Import a CSV file, sampling [`DEFAULT_SAMPLE_SIZE`] rows for inference.
pub fn import_csv(path: &Path) -> Result<SourceDataset> {
    import_csv_with_sample(path, DEFAULT_SAMPLE_SIZE)
}

/// Import a CSV file and profile its columns from the first `sample_size`
/// rows. Every row is still counted.
pub fn import_csv_with_sample(path: &Path, sample_size: usize) -> Result<SourceDataset> {
    tracing::info!(path = %path.display(), "Importing file");
    let source = CsvSource::open(path)?;

    let mut sampled: Vec<Vec<String>> = Vec::new();
    let mut total_rows = 0usize;
    for row in source.rows(path) {
        let row = row?;
        total_rows += 1;
        if sampled.len() < sample_size {
            sampled.push(row);
        }
    }

    tracing::info!(
        columns = source.headers.len(),
        rows = total_rows,
        encoding = source.decoded.encoding,
        "CSV has {} columns and {} data rows",
        source.headers.len(),
        total_rows
    );

    let columns = source
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<&str> = sampled.iter().map(|row| row[idx].as_str()).collect();
            let mut column = SourceColumn::new(name.clone(), idx).with_type(infer_type(&values));
            column.null_count = values.iter().filter(|v| v.is_empty()).count();
            column.sample_values = values
                .iter()
                .take(SAMPLE_VALUES_KEPT)
                .map(|v| (*v).to_string())
                .collect();
            column
        })
        .collect();

    Ok(SourceDataset {
        path: path.to_path_buf(),
        columns,
        total_rows,
        encoding: source.decoded.encoding.to_string(),
    })
}

/// Every data row keyed by header. With duplicate headers the rightmost
/// cell wins.
pub fn read_records(path: &Path) -> Result<Vec<SourceRecord>> {
    let source = CsvSource::open(path)?;
    let records = source
        .rows(path)
        .map(|row| row.map(|cells| source.to_record(cells)))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(path = %path.display(), rows = records.len(), "Read source records");
    Ok(records)
}

/// The first `limit` data rows keyed by header.
pub fn preview(path: &Path, limit: usize) -> Result<Vec<SourceRecord>> {
    let source = CsvSource::open(path)?;
    source
        .rows(path)
        .take(limit)
        .map(|row| row.map(|cells| source.to_record(cells)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_cells_pads_and_truncates() {
        let short = StringRecord::from(vec!["a"]);
        assert_eq!(row_cells(&short, 3), vec!["a", "", ""]);
        let long = StringRecord::from(vec!["a", "b", "c", "d"]);
        assert_eq!(row_cells(&long, 2), vec!["a", "b"]);
    }

    #[test]
    fn test_extension_check() {
        assert!(check_extension(Path::new("data/Accounts.CSV")).is_ok());
        let err = check_extension(Path::new("data/Accounts.xlsx")).expect_err("xlsx rejected");
        assert!(matches!(
            err,
            IngestError::UnsupportedExtension { ref extension, .. } if extension == "xlsx"
        ));
        assert!(check_extension(Path::new("data/Accounts")).is_err());
    }
}
