//! CSV source files: decoding, headers and rows.

mod decode;
mod header;
mod reader;

pub use decode::{DecodedText, decode_bytes};
pub use header::normalize_header;
pub use reader::{
    DEFAULT_SAMPLE_SIZE, SAMPLE_VALUES_KEPT, import_csv, import_csv_with_sample, preview,
    read_records,
};
