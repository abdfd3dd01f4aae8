//! Source file ingestion for CRM imports.
//!
//! # Features
//!
//! - **CSV Import**: decode a source file, profile its columns and infer types
//! - **Records**: read every row (or a preview) keyed by header
//! - **Templates**: write a CSV template for a target object
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use crm_ingest::{import_csv, read_records};
//!
//! let dataset = import_csv(Path::new("claims.csv"))?;
//! println!("{} columns, {} rows", dataset.columns.len(), dataset.total_rows);
//! let rows = read_records(Path::new("claims.csv"))?;
//! ```

mod error;
mod source;
pub mod inference;
pub mod template;

// === Error Types ===
pub use error::{IngestError, Result};

// === CSV Reading ===
pub use source::{
    DEFAULT_SAMPLE_SIZE, DecodedText, SAMPLE_VALUES_KEPT, decode_bytes, import_csv,
    import_csv_with_sample, normalize_header, preview, read_records,
};

// === Type Inference ===
pub use inference::infer_type;

// === Templates ===
pub use template::{describe_field, select_template_fields, write_template};
