//! Value conversion and row transformation for CRM loads.
//!
//! [`convert_value`] turns one raw cell into a typed [`FieldValue`] for a
//! target field. [`RecordTransformer`] applies a whole mapping set to source
//! rows, producing records ready to submit.
//!
//! [`FieldValue`]: crm_model::FieldValue

pub mod convert;
pub mod normalization;
pub mod record;

pub use convert::{convert_value, parse_bool};
pub use record::RecordTransformer;
