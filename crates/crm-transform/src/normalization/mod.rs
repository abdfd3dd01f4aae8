//! Parsers for the typed field categories.
//!
//! - **numeric**: integer truncation and decimal parsing with separators stripped
//! - **datetime**: accepted date and datetime layouts and their output forms
//! - **picklist**: exact then case-insensitive matching against allowed values
//! - **reference**: record id shape checks

pub mod datetime;
pub mod numeric;
pub mod picklist;
pub mod reference;

pub use datetime::{format_date, format_datetime, parse_date, parse_datetime};
pub use numeric::{parse_decimal, parse_integer};
pub use picklist::resolve_picklist;
pub use reference::is_record_id;
