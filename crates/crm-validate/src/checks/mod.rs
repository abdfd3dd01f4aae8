//! Individual mapping checks.
//!
//! Each check looks at the whole mapping set and returns its findings in a
//! stable order. [`crate::validate_mapping`] runs them in sequence.

pub mod duplicate;
pub mod field;
pub mod required;
pub mod updateable;
