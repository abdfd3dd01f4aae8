//! Library components of the `crm-migrate` command line tool.

pub mod inputs;
pub mod logging;
pub mod settings;
