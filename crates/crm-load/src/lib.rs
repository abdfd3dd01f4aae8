//! Record loading for CRM imports.
//!
//! [`LoadExecutor`] transforms source rows with the mapping set and submits
//! them. Fewer than [`BULK_THRESHOLD`] rows go through one REST call per
//! record; larger loads run as a single Bulk API 2.0 job that is polled until
//! it finishes. Remote calls go through the traits in [`api`] on a
//! [`SharedSession`], which re-authenticates once when a session expires.
//!
//! [`spawn_load`] runs a load on a background thread with a cancel handle.
//! [`sample_object`] previews records already stored in the target object.

pub mod api;
pub mod bulk;
mod error;
pub mod executor;
pub mod metadata;
pub mod rest;
pub mod sample;
pub mod session;
pub mod task;

pub use api::{BulkApi, BulkJobState, Connection, CrmApi, JobInfo, MetadataApi, RecordApi, ResultKind, SaveResult};
pub use bulk::{Clock, SystemClock};
pub use error::{LoadError, Result};
pub use executor::{
    BULK_THRESHOLD, LoadExecutor, LoadMode, LoadProgress, LoadRequest, LoadState, ProgressSink,
};
pub use metadata::{fetch_catalog, fetch_object};
pub use rest::{RestConnection, SessionToken, StaticToken, TokenSource};
pub use sample::{
    DEFAULT_SAMPLE_LIMIT, RecordSample, fetch_layout_fields, sample_object, sample_records,
    select_preview_fields,
};
pub use session::SharedSession;
pub use task::{LoadHandle, LoadUpdate, spawn_load};
