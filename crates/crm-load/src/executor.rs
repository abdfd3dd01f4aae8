//! Load execution: transform rows, then submit them record by record or as
//! one bulk job depending on volume.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crm_model::{
    FieldMapping, ID_FIELD, LoadOperation, LoadResult, RowError, SourceRecord, TargetObject,
    TargetRecord,
};
use crm_transform::RecordTransformer;
use tracing::{debug, error, info, info_span, warn};

use crate::api::{CrmApi, ResultKind};
use crate::bulk::{
    Clock, JobPoller, MAX_WAIT, POLL_INTERVAL, SystemClock, failed_row_errors, parse_results_csv,
    records_to_csv,
};
use crate::error::{LoadError, Result};
use crate::session::SharedSession;

/// Row count at which loads switch to the bulk API.
pub const BULK_THRESHOLD: usize = 200;

/// Submission strategy for a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// One API call per record.
    Direct,
    /// One asynchronous bulk job.
    Bulk,
}

impl LoadMode {
    pub fn for_row_count(rows: usize) -> Self {
        if rows >= BULK_THRESHOLD {
            Self::Bulk
        } else {
            Self::Direct
        }
    }
}

/// Steps of a load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Preparing,
    Transforming,
    DirectSubmit,
    BulkSubmit,
    Polling,
    Completed,
    Failed,
}

impl LoadState {
    /// Get human-readable label.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Preparing => "Preparing...",
            Self::Transforming => "Transforming records...",
            Self::DirectSubmit => "Submitting records...",
            Self::BulkSubmit => "Submitting bulk job...",
            Self::Polling => "Waiting for bulk job...",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

/// Counters reported after every direct row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadProgress {
    pub current: usize,
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
}

/// Receiver of load progress.
pub trait ProgressSink {
    fn state(&mut self, _state: LoadState) {}

    fn progress(&mut self, _progress: LoadProgress) {}

    fn status(&mut self, _message: &str) {}
}

/// Discards all progress.
impl ProgressSink for () {}

/// Everything needed to run one load.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub object: TargetObject,
    pub mappings: Vec<FieldMapping>,
    pub rows: Vec<SourceRecord>,
    pub operation: LoadOperation,
    pub record_type_id: Option<String>,
}

impl LoadRequest {
    pub fn new(
        object: TargetObject,
        mappings: Vec<FieldMapping>,
        rows: Vec<SourceRecord>,
        operation: LoadOperation,
    ) -> Self {
        Self {
            object,
            mappings,
            rows,
            operation,
            record_type_id: None,
        }
    }

    pub fn with_record_type(mut self, record_type_id: Option<String>) -> Self {
        self.record_type_id = record_type_id;
        self
    }

    pub fn mode(&self) -> LoadMode {
        LoadMode::for_row_count(self.rows.len())
    }
}

pub struct LoadExecutor<C> {
    session: SharedSession<C>,
    clock: Box<dyn Clock>,
    poll_interval: Duration,
    max_wait: Duration,
    cancel_flag: Arc<AtomicBool>,
}

impl<C> std::fmt::Debug for LoadExecutor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadExecutor")
            .field("poll_interval", &self.poll_interval)
            .field("max_wait", &self.max_wait)
            .field("is_cancelled", &self.cancel_flag.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<C: CrmApi> LoadExecutor<C> {
    pub fn new(session: SharedSession<C>) -> Self {
        Self {
            session,
            clock: Box::new(SystemClock::default()),
            poll_interval: POLL_INTERVAL,
            max_wait: MAX_WAIT,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_poll_settings(mut self, interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = interval;
        self.max_wait = max_wait;
        self
    }

    /// Share a cancel flag with the caller.
    pub fn with_cancel_flag(mut self, cancel_flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = cancel_flag;
        self
    }

    pub fn session(&self) -> &SharedSession<C> {
        &self.session
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(LoadError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run a load.
    ///
    /// Row failures and bulk job failures are reported in the returned
    /// [`LoadResult`]. The only error is [`LoadError::Cancelled`].
    pub fn execute(&self, request: &LoadRequest, sink: &mut dyn ProgressSink) -> Result<LoadResult> {
        let _span = info_span!(
            "load",
            object = %request.object.name,
            operation = %request.operation
        )
        .entered();
        sink.state(LoadState::Preparing);
        self.check_cancelled()?;

        let total_rows = request.rows.len();
        info!(rows = total_rows, mappings = request.mappings.len(), "Starting data load");

        sink.state(LoadState::Transforming);
        let records =
            RecordTransformer::new(&request.object, &request.mappings, request.operation)
                .with_record_type(request.record_type_id.clone())
                .transform_all(&request.rows);

        let result = match request.mode() {
            LoadMode::Bulk => {
                info!(rows = total_rows, threshold = BULK_THRESHOLD, "Using Bulk API");
                sink.state(LoadState::BulkSubmit);
                self.load_bulk(&request.object.name, &records, request.operation, sink)?
            }
            LoadMode::Direct => {
                info!(rows = total_rows, "Using REST API");
                sink.state(LoadState::DirectSubmit);
                match request.operation {
                    LoadOperation::Insert => self.insert_records(&request.object.name, &records, sink)?,
                    LoadOperation::Update => self.update_records(&request.object.name, &records, sink)?,
                }
            }
        };

        info!(
            successful = result.successful_rows,
            failed = result.failed_rows,
            total = result.total_rows,
            "Load complete"
        );
        sink.state(if result.successful_rows == 0 && result.total_rows > 0 {
            LoadState::Failed
        } else {
            LoadState::Completed
        });
        Ok(result)
    }

    fn insert_records(
        &self,
        object: &str,
        records: &[TargetRecord],
        sink: &mut dyn ProgressSink,
    ) -> Result<LoadResult> {
        let mut result = LoadResult {
            total_rows: records.len(),
            ..LoadResult::default()
        };

        for (idx, record) in records.iter().enumerate() {
            self.check_cancelled()?;
            let mut cleaned = record.clone();
            cleaned.remove(ID_FIELD);
            if idx == 0 {
                let fields: Vec<&str> = cleaned.keys().map(String::as_str).collect();
                info!("Fields being inserted: {}", fields.join(", "));
            }

            match self.session.with_session(|api| api.create(object, &cleaned)) {
                Ok(saved) if saved.success => {
                    result.successful_rows += 1;
                    debug!(row = idx + 1, id = saved.id.as_deref().unwrap_or_default(), "Inserted");
                }
                Ok(saved) => {
                    let message = saved.error_text();
                    warn!(row = idx + 1, error = %message, "Insert failed");
                    result.failed_rows += 1;
                    result.errors.push(RowError::for_record(idx + 1, record, message));
                }
                Err(err) => {
                    error!(row = idx + 1, error = %err, "Exception during insert");
                    result.failed_rows += 1;
                    result.errors.push(RowError::for_record(idx + 1, record, err.to_string()));
                }
            }
            sink.progress(progress(idx + 1, &result));
        }
        Ok(result)
    }

    fn update_records(
        &self,
        object: &str,
        records: &[TargetRecord],
        sink: &mut dyn ProgressSink,
    ) -> Result<LoadResult> {
        let mut result = LoadResult {
            total_rows: records.len(),
            ..LoadResult::default()
        };

        for (idx, record) in records.iter().enumerate() {
            self.check_cancelled()?;
            let record_id = record
                .get(ID_FIELD)
                .filter(|id| !id.is_blank())
                .map(ToString::to_string);

            let outcome = match record_id {
                None => Err("Missing Id field for update operation".to_string()),
                Some(record_id) => {
                    let mut data = record.clone();
                    data.remove(ID_FIELD);
                    self.session
                        .with_session(|api| api.update(object, &record_id, &data))
                        .map(|()| debug!(row = idx + 1, id = %record_id, "Updated"))
                        .map_err(|err| {
                            error!(row = idx + 1, error = %err, "Exception during update");
                            err.to_string()
                        })
                }
            };

            match outcome {
                Ok(()) => result.successful_rows += 1,
                Err(message) => {
                    result.failed_rows += 1;
                    result.errors.push(RowError::for_record(idx + 1, record, message));
                }
            }
            sink.progress(progress(idx + 1, &result));
        }
        Ok(result)
    }

    fn load_bulk(
        &self,
        object: &str,
        records: &[TargetRecord],
        operation: LoadOperation,
        sink: &mut dyn ProgressSink,
    ) -> Result<LoadResult> {
        info!(records = records.len(), object, "Starting Bulk API load");
        let mut job_id: Option<String> = None;

        match self.run_bulk_job(object, records, operation, sink, &mut job_id) {
            Ok(result) => Ok(result),
            Err(LoadError::Cancelled) => {
                if let Some(job_id) = &job_id {
                    if let Err(err) = self.abort_bulk_job(job_id) {
                        warn!(job_id, error = %err, "Could not abort cancelled bulk job");
                    }
                }
                Err(LoadError::Cancelled)
            }
            Err(err) => {
                error!(error = %err, "Bulk load failed");
                Ok(LoadResult::all_failed(
                    records.len(),
                    format!("Bulk API error: {err}"),
                ))
            }
        }
    }

    fn run_bulk_job(
        &self,
        object: &str,
        records: &[TargetRecord],
        operation: LoadOperation,
        sink: &mut dyn ProgressSink,
        job_slot: &mut Option<String>,
    ) -> Result<LoadResult> {
        self.check_cancelled()?;
        sink.status("Creating bulk job...");
        let job_id = self
            .session
            .with_session(|api| api.create_job(object, operation))?;
        info!(job_id = %job_id, "Created bulk job");
        *job_slot = Some(job_id.clone());

        self.check_cancelled()?;
        sink.status(&format!("Uploading {} records...", records.len()));
        let payload = records_to_csv(records)?;
        self.session
            .with_session(|api| api.upload_batch(&job_id, &payload))?;

        self.check_cancelled()?;
        sink.status("Starting job processing...");
        self.session.with_session(|api| api.close_job(&job_id))?;

        sink.status("Processing records...");
        sink.state(LoadState::Polling);
        let poller = JobPoller::new(self.clock.as_ref(), self.poll_interval, self.max_wait);
        let final_status = poller.wait(
            &job_id,
            || self.session.with_session(|api| api.job_status(&job_id)),
            &|| self.is_cancelled(),
        )?;
        info!(job_id = %job_id, state = %final_status.state, "Bulk job finished");

        self.check_cancelled()?;
        sink.status("Retrieving results...");
        let successful = parse_results_csv(
            &self
                .session
                .with_session(|api| api.fetch_results(&job_id, ResultKind::Successful))?,
        )?;
        let failed = parse_results_csv(
            &self
                .session
                .with_session(|api| api.fetch_results(&job_id, ResultKind::Failed))?,
        )?;
        info!(
            job_id = %job_id,
            successful = successful.len(),
            failed = failed.len(),
            "Bulk job results"
        );

        // Rows the job never reported on count as failed.
        let successful_rows = successful.len().min(records.len());
        Ok(LoadResult {
            total_rows: records.len(),
            successful_rows,
            failed_rows: records.len() - successful_rows,
            errors: failed_row_errors(failed),
        })
    }

    /// Abort a running bulk job.
    pub fn abort_bulk_job(&self, job_id: &str) -> Result<()> {
        info!(job_id, "Aborting bulk job");
        self.session.with_session(|api| api.abort_job(job_id))
    }
}

fn progress(current: usize, result: &LoadResult) -> LoadProgress {
    LoadProgress {
        current,
        successful: result.successful_rows,
        failed: result.failed_rows,
        total: result.total_rows,
    }
}
