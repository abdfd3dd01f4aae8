//! Bulk API 2.0 helpers: CSV payloads, result parsing and job polling.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crm_model::{RowError, TargetRecord};

use crate::api::JobInfo;
use crate::error::{LoadError, Result};

/// Delay between job status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Longest a job may run before the load gives up.
pub const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Column carrying the per-row error in failed results.
pub const ERROR_COLUMN: &str = "sf__Error";

/// Time source for the poll loop.
pub trait Clock: Send {
    /// Monotonic time since an arbitrary origin.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

/// Wall-clock [`Clock`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Serialize records as an upload batch.
///
/// The header is the union of all record keys in name order; a record
/// without a value for a column gets an empty cell.
pub fn records_to_csv(records: &[TargetRecord]) -> Result<String> {
    if records.is_empty() {
        return Err(LoadError::EmptyUpload);
    }
    let columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| record.get(*column).map(ToString::to_string).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| LoadError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| LoadError::Csv(e.to_string()))
}

/// Parse a result set into rows keyed by column.
pub fn parse_results_csv(text: &str) -> Result<Vec<BTreeMap<String, String>>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    reader
        .records()
        .map(|record| {
            let record = record?;
            Ok(headers
                .iter()
                .zip(record.iter())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect())
        })
        .collect()
}

/// Row errors for the failed result set, numbered from 1.
pub fn failed_row_errors(failed: Vec<BTreeMap<String, String>>) -> Vec<RowError> {
    failed
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            let error = record
                .get(ERROR_COLUMN)
                .filter(|e| !e.is_empty())
                .cloned()
                .unwrap_or_else(|| "Unknown error".to_string());
            RowError {
                row: idx + 1,
                record,
                error,
            }
        })
        .collect()
}

/// Waits for a bulk job to reach a terminal state.
pub struct JobPoller<'a> {
    clock: &'a dyn Clock,
    interval: Duration,
    max_wait: Duration,
}

impl<'a> JobPoller<'a> {
    pub fn new(clock: &'a dyn Clock, interval: Duration, max_wait: Duration) -> Self {
        Self {
            clock,
            interval,
            max_wait,
        }
    }

    /// Poll `status` until the job is terminal.
    ///
    /// The timeout is checked after each non-terminal status, so a job
    /// finishing on the last poll still succeeds. `cancelled` is checked
    /// before every poll.
    pub fn wait<F>(&self, job_id: &str, mut status: F, cancelled: &dyn Fn() -> bool) -> Result<JobInfo>
    where
        F: FnMut() -> Result<JobInfo>,
    {
        let start = self.clock.now();
        loop {
            if cancelled() {
                return Err(LoadError::Cancelled);
            }
            let info = status()?;
            tracing::debug!(job_id, state = %info.state, "Bulk job state");
            if info.state.is_terminal() {
                return Ok(info);
            }
            if self.clock.now().saturating_sub(start) > self.max_wait {
                return Err(LoadError::Timeout {
                    job_id: job_id.to_string(),
                    seconds: self.max_wait.as_secs(),
                });
            }
            self.clock.sleep(self.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BulkJobState;
    use crm_model::FieldValue;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeClock {
        elapsed: Mutex<Duration>,
    }

    impl Clock for FakeClock {
        fn now(&self) -> Duration {
            *self.elapsed.lock().expect("clock lock")
        }

        fn sleep(&self, duration: Duration) {
            *self.elapsed.lock().expect("clock lock") += duration;
        }
    }

    fn record(pairs: &[(&str, FieldValue)]) -> TargetRecord {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn csv_uses_union_of_columns() {
        let records = vec![
            record(&[
                ("Name", FieldValue::Text("Acme, Inc".to_string())),
                ("Active__c", FieldValue::Bool(true)),
            ]),
            record(&[
                ("Name", FieldValue::Text("Globex".to_string())),
                ("Amount__c", FieldValue::Decimal(12.5)),
            ]),
        ];
        let csv = records_to_csv(&records).expect("csv");
        assert_eq!(
            csv,
            "Active__c,Amount__c,Name\ntrue,,\"Acme, Inc\"\n,12.5,Globex\n"
        );
        assert!(matches!(records_to_csv(&[]), Err(LoadError::EmptyUpload)));
    }

    #[test]
    fn failed_results_become_row_errors() {
        let failed = parse_results_csv(
            "\"sf__Id\",\"sf__Error\",Name\n\"\",\"REQUIRED_FIELD_MISSING:Required fields are missing: [Name]\",\n\"\",\"\",Bad\n",
        )
        .expect("parse");
        let errors = failed_row_errors(failed);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].row, 1);
        assert!(errors[0].error.starts_with("REQUIRED_FIELD_MISSING"));
        assert_eq!(errors[1].row, 2);
        assert_eq!(errors[1].error, "Unknown error");
        assert_eq!(errors[1].record["Name"], "Bad");

        assert!(parse_results_csv("").expect("empty").is_empty());
    }

    #[test]
    fn poller_returns_terminal_state() {
        let clock = FakeClock::default();
        let poller = JobPoller::new(&clock, POLL_INTERVAL, MAX_WAIT);
        let mut states = vec![BulkJobState::JobComplete, BulkJobState::InProgress, BulkJobState::UploadComplete];
        let info = poller
            .wait("750", || Ok(JobInfo::new("750", states.pop().expect("state"))), &|| false)
            .expect("job completes");
        assert_eq!(info.state, BulkJobState::JobComplete);
        assert_eq!(clock.now(), POLL_INTERVAL * 2);
    }

    #[test]
    fn poller_times_out() {
        let clock = FakeClock::default();
        let poller = JobPoller::new(&clock, POLL_INTERVAL, Duration::from_secs(12));
        let mut polls = 0;
        let err = poller
            .wait(
                "750",
                || {
                    polls += 1;
                    Ok(JobInfo::new("750", BulkJobState::InProgress))
                },
                &|| false,
            )
            .expect_err("timeout");
        assert!(matches!(err, LoadError::Timeout { seconds: 12, .. }));
        // Polls at 0s, 5s, 10s and 15s; the last one exceeds the limit.
        assert_eq!(polls, 4);
    }

    #[test]
    fn poller_stops_on_cancel() {
        let clock = FakeClock::default();
        let poller = JobPoller::new(&clock, POLL_INTERVAL, MAX_WAIT);
        let err = poller
            .wait("750", || Ok(JobInfo::new("750", BulkJobState::InProgress)), &|| true)
            .expect_err("cancelled");
        assert!(matches!(err, LoadError::Cancelled));
    }
}
