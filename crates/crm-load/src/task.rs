//! Background load thread.
//!
//! Runs a load off the calling thread with cooperative cancellation and
//! streams progress over a channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crm_model::LoadResult;
use crossbeam_channel::Sender;

use crate::api::CrmApi;
use crate::error::LoadError;
use crate::executor::{LoadExecutor, LoadProgress, LoadRequest, LoadState, ProgressSink};

/// Messages sent from the background load thread.
#[derive(Debug, Clone)]
pub enum LoadUpdate {
    State(LoadState),
    Progress(LoadProgress),
    Status(String),
    /// Load finished; the result carries per-row failures.
    Complete(LoadResult),
    /// Load was cancelled by the user.
    Cancelled,
    Error(String),
}

/// Forwards progress into a channel. A dropped receiver is ignored.
struct ChannelSink<'a> {
    sender: &'a Sender<LoadUpdate>,
}

impl ProgressSink for ChannelSink<'_> {
    fn state(&mut self, state: LoadState) {
        let _ = self.sender.send(LoadUpdate::State(state));
    }

    fn progress(&mut self, progress: LoadProgress) {
        let _ = self.sender.send(LoadUpdate::Progress(progress));
    }

    fn status(&mut self, message: &str) {
        let _ = self.sender.send(LoadUpdate::Status(message.to_string()));
    }
}

/// Handle to cancel or await an in-progress load.
pub struct LoadHandle {
    cancel_flag: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl LoadHandle {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Get the cancel flag for sharing with other threads.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the load thread. The final outcome arrives on the channel.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

impl std::fmt::Debug for LoadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadHandle")
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Spawn a background load thread.
///
/// The executor's cancel flag is replaced by the returned handle's.
pub fn spawn_load<C>(
    executor: LoadExecutor<C>,
    request: LoadRequest,
    sender: Sender<LoadUpdate>,
) -> LoadHandle
where
    C: CrmApi + Send + 'static,
{
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let executor = executor.with_cancel_flag(cancel_flag.clone());

    let thread = std::thread::spawn(move || {
        let mut sink = ChannelSink { sender: &sender };
        match executor.execute(&request, &mut sink) {
            Ok(result) => {
                let _ = sender.send(LoadUpdate::Complete(result));
            }
            Err(LoadError::Cancelled) => {
                tracing::info!("Load cancelled");
                let _ = sender.send(LoadUpdate::Cancelled);
            }
            Err(error) => {
                let _ = sender.send(LoadUpdate::Error(error.to_string()));
            }
        }
    });

    LoadHandle {
        cancel_flag,
        thread,
    }
}
