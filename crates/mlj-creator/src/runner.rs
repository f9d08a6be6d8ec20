//! Job runner
//!
//! Opens a created job, starts its datafeed and polls lookback progress in a
//! background task until the datafeed finishes or polling is stopped.
//!
//! Progress is published as an integer percentage through a
//! [`tokio::sync::watch`] channel and to any callbacks registered on the
//! creator. `-1` means not started and `-2` means the start failed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::MlApi;
use crate::creator::JobCreator;
use crate::error::{ApiError, CreatorError};
use crate::types::{ProgressSubscriber, StopHandle};

/// Progress before the datafeed has started
pub const PROGRESS_NOT_STARTED: i32 = -1;
/// Progress published when starting failed
pub const PROGRESS_ERROR: i32 = -2;
/// Progress of a finished lookback
pub const PROGRESS_COMPLETE: i32 = 100;

/// Datafeed state as seen by the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatafeedState {
    /// Not running
    Stopped,
    /// Opening the job
    Starting,
    /// Lookback in progress
    Started,
}

struct Shared {
    progress: watch::Sender<i32>,
    subscribers: Vec<ProgressSubscriber>,
    state: Mutex<DatafeedState>,
}

impl Shared {
    fn publish(&self, progress: i32) {
        self.progress.send_replace(progress);
        for subscriber in &self.subscribers {
            subscriber(progress);
        }
    }

    fn set_state(&self, state: DatafeedState) {
        *self.state.lock() = state;
    }
}

/// Starts a job's datafeed and tracks its progress
pub struct JobRunner {
    api: Arc<dyn MlApi>,
    job_id: String,
    datafeed_id: String,
    start: i64,
    end: i64,
    refresh_interval: Duration,
    stop: StopHandle,
    shared: Arc<Shared>,
    job_assigned_to_node: bool,
    poll: Option<JoinHandle<()>>,
}

impl JobRunner {
    /// Runner for the job currently defined by `creator`
    #[must_use]
    pub fn new(api: Arc<dyn MlApi>, creator: &JobCreator) -> Self {
        let (progress, _) = watch::channel(PROGRESS_NOT_STARTED);
        Self {
            api,
            job_id: creator.job_id().to_string(),
            datafeed_id: creator.datafeed_id().to_string(),
            start: creator.start(),
            end: creator.end(),
            refresh_interval: creator.settings().refresh_interval(),
            stop: creator.stop_handle().clone(),
            shared: Arc::new(Shared {
                progress,
                subscribers: creator.progress_subscribers().to_vec(),
                state: Mutex::new(DatafeedState::Stopped),
            }),
            job_assigned_to_node: false,
            poll: None,
        }
    }

    /// Open the job, start the datafeed and begin polling progress
    ///
    /// Returns whether the engine reported the datafeed as started.
    ///
    /// # Errors
    /// `CreatorError::DatafeedStart` if opening the job or starting the
    /// datafeed fails. Progress is set to [`PROGRESS_ERROR`] first.
    pub async fn start_datafeed(&mut self) -> Result<bool, CreatorError> {
        self.shared.set_state(DatafeedState::Starting);
        match self.open_and_start().await {
            Ok(started) => {
                info!(job_id = %self.job_id, started, "datafeed started");
                self.shared.set_state(DatafeedState::Started);
                self.shared.publish(0);
                self.spawn_poll();
                Ok(started)
            }
            Err(e) => {
                error!(job_id = %self.job_id, "failed to start datafeed: {}", e);
                self.shared.set_state(DatafeedState::Stopped);
                self.shared.publish(PROGRESS_ERROR);
                Err(CreatorError::DatafeedStart(e))
            }
        }
    }

    async fn open_and_start(&mut self) -> Result<bool, ApiError> {
        let opened = self.api.open_job(&self.job_id).await?;
        self.job_assigned_to_node = opened.node.as_deref().is_some_and(|n| !n.is_empty());
        if !self.job_assigned_to_node {
            debug!(job_id = %self.job_id, "job is waiting for a node");
        }
        let response = self
            .api
            .start_datafeed(&self.datafeed_id, &self.job_id, self.start, self.end)
            .await?;
        Ok(response.started)
    }

    fn spawn_poll(&mut self) {
        let api = Arc::clone(&self.api);
        let shared = Arc::clone(&self.shared);
        let stop = self.stop.clone();
        let job_id = self.job_id.clone();
        let (start, end, interval) = (self.start, self.end, self.refresh_interval);

        self.poll = Some(tokio::spawn(async move {
            poll_progress(api.as_ref(), &shared, &stop, &job_id, start, end, interval).await;
        }));
    }

    /// Wait for the progress poll to finish
    pub async fn wait(&mut self) {
        if let Some(handle) = self.poll.take() {
            if let Err(e) = handle.await {
                warn!(job_id = %self.job_id, "progress poll ended abnormally: {}", e);
            }
        }
    }

    /// Receive every progress update
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<i32> {
        self.shared.progress.subscribe()
    }

    /// Current datafeed state
    #[must_use]
    pub fn datafeed_state(&self) -> DatafeedState {
        *self.shared.state.lock()
    }

    /// Last published progress
    #[must_use]
    pub fn percentage_complete(&self) -> i32 {
        *self.shared.progress.borrow()
    }

    /// Whether the opened job was assigned to a node
    #[inline]
    #[must_use]
    pub fn job_assigned_to_node(&self) -> bool {
        self.job_assigned_to_node
    }

    /// Job being run
    #[inline]
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Datafeed that was started
    #[inline]
    #[must_use]
    pub fn datafeed_id(&self) -> &str {
        &self.datafeed_id
    }
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("job_id", &self.job_id)
            .field("datafeed_id", &self.datafeed_id)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("state", &self.datafeed_state())
            .field("progress", &self.percentage_complete())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_percentage(progress: f64) -> i32 {
    if progress.is_nan() {
        return 0;
    }
    progress.clamp(0.0, 100.0).round() as i32
}

async fn poll_progress(
    api: &dyn MlApi,
    shared: &Shared,
    stop: &StopHandle,
    job_id: &str,
    start: i64,
    end: i64,
    interval: Duration,
) {
    loop {
        if stop.is_stopped() {
            debug!(job_id, "progress poll stopped");
            return;
        }
        match api.get_lookback_progress(job_id, start, end).await {
            Ok(p) => {
                shared.publish(as_percentage(p.progress));
                if !p.is_running && p.is_job_closed {
                    info!(job_id, "lookback finished");
                    shared.set_state(DatafeedState::Stopped);
                    return;
                }
            }
            Err(e) => {
                warn!(job_id, "failed to read lookback progress: {}", e);
                shared.set_state(DatafeedState::Stopped);
                shared.publish(PROGRESS_ERROR);
                return;
            }
        }
        tokio::time::sleep(interval).await;
    }
}
