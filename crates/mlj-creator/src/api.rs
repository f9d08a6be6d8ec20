//! Collaborator contracts
//!
//! The creator never talks to a cluster directly. Every remote operation goes
//! through [`MlApi`] or [`CalendarService`], held as `Arc<dyn ...>` so tests
//! and the CLI can supply their own.

use async_trait::async_trait;
use mlj_config::{DatafeedConfig, IndicesOptions, JobConfig, RuntimeMappings};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ApiError;
use crate::types::Calendar;

/// Request for the earliest and latest timestamps of a data source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeFieldRangeRequest {
    /// Index pattern
    pub index: String,
    /// Field holding event timestamps
    pub time_field_name: String,
    /// Datafeed query, possibly excluding frozen data
    pub query: JsonValue,
    /// Runtime fields the query may reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_mappings: Option<RuntimeMappings>,
    /// How missing or closed indices are treated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices_options: Option<IndicesOptions>,
}

/// Epoch millisecond range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    /// Earliest timestamp
    pub start: i64,
    /// Latest timestamp
    pub end: i64,
}

/// Result of opening a job
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenJobResponse {
    /// Whether the job is open
    pub opened: bool,
    /// Node the job was assigned to; empty when waiting for capacity
    #[serde(default)]
    pub node: Option<String>,
}

/// Result of starting a datafeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartDatafeedResponse {
    /// Whether the datafeed started
    pub started: bool,
}

/// Lookback progress of a running datafeed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LookbackProgress {
    /// Percentage, may exceed 100 near the end of the range
    pub progress: f64,
    /// Datafeed still running
    pub is_running: bool,
    /// Job closed after lookback
    pub is_job_closed: bool,
}

/// Anomaly detection API
#[async_trait]
pub trait MlApi: Send + Sync {
    /// Store a job definition
    async fn add_job(&self, job_id: &str, job: &JobConfig) -> Result<(), ApiError>;

    /// Store a datafeed definition
    async fn add_datafeed(&self, datafeed_id: &str, datafeed: &DatafeedConfig) -> Result<(), ApiError>;

    /// Delete a job together with its datafeed
    async fn delete_job(&self, job_id: &str) -> Result<(), ApiError>;

    /// Open a job
    async fn open_job(&self, job_id: &str) -> Result<OpenJobResponse, ApiError>;

    /// Start a datafeed over `[start, end)`
    async fn start_datafeed(
        &self,
        datafeed_id: &str,
        job_id: &str,
        start: i64,
        end: i64,
    ) -> Result<StartDatafeedResponse, ApiError>;

    /// Current lookback progress of a job
    async fn get_lookback_progress(
        &self,
        job_id: &str,
        start: i64,
        end: i64,
    ) -> Result<LookbackProgress, ApiError>;

    /// Time range covered by a data source
    async fn get_time_field_range(&self, request: &TimeFieldRangeRequest) -> Result<TimeRange, ApiError>;
}

/// Calendar membership updates
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Add `job_id` to the calendar's job list
    async fn assign_new_job_id(&self, calendar: &Calendar, job_id: &str) -> Result<(), ApiError>;
}

/// API for offline use: reads nothing, rejects every remote operation
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineApi;

impl OfflineApi {
    fn unavailable(operation: &str) -> ApiError {
        ApiError::Transport(format!("{operation} is unavailable offline"))
    }
}

#[async_trait]
impl MlApi for OfflineApi {
    async fn add_job(&self, _job_id: &str, _job: &JobConfig) -> Result<(), ApiError> {
        Err(Self::unavailable("add_job"))
    }

    async fn add_datafeed(&self, _datafeed_id: &str, _datafeed: &DatafeedConfig) -> Result<(), ApiError> {
        Err(Self::unavailable("add_datafeed"))
    }

    async fn delete_job(&self, _job_id: &str) -> Result<(), ApiError> {
        Err(Self::unavailable("delete_job"))
    }

    async fn open_job(&self, _job_id: &str) -> Result<OpenJobResponse, ApiError> {
        Err(Self::unavailable("open_job"))
    }

    async fn start_datafeed(
        &self,
        _datafeed_id: &str,
        _job_id: &str,
        _start: i64,
        _end: i64,
    ) -> Result<StartDatafeedResponse, ApiError> {
        Err(Self::unavailable("start_datafeed"))
    }

    async fn get_lookback_progress(
        &self,
        _job_id: &str,
        _start: i64,
        _end: i64,
    ) -> Result<LookbackProgress, ApiError> {
        Err(Self::unavailable("get_lookback_progress"))
    }

    async fn get_time_field_range(&self, _request: &TimeFieldRangeRequest) -> Result<TimeRange, ApiError> {
        Err(Self::unavailable("get_time_field_range"))
    }
}

#[async_trait]
impl CalendarService for OfflineApi {
    async fn assign_new_job_id(&self, _calendar: &Calendar, _job_id: &str) -> Result<(), ApiError> {
        Err(Self::unavailable("assign_new_job_id"))
    }
}
