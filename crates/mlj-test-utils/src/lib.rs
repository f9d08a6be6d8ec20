//! Testing utilities for MLJ workspace
//!
//! Shared fixtures and a recording fake of the collaborator APIs.

#![allow(missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use mlj_catalog::{Field, FieldType};
use mlj_config::{DatafeedConfig, JobConfig};
use mlj_creator::{
    ApiError, Calendar, CalendarService, CreatorSettings, DataSource, JobCreator, LookbackProgress,
    MlApi, OpenJobResponse, StartDatafeedResponse, TimeFieldRangeRequest, TimeRange,
};
use parking_lot::Mutex;
use serde_json::json;

/// A call made against [`RecordingApi`]
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    AddJob(String),
    AddDatafeed(String),
    DeleteJob(String),
    OpenJob(String),
    StartDatafeed {
        datafeed_id: String,
        job_id: String,
        start: i64,
        end: i64,
    },
    LookbackProgress(String),
    TimeFieldRange(TimeFieldRangeRequest),
    AssignCalendar {
        calendar_id: String,
        job_id: String,
    },
}

impl ApiCall {
    /// Operation name, as used by [`RecordingApi::fail`]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::AddJob(_) => "add_job",
            Self::AddDatafeed(_) => "add_datafeed",
            Self::DeleteJob(_) => "delete_job",
            Self::OpenJob(_) => "open_job",
            Self::StartDatafeed { .. } => "start_datafeed",
            Self::LookbackProgress(_) => "get_lookback_progress",
            Self::TimeFieldRange(_) => "get_time_field_range",
            Self::AssignCalendar { .. } => "assign_new_job_id",
        }
    }
}

/// In-memory [`MlApi`] and [`CalendarService`] that records every call
///
/// Every operation succeeds unless told to fail with [`fail`](Self::fail).
/// Calendar failures can also target a single calendar with
/// [`fail_calendar`](Self::fail_calendar).
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<ApiCall>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    calendar_failures: Mutex<HashMap<String, ApiError>>,
    jobs: Mutex<Vec<JobConfig>>,
    datafeeds: Mutex<Vec<DatafeedConfig>>,
    progress: Mutex<VecDeque<Result<LookbackProgress, ApiError>>>,
    node: Mutex<Option<String>>,
    time_range: Mutex<TimeRange>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        let api = Self::default();
        *api.node.lock() = Some("node-1".to_string());
        *api.time_range.lock() = TimeRange {
            start: 1_600_000_000_000,
            end: 1_600_086_400_000,
        };
        Arc::new(api)
    }

    /// Make every call to `operation` fail with `error`
    pub fn fail(&self, operation: &'static str, error: ApiError) {
        self.failures.lock().insert(operation, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
        self.calendar_failures.lock().clear();
    }

    /// Make assigning a job to `calendar_id` fail
    pub fn fail_calendar(&self, calendar_id: &str, error: ApiError) {
        self.calendar_failures
            .lock()
            .insert(calendar_id.to_string(), error);
    }

    /// Queue progress responses; once drained the lookback reports finished
    pub fn push_progress(&self, progress: Result<LookbackProgress, ApiError>) {
        self.progress.lock().push_back(progress);
    }

    /// Node reported by `open_job`
    pub fn set_node(&self, node: Option<&str>) {
        *self.node.lock() = node.map(str::to_string);
    }

    pub fn set_time_range(&self, start: i64, end: i64) {
        *self.time_range.lock() = TimeRange { start, end };
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(ApiCall::operation).collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    pub fn submitted_jobs(&self) -> Vec<JobConfig> {
        self.jobs.lock().clone()
    }

    pub fn submitted_datafeeds(&self) -> Vec<DatafeedConfig> {
        self.datafeeds.lock().clone()
    }

    fn record(&self, call: ApiCall) -> Result<(), ApiError> {
        let operation = call.operation();
        self.calls.lock().push(call);
        match self.failures.lock().get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MlApi for RecordingApi {
    async fn add_job(&self, job_id: &str, job: &JobConfig) -> Result<(), ApiError> {
        self.record(ApiCall::AddJob(job_id.to_string()))?;
        self.jobs.lock().push(job.clone());
        Ok(())
    }

    async fn add_datafeed(&self, datafeed_id: &str, datafeed: &DatafeedConfig) -> Result<(), ApiError> {
        self.record(ApiCall::AddDatafeed(datafeed_id.to_string()))?;
        self.datafeeds.lock().push(datafeed.clone());
        Ok(())
    }

    async fn delete_job(&self, job_id: &str) -> Result<(), ApiError> {
        self.record(ApiCall::DeleteJob(job_id.to_string()))
    }

    async fn open_job(&self, job_id: &str) -> Result<OpenJobResponse, ApiError> {
        self.record(ApiCall::OpenJob(job_id.to_string()))?;
        Ok(OpenJobResponse {
            opened: true,
            node: self.node.lock().clone(),
        })
    }

    async fn start_datafeed(
        &self,
        datafeed_id: &str,
        job_id: &str,
        start: i64,
        end: i64,
    ) -> Result<StartDatafeedResponse, ApiError> {
        self.record(ApiCall::StartDatafeed {
            datafeed_id: datafeed_id.to_string(),
            job_id: job_id.to_string(),
            start,
            end,
        })?;
        Ok(StartDatafeedResponse { started: true })
    }

    async fn get_lookback_progress(
        &self,
        job_id: &str,
        _start: i64,
        _end: i64,
    ) -> Result<LookbackProgress, ApiError> {
        self.record(ApiCall::LookbackProgress(job_id.to_string()))?;
        self.progress.lock().pop_front().unwrap_or(Ok(LookbackProgress {
            progress: 100.0,
            is_running: false,
            is_job_closed: true,
        }))
    }

    async fn get_time_field_range(&self, request: &TimeFieldRangeRequest) -> Result<TimeRange, ApiError> {
        self.record(ApiCall::TimeFieldRange(request.clone()))?;
        Ok(*self.time_range.lock())
    }
}

#[async_trait]
impl CalendarService for RecordingApi {
    async fn assign_new_job_id(&self, calendar: &Calendar, job_id: &str) -> Result<(), ApiError> {
        self.record(ApiCall::AssignCalendar {
            calendar_id: calendar.calendar_id.clone(),
            job_id: job_id.to_string(),
        })?;
        match self.calendar_failures.lock().get(&calendar.calendar_id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub fn sample_fields() -> Vec<Field> {
    vec![
        Field::new("bytes", FieldType::Long),
        Field::new("response_time", FieldType::Double),
        Field::new("host", FieldType::Keyword),
        Field::new("status", FieldType::Keyword),
        Field::new("client_ip", FieldType::Ip),
        Field::new("message", FieldType::Text).not_aggregatable(),
        Field::new("@timestamp", FieldType::Date),
    ]
}

/// Web logs data source with two runtime fields
pub fn sample_data_source() -> DataSource {
    DataSource::new("web-logs-*")
        .with_id("web-logs")
        .with_name("Web logs")
        .with_time_field("@timestamp")
        .with_fields(sample_fields())
        .with_runtime_field(
            "hour_of_day",
            json!({"type": "long", "script": "emit(doc['@timestamp'].value.getHour())"}),
        )
        .with_runtime_field(
            "status_class",
            json!({"type": "keyword", "script": "emit(doc['status'].value.substring(0, 1))"}),
        )
}

/// Creator over [`sample_data_source`] with a fast poll interval
pub fn sample_creator(api: Arc<RecordingApi>) -> JobCreator {
    JobCreator::new(
        api.clone(),
        api,
        sample_data_source(),
        None,
        json!({"match_all": {}}),
        CreatorSettings::default().with_refresh_interval_ms(5),
    )
}

/// Sample creator with a job id, bucket span and one mean detector
pub fn configured_creator(api: Arc<RecordingApi>, job_id: &str) -> JobCreator {
    use mlj_catalog::{Aggregation, AggregationId};
    use mlj_config::Detector;

    let mut creator = sample_creator(api);
    creator.set_job_id(job_id);
    creator.set_bucket_span("15m");
    let field = creator
        .find_field("bytes")
        .unwrap_or_else(|| Field::new("bytes", FieldType::Long));
    creator.add_detector(
        Detector::new(AggregationId::Mean).with_field("bytes"),
        *Aggregation::lookup(AggregationId::Mean),
        field,
    );
    creator.add_influencer("host");
    creator
}
