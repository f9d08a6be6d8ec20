//! MLJ Creator - anomaly detection job creator
//!
//! Builds a job and its datafeed step by step, then submits them:
//! - Keeps detectors, their functions and their fields aligned
//! - Applies sparse-data function substitution
//! - Filters runtime mappings down to the ones the job uses
//! - Tracks the submission lifecycle, including partial failures
//! - Starts the datafeed and reports lookback progress
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mlj_catalog::{Aggregation, AggregationId, Field, FieldType};
//! use mlj_config::Detector;
//! use mlj_creator::{CreatorSettings, DataSource, JobCreator};
//!
//! # async fn example(api: Arc<dyn mlj_creator::MlApi>, calendars: Arc<dyn mlj_creator::CalendarService>)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let source = DataSource::new("web-logs-*").with_time_field("@timestamp");
//! let mut creator = JobCreator::new(api, calendars, source, None, serde_json::json!({"match_all": {}}), CreatorSettings::default());
//!
//! creator.set_job_id("web-bytes");
//! creator.set_bucket_span("15m");
//! creator.add_detector(
//!     Detector::new(AggregationId::Mean).with_field("bytes"),
//!     *Aggregation::lookup(AggregationId::Mean),
//!     Field::new("bytes", FieldType::Long),
//! );
//!
//! let mut runner = creator.create_and_start_job().await?;
//! runner.wait().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod api;
pub mod creator;
pub mod detectors;
pub mod error;
pub mod lifecycle;
pub mod plan;
pub mod runner;
pub mod settings;
pub mod types;

pub use api::{
    CalendarService, LookbackProgress, MlApi, OfflineApi, OpenJobResponse, StartDatafeedResponse,
    TimeFieldRangeRequest, TimeRange,
};
pub use creator::JobCreator;
pub use detectors::{DetectorEntry, DetectorSet};
pub use error::{ApiError, CreatorError, LifecycleError, PlanError, SettingsError};
pub use lifecycle::{allowed_transitions, validate_transition, JobLifecycle, LifecycleState, SubmissionStage};
pub use plan::{PlanDataSource, PlanDetector, PlanField, WizardPlan};
pub use runner::{DatafeedState, JobRunner, PROGRESS_COMPLETE, PROGRESS_ERROR, PROGRESS_NOT_STARTED};
pub use settings::CreatorSettings;
pub use types::{Calendar, DataSource, JobType, ProgressSubscriber, SavedSearch, SavedSearchQuery, StopHandle};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building jobs
    pub use crate::{
        CalendarService, CreatorError, CreatorSettings, DataSource, JobCreator, JobLifecycle,
        JobRunner, JobType, MlApi,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
