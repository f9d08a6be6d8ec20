//! Error types for job creation
//!
//! Provides error handling for:
//! - Collaborator API failures
//! - Submission failures at each stage
//! - Illegal lifecycle transitions
//! - Settings and wizard plan loading

use mlj_catalog::CatalogError;
use mlj_config::ConfigError;

use crate::lifecycle::LifecycleState;

/// Error reported by a collaborator API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Request never got a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Request was rejected
    #[error("request rejected ({status}): {message}")]
    Validation {
        /// HTTP status
        status: u16,
        /// Server message
        message: String,
    },

    /// Referenced resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Rejected request with a status code
    #[inline]
    pub fn validation(status: u16, message: impl Into<String>) -> Self {
        Self::Validation {
            status,
            message: message.into(),
        }
    }

    /// Whether repeating the request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Transition not in the lifecycle table
    #[error("illegal transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: LifecycleState,
        /// Requested state
        to: LifecycleState,
    },

    /// No job definition was left behind by a failure
    #[error("no orphaned job to discard in state {0:?}")]
    NoOrphanedJob(LifecycleState),

    /// Only a failed lifecycle can be resumed
    #[error("nothing to resume in state {0:?}")]
    NotFailed(LifecycleState),
}

/// Main job creator error type
#[derive(Debug, thiserror::Error)]
pub enum CreatorError {
    /// Job definition was rejected
    #[error("job submission failed: {0}")]
    JobSubmission(#[source] ApiError),

    /// Datafeed definition was rejected
    #[error("datafeed submission failed: {0}")]
    DatafeedSubmission(#[source] ApiError),

    /// A calendar could not be extended with the new job
    #[error("calendar {calendar_id} update failed: {source}")]
    CalendarUpdate {
        /// Calendar that failed; later calendars were not attempted
        calendar_id: String,
        /// Underlying rejection
        #[source]
        source: ApiError,
    },

    /// Opening the job or starting the datafeed failed
    #[error("datafeed start failed: {0}")]
    DatafeedStart(#[source] ApiError),

    /// Time range discovery failed
    #[error("time range lookup failed: {0}")]
    TimeRange(#[source] ApiError),

    /// Explicit cleanup of an orphaned job failed
    #[error("job cleanup failed: {0}")]
    Cleanup(#[source] ApiError),

    /// Operation not allowed in the current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(#[from] LifecycleError),

    /// Config serialization failed
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl CreatorError {
    /// The collaborator error behind this failure, if any
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::JobSubmission(e)
            | Self::DatafeedSubmission(e)
            | Self::CalendarUpdate { source: e, .. }
            | Self::DatafeedStart(e)
            | Self::TimeRange(e)
            | Self::Cleanup(e) => Some(e),
            Self::InvalidState(_) | Self::Config(_) => None,
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_retryable)
    }

    /// Whether the failure came from submitting a definition
    #[inline]
    #[must_use]
    pub fn is_submission_failure(&self) -> bool {
        matches!(
            self,
            Self::JobSubmission(_) | Self::DatafeedSubmission(_) | Self::CalendarUpdate { .. }
        )
    }
}

/// Settings loading errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid TOML for [`CreatorSettings`](crate::CreatorSettings)
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Wizard plan errors
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Plan file could not be read
    #[error("failed to read plan: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed YAML plan
    #[error("invalid plan: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed JSON plan
    #[error("invalid plan: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown function id
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A metric function was given without a field
    #[error("detector {index} ({function}) needs a field")]
    MissingField {
        /// Detector position in the plan
        index: usize,
        /// Function id as written
        function: String,
    },
}
