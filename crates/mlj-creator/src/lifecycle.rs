//! Submission lifecycle
//!
//! A job creator moves through `Draft -> JobCreated -> DatafeedCreated ->
//! Started`. Any submission step may fail instead; the failure records which
//! step failed and whether a job definition already exists on the engine.
//!
//! Failures are never rolled back automatically. A caller that wants the
//! orphaned job removed asks for it explicitly.

use serde::Serialize;

use crate::error::LifecycleError;

/// Submission step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    /// Submitting the job definition
    CreateJob,
    /// Adding the job to its calendars
    UpdateCalendars,
    /// Submitting the datafeed definition
    CreateDatafeed,
    /// Opening the job and starting the datafeed
    StartDatafeed,
}

/// Lifecycle state without payload, used for the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// See [`JobLifecycle::Draft`]
    Draft,
    /// See [`JobLifecycle::JobCreated`]
    JobCreated,
    /// See [`JobLifecycle::DatafeedCreated`]
    DatafeedCreated,
    /// See [`JobLifecycle::Started`]
    Started,
    /// See [`JobLifecycle::Failed`]
    Failed,
}

/// Lifecycle of a job creator
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobLifecycle {
    /// Being configured, nothing submitted
    #[default]
    Draft,
    /// Job definition accepted
    JobCreated,
    /// Datafeed definition accepted
    DatafeedCreated,
    /// Datafeed running
    Started,
    /// A submission step failed
    Failed {
        /// Step that failed
        stage: SubmissionStage,
        /// Error message of the failure
        reason: String,
        /// Whether a job definition exists on the cluster
        job_created: bool,
    },
}

impl JobLifecycle {
    /// Payload-free state
    #[inline]
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        match self {
            Self::Draft => LifecycleState::Draft,
            Self::JobCreated => LifecycleState::JobCreated,
            Self::DatafeedCreated => LifecycleState::DatafeedCreated,
            Self::Started => LifecycleState::Started,
            Self::Failed { .. } => LifecycleState::Failed,
        }
    }

    /// Whether a failure left a job definition on the engine
    #[inline]
    #[must_use]
    pub fn orphaned_job(&self) -> bool {
        matches!(self, Self::Failed { job_created: true, .. })
    }

    /// The state a failed lifecycle can resume from
    ///
    /// `None` unless failed.
    #[must_use]
    pub fn resume_state(&self) -> Option<JobLifecycle> {
        let Self::Failed { stage, .. } = self else {
            return None;
        };
        Some(match stage {
            SubmissionStage::CreateJob => Self::Draft,
            SubmissionStage::UpdateCalendars | SubmissionStage::CreateDatafeed => Self::JobCreated,
            SubmissionStage::StartDatafeed => Self::DatafeedCreated,
        })
    }

    /// Check that moving to `to` is allowed
    ///
    /// # Errors
    /// `LifecycleError::IllegalTransition` when the table forbids it
    #[inline]
    pub fn check(&self, to: LifecycleState) -> Result<(), LifecycleError> {
        validate_transition(self.state(), to)
    }

    /// Move to `next`, if allowed
    ///
    /// # Errors
    /// `LifecycleError::IllegalTransition` when the table forbids it
    pub fn transition(&mut self, next: JobLifecycle) -> Result<(), LifecycleError> {
        self.check(next.state())?;
        tracing::debug!("lifecycle {:?} -> {:?}", self.state(), next.state());
        *self = next;
        Ok(())
    }
}

/// Validates a state transition.
///
/// # Errors
/// `LifecycleError::IllegalTransition` when `to` is not reachable from `from`
pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(LifecycleError::IllegalTransition { from, to })
    }
}

/// States reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: LifecycleState) -> Vec<LifecycleState> {
    use LifecycleState::{DatafeedCreated, Draft, Failed, JobCreated, Started};
    match from {
        Draft => vec![JobCreated, Failed],
        JobCreated => vec![DatafeedCreated, Failed],
        DatafeedCreated => vec![Started, Failed],
        Started => vec![],
        Failed => vec![Draft, JobCreated, DatafeedCreated],
    }
}
