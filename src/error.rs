use thiserror::Error;

use crate::job::JobPhase;
use crate::release::ReleaseState;
use crate::report::ErrorType;
use crate::state::SubmissionState;

/// Top-level error for the scheduling subsystem
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("No open release")]
    NoOpenRelease,

    #[error("Expected exactly one open release, found {count}")]
    MultipleOpenReleases { count: usize },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Validation job error: {0}")]
    Job(#[from] JobError),

    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

/// Operator or scheduler attempted a transition the current state does not allow.
///
/// Every variant maps to a stable code through [`StateError::code`] so an
/// outer layer can pick a response status without matching on messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Cannot {action} project '{project_key}' in state {state}")]
    InvalidState {
        project_key: String,
        state: SubmissionState,
        action: &'static str,
    },

    #[error("Release '{release}' is {state}, transitions require an open release")]
    ReleaseNotOpen { release: String, state: ReleaseState },

    #[error("Release '{release}' has no submission for project '{project_key}'")]
    SubmissionNotFound { release: String, project_key: String },

    #[error("Project '{project_key}' is already queued")]
    AlreadyQueued { project_key: String },

    #[error("Release '{release}' still has {pending} queued or validating project(s)")]
    ReleaseBusy { release: String, pending: usize },
}

impl StateError {
    /// Machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            StateError::InvalidState { .. } => "INVALID_STATE",
            StateError::ReleaseNotOpen { .. } => "RELEASE_NOT_OPEN",
            StateError::SubmissionNotFound { .. } => "SUBMISSION_NOT_FOUND",
            StateError::AlreadyQueued { .. } => "ALREADY_QUEUED",
            StateError::ReleaseBusy { .. } => "RELEASE_BUSY",
        }
    }

    /// Submission state that caused the rejection, when there is one
    pub fn offending_state(&self) -> Option<SubmissionState> {
        match self {
            StateError::InvalidState { state, .. } => Some(*state),
            _ => None,
        }
    }
}

/// Durable store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Release not found: {name}")]
    ReleaseNotFound { name: String },

    #[error("Dictionary not found: {version}")]
    DictionaryNotFound { version: String },

    #[error("Optimistic lock conflict on release '{release}': expected version {expected}, found {actual}")]
    Conflict {
        release: String,
        expected: u64,
        actual: u64,
    },

    #[error("Store unavailable: {details}")]
    Unavailable { details: String },

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// External job engine failures
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to connect job for '{project_key}': {details}")]
    Connect {
        project_key: String,
        details: String,
    },

    #[error("Failed to start job for '{project_key}': {details}")]
    Start {
        project_key: String,
        details: String,
    },

    #[error("Failed to stop job for '{project_key}': {details}")]
    Stop {
        project_key: String,
        details: String,
    },

    #[error("Job engine unavailable: {details}")]
    Unavailable { details: String },
}

/// Validation job lifecycle violations
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Validation job for '{project_key}' was already killed")]
    AlreadyKilled { project_key: String },

    #[error("Validation job for '{project_key}' is {actual:?}, expected {expected:?}")]
    InvalidPhase {
        project_key: String,
        expected: JobPhase,
        actual: JobPhase,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Report construction failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("{error_type:?} expects {expected} parameter(s), {actual} supplied")]
    ParameterCount {
        error_type: ErrorType,
        expected: usize,
        actual: usize,
    },
}

/// Dictionary lookup and pattern failures
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Invalid file pattern for schema '{schema}': {source}")]
    InvalidPattern {
        schema: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown schema: {name}")]
    UnknownSchema { name: String },

    #[error("Dictionary IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dictionary parsing error: {0}")]
    Parsing(#[from] serde_json::Error),
}

/// Notification delivery failures; logged by callers, never propagated
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification delivery failed: {details}")]
    Delivery { details: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SchedulerError>;

pub type StateResult<T> = std::result::Result<T, StateError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

pub type JobResult<T> = std::result::Result<T, JobError>;

pub type DictionaryResult<T> = std::result::Result<T, DictionaryError>;
