//! # submission-validator Library
//!
//! Schedules validation of queued project submissions against the open
//! release, drives each run through the submission state machine and folds
//! the results into a hierarchical report tree.

pub mod cli;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod job;
pub mod logging;
pub mod model;
pub mod notify;
pub mod output;
pub mod release;
pub mod report;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod store;

pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigManager, SchedulerConfig};
pub use dictionary::{Classification, Dictionary, FileSchema};
pub use engine::{Cascade, CascadeStatus, JobEngine, PlanningFailure, SubJob, SubJobReport};
pub use error::{SchedulerError, StateError, StoreError};
pub use job::{FileLevelErrorPolicy, JobPhase, Outcome, ValidationJob};
pub use logging::{LogConfig, LogFormat, init_logging};
pub use model::{DataType, FileType};
pub use notify::{Notifier, TracingNotifier};
pub use output::Output;
pub use release::{QueuedProject, Release, ReleaseState, Submission};
pub use report::{ErrorRecord, ErrorType, Report, ReportState};
pub use scheduler::{PollOutcome, ValidationScheduler};
pub use service::ReleaseService;
pub use state::{SubmissionState, Transition};
pub use store::{
    FileSystemSubmissionDirectory, InMemoryReleaseStore, InMemorySubmissionDirectory,
    ReleaseStore, SubmissionDirectory,
};
