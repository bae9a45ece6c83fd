//! Boundary to the external batch job engine.
//!
//! The engine runs the field-level checks; this crate only plans, starts,
//! stops and observes the work it is handed. A [`SubJob`] covers one file
//! schema, a [`Cascade`] is the connected unit of every sub-job in one run.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dictionary::FileSchema;
use crate::error::EngineResult;
use crate::model::FileType;
use crate::report::{ErrorRecord, FieldReport, SummaryReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CascadeStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl CascadeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CascadeStatus::Running)
    }
}

/// A sub-job that could not be planned, reported as a file-level error
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningFailure {
    pub file_type: FileType,
    pub error: ErrorRecord,
}

/// Output of one sub-job once its cascade has finished
#[derive(Debug, Clone, PartialEq)]
pub struct SubJobReport {
    pub schema_name: String,
    pub file_name: String,
    pub file_type: FileType,
    pub summaries: Vec<SummaryReport>,
    pub field_reports: Vec<FieldReport>,
    pub errors: Vec<ErrorRecord>,
}

impl SubJobReport {
    pub fn new(schema_name: &str, file_name: &str, file_type: FileType) -> Self {
        Self {
            schema_name: schema_name.to_string(),
            file_name: file_name.to_string(),
            file_type,
            summaries: Vec::new(),
            field_reports: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Absorbs another fragment for the same schema.
    pub fn absorb(&mut self, other: SubJobReport) {
        self.summaries.extend(other.summaries);
        self.field_reports.extend(other.field_reports);
        self.errors.extend(other.errors);
    }
}

/// One unit of per-file-schema work inside a validation run
pub trait SubJob: Send + Sync {
    fn schema_name(&self) -> &str;

    fn file_name(&self) -> &str;

    /// Checks the sub-job can run, e.g. that a referenced file exists.
    fn plan(&self) -> Result<(), PlanningFailure>;

    /// Report fragment gathered after the cascade finished
    fn collect(&self) -> SubJobReport;
}

/// Connected unit of work for one validation run
#[async_trait]
pub trait Cascade: Send + Sync {
    /// Launches the work and returns without waiting for it.
    async fn start(&self) -> EngineResult<()>;

    /// Requests a halt and waits until the engine acknowledges it.
    async fn stop(&self) -> EngineResult<()>;

    fn status(&self) -> CascadeStatus;

    /// Resolves once the cascade reaches a terminal status.
    async fn wait(&self) -> CascadeStatus;
}

#[async_trait]
pub trait JobEngine: Send + Sync {
    /// Sub-jobs validating `file_name` against `schema`
    fn sub_jobs(&self, project_key: &str, schema: &FileSchema, file_name: &str)
    -> Vec<Arc<dyn SubJob>>;

    /// Clears the project's working area before a run.
    async fn reset_working_area(&self, release: &str, project_key: &str) -> EngineResult<()>;

    async fn connect(
        &self,
        job_id: Uuid,
        project_key: &str,
        sub_jobs: &[Arc<dyn SubJob>],
    ) -> EngineResult<Arc<dyn Cascade>>;
}
