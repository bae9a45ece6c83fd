//! One project's validation run
//!
//! A [`ValidationJob`] is built when the scheduler admits a project and lives
//! only in memory until its outcome has been recorded:
//!
//! ```text
//! Created --connect--> Connected --start--> Running --> Completed | Stopped | Failed
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{Cascade, CascadeStatus, JobEngine, PlanningFailure, SubJob, SubJobReport};
use crate::error::{JobError, JobResult};
use crate::model::{DataType, FileType};
use crate::report::{ErrorRecord, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    Created,
    Connected,
    Running,
    Completed,
    Stopped,
    Failed,
}

/// Result of collecting a finished job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
}

/// How out-of-band file-level errors for the same file combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileLevelErrorPolicy {
    /// Only the most recent error per file is kept
    #[default]
    Latest,
    Accumulate,
}

struct Timing {
    phase: JobPhase,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

pub struct ValidationJob {
    id: Uuid,
    release: String,
    project_key: String,
    dictionary_version: String,
    data_types: Vec<DataType>,
    policy: FileLevelErrorPolicy,
    included: Vec<(String, Vec<Arc<dyn SubJob>>)>,
    planned: Vec<Arc<dyn SubJob>>,
    file_level_errors: BTreeMap<String, (FileType, Vec<ErrorRecord>)>,
    cascade: Option<Arc<dyn Cascade>>,
    killed: AtomicBool,
    timing: Mutex<Timing>,
}

impl ValidationJob {
    pub fn new(
        release: impl Into<String>,
        project_key: impl Into<String>,
        dictionary_version: impl Into<String>,
        data_types: Vec<DataType>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            release: release.into(),
            project_key: project_key.into(),
            dictionary_version: dictionary_version.into(),
            data_types,
            policy: FileLevelErrorPolicy::default(),
            included: Vec::new(),
            planned: Vec::new(),
            file_level_errors: BTreeMap::new(),
            cascade: None,
            killed: AtomicBool::new(false),
            timing: Mutex::new(Timing {
                phase: JobPhase::Created,
                started_at: None,
                finished_at: None,
            }),
        }
    }

    pub fn with_policy(mut self, policy: FileLevelErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    pub fn dictionary_version(&self) -> &str {
        &self.dictionary_version
    }

    pub fn data_types(&self) -> &[DataType] {
        &self.data_types
    }

    pub fn phase(&self) -> JobPhase {
        self.timing().phase
    }

    /// Registers the sub-jobs for one file schema. Repeated calls accumulate.
    pub fn include(&mut self, schema_name: &str, sub_jobs: Vec<Arc<dyn SubJob>>) -> JobResult<()> {
        self.expect_phase(JobPhase::Created)?;
        match self
            .included
            .iter_mut()
            .find(|(name, _)| name == schema_name)
        {
            Some((_, existing)) => existing.extend(sub_jobs),
            None => self.included.push((schema_name.to_string(), sub_jobs)),
        }
        Ok(())
    }

    /// Records a file-level error that did not come from a sub-job.
    pub fn add_file_level_error(&mut self, file_type: FileType, error: ErrorRecord) {
        let policy = self.policy;
        let (_, errors) = self
            .file_level_errors
            .entry(error.file_name.clone())
            .or_insert_with(|| (file_type, Vec::new()));
        if policy == FileLevelErrorPolicy::Latest {
            errors.clear();
        }
        errors.push(error);
    }

    pub fn file_level_errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.file_level_errors
            .values()
            .flat_map(|(_, errors)| errors.iter())
    }

    /// Plans every included sub-job and wires the survivors into one cascade.
    ///
    /// A sub-job that fails to plan is dropped and its failure recorded as a
    /// file-level error, so the remaining files are still validated.
    pub async fn connect(&mut self, engine: &dyn JobEngine) -> JobResult<()> {
        self.expect_phase(JobPhase::Created)?;

        let mut planned = Vec::new();
        let mut failures = Vec::new();
        for (schema_name, sub_jobs) in &self.included {
            for sub_job in sub_jobs {
                match sub_job.plan() {
                    Ok(()) => planned.push(Arc::clone(sub_job)),
                    Err(failure) => {
                        warn!(
                            project_key = %self.project_key,
                            schema = %schema_name,
                            file = %sub_job.file_name(),
                            "Sub-job failed to plan, recording file-level error"
                        );
                        failures.push(failure);
                    }
                }
            }
        }
        for PlanningFailure { file_type, error } in failures {
            self.add_file_level_error(file_type, error);
        }

        let cascade = engine.connect(self.id, &self.project_key, &planned).await?;
        debug!(
            project_key = %self.project_key,
            sub_jobs = planned.len(),
            "Validation job connected"
        );
        self.planned = planned;
        self.cascade = Some(cascade);
        self.timing().phase = JobPhase::Connected;
        Ok(())
    }

    /// Resets the working area and launches the cascade without waiting for it.
    ///
    /// Returns only after `grace` has elapsed so that a cancel issued right
    /// after admission finds the engine's own bookkeeping in place.
    pub async fn start(&self, engine: &dyn JobEngine, grace: Duration) -> JobResult<()> {
        self.expect_phase(JobPhase::Connected)?;
        let cascade = self.cascade()?;

        engine
            .reset_working_area(&self.release, &self.project_key)
            .await?;
        cascade.start().await?;
        {
            let mut timing = self.timing();
            timing.phase = JobPhase::Running;
            timing.started_at = Some(Instant::now());
        }
        info!(
            project_key = %self.project_key,
            job_id = %self.id,
            "Validation job started"
        );

        if !grace.is_zero() {
            tokio::time::sleep(grace).await;
        }
        Ok(())
    }

    /// Asks the engine to halt and waits for the acknowledgement.
    pub async fn stop(&self) -> JobResult<()> {
        let cascade = self.cascade()?;
        cascade.stop().await?;
        self.finish(JobPhase::Stopped);
        Ok(())
    }

    /// Marks the job killed. Killing twice is a bookkeeping bug and fails.
    pub fn kill(&self) -> JobResult<()> {
        if self.killed.swap(true, Ordering::SeqCst) {
            return Err(JobError::AlreadyKilled {
                project_key: self.project_key.clone(),
            });
        }
        Ok(())
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> CascadeStatus {
        match &self.cascade {
            Some(cascade) => cascade.status(),
            None => CascadeStatus::Running,
        }
    }

    /// Waits for the cascade to reach a terminal status.
    pub async fn wait(&self) -> JobResult<CascadeStatus> {
        let cascade = self.cascade()?;
        let status = cascade.wait().await;
        let phase = match status {
            CascadeStatus::Completed => JobPhase::Completed,
            CascadeStatus::Stopped => JobPhase::Stopped,
            CascadeStatus::Failed | CascadeStatus::Running => JobPhase::Failed,
        };
        self.finish(phase);
        Ok(status)
    }

    /// Time spent running, up to now if the job has not finished.
    pub fn duration(&self) -> Option<Duration> {
        let timing = self.timing();
        let started_at = timing.started_at?;
        let finished_at = timing.finished_at.unwrap_or_else(Instant::now);
        Some(finished_at.saturating_duration_since(started_at))
    }

    /// Merges every sub-job's fragment and the file-level errors into `report`.
    ///
    /// Fragments sharing a schema name collapse into the first one, so each
    /// file gets a single entry. The outcome counts only errors that landed in
    /// the tree; records naming a file outside the report are dropped there.
    pub fn collect(&self, report: &mut Report) -> Outcome {
        let mut fragments: BTreeMap<String, SubJobReport> = BTreeMap::new();
        for sub_job in &self.planned {
            let fragment = sub_job.collect();
            match fragments.entry(fragment.schema_name.clone()) {
                Entry::Occupied(mut entry) => entry.get_mut().absorb(fragment),
                Entry::Vacant(entry) => {
                    entry.insert(fragment);
                }
            }
        }

        let errors_before = report.error_count();
        for fragment in fragments.into_values() {
            let file_name = fragment.file_name;
            report.add_file(fragment.file_type, &file_name);
            for summary in fragment.summaries {
                report.add_summary(&file_name, &summary.name, &summary.value);
            }
            for field_report in fragment.field_reports {
                report.add_field_report(&file_name, field_report);
            }
            for error in fragment.errors {
                report.add_error(error);
            }
        }

        for (file_name, (file_type, errors)) in &self.file_level_errors {
            report.add_file(*file_type, file_name);
            for error in errors {
                report.add_error(error.clone());
            }
        }

        if report.error_count() > errors_before {
            Outcome::Failed
        } else {
            Outcome::Passed
        }
    }

    fn cascade(&self) -> JobResult<&Arc<dyn Cascade>> {
        self.cascade.as_ref().ok_or_else(|| JobError::InvalidPhase {
            project_key: self.project_key.clone(),
            expected: JobPhase::Connected,
            actual: self.phase(),
        })
    }

    fn expect_phase(&self, expected: JobPhase) -> JobResult<()> {
        let actual = self.phase();
        if actual != expected {
            return Err(JobError::InvalidPhase {
                project_key: self.project_key.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn finish(&self, phase: JobPhase) {
        let mut timing = self.timing();
        if timing.finished_at.is_none() {
            timing.phase = phase;
            timing.finished_at = Some(Instant::now());
        }
    }

    fn timing(&self) -> MutexGuard<'_, Timing> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
