//! Polling validation scheduler
//!
//! One loop admits queued projects into a bounded number of slots and a
//! watcher task per running job records its outcome. The slot table lock is
//! held for the whole of every admission, completion and cancellation, which
//! is what keeps a project from being resolved twice. Admission holds it
//! through the engine's start grace period too, so completions and cancels
//! queue behind each admitted project for up to `start_grace_ms`.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::dictionary::{Classification, Dictionary};
use crate::engine::{CascadeStatus, JobEngine};
use crate::error::{Result, SchedulerError};
use crate::job::{Outcome, ValidationJob};
use crate::model::{DataType, FileType};
use crate::notify::{Notifier, send_processing_started, send_support_problem, send_validated};
use crate::release::{QueuedProject, Release};
use crate::report::{ErrorRecord, ErrorType, Report};
use crate::service::ReleaseService;
use crate::state::SubmissionState;
use crate::store::{ReleaseStore, SubmissionDirectory};

/// What one poll iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    AwaitingOpenRelease,
    MultipleOpenReleases { count: usize },
    /// Every slot is taken or nothing is queued
    Idle { active: usize },
    Admitted {
        started: Vec<String>,
        malformed: Vec<String>,
    },
    /// The iteration failed; the affected project, if any, was resolved to ERROR
    Failed {
        project_key: Option<String>,
        reason: String,
    },
}

enum Admission {
    Started,
    Malformed,
}

struct Slot {
    job: Arc<ValidationJob>,
    release: String,
    queued: QueuedProject,
    files: BTreeMap<String, FileType>,
    original: Report,
    watcher: Option<JoinHandle<()>>,
}

struct Inner {
    service: ReleaseService,
    engine: Arc<dyn JobEngine>,
    files: Arc<dyn SubmissionDirectory>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    slots: Mutex<HashMap<String, Slot>>,
}

#[derive(Clone)]
pub struct ValidationScheduler {
    inner: Arc<Inner>,
}

impl ValidationScheduler {
    pub fn new(
        store: Arc<dyn ReleaseStore>,
        engine: Arc<dyn JobEngine>,
        files: Arc<dyn SubmissionDirectory>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        let service = ReleaseService::new(store, config.store_retry_attempts);
        Self {
            inner: Arc::new(Inner {
                service,
                engine,
                files,
                notifier,
                config,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Operator-facing release operations
    pub fn service(&self) -> &ReleaseService {
        &self.inner.service
    }

    /// Projects currently holding a slot
    pub async fn active_projects(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.slots.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Polls until `shutdown` fires, then cancels every running job.
    ///
    /// Only a second open release stops the loop early, and only when
    /// configured to.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut interval = tokio::time::interval(self.inner.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            max_concurrent = self.inner.config.max_concurrent_validations,
            poll_interval_ms = self.inner.config.poll_interval_ms,
            "Validation scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let PollOutcome::MultipleOpenReleases { count } = self.poll_once().await
                        && self.inner.config.fail_on_multiple_open_releases
                    {
                        self.shutdown().await;
                        return Err(SchedulerError::MultipleOpenReleases { count });
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Validation scheduler shutting down");
                    self.shutdown().await;
                    return Ok(());
                }
            }
        }
    }

    /// Runs one admission pass. Never fails and never panics to the caller.
    pub async fn poll_once(&self) -> PollOutcome {
        match AssertUnwindSafe(self.try_poll()).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(error = %e, "Scheduler poll failed");
                send_support_problem(
                    self.inner.notifier.as_ref(),
                    "Validation scheduler poll failed",
                    &e.to_string(),
                );
                PollOutcome::Failed {
                    project_key: None,
                    reason: e.to_string(),
                }
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(reason = %reason, "Scheduler poll panicked");
                send_support_problem(
                    self.inner.notifier.as_ref(),
                    "Validation scheduler poll panicked",
                    &reason,
                );
                PollOutcome::Failed {
                    project_key: None,
                    reason,
                }
            }
        }
    }

    /// Stops a running validation or withdraws a queued one.
    ///
    /// Unknown or idle projects are left alone.
    pub async fn cancel(&self, project_key: &str) -> Result<()> {
        let mut slots = self.inner.slots.lock().await;

        if let Some(mut slot) = slots.remove(project_key) {
            slot.job.kill()?;
            if let Err(e) = slot.job.stop().await {
                warn!(project_key, error = %e, "Job engine failed to acknowledge stop");
            }
            if let Some(watcher) = slot.watcher.take() {
                watcher.abort();
            }
            if let Err(e) = self
                .inner
                .service
                .cancel_validation(&slot.release, project_key)
                .await
            {
                // the job is gone, so the submission must not stay in flight
                self.fail_project(&slot.release, project_key, slot.job.data_types(), &e)
                    .await;
                return Err(e);
            }
            info!(
                project_key,
                duration_ms = slot.job.duration().map(|d| d.as_millis() as u64),
                "Running validation cancelled"
            );
            return Ok(());
        }

        let release = match self.inner.service.open_release().await {
            Ok(release) => release,
            Err(SchedulerError::NoOpenRelease) => return Ok(()),
            Err(e) => return Err(e),
        };
        if release.is_queued(project_key) {
            self.inner
                .service
                .delete_queued_request(&release.name, project_key)
                .await?;
        } else {
            debug!(project_key, "Nothing to cancel");
        }
        Ok(())
    }

    /// Cancels every running job.
    pub async fn shutdown(&self) {
        let keys = self.active_projects().await;
        for key in keys {
            if let Err(e) = self.cancel(&key).await {
                error!(project_key = %key, error = %e, "Failed to cancel validation on shutdown");
            }
        }
    }

    async fn try_poll(&self) -> Result<PollOutcome> {
        let release = match self.inner.service.open_release().await {
            Ok(release) => release,
            Err(SchedulerError::NoOpenRelease) => {
                debug!("Waiting for an open release");
                return Ok(PollOutcome::AwaitingOpenRelease);
            }
            Err(SchedulerError::MultipleOpenReleases { count }) => {
                error!(count, "More than one open release");
                return Ok(PollOutcome::MultipleOpenReleases { count });
            }
            Err(e) => return Err(e),
        };

        let mut slots = self.inner.slots.lock().await;
        let mut started = Vec::new();
        let mut malformed = Vec::new();

        while slots.len() < self.inner.config.max_concurrent_validations {
            let Some(queued) = self.inner.service.next_queued_project(&release.name).await? else {
                break;
            };
            let project_key = queued.key.clone();

            match self.admit(&mut slots, &release, &queued).await {
                Ok(Admission::Started) => started.push(project_key),
                Ok(Admission::Malformed) => malformed.push(project_key),
                Err(e) => {
                    self.fail_project(&release.name, &project_key, &queued.selected_data_types(), &e)
                        .await;
                    return Ok(PollOutcome::Failed {
                        project_key: Some(project_key),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if started.is_empty() && malformed.is_empty() {
            Ok(PollOutcome::Idle {
                active: slots.len(),
            })
        } else {
            Ok(PollOutcome::Admitted { started, malformed })
        }
    }

    async fn admit(
        &self,
        slots: &mut HashMap<String, Slot>,
        release: &Release,
        queued: &QueuedProject,
    ) -> Result<Admission> {
        let inner = &self.inner;
        let project_key = queued.key.as_str();

        let file_names = inner.files.list_files(&release.name, project_key).await?;
        let dictionary = inner
            .service
            .store()
            .dictionary(&release.dictionary_version)
            .await?;
        let classification = dictionary.classify(&file_names)?;

        let (queued, original) = inner
            .service
            .dequeue_to_validating(&release.name, project_key, &classification.files)
            .await?;

        if classification.is_malformed() {
            self.reject_malformed(release, &queued, &dictionary, &classification)
                .await?;
            return Ok(Admission::Malformed);
        }

        let selected = queued.selected_data_types();
        let mut job = ValidationJob::new(
            &release.name,
            project_key,
            &dictionary.version,
            selected.clone(),
        )
        .with_policy(inner.config.file_level_error_policy);

        for schema in &dictionary.schemas {
            if !selected.contains(&schema.file_type.data_type()) {
                continue;
            }
            if let Some(files) = classification.conflicts.get(&schema.name) {
                for file_name in files {
                    job.add_file_level_error(
                        schema.file_type,
                        ErrorRecord::new(ErrorType::TooManyFilesError, file_name)
                            .with_params(vec![json!(schema.name), json!(files)]),
                    );
                }
                continue;
            }
            for file_name in classification.matched.get(&schema.name).into_iter().flatten() {
                let sub_jobs = inner.engine.sub_jobs(project_key, schema, file_name);
                job.include(&schema.name, sub_jobs)?;
            }
        }

        job.connect(inner.engine.as_ref()).await?;
        send_processing_started(inner.notifier.as_ref(), project_key, &queued.emails);

        let job = Arc::new(job);
        job.start(inner.engine.as_ref(), inner.config.start_grace())
            .await?;
        let watcher = self.spawn_watcher(Arc::clone(&job));

        slots.insert(
            project_key.to_string(),
            Slot {
                job,
                release: release.name.clone(),
                queued,
                files: classification.files,
                original,
                watcher: Some(watcher),
            },
        );
        info!(release = %release.name, project_key, "Validation admitted");
        Ok(Admission::Started)
    }

    /// Resolves a submission missing required files straight to INVALID.
    async fn reject_malformed(
        &self,
        release: &Release,
        queued: &QueuedProject,
        dictionary: &Dictionary,
        classification: &Classification,
    ) -> Result<()> {
        let mut report = Report::new();
        for schema_name in &classification.missing {
            let schema = dictionary.schema(schema_name)?;
            let file_name = schema.placeholder_file_name();
            report.add_file(schema.file_type, &file_name);
            report.add_error(
                ErrorRecord::new(ErrorType::RelationFileError, &file_name)
                    .with_params(vec![json!(schema.name)]),
            );
        }
        report.inherit_state(SubmissionState::Validating, &DataType::ALL);
        report.refresh_state();

        warn!(
            release = %release.name,
            project_key = %queued.key,
            missing = ?classification.missing,
            "Submission is missing required files"
        );
        self.inner
            .service
            .resolve(
                &release.name,
                &queued.key,
                SubmissionState::Invalid,
                Some(report),
            )
            .await?;
        send_validated(
            self.inner.notifier.as_ref(),
            &release.name,
            &queued.key,
            SubmissionState::Invalid,
            &queued.emails,
        );
        Ok(())
    }

    fn spawn_watcher(&self, job: Arc<ValidationJob>) -> JoinHandle<()> {
        let scheduler = self.clone();
        let timeout = self.inner.config.job_timeout();

        tokio::spawn(async move {
            let waited = match timeout {
                Some(limit) => match tokio::time::timeout(limit, job.wait()).await {
                    Ok(waited) => waited,
                    Err(_) => {
                        warn!(
                            project_key = %job.project_key(),
                            timeout_secs = limit.as_secs(),
                            "Validation job timed out, stopping it"
                        );
                        if let Err(e) = job.stop().await {
                            error!(project_key = %job.project_key(), error = %e, "Failed to stop timed out job");
                        }
                        Ok(CascadeStatus::Failed)
                    }
                },
                None => job.wait().await,
            };

            let status = waited.unwrap_or_else(|e| {
                error!(project_key = %job.project_key(), error = %e, "Lost track of validation job");
                CascadeStatus::Failed
            });
            scheduler.complete(job.project_key(), job.id(), status).await;
        })
    }

    /// Records a finished job's outcome if it still owns its slot.
    async fn complete(&self, project_key: &str, job_id: Uuid, status: CascadeStatus) {
        let mut slots = self.inner.slots.lock().await;
        if !slots
            .get(project_key)
            .is_some_and(|slot| slot.job.id() == job_id)
        {
            debug!(project_key, %job_id, "Job finished after its slot was released");
            return;
        }
        let Some(slot) = slots.remove(project_key) else {
            return;
        };

        if let Err(e) = self.record_outcome(&slot, status).await {
            self.fail_project(&slot.release, project_key, slot.job.data_types(), &e)
                .await;
        }
    }

    async fn record_outcome(&self, slot: &Slot, status: CascadeStatus) -> Result<()> {
        let job = &slot.job;
        let selected = job.data_types();

        let mut report = Report::from_files(&slot.files);
        report.inherit_state(SubmissionState::Validating, selected);
        let outcome = job.collect(&mut report);

        let state = if status == CascadeStatus::Completed {
            report.refresh_state();
            match outcome {
                Outcome::Passed => SubmissionState::Valid,
                Outcome::Failed => SubmissionState::Invalid,
            }
        } else {
            warn!(
                project_key = %job.project_key(),
                ?status,
                "Validation job terminated without being cancelled"
            );
            report.inherit_state(SubmissionState::Error, selected);
            SubmissionState::Error
        };
        report.merge_report(&slot.original, selected);

        self.inner
            .service
            .resolve(&slot.release, job.project_key(), state, Some(report))
            .await?;
        info!(
            release = %slot.release,
            project_key = %job.project_key(),
            %state,
            duration_ms = job.duration().map(|d| d.as_millis() as u64),
            "Validation finished"
        );
        send_validated(
            self.inner.notifier.as_ref(),
            &slot.release,
            job.project_key(),
            state,
            &slot.queued.emails,
        );
        Ok(())
    }

    /// Resolves a project and its `selected` report nodes to ERROR after an
    /// unexpected failure.
    async fn fail_project(
        &self,
        release: &str,
        project_key: &str,
        selected: &[DataType],
        cause: &SchedulerError,
    ) {
        error!(release, project_key, error = %cause, "Validation failed unexpectedly");
        send_support_problem(
            self.inner.notifier.as_ref(),
            &format!("Validation of project '{}' failed", project_key),
            &cause.to_string(),
        );
        if let Err(e) = self
            .inner
            .service
            .fail_submission(release, project_key, selected)
            .await
        {
            error!(release, project_key, error = %e, "Failed to resolve project to ERROR");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
