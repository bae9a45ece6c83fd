//! Release and submission operations over a [`ReleaseStore`]
//!
//! Every mutation reads the release, applies a closure and saves it back. A
//! save rejected for a stale version is retried against a fresh read, so the
//! closure must be safe to run more than once.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Result, SchedulerError, StateError};
use crate::model::{DataType, FileType};
use crate::release::{QueuedProject, Release};
use crate::report::{FileReport, Report};
use crate::state::{SubmissionState, Transition};
use crate::store::ReleaseStore;

pub struct ReleaseService {
    store: Arc<dyn ReleaseStore>,
    retry_attempts: u32,
}

impl ReleaseService {
    pub fn new(store: Arc<dyn ReleaseStore>, retry_attempts: u32) -> Self {
        Self {
            store,
            retry_attempts,
        }
    }

    pub fn store(&self) -> &Arc<dyn ReleaseStore> {
        &self.store
    }

    pub async fn count_open_releases(&self) -> Result<usize> {
        Ok(self.store.open_releases().await?.len())
    }

    /// The single open release.
    pub async fn open_release(&self) -> Result<Release> {
        let mut open = self.store.open_releases().await?;
        match open.len() {
            0 => Err(SchedulerError::NoOpenRelease),
            1 => Ok(open.remove(0)),
            count => Err(SchedulerError::MultipleOpenReleases { count }),
        }
    }

    pub async fn add_submission(
        &self,
        release_name: &str,
        project_key: &str,
        project_name: &str,
    ) -> Result<()> {
        self.update(release_name, |release| {
            release.add_submission(project_key, project_name);
            Ok(())
        })
        .await
    }

    /// Queues every project or none of them.
    pub async fn enqueue(&self, release_name: &str, projects: &[QueuedProject]) -> Result<()> {
        self.update(release_name, |release| {
            for project in projects {
                release.transition(&project.key, Transition::Queue)?;
                release.enqueue(project.clone())?;
                release
                    .submission_mut(&project.key)?
                    .report
                    .inherit_state(SubmissionState::Queued, &project.selected_data_types());
            }
            Ok(())
        })
        .await?;

        for project in projects {
            info!(release = release_name, project_key = %project.key, "Project queued");
        }
        Ok(())
    }

    pub async fn next_queued_project(&self, release_name: &str) -> Result<Option<QueuedProject>> {
        let release = self.store.release(release_name).await?;
        Ok(release.next_in_queue().cloned())
    }

    /// Moves a queued project into VALIDATING and prepares its report.
    ///
    /// The report is synchronized with `files`, the selected data types are
    /// reset and marked validating. Returns the dequeued request together
    /// with the report as it stood before the reset.
    pub async fn dequeue_to_validating(
        &self,
        release_name: &str,
        project_key: &str,
        files: &BTreeMap<String, FileType>,
    ) -> Result<(QueuedProject, Report)> {
        self.update(release_name, |release| {
            let state = release.submission_state(project_key).unwrap_or_default();
            let queued = release
                .dequeue(project_key)
                .ok_or_else(|| StateError::InvalidState {
                    project_key: project_key.to_string(),
                    state,
                    action: Transition::Start.action(),
                })?;
            release.transition(project_key, Transition::Start)?;

            let selected = queued.selected_data_types();
            let report = &mut release.submission_mut(project_key)?.report;
            report.refresh_files(files);
            let original = report.clone();
            report.reset_data_types(&selected);
            report.inherit_state(SubmissionState::Validating, &selected);
            Ok((queued, original))
        })
        .await
    }

    /// Records the outcome of a run, replacing the report when one is given.
    pub async fn resolve(
        &self,
        release_name: &str,
        project_key: &str,
        state: SubmissionState,
        report: Option<Report>,
    ) -> Result<()> {
        let transition =
            Transition::resolving_to(state).ok_or_else(|| SchedulerError::Concurrency {
                details: format!("{} is not a validation outcome", state),
            })?;

        self.update(release_name, |release| {
            release.transition(project_key, transition)?;
            release.dequeue(project_key);
            if let Some(report) = &report {
                release.submission_mut(project_key)?.report = report.clone();
            }
            Ok(())
        })
        .await?;

        info!(release = release_name, project_key, %state, "Submission resolved");
        Ok(())
    }

    /// Resolves an in-flight submission to ERROR after an infrastructure failure.
    ///
    /// The selected data types of the stored report are marked ERROR in the
    /// same update so the tree never outlives the run as validating.
    pub async fn fail_submission(
        &self,
        release_name: &str,
        project_key: &str,
        selected: &[DataType],
    ) -> Result<()> {
        self.update(release_name, |release| {
            release.transition(project_key, Transition::Fail)?;
            release.dequeue(project_key);
            release
                .submission_mut(project_key)?
                .report
                .inherit_state(SubmissionState::Error, selected);
            Ok(())
        })
        .await?;

        warn!(release = release_name, project_key, "Submission resolved to ERROR");
        Ok(())
    }

    pub async fn update_submission_report(
        &self,
        release_name: &str,
        project_key: &str,
        report: Report,
    ) -> Result<()> {
        self.update(release_name, |release| {
            release.submission_mut(project_key)?.report = report.clone();
            Ok(())
        })
        .await
    }

    /// Withdraws a request that never started.
    pub async fn delete_queued_request(&self, release_name: &str, project_key: &str) -> Result<()> {
        self.cancel_submission(release_name, project_key).await?;
        info!(release = release_name, project_key, "Queued request removed");
        Ok(())
    }

    /// Returns a cancelled run's submission to NOT_VALIDATED.
    pub async fn cancel_validation(&self, release_name: &str, project_key: &str) -> Result<()> {
        self.cancel_submission(release_name, project_key).await?;
        info!(release = release_name, project_key, "Validation cancelled");
        Ok(())
    }

    pub async fn reset_state(&self, release_name: &str, project_key: &str) -> Result<()> {
        self.update(release_name, |release| {
            release.transition(project_key, Transition::Reset)?;
            release.submission_mut(project_key)?.report.reset_all();
            Ok(())
        })
        .await
    }

    pub async fn sign_off(&self, release_name: &str, project_key: &str) -> Result<()> {
        self.update(release_name, |release| {
            release.transition(project_key, Transition::SignOff)?;
            Ok(())
        })
        .await
    }

    pub async fn report(&self, release_name: &str, project_key: &str) -> Result<Report> {
        let release = self.store.release(release_name).await?;
        let submission =
            release
                .submission(project_key)
                .ok_or_else(|| StateError::SubmissionNotFound {
                    release: release_name.to_string(),
                    project_key: project_key.to_string(),
                })?;
        Ok(submission.report.clone())
    }

    pub async fn file_report(
        &self,
        release_name: &str,
        project_key: &str,
        file_name: &str,
    ) -> Result<Option<FileReport>> {
        Ok(self
            .report(release_name, project_key)
            .await?
            .file_report(file_name))
    }

    /// Completes `release_name` and opens `next_name` in its place.
    ///
    /// Refused while any project is queued or validating. Every project is
    /// carried into the new release as NOT_VALIDATED with its last report.
    pub async fn perform_release(
        &self,
        release_name: &str,
        next_name: &str,
        dictionary_version: &str,
    ) -> Result<Release> {
        let mut carried = Vec::new();
        self.update(release_name, |release| {
            if !release.is_open() {
                return Err(StateError::ReleaseNotOpen {
                    release: release.name.clone(),
                    state: release.state,
                }
                .into());
            }
            let pending = release.pending_count();
            if pending > 0 {
                return Err(StateError::ReleaseBusy {
                    release: release.name.clone(),
                    pending,
                }
                .into());
            }
            carried = release.submissions.clone();
            release.complete();
            Ok(())
        })
        .await?;

        let mut next = Release::new(next_name, dictionary_version);
        for submission in carried {
            next.add_submission(&submission.project_key, &submission.project_name);
            next.submission_mut(&submission.project_key)?.report = submission.report;
        }
        let next = self.store.insert(next).await?;
        info!(
            release = release_name,
            next = next_name,
            projects = next.submissions.len(),
            "Release performed"
        );
        Ok(next)
    }

    /// Read-modify-write with retries on optimistic-lock conflicts.
    async fn update<T, F>(&self, release_name: &str, mut mutate: F) -> Result<T>
    where
        F: FnMut(&mut Release) -> Result<T> + Send,
        T: Send,
    {
        let mut retries = 0;
        loop {
            let mut release = self.store.release(release_name).await?;
            let value = mutate(&mut release)?;
            match self.store.save(&release).await {
                Ok(saved) => {
                    debug!(release = release_name, version = saved.version, "Release updated");
                    return Ok(value);
                }
                Err(e) if e.is_conflict() && retries < self.retry_attempts => {
                    retries += 1;
                    warn!(release = release_name, attempt = retries, error = %e, "Retrying release update");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn cancel_submission(&self, release_name: &str, project_key: &str) -> Result<()> {
        self.update(release_name, |release| {
            release.transition(project_key, Transition::Cancel)?;
            release.dequeue(project_key);
            release
                .submission_mut(project_key)?
                .report
                .abort(&DataType::ALL);
            Ok(())
        })
        .await
    }
}
