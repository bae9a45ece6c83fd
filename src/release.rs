use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::model::DataType;
use crate::report::Report;
use crate::state::{SubmissionState, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseState {
    Opened,
    Completed,
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseState::Opened => f.write_str("OPENED"),
            ReleaseState::Completed => f.write_str("COMPLETED"),
        }
    }
}

/// A validation request waiting in a release's queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedProject {
    pub key: String,
    #[serde(default)]
    pub emails: Vec<String>,
    /// Data types to validate; empty means all of them
    #[serde(default)]
    pub data_types: Vec<DataType>,
}

impl QueuedProject {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            emails: Vec::new(),
            data_types: Vec::new(),
        }
    }

    pub fn with_emails(mut self, emails: Vec<String>) -> Self {
        self.emails = emails;
        self
    }

    pub fn with_data_types(mut self, data_types: Vec<DataType>) -> Self {
        self.data_types = data_types;
        self
    }

    /// Selected data types with the empty selection expanded
    pub fn selected_data_types(&self) -> Vec<DataType> {
        DataType::resolve_selection(&self.data_types)
    }
}

/// One project's participation in one release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub project_key: String,
    pub project_name: String,
    pub release_name: String,
    pub state: SubmissionState,
    #[serde(default)]
    pub report: Report,
    pub last_updated: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        project_key: impl Into<String>,
        project_name: impl Into<String>,
        release_name: impl Into<String>,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            project_name: project_name.into(),
            release_name: release_name.into(),
            state: SubmissionState::NotValidated,
            report: Report::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub name: String,
    pub state: ReleaseState,
    pub dictionary_version: String,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub queue: Vec<QueuedProject>,
    /// Optimistic lock version, bumped by the store on every save
    #[serde(default)]
    pub version: u64,
}

impl Release {
    pub fn new(name: impl Into<String>, dictionary_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ReleaseState::Opened,
            dictionary_version: dictionary_version.into(),
            release_date: None,
            submissions: Vec::new(),
            queue: Vec::new(),
            version: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == ReleaseState::Opened
    }

    pub fn add_submission(&mut self, project_key: &str, project_name: &str) {
        if self.submission(project_key).is_none() {
            self.submissions
                .push(Submission::new(project_key, project_name, self.name.clone()));
        }
    }

    pub fn submission(&self, project_key: &str) -> Option<&Submission> {
        self.submissions
            .iter()
            .find(|submission| submission.project_key == project_key)
    }

    pub fn submission_mut(&mut self, project_key: &str) -> StateResult<&mut Submission> {
        let release = self.name.clone();
        self.submissions
            .iter_mut()
            .find(|submission| submission.project_key == project_key)
            .ok_or_else(|| StateError::SubmissionNotFound {
                release,
                project_key: project_key.to_string(),
            })
    }

    pub fn submission_state(&self, project_key: &str) -> Option<SubmissionState> {
        self.submission(project_key).map(|submission| submission.state)
    }

    pub fn is_queued(&self, project_key: &str) -> bool {
        self.queue.iter().any(|queued| queued.key == project_key)
    }

    pub fn next_in_queue(&self) -> Option<&QueuedProject> {
        self.queue.first()
    }

    pub fn enqueue(&mut self, project: QueuedProject) -> StateResult<()> {
        if self.is_queued(&project.key) {
            return Err(StateError::AlreadyQueued {
                project_key: project.key,
            });
        }
        self.queue.push(project);
        Ok(())
    }

    pub fn dequeue(&mut self, project_key: &str) -> Option<QueuedProject> {
        let position = self
            .queue
            .iter()
            .position(|queued| queued.key == project_key)?;
        Some(self.queue.remove(position))
    }

    /// Number of projects queued or validating
    pub fn pending_count(&self) -> usize {
        self.submissions
            .iter()
            .filter(|submission| submission.state.is_in_flight())
            .count()
    }

    /// Applies `transition` to a project's submission.
    ///
    /// Fails when the release is not open or the transition is illegal from
    /// the submission's current state. The submission is left untouched on
    /// failure.
    pub fn transition(
        &mut self,
        project_key: &str,
        transition: Transition,
    ) -> StateResult<SubmissionState> {
        if !self.is_open() {
            return Err(StateError::ReleaseNotOpen {
                release: self.name.clone(),
                state: self.state,
            });
        }

        let submission = self.submission_mut(project_key)?;
        let next = submission
            .state
            .next(transition)
            .ok_or_else(|| StateError::InvalidState {
                project_key: project_key.to_string(),
                state: submission.state,
                action: transition.action(),
            })?;
        submission.state = next;
        submission.last_updated = Utc::now();
        Ok(next)
    }

    /// Closes the release, keeping only signed-off submissions.
    pub fn complete(&mut self) {
        self.state = ReleaseState::Completed;
        self.release_date = Some(Utc::now());
        self.queue.clear();
        self.submissions
            .retain(|submission| submission.state == SubmissionState::SignedOff);
    }
}
