#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use submission_validator::config::SchedulerConfig;
use submission_validator::dictionary::{Dictionary, FileSchema};
use submission_validator::engine::{
    Cascade, CascadeStatus, JobEngine, PlanningFailure, SubJob, SubJobReport,
};
use submission_validator::error::{
    EngineError, EngineResult, NotifyError, StoreError, StoreResult,
};
use submission_validator::model::FileType;
use submission_validator::notify::Notifier;
use submission_validator::release::{QueuedProject, Release};
use submission_validator::report::{ErrorRecord, Report};
use submission_validator::scheduler::ValidationScheduler;
use submission_validator::state::SubmissionState;
use submission_validator::store::{InMemoryReleaseStore, InMemorySubmissionDirectory, ReleaseStore};

pub const RELEASE: &str = "release1";
pub const DICTIONARY_VERSION: &str = "0.6c";

pub fn dictionary() -> Dictionary {
    Dictionary {
        version: DICTIONARY_VERSION.to_string(),
        schemas: vec![
            FileSchema::new(FileType::Donor, r"^donor(\..+)?\.txt$").required(),
            FileSchema::new(FileType::Specimen, r"^specimen(\..+)?\.txt$").required(),
            FileSchema::new(FileType::Sample, r"^sample(\..+)?\.txt$"),
        ],
    }
}

pub fn scheduler_config(max_concurrent: usize) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrent_validations: max_concurrent,
        poll_interval_ms: 20,
        start_grace_ms: 0,
        ..SchedulerConfig::default()
    }
}

/// Sub-job reporting whatever errors were scripted for its file
pub struct ScriptedSubJob {
    schema: String,
    file: String,
    file_type: FileType,
    errors: Vec<ErrorRecord>,
    plan_error: Option<ErrorRecord>,
}

impl SubJob for ScriptedSubJob {
    fn schema_name(&self) -> &str {
        &self.schema
    }

    fn file_name(&self) -> &str {
        &self.file
    }

    fn plan(&self) -> Result<(), PlanningFailure> {
        match &self.plan_error {
            Some(error) => Err(PlanningFailure {
                file_type: self.file_type,
                error: error.clone(),
            }),
            None => Ok(()),
        }
    }

    fn collect(&self) -> SubJobReport {
        let mut report = SubJobReport::new(&self.schema, &self.file, self.file_type);
        report.errors = self.errors.clone();
        report
    }
}

pub struct ScriptedCascade {
    status: watch::Sender<CascadeStatus>,
}

#[async_trait]
impl Cascade for ScriptedCascade {
    async fn start(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn stop(&self) -> EngineResult<()> {
        self.status.send_replace(CascadeStatus::Stopped);
        Ok(())
    }

    fn status(&self) -> CascadeStatus {
        *self.status.borrow()
    }

    async fn wait(&self) -> CascadeStatus {
        let mut receiver = self.status.subscribe();
        match receiver.wait_for(|status| status.is_terminal()).await {
            Ok(status) => *status,
            Err(_) => CascadeStatus::Failed,
        }
    }
}

/// Job engine whose runs only finish when a test says so
#[derive(Default)]
pub struct ScriptedEngine {
    cascades: Mutex<HashMap<String, Arc<ScriptedCascade>>>,
    errors: Mutex<HashMap<(String, String), Vec<ErrorRecord>>>,
    plan_errors: Mutex<HashMap<(String, String), ErrorRecord>>,
    failing_connects: Mutex<HashSet<String>>,
    connects: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_errors(&self, project_key: &str, file_name: &str, errors: Vec<ErrorRecord>) {
        self.errors
            .lock()
            .unwrap()
            .insert((project_key.to_string(), file_name.to_string()), errors);
    }

    pub fn script_plan_error(&self, project_key: &str, file_name: &str, error: ErrorRecord) {
        self.plan_errors
            .lock()
            .unwrap()
            .insert((project_key.to_string(), file_name.to_string()), error);
    }

    pub fn fail_connect(&self, project_key: &str) {
        self.failing_connects
            .lock()
            .unwrap()
            .insert(project_key.to_string());
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn status(&self, project_key: &str) -> Option<CascadeStatus> {
        self.cascades
            .lock()
            .unwrap()
            .get(project_key)
            .map(|cascade| cascade.status())
    }

    /// Drives the project's running cascade to `status`.
    pub fn finish(&self, project_key: &str, status: CascadeStatus) {
        let cascades = self.cascades.lock().unwrap();
        let cascade = cascades
            .get(project_key)
            .unwrap_or_else(|| panic!("no cascade connected for {}", project_key));
        cascade.status.send_replace(status);
    }
}

#[async_trait]
impl JobEngine for ScriptedEngine {
    fn sub_jobs(
        &self,
        project_key: &str,
        schema: &FileSchema,
        file_name: &str,
    ) -> Vec<Arc<dyn SubJob>> {
        let key = (project_key.to_string(), file_name.to_string());
        let errors = self
            .errors
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default();
        let plan_error = self.plan_errors.lock().unwrap().get(&key).cloned();
        vec![Arc::new(ScriptedSubJob {
            schema: schema.name.clone(),
            file: file_name.to_string(),
            file_type: schema.file_type,
            errors,
            plan_error,
        })]
    }

    async fn reset_working_area(&self, _release: &str, _project_key: &str) -> EngineResult<()> {
        Ok(())
    }

    async fn connect(
        &self,
        _job_id: Uuid,
        project_key: &str,
        _sub_jobs: &[Arc<dyn SubJob>],
    ) -> EngineResult<Arc<dyn Cascade>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.failing_connects.lock().unwrap().contains(project_key) {
            return Err(EngineError::Connect {
                project_key: project_key.to_string(),
                details: "engine rejected the job".to_string(),
            });
        }

        let (status, _) = watch::channel(CascadeStatus::Running);
        let cascade = Arc::new(ScriptedCascade { status });
        self.cascades
            .lock()
            .unwrap()
            .insert(project_key.to_string(), Arc::clone(&cascade));
        Ok(cascade as Arc<dyn Cascade>)
    }
}

/// In-memory store whose next saves can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryReleaseStore,
    failing_saves: AtomicU32,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_dictionary(&self, dictionary: Dictionary) {
        self.inner.insert_dictionary(dictionary).await;
    }

    /// Makes the next `count` saves fail as if the store were down.
    pub fn fail_next_saves(&self, count: u32) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReleaseStore for FlakyStore {
    async fn open_releases(&self) -> StoreResult<Vec<Release>> {
        self.inner.open_releases().await
    }

    async fn release(&self, name: &str) -> StoreResult<Release> {
        self.inner.release(name).await
    }

    async fn save(&self, release: &Release) -> StoreResult<Release> {
        let failing = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable {
                details: "release store went away".to_string(),
            });
        }
        self.inner.save(release).await
    }

    async fn insert(&self, release: Release) -> StoreResult<Release> {
        self.inner.insert(release).await
    }

    async fn dictionary(&self, version: &str) -> StoreResult<Dictionary> {
        self.inner.dictionary(version).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Started(String),
    Validated(String, SubmissionState),
    Support(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn support_count(&self) -> usize {
        self.sent()
            .iter()
            .filter(|notification| matches!(notification, Notification::Support(_)))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn processing_started(
        &self,
        project_key: &str,
        _recipients: &[String],
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push(Notification::Started(project_key.to_string()));
        Ok(())
    }

    fn validated(
        &self,
        _release: &str,
        project_key: &str,
        state: SubmissionState,
        _recipients: &[String],
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push(Notification::Validated(project_key.to_string(), state));
        Ok(())
    }

    fn support_problem(&self, subject: &str, _detail: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push(Notification::Support(subject.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub files: Arc<InMemorySubmissionDirectory>,
    pub engine: Arc<ScriptedEngine>,
    pub notifier: Arc<RecordingNotifier>,
    pub scheduler: ValidationScheduler,
}

impl Harness {
    /// One open release with a submission per project.
    pub async fn new(config: SchedulerConfig, projects: &[&str]) -> Self {
        let store = Arc::new(FlakyStore::new());
        store.insert_dictionary(dictionary()).await;
        let mut release = Release::new(RELEASE, DICTIONARY_VERSION);
        for project in projects {
            release.add_submission(project, &format!("Project {}", project));
        }
        store.insert(release).await.unwrap();

        let files = Arc::new(InMemorySubmissionDirectory::new());
        let engine = Arc::new(ScriptedEngine::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = ValidationScheduler::new(
            store.clone(),
            engine.clone(),
            files.clone(),
            notifier.clone(),
            config,
        );

        Self {
            store,
            files,
            engine,
            notifier,
            scheduler,
        }
    }

    pub async fn submit(&self, project_key: &str, file_names: &[&str]) {
        self.files
            .set_files(RELEASE, project_key, file_names.iter().copied())
            .await;
    }

    pub async fn enqueue(&self, projects: Vec<QueuedProject>) {
        self.scheduler
            .service()
            .enqueue(RELEASE, &projects)
            .await
            .unwrap();
    }

    pub async fn enqueue_keys(&self, keys: &[&str]) {
        let projects = keys.iter().map(|key| QueuedProject::new(*key)).collect();
        self.enqueue(projects).await;
    }

    pub async fn state(&self, project_key: &str) -> SubmissionState {
        self.store
            .release(RELEASE)
            .await
            .unwrap()
            .submission_state(project_key)
            .unwrap()
    }

    pub async fn report(&self, project_key: &str) -> Report {
        self.scheduler
            .service()
            .report(RELEASE, project_key)
            .await
            .unwrap()
    }

    /// Waits for the watcher task to record an outcome.
    pub async fn wait_for_state(&self, project_key: &str, expected: SubmissionState) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let state = self.state(project_key).await;
            if state == expected {
                // the watcher still holds the slot table until it has notified
                self.scheduler.active_projects().await;
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("{} stuck in {}, expected {}", project_key, state, expected);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Waits until the project no longer holds a slot.
    pub async fn wait_for_release_of_slot(&self, project_key: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self
            .scheduler
            .active_projects()
            .await
            .iter()
            .any(|key| key == project_key)
        {
            if tokio::time::Instant::now() >= deadline {
                panic!("{} still holds a slot", project_key);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
