//! Durable state behind the scheduler
//!
//! Releases are saved whole under an optimistic lock: a save carries the
//! version it was read at and is rejected with [`StoreError::Conflict`] when
//! another writer got there first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::dictionary::Dictionary;
use crate::error::{StoreError, StoreResult};
use crate::release::Release;

#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Every release currently in the OPENED state
    async fn open_releases(&self) -> StoreResult<Vec<Release>>;

    async fn release(&self, name: &str) -> StoreResult<Release>;

    /// Persists `release` if its version is still current, returning the
    /// stored copy with the bumped version.
    async fn save(&self, release: &Release) -> StoreResult<Release>;

    /// Stores a new release. Fails with a conflict if the name is taken.
    async fn insert(&self, release: Release) -> StoreResult<Release>;

    async fn dictionary(&self, version: &str) -> StoreResult<Dictionary>;
}

/// Lists the file names a project has submitted to a release
#[async_trait]
pub trait SubmissionDirectory: Send + Sync {
    async fn list_files(&self, release: &str, project_key: &str) -> StoreResult<Vec<String>>;
}

#[derive(Default)]
pub struct InMemoryReleaseStore {
    releases: RwLock<HashMap<String, Release>>,
    dictionaries: RwLock<HashMap<String, Dictionary>>,
}

impl InMemoryReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_dictionary(&self, dictionary: Dictionary) {
        self.dictionaries
            .write()
            .await
            .insert(dictionary.version.clone(), dictionary);
    }
}

#[async_trait]
impl ReleaseStore for InMemoryReleaseStore {
    async fn open_releases(&self) -> StoreResult<Vec<Release>> {
        let releases = self.releases.read().await;
        let mut open: Vec<Release> = releases
            .values()
            .filter(|release| release.is_open())
            .cloned()
            .collect();
        open.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(open)
    }

    async fn release(&self, name: &str) -> StoreResult<Release> {
        self.releases
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::ReleaseNotFound {
                name: name.to_string(),
            })
    }

    async fn save(&self, release: &Release) -> StoreResult<Release> {
        let mut releases = self.releases.write().await;
        let stored = releases
            .get_mut(&release.name)
            .ok_or_else(|| StoreError::ReleaseNotFound {
                name: release.name.clone(),
            })?;

        if stored.version != release.version {
            return Err(StoreError::Conflict {
                release: release.name.clone(),
                expected: release.version,
                actual: stored.version,
            });
        }

        let mut saved = release.clone();
        saved.version += 1;
        *stored = saved.clone();
        debug!(release = %saved.name, version = saved.version, "Release saved");
        Ok(saved)
    }

    async fn insert(&self, release: Release) -> StoreResult<Release> {
        let mut releases = self.releases.write().await;
        if let Some(existing) = releases.get(&release.name) {
            return Err(StoreError::Conflict {
                release: release.name.clone(),
                expected: release.version,
                actual: existing.version,
            });
        }
        releases.insert(release.name.clone(), release.clone());
        Ok(release)
    }

    async fn dictionary(&self, version: &str) -> StoreResult<Dictionary> {
        self.dictionaries
            .read()
            .await
            .get(version)
            .cloned()
            .ok_or_else(|| StoreError::DictionaryNotFound {
                version: version.to_string(),
            })
    }
}

/// Submission listings held in memory, keyed by release and project
#[derive(Default)]
pub struct InMemorySubmissionDirectory {
    files: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl InMemorySubmissionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_files<S: Into<String>>(
        &self,
        release: &str,
        project_key: &str,
        files: impl IntoIterator<Item = S>,
    ) {
        self.files.write().await.insert(
            (release.to_string(), project_key.to_string()),
            files.into_iter().map(Into::into).collect(),
        );
    }
}

#[async_trait]
impl SubmissionDirectory for InMemorySubmissionDirectory {
    async fn list_files(&self, release: &str, project_key: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .files
            .read()
            .await
            .get(&(release.to_string(), project_key.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Submission files laid out as `<root>/<release>/<project>/<file>`
pub struct FileSystemSubmissionDirectory {
    root: PathBuf,
}

impl FileSystemSubmissionDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Names of the regular files directly inside `directory`, sorted
    pub async fn list_dir(directory: &Path) -> StoreResult<Vec<String>> {
        if !tokio::fs::try_exists(directory).await? {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl SubmissionDirectory for FileSystemSubmissionDirectory {
    async fn list_files(&self, release: &str, project_key: &str) -> StoreResult<Vec<String>> {
        Self::list_dir(&self.root.join(release).join(project_key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = InMemoryReleaseStore::new();
        store.insert(Release::new("release1", "0.6c")).await.unwrap();

        let release = store.release("release1").await.unwrap();
        let saved = store.save(&release).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(store.release("release1").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let store = InMemoryReleaseStore::new();
        store.insert(Release::new("release1", "0.6c")).await.unwrap();

        let first = store.release("release1").await.unwrap();
        let second = store.release("release1").await.unwrap();
        store.save(&first).await.unwrap();

        let error = store.save(&second).await.unwrap_err();
        assert!(error.is_conflict());
    }

    #[tokio::test]
    async fn test_open_releases_filters_completed() {
        let store = InMemoryReleaseStore::new();
        let mut old = Release::new("release0", "0.6b");
        old.complete();
        store.insert(old).await.unwrap();
        store.insert(Release::new("release1", "0.6c")).await.unwrap();

        let open = store.open_releases().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].name, "release1");
    }

    #[tokio::test]
    async fn test_missing_lookups() {
        let store = InMemoryReleaseStore::new();
        assert!(matches!(
            store.release("nope").await,
            Err(StoreError::ReleaseNotFound { .. })
        ));
        assert!(matches!(
            store.dictionary("0.1").await,
            Err(StoreError::DictionaryNotFound { .. })
        ));
        assert!(
            store
                .insert(Release::new("dup", "0.6c"))
                .await
                .is_ok()
        );
        assert!(store.insert(Release::new("dup", "0.6c")).await.is_err());
    }

    #[tokio::test]
    async fn test_file_system_directory_lists_files() {
        let temp_dir = TempDir::new().unwrap();
        let project_dir = temp_dir.path().join("release1").join("PRJ1");
        std::fs::create_dir_all(project_dir.join("nested")).unwrap();
        std::fs::write(project_dir.join("specimen.txt"), "").unwrap();
        std::fs::write(project_dir.join("donor.txt"), "").unwrap();

        let directory = FileSystemSubmissionDirectory::new(temp_dir.path());
        let files = directory.list_files("release1", "PRJ1").await.unwrap();
        assert_eq!(files, vec!["donor.txt".to_string(), "specimen.txt".to_string()]);

        let empty = directory.list_files("release1", "PRJ2").await.unwrap();
        assert!(empty.is_empty());
    }
}
