use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::io::backup;
use crate::io::lock::{DataLock, LockError};
use crate::model::config::StorageConfig;
use crate::model::project::{Project, ProjectType};
use crate::model::task::MainTask;
use crate::parse::task_json::{self, DecodeError, WireTask};

/// Error type for persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not valid: {source}")]
    CorruptFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{path}: {source}")]
    InvalidTasks { path: PathBuf, source: DecodeError },
    #[error("could not encode data: {0}")]
    EncodeError(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Load/save contract between the task tree and a storage backend.
pub trait TaskStore: Send + Sync {
    /// Main tasks for a project; empty when nothing was saved yet.
    fn load_tasks(&self, project: ProjectType) -> Result<Vec<MainTask>, StoreError>;

    /// Replace the whole task list of one project.
    fn save_tasks(&self, project: ProjectType, tasks: &[MainTask]) -> Result<(), StoreError>;

    fn load_projects(&self) -> Result<Vec<Project>, StoreError>;

    /// Insert or update a project's metadata; returns the stored record.
    fn save_project(
        &self,
        project: ProjectType,
        title: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Project, StoreError>;
}

/// Upsert rule shared by every backend. A missing title falls back to the
/// project's default and a missing date is stored as null.
pub fn upsert_project(
    projects: &mut Vec<Project>,
    project_type: ProjectType,
    title: Option<&str>,
    date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Project {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(project_type.default_title())
        .to_string();

    match projects.iter_mut().find(|p| p.project_type == project_type) {
        Some(existing) => {
            existing.title = title;
            existing.date = date;
            existing.updated_at = now;
            existing.clone()
        }
        None => {
            let project = Project {
                project_type,
                title,
                date,
                created_at: now,
                updated_at: now,
            };
            projects.push(project.clone());
            project
        }
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Outcome of `FileStore::initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitReport {
    pub created_tasks: bool,
    pub created_projects: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// JSON documents in a data directory:
/// `tasks.json` (project id → main tasks), `projects.json`, and `backups/`.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    backup_enabled: bool,
    max_backups: usize,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        FileStore {
            data_dir: data_dir.into(),
            backup_enabled: false,
            max_backups: 10,
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        FileStore {
            data_dir: storage.data_dir.clone(),
            backup_enabled: storage.backup_enabled,
            max_backups: storage.max_backups,
        }
    }

    pub fn with_backups(mut self, max_backups: usize) -> Self {
        self.backup_enabled = true;
        self.max_backups = max_backups;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }

    pub fn projects_path(&self) -> PathBuf {
        self.data_dir.join("projects.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    fn ensure_data_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::WriteError {
            path: self.data_dir.clone(),
            source: e,
        })
    }

    /// Create the data directory and default documents. Existing files are
    /// left untouched. A backup directory that cannot be created is logged.
    pub fn initialize(&self) -> Result<InitReport, StoreError> {
        self.ensure_data_dir()?;
        if let Err(e) = fs::create_dir_all(self.backup_dir()) {
            tracing::warn!(path = %self.backup_dir().display(), error = %e, "could not create backup directory");
        }
        let _lock = DataLock::acquire_default(&self.data_dir)?;
        let mut report = InitReport {
            created_tasks: false,
            created_projects: false,
        };

        let tasks_path = self.tasks_path();
        if !tasks_path.exists() {
            write_json(&tasks_path, &empty_task_document())?;
            tracing::info!(path = %tasks_path.display(), "created initial tasks.json");
            report.created_tasks = true;
        }

        let projects_path = self.projects_path();
        if !projects_path.exists() {
            let now = Utc::now();
            let defaults: Vec<Project> = ProjectType::ALL
                .iter()
                .map(|p| Project::with_defaults(*p, now))
                .collect();
            write_json(&projects_path, &defaults)?;
            tracing::info!(path = %projects_path.display(), "created initial projects.json");
            report.created_projects = true;
        }
        Ok(report)
    }

    fn read_task_document(&self) -> Result<IndexMap<String, serde_json::Value>, StoreError> {
        let path = self.tasks_path();
        if !path.exists() {
            return Ok(empty_task_document());
        }
        let text = fs::read_to_string(&path).map_err(|e| StoreError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| StoreError::CorruptFile { path, source: e })
    }

    fn read_projects(&self) -> Result<Vec<Project>, StoreError> {
        let path = self.projects_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path).map_err(|e| StoreError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| StoreError::CorruptFile { path, source: e })
    }

    /// Back up a data file before it is replaced. Failures are logged and
    /// never block the save.
    fn backup_before_write(&self, path: &Path) {
        if !self.backup_enabled {
            return;
        }
        if let Err(e) = backup::backup_file(&self.backup_dir(), path, self.max_backups, Utc::now()) {
            tracing::warn!(path = %path.display(), error = %e, "backup failed, continuing with save");
        }
    }

    /// Delete backups older than `days` days.
    pub fn prune_backups(&self, days: i64) -> Result<Vec<PathBuf>, StoreError> {
        let age = std::time::Duration::from_secs((days.max(0) as u64).saturating_mul(86_400));
        let cutoff = std::time::SystemTime::now()
            .checked_sub(age)
            .unwrap_or(std::time::UNIX_EPOCH);
        Ok(backup::prune_backups(&self.backup_dir(), cutoff)?)
    }

    /// Check that both data files can be opened for reading and writing.
    pub fn health(&self) -> HealthReport {
        let check = || -> Result<(), StoreError> {
            if !self.data_dir.is_dir() {
                return Err(StoreError::Unavailable(format!(
                    "data directory {} does not exist",
                    self.data_dir.display()
                )));
            }
            for path in [self.tasks_path(), self.projects_path()] {
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(&path)
                    .map_err(|e| StoreError::ReadError { path, source: e })?;
            }
            Ok(())
        };
        match check() {
            Ok(()) => HealthReport {
                status: HealthStatus::Healthy,
                data_dir: Some(self.data_dir.clone()),
                tasks_file: Some(self.tasks_path()),
                projects_file: Some(self.projects_path()),
                error: None,
                timestamp: Utc::now(),
            },
            Err(e) => HealthReport {
                status: HealthStatus::Unhealthy,
                data_dir: None,
                tasks_file: None,
                projects_file: None,
                error: Some(e.to_string()),
                timestamp: Utc::now(),
            },
        }
    }
}

fn empty_task_document() -> IndexMap<String, serde_json::Value> {
    ProjectType::ALL
        .iter()
        .map(|p| (p.as_str().to_string(), serde_json::Value::Array(Vec::new())))
        .collect()
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(value)?;
    backup::atomic_write(path, text.as_bytes()).map_err(|e| StoreError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

impl TaskStore for FileStore {
    fn load_tasks(&self, project: ProjectType) -> Result<Vec<MainTask>, StoreError> {
        let mut doc = self.read_task_document()?;
        let Some(value) = doc.swap_remove(project.as_str()) else {
            return Ok(Vec::new());
        };
        let path = self.tasks_path();
        let wire: Vec<WireTask> = serde_json::from_value(value).map_err(|e| StoreError::InvalidTasks {
            path: path.clone(),
            source: DecodeError::Json(e),
        })?;
        task_json::from_wire(wire).map_err(|e| StoreError::InvalidTasks { path, source: e })
    }

    fn save_tasks(&self, project: ProjectType, tasks: &[MainTask]) -> Result<(), StoreError> {
        self.ensure_data_dir()?;
        let _lock = DataLock::acquire_default(&self.data_dir)?;
        let path = self.tasks_path();
        self.backup_before_write(&path);

        let mut doc = self.read_task_document()?;
        doc.insert(
            project.as_str().to_string(),
            serde_json::to_value(task_json::to_wire(tasks))?,
        );
        write_json(&path, &doc)?;
        tracing::info!(project = %project, count = tasks.len(), "tasks saved");
        Ok(())
    }

    fn load_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.read_projects()
    }

    fn save_project(
        &self,
        project: ProjectType,
        title: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Project, StoreError> {
        self.ensure_data_dir()?;
        let _lock = DataLock::acquire_default(&self.data_dir)?;
        let path = self.projects_path();
        self.backup_before_write(&path);

        let mut projects = self.read_projects()?;
        let saved = upsert_project(&mut projects, project, title, date, Utc::now());
        write_json(&path, &projects)?;
        tracing::info!(project = %project, "project saved");
        Ok(saved)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<HashMap<ProjectType, Vec<MainTask>>>,
    projects: Mutex<Vec<Project>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(project: ProjectType, tasks: Vec<MainTask>) -> Self {
        let store = Self::default();
        guard(&store.tasks).insert(project, tasks);
        store
    }

    /// Number of successful `save_tasks` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following `save_tasks` call fail
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl TaskStore for MemoryStore {
    fn load_tasks(&self, project: ProjectType) -> Result<Vec<MainTask>, StoreError> {
        Ok(guard(&self.tasks).get(&project).cloned().unwrap_or_default())
    }

    fn save_tasks(&self, project: ProjectType, tasks: &[MainTask]) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        guard(&self.tasks).insert(project, tasks.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load_projects(&self) -> Result<Vec<Project>, StoreError> {
        Ok(guard(&self.projects).clone())
    }

    fn save_project(
        &self,
        project: ProjectType,
        title: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Project, StoreError> {
        let mut projects = guard(&self.projects);
        Ok(upsert_project(&mut projects, project, title, date, Utc::now()))
    }
}
