use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl TaskStatus {
    /// Human label, identical to the stored form
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::OnHold => "On Hold",
        }
    }

    /// Single-character marker used in list output
    pub fn marker(self) -> char {
        match self {
            TaskStatus::NotStarted => ' ',
            TaskStatus::InProgress => '>',
            TaskStatus::Completed => 'x',
            TaskStatus::OnHold => '~',
        }
    }
}

/// A single schedulable unit.
///
/// Subtasks are plain `Task`s; only [`MainTask`] can own children, so the
/// one-level nesting limit holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique within its project, never reassigned
    pub id: String,
    pub title: String,
    /// `HH:MM`, `None` when unset
    pub start_time: Option<String>,
    /// `HH:MM`, `None` when unset
    pub end_time: Option<String>,
    pub status: TaskStatus,
    /// 0..=100
    pub progress: u8,
    /// Set when the task last became Completed
    pub completed_at: Option<DateTime<Utc>>,
    /// Human duration, only present on completed tasks with both times
    pub total_time: Option<String>,
    /// Who performed the Completed transition
    pub completed_by: Option<String>,
    pub locked: bool,
    /// Stored `isExpanded` of a subtask, kept as found. Main tasks use
    /// [`MainTask::is_expanded`] instead.
    pub expanded: Option<bool>,
}

impl Task {
    /// Create a task with default field values
    pub fn new(id: String, title: String) -> Self {
        Task {
            id,
            title,
            start_time: None,
            end_time: None,
            status: TaskStatus::NotStarted,
            progress: 0,
            completed_at: None,
            total_time: None,
            completed_by: None,
            locked: false,
            expanded: None,
        }
    }
}

/// A top-level task, optionally owning an ordered list of subtasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainTask {
    pub task: Task,
    pub subtasks: Vec<Task>,
    /// UI-only, but persisted
    pub is_expanded: bool,
}

impl MainTask {
    pub fn new(id: String, title: String) -> Self {
        MainTask {
            task: Task::new(id, title),
            subtasks: Vec::new(),
            is_expanded: true,
        }
    }

    /// A task with at least one subtask has its times, status and progress
    /// computed rather than edited.
    pub fn is_derived(&self) -> bool {
        !self.subtasks.is_empty()
    }

    pub fn subtask(&self, id: &str) -> Option<&Task> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    pub fn subtask_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.subtasks.iter_mut().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_main_task_defaults() {
        let main = MainTask::new("task-1".into(), "Foundation".into());
        assert_eq!(main.task.status, TaskStatus::NotStarted);
        assert_eq!(main.task.progress, 0);
        assert!(main.is_expanded);
        assert!(!main.task.locked);
        assert!(!main.is_derived());
        assert!(main.task.completed_at.is_none());
    }

    #[test]
    fn status_serializes_with_spaces() {
        let s = serde_json::to_string(&TaskStatus::NotStarted).unwrap();
        assert_eq!(s, "\"Not Started\"");
        let back: TaskStatus = serde_json::from_str("\"On Hold\"").unwrap();
        assert_eq!(back, TaskStatus::OnHold);
        assert_eq!(TaskStatus::InProgress.label(), "In Progress");
    }

    #[test]
    fn subtask_lookup() {
        let mut main = MainTask::new("task-1".into(), "Walls".into());
        main.subtasks.push(Task::new("subtask-1".into(), "Studs".into()));
        assert!(main.is_derived());
        assert_eq!(main.subtask("subtask-1").unwrap().title, "Studs");
        main.subtask_mut("subtask-1").unwrap().locked = true;
        assert!(main.subtasks[0].locked);
        assert!(main.subtask("missing").is_none());
    }
}
