use chrono::{DateTime, Utc};

use crate::model::project::ProjectType;
use crate::model::task::{MainTask, Task, TaskStatus};
use crate::ops::access::{self, Actor};
use crate::ops::aggregate::{self, ScheduleStats};
use crate::ops::time_math;

/// Error type for task operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error("unknown field '{0}' (expected: title, start, end, status, progress)")]
    InvalidField(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("{field} of {id} is computed from its subtasks")]
    ComputedField { id: String, field: &'static str },
}

/// Result of a gated mutation. A denied mutation leaves the tree untouched.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The new task's id
    Created(String),
    Denied,
}

impl Outcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Outcome::Denied)
    }
}

/// A single field write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Title(String),
    StartTime(Option<String>),
    EndTime(Option<String>),
    Status(TaskStatus),
    Progress(u8),
}

impl FieldUpdate {
    /// Build an update from a field name and its textual value.
    pub fn parse(field: &str, value: &str) -> Result<FieldUpdate, TaskError> {
        match field {
            "title" => Ok(FieldUpdate::Title(value.to_string())),
            "start" | "startTime" => Ok(FieldUpdate::StartTime(parse_time(value)?)),
            "end" | "endTime" => Ok(FieldUpdate::EndTime(parse_time(value)?)),
            "status" => parse_status(value).map(FieldUpdate::Status),
            "progress" => {
                let progress = value
                    .trim_end_matches('%')
                    .parse::<u8>()
                    .ok()
                    .filter(|p| *p <= 100)
                    .ok_or_else(|| TaskError::InvalidValue {
                        field: "progress",
                        reason: format!("'{}' is not a number between 0 and 100", value),
                    })?;
                Ok(FieldUpdate::Progress(progress))
            }
            other => Err(TaskError::InvalidField(other.to_string())),
        }
    }

    /// Field name as accepted by `parse`
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldUpdate::Title(_) => "title",
            FieldUpdate::StartTime(_) => "start",
            FieldUpdate::EndTime(_) => "end",
            FieldUpdate::Status(_) => "status",
            FieldUpdate::Progress(_) => "progress",
        }
    }

    /// Whether a task with subtasks derives this field
    fn is_rolled_up(&self) -> bool {
        !matches!(self, FieldUpdate::Title(_))
    }

    fn validate(&self) -> Result<(), TaskError> {
        match self {
            FieldUpdate::Title(t) if t.trim().is_empty() => Err(TaskError::EmptyTitle),
            FieldUpdate::StartTime(Some(t)) | FieldUpdate::EndTime(Some(t))
                if !time_math::is_valid_hhmm(t) =>
            {
                Err(TaskError::InvalidTime(t.clone()))
            }
            FieldUpdate::Progress(p) if *p > 100 => Err(TaskError::InvalidValue {
                field: "progress",
                reason: format!("{} is above 100", p),
            }),
            _ => Ok(()),
        }
    }
}

fn parse_time(value: &str) -> Result<Option<String>, TaskError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if !time_math::is_valid_hhmm(value) {
        return Err(TaskError::InvalidTime(value.to_string()));
    }
    Ok(Some(value.to_string()))
}

/// Parse a status from its stored label or a short CLI form.
pub fn parse_status(s: &str) -> Result<TaskStatus, TaskError> {
    match s.to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
        "not started" | "todo" => Ok(TaskStatus::NotStarted),
        "in progress" | "active" => Ok(TaskStatus::InProgress),
        "completed" | "done" => Ok(TaskStatus::Completed),
        "on hold" | "hold" => Ok(TaskStatus::OnHold),
        _ => Err(TaskError::InvalidValue {
            field: "status",
            reason: format!(
                "unknown status '{}' (expected: not-started, in-progress, completed, on-hold)",
                s
            ),
        }),
    }
}

/// The in-memory task list for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTree {
    pub project: ProjectType,
    pub tasks: Vec<MainTask>,
}

impl TaskTree {
    pub fn new(project: ProjectType, tasks: Vec<MainTask>) -> Self {
        TaskTree { project, tasks }
    }

    pub fn find_main(&self, id: &str) -> Option<&MainTask> {
        self.tasks.iter().find(|t| t.task.id == id)
    }

    fn find_main_mut(&mut self, id: &str) -> Result<&mut MainTask, TaskError> {
        self.tasks
            .iter_mut()
            .find(|t| t.task.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Locate a task: top-level by id, or a subtask by (parent, id).
    pub fn find(&self, task_id: &str, parent_id: Option<&str>) -> Option<&Task> {
        match parent_id {
            Some(parent) => self.find_main(parent)?.subtask(task_id),
            None => self.find_main(task_id).map(|m| &m.task),
        }
    }

    pub fn stats(&self) -> ScheduleStats {
        aggregate::schedule_stats(&self.tasks)
    }

    /// Write one field on a task, then re-derive the affected main task.
    pub fn update_field(
        &mut self,
        actor: &Actor,
        task_id: &str,
        parent_id: Option<&str>,
        update: FieldUpdate,
    ) -> Result<Outcome, TaskError> {
        self.update_field_at(actor, task_id, parent_id, update, Utc::now())
    }

    pub fn update_field_at(
        &mut self,
        actor: &Actor,
        task_id: &str,
        parent_id: Option<&str>,
        update: FieldUpdate,
        now: DateTime<Utc>,
    ) -> Result<Outcome, TaskError> {
        update.validate()?;

        match parent_id {
            Some(parent) => {
                let main = self.find_main_mut(parent)?;
                let previous = main.task.status;
                let sub = main
                    .subtask_mut(task_id)
                    .ok_or_else(|| TaskError::NotFound(format!("{} (in {})", task_id, parent)))?;
                if !access::can_mutate(actor.role, sub) {
                    return Ok(Outcome::Denied);
                }
                write_leaf_field(sub, update, actor, now);
                aggregate::refresh_main(main, previous, actor, now);
            }
            None => {
                let main = self.find_main_mut(task_id)?;
                if !access::can_mutate(actor.role, &main.task) {
                    return Ok(Outcome::Denied);
                }
                if main.is_derived() {
                    if update.is_rolled_up() {
                        return Err(TaskError::ComputedField {
                            id: task_id.to_string(),
                            field: update.field_name(),
                        });
                    }
                    write_raw_field(&mut main.task, update);
                } else {
                    write_leaf_field(&mut main.task, update, actor, now);
                }
            }
        }
        Ok(Outcome::Applied)
    }

    /// Append a new leaf main task. Admin only.
    pub fn add_main_task(&mut self, actor: &Actor, title: &str) -> Result<Outcome, TaskError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        if !access::can_administer(actor.role) {
            return Ok(Outcome::Denied);
        }
        let id = self.fresh_id("task");
        self.tasks.push(MainTask::new(id.clone(), title.to_string()));
        Ok(Outcome::Created(id))
    }

    /// Append a default subtask to a main task and re-derive it.
    pub fn add_subtask(&mut self, actor: &Actor, parent_id: &str) -> Result<Outcome, TaskError> {
        self.add_subtask_at(actor, parent_id, Utc::now())
    }

    pub fn add_subtask_at(
        &mut self,
        actor: &Actor,
        parent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome, TaskError> {
        let id = self.fresh_id("subtask");
        let main = self.find_main_mut(parent_id)?;
        if !access::can_mutate(actor.role, &main.task) {
            return Ok(Outcome::Denied);
        }
        let previous = main.task.status;
        main.subtasks.push(Task::new(id.clone(), "New Subtask".to_string()));
        aggregate::refresh_main(main, previous, actor, now);
        Ok(Outcome::Created(id))
    }

    /// Remove a task (and, for a main task, its subtasks).
    pub fn delete_task(
        &mut self,
        actor: &Actor,
        task_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Outcome, TaskError> {
        self.delete_task_at(actor, task_id, parent_id, Utc::now())
    }

    pub fn delete_task_at(
        &mut self,
        actor: &Actor,
        task_id: &str,
        parent_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, TaskError> {
        match parent_id {
            Some(parent) => {
                let main = self.find_main_mut(parent)?;
                let idx = main
                    .subtasks
                    .iter()
                    .position(|s| s.id == task_id)
                    .ok_or_else(|| TaskError::NotFound(format!("{} (in {})", task_id, parent)))?;
                if !access::can_mutate(actor.role, &main.subtasks[idx]) {
                    return Ok(Outcome::Denied);
                }
                let previous = main.task.status;
                main.subtasks.remove(idx);
                aggregate::refresh_main(main, previous, actor, now);
            }
            None => {
                let idx = self
                    .tasks
                    .iter()
                    .position(|t| t.task.id == task_id)
                    .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
                if !access::can_mutate(actor.role, &self.tasks[idx].task) {
                    return Ok(Outcome::Denied);
                }
                self.tasks.remove(idx);
            }
        }
        Ok(Outcome::Applied)
    }

    /// Flip a main task's expanded flag. Open to every role, locked or not.
    pub fn toggle_expanded(&mut self, task_id: &str) -> Result<Outcome, TaskError> {
        let main = self.find_main_mut(task_id)?;
        main.is_expanded = !main.is_expanded;
        Ok(Outcome::Applied)
    }

    /// Flip a task's lock. Admin only; not itself blocked by the lock.
    pub fn toggle_locked(
        &mut self,
        actor: &Actor,
        task_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Outcome, TaskError> {
        let task = match parent_id {
            Some(parent) => self
                .find_main_mut(parent)?
                .subtask_mut(task_id)
                .ok_or_else(|| TaskError::NotFound(format!("{} (in {})", task_id, parent)))?,
            None => &mut self.find_main_mut(task_id)?.task,
        };
        if !access::can_administer(actor.role) {
            return Ok(Outcome::Denied);
        }
        task.locked = !task.locked;
        Ok(Outcome::Applied)
    }

    /// `<kind>-<unix millis>`, suffixed on collision.
    fn fresh_id(&self, kind: &str) -> String {
        let base = format!("{}-{}", kind, Utc::now().timestamp_millis());
        if !self.id_in_use(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !self.id_in_use(candidate))
            .unwrap_or(base)
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.tasks
            .iter()
            .any(|m| m.task.id == id || m.subtasks.iter().any(|s| s.id == id))
    }
}

fn write_leaf_field(task: &mut Task, update: FieldUpdate, actor: &Actor, now: DateTime<Utc>) {
    match update {
        FieldUpdate::Status(status) => aggregate::apply_leaf_status(task, status, actor, now),
        other => write_raw_field(task, other),
    }
}

fn write_raw_field(task: &mut Task, update: FieldUpdate) {
    match update {
        FieldUpdate::Title(title) => task.title = title,
        FieldUpdate::StartTime(t) => task.start_time = t,
        FieldUpdate::EndTime(t) => task.end_time = t,
        FieldUpdate::Status(s) => task.status = s,
        FieldUpdate::Progress(p) => task.progress = p,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
