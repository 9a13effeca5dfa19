use std::sync::Arc;
use std::time::Duration;

use crate::io::autosave::{DebouncedSaver, SaveReport};
use crate::io::store::{StoreError, TaskStore};
use crate::model::project::ProjectType;
use crate::model::task::MainTask;
use crate::ops::access::Actor;
use crate::ops::aggregate::ScheduleStats;
use crate::ops::task_ops::{FieldUpdate, Outcome, TaskError, TaskTree};

/// One signed-in actor editing one project's task list. Every change that
/// goes through is handed to the debounced saver.
pub struct Session {
    actor: Actor,
    tree: TaskTree,
    saver: DebouncedSaver,
}

impl Session {
    pub fn open(
        store: Arc<dyn TaskStore>,
        project: ProjectType,
        actor: Actor,
        debounce: Duration,
    ) -> Result<Self, StoreError> {
        let tasks = store.load_tasks(project)?;
        tracing::debug!(project = %project, count = tasks.len(), user = %actor.name, "session opened");
        Ok(Session {
            actor,
            tree: TaskTree::new(project, tasks),
            saver: DebouncedSaver::spawn(store, project, debounce),
        })
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn project(&self) -> ProjectType {
        self.tree.project
    }

    pub fn tasks(&self) -> &[MainTask] {
        &self.tree.tasks
    }

    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    pub fn stats(&self) -> ScheduleStats {
        self.tree.stats()
    }

    pub fn update_field(
        &mut self,
        task_id: &str,
        parent_id: Option<&str>,
        update: FieldUpdate,
    ) -> Result<Outcome, TaskError> {
        let outcome = self.tree.update_field(&self.actor, task_id, parent_id, update)?;
        Ok(self.record("update", task_id, outcome))
    }

    pub fn add_main_task(&mut self, title: &str) -> Result<Outcome, TaskError> {
        let outcome = self.tree.add_main_task(&self.actor, title)?;
        Ok(self.record("add", title, outcome))
    }

    pub fn add_subtask(&mut self, parent_id: &str) -> Result<Outcome, TaskError> {
        let outcome = self.tree.add_subtask(&self.actor, parent_id)?;
        Ok(self.record("add subtask", parent_id, outcome))
    }

    pub fn delete_task(&mut self, task_id: &str, parent_id: Option<&str>) -> Result<Outcome, TaskError> {
        let outcome = self.tree.delete_task(&self.actor, task_id, parent_id)?;
        Ok(self.record("delete", task_id, outcome))
    }

    pub fn toggle_expanded(&mut self, task_id: &str) -> Result<Outcome, TaskError> {
        let outcome = self.tree.toggle_expanded(task_id)?;
        Ok(self.record("expand", task_id, outcome))
    }

    pub fn toggle_locked(&mut self, task_id: &str, parent_id: Option<&str>) -> Result<Outcome, TaskError> {
        let outcome = self.tree.toggle_locked(&self.actor, task_id, parent_id)?;
        Ok(self.record("lock", task_id, outcome))
    }

    fn record(&self, op: &str, target: &str, outcome: Outcome) -> Outcome {
        if outcome.changed() {
            self.saver.schedule(self.tree.tasks.clone());
        } else {
            tracing::debug!(op, target, user = %self.actor.name, role = %self.actor.role, "mutation denied");
        }
        outcome
    }

    /// Write any pending change now.
    pub fn flush(&self) {
        self.saver.flush();
    }

    /// End the session, writing whatever is pending.
    pub fn close(self) -> SaveReport {
        self.saver.finish()
    }
}
