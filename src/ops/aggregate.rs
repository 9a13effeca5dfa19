use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::task::{MainTask, Task, TaskStatus};
use crate::ops::access::Actor;
use crate::ops::time_math;

/// `round((100*completed + 50*in_progress) / total)`, rounding halves up.
/// Zero when there is nothing to count.
pub fn weighted_progress(completed: usize, in_progress: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let points = 100 * completed + 50 * in_progress;
    let rounded = (2 * points + total) / (2 * total);
    rounded.min(100) as u8
}

/// Progress and status a derived task gets from its subtasks.
/// `OnHold` is never produced here.
pub fn rollup(subtasks: &[Task]) -> (u8, TaskStatus) {
    let total = subtasks.len();
    let completed = count_status(subtasks.iter(), TaskStatus::Completed);
    let in_progress = count_status(subtasks.iter(), TaskStatus::InProgress);

    let status = if completed == total {
        TaskStatus::Completed
    } else if completed > 0 || in_progress > 0 {
        TaskStatus::InProgress
    } else {
        TaskStatus::NotStarted
    };
    (weighted_progress(completed, in_progress, total), status)
}

fn count_status<'a>(tasks: impl Iterator<Item = &'a Task>, status: TaskStatus) -> usize {
    tasks.filter(|t| t.status == status).count()
}

/// Earliest start and latest end among subtasks that have both times set.
pub fn time_window(subtasks: &[Task]) -> Option<(String, String)> {
    let timed = subtasks.iter().filter_map(|s| match (&s.start_time, &s.end_time) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    });
    timed.fold(None, |acc, (start, end)| match acc {
        None => Some((start.clone(), end.clone())),
        Some((lo, hi)) => Some((
            if *start < lo { start.clone() } else { lo },
            if *end > hi { end.clone() } else { hi },
        )),
    })
}

/// Write a status onto a leaf task, with completion bookkeeping.
pub fn apply_leaf_status(task: &mut Task, new_status: TaskStatus, actor: &Actor, now: DateTime<Utc>) {
    if new_status == TaskStatus::Completed {
        if task.status != TaskStatus::Completed || task.completed_at.is_none() {
            task.completed_at = Some(now);
            task.completed_by = Some(actor.name.clone());
            task.progress = 100;
            task.total_time =
                time_math::duration_opt(task.start_time.as_deref(), task.end_time.as_deref());
        }
    } else {
        task.completed_at = None;
        task.completed_by = None;
        task.total_time = None;
        task.progress = if new_status == TaskStatus::InProgress { 50 } else { 0 };
    }
    task.status = new_status;
}

/// Recompute a derived main task from its subtasks.
///
/// `previous` is the status the task had before the mutation that triggered
/// this pass; completion bookkeeping fires on transitions relative to it.
/// Leaf main tasks are left alone.
pub fn refresh_main(main: &mut MainTask, previous: TaskStatus, actor: &Actor, now: DateTime<Utc>) {
    if !main.is_derived() {
        return;
    }

    // No timed subtask: keep the last window we had.
    if let Some((start, end)) = time_window(&main.subtasks) {
        main.task.start_time = Some(start);
        main.task.end_time = Some(end);
    }

    let (progress, status) = rollup(&main.subtasks);
    let task = &mut main.task;
    task.progress = progress;
    task.status = status;

    if status == TaskStatus::Completed {
        if previous != TaskStatus::Completed || task.completed_at.is_none() {
            task.completed_at = Some(now);
            task.completed_by = Some(actor.name.clone());
        }
        task.total_time =
            time_math::duration_opt(task.start_time.as_deref(), task.end_time.as_deref());
    } else {
        task.completed_at = None;
        task.completed_by = None;
        task.total_time = None;
    }
}

/// Status shown for a main task: rolled up when derived, stored otherwise.
pub fn effective_status(main: &MainTask) -> TaskStatus {
    if main.is_derived() {
        rollup(&main.subtasks).1
    } else {
        main.task.status
    }
}

/// Dashboard counts over main tasks and their direct subtasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub remaining: usize,
    pub overall_progress: u8,
}

pub fn schedule_stats(tasks: &[MainTask]) -> ScheduleStats {
    let mut stats = ScheduleStats::default();
    let mut tally = |status: TaskStatus| {
        stats.total += 1;
        match status {
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::NotStarted | TaskStatus::OnHold => {}
        }
    };
    for main in tasks {
        tally(effective_status(main));
        for sub in &main.subtasks {
            tally(sub.status);
        }
    }
    stats.remaining = stats.total - stats.completed;
    stats.overall_progress = weighted_progress(stats.completed, stats.in_progress, stats.total);
    stats
}
