use chrono::NaiveDate;
use serde::Serialize;

use crate::model::project::{Project, ProjectType};
use crate::model::task::{MainTask, Task};
use crate::ops::aggregate::ScheduleStats;
use crate::parse::task_json::{self, WireTask};
use crate::util::unicode::{display_width, pad_to_width};

const MAX_TITLE_WIDTH: usize = 32;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ListJson {
    pub project: ProjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub tasks: Vec<WireTask>,
    pub stats: ScheduleStats,
}

#[derive(Serialize)]
pub struct MutationJson {
    pub project: ProjectType,
    pub id: String,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

#[derive(Serialize)]
pub struct PruneJson {
    pub removed: Vec<String>,
}

pub fn list_json(project: ProjectType, meta: Option<&Project>, tasks: &[MainTask], stats: ScheduleStats) -> ListJson {
    ListJson {
        project,
        title: meta.map(|p| p.title.clone()),
        date: meta.and_then(|p| p.date),
        tasks: task_json::to_wire(tasks),
        stats,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Column widths shared by every line of a listing
#[derive(Debug, Clone, Copy)]
pub struct Columns {
    label: usize,
    title: usize,
}

impl Columns {
    pub fn fit(tasks: &[MainTask]) -> Self {
        let mut cols = Columns { label: 0, title: 0 };
        for main in tasks {
            cols.widen(&main.task, 0);
            if main.is_expanded {
                for sub in &main.subtasks {
                    cols.widen(sub, 1);
                }
            }
        }
        cols.title = cols.title.min(MAX_TITLE_WIDTH);
        cols
    }

    fn widen(&mut self, task: &Task, indent: usize) {
        self.label = self.label.max(display_width(&label(task, indent)));
        self.title = self.title.max(display_width(&task.title));
    }
}

fn label(task: &Task, indent: usize) -> String {
    format!("{}[{}] {}", "  ".repeat(indent), task.status.marker(), task.id)
}

fn window(task: &Task) -> String {
    format!(
        "{} - {}",
        task.start_time.as_deref().unwrap_or("--:--"),
        task.end_time.as_deref().unwrap_or("--:--")
    )
}

/// One task as a single aligned line
pub fn format_task_line(task: &Task, indent: usize, cols: Columns) -> String {
    let mut line = format!(
        "{}  {}  {}  {:>3}%  {}",
        pad_to_width(&label(task, indent), cols.label),
        pad_to_width(&task.title, cols.title),
        window(task),
        task.progress,
        task.status.label()
    );
    if let Some(total) = &task.total_time {
        line.push_str(&format!("  {}", total));
    }
    if let Some(who) = &task.completed_by {
        line.push_str(&format!("  by {}", who));
    }
    if task.locked {
        line.push_str("  [locked]");
    }
    line
}

/// A main task followed by its subtasks when expanded
pub fn format_main_task(main: &MainTask, cols: Columns) -> Vec<String> {
    let mut lines = vec![format_task_line(&main.task, 0, cols)];
    if main.is_expanded {
        for sub in &main.subtasks {
            lines.push(format_task_line(sub, 1, cols));
        }
    } else if !main.subtasks.is_empty() {
        let n = main.subtasks.len();
        let last = lines.len() - 1;
        lines[last].push_str(&format!("  (+{} {})", n, if n == 1 { "subtask" } else { "subtasks" }));
    }
    lines
}

pub fn format_header(project: ProjectType, meta: Option<&Project>) -> String {
    let title = meta
        .map(|p| p.title.as_str())
        .unwrap_or(project.default_title());
    match meta.and_then(|p| p.date) {
        Some(date) => format!("== {} ({}) {} ==", title, project, date),
        None => format!("== {} ({}) ==", title, project),
    }
}

pub fn format_listing(project: ProjectType, meta: Option<&Project>, tasks: &[MainTask]) -> Vec<String> {
    let mut lines = vec![format_header(project, meta), String::new()];
    if tasks.is_empty() {
        lines.push("(no tasks)".to_string());
        return lines;
    }
    let cols = Columns::fit(tasks);
    for main in tasks {
        lines.extend(format_main_task(main, cols));
    }
    lines
}

pub fn format_stats(stats: &ScheduleStats) -> Vec<String> {
    vec![
        format!("total:        {}", stats.total),
        format!("completed:    {}", stats.completed),
        format!("in progress:  {}", stats.in_progress),
        format!("remaining:    {}", stats.remaining),
        format!("progress:     {}%", stats.overall_progress),
    ]
}

pub fn format_project(project: &Project) -> String {
    let date = project
        .date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "(no date)".to_string());
    format!("{:<8} {}  {}", project.project_type.as_str(), project.title, date)
}
