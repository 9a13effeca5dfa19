use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::task::{MainTask, Task, TaskStatus};

/// Error type for task document decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid task document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("subtask {0} has subtasks of its own (only one level of nesting is allowed)")]
    NestedSubtask(String),
    #[error("task {id} has progress {progress} (expected 0-100)")]
    ProgressOutOfRange { id: String, progress: u32 },
    #[error("task {id} has invalid {field} '{value}' (expected HH:MM)")]
    BadTime {
        id: String,
        field: &'static str,
        value: String,
    },
}

/// The stored shape of a task. Both nesting levels share it; the typed
/// conversion rejects anything deeper than one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub subtasks: Vec<WireTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expanded: Option<bool>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_time: Option<String>,
    #[serde(default)]
    pub completed_by: Option<String>,
    #[serde(default)]
    pub locked: bool,
}

impl WireTask {
    fn into_task(self) -> Result<(Task, Vec<WireTask>, Option<bool>), DecodeError> {
        let start_time = time_field(&self.id, "startTime", self.start_time)?;
        let end_time = time_field(&self.id, "endTime", self.end_time)?;
        let progress = u8::try_from(self.progress)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| DecodeError::ProgressOutOfRange {
                id: self.id.clone(),
                progress: self.progress,
            })?;
        let task = Task {
            id: self.id,
            title: self.title,
            start_time,
            end_time,
            status: self.status,
            progress,
            completed_at: self.completed_at,
            total_time: self.total_time.filter(|t| !t.is_empty()),
            completed_by: self.completed_by,
            locked: self.locked,
            expanded: None,
        };
        Ok((task, self.subtasks, self.is_expanded))
    }

    fn from_task(task: &Task, subtasks: Vec<WireTask>, is_expanded: Option<bool>) -> Self {
        WireTask {
            id: task.id.clone(),
            title: task.title.clone(),
            start_time: task.start_time.clone().unwrap_or_default(),
            end_time: task.end_time.clone().unwrap_or_default(),
            status: task.status,
            progress: u32::from(task.progress),
            subtasks,
            is_expanded,
            completed_at: task.completed_at,
            total_time: task.total_time.clone(),
            completed_by: task.completed_by.clone(),
            locked: task.locked,
        }
    }
}

fn time_field(id: &str, field: &'static str, value: String) -> Result<Option<String>, DecodeError> {
    if value.is_empty() {
        return Ok(None);
    }
    if !crate::ops::time_math::is_valid_hhmm(&value) {
        return Err(DecodeError::BadTime {
            id: id.to_string(),
            field,
            value,
        });
    }
    Ok(Some(value))
}

impl TryFrom<WireTask> for MainTask {
    type Error = DecodeError;

    fn try_from(wire: WireTask) -> Result<Self, Self::Error> {
        let (task, children, is_expanded) = wire.into_task()?;
        let mut subtasks = Vec::with_capacity(children.len());
        for child in children {
            let child_id = child.id.clone();
            let (mut sub, grandchildren, expanded) = child.into_task()?;
            if !grandchildren.is_empty() {
                return Err(DecodeError::NestedSubtask(child_id));
            }
            sub.expanded = expanded;
            subtasks.push(sub);
        }
        Ok(MainTask {
            task,
            subtasks,
            is_expanded: is_expanded.unwrap_or(true),
        })
    }
}

impl From<&MainTask> for WireTask {
    fn from(main: &MainTask) -> Self {
        let subtasks = main
            .subtasks
            .iter()
            .map(|s| WireTask::from_task(s, Vec::new(), s.expanded))
            .collect();
        WireTask::from_task(&main.task, subtasks, Some(main.is_expanded))
    }
}

/// Convert decoded wire tasks into the typed tree
pub fn from_wire(wire: Vec<WireTask>) -> Result<Vec<MainTask>, DecodeError> {
    wire.into_iter().map(MainTask::try_from).collect()
}

pub fn to_wire(tasks: &[MainTask]) -> Vec<WireTask> {
    tasks.iter().map(WireTask::from).collect()
}

/// Parse a JSON array of main tasks
pub fn parse_tasks(json: &str) -> Result<Vec<MainTask>, DecodeError> {
    let wire: Vec<WireTask> = serde_json::from_str(json)?;
    from_wire(wire)
}

/// Serialize main tasks as a pretty-printed JSON array
pub fn serialize_tasks(tasks: &[MainTask]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&to_wire(tasks))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
      {
        "id": "task-1",
        "title": "Foundation",
        "startTime": "08:00",
        "endTime": "10:00",
        "status": "In Progress",
        "progress": 75,
        "isExpanded": false,
        "completedAt": null,
        "totalTime": null,
        "completedBy": null,
        "locked": false,
        "subtasks": [
          {
            "id": "subtask-1",
            "title": "Dig",
            "startTime": "08:00",
            "endTime": "09:00",
            "status": "Completed",
            "progress": 100,
            "subtasks": [],
            "completedAt": "2025-07-10T09:00:00.000Z",
            "totalTime": "1h",
            "completedBy": "admin",
            "locked": true
          },
          {
            "id": "subtask-2",
            "title": "Pour",
            "startTime": "",
            "endTime": "",
            "status": "In Progress",
            "progress": 50,
            "subtasks": []
          }
        ]
      }
    ]"#;

    #[test]
    fn parse_sample_document() {
        let tasks = parse_tasks(SAMPLE).unwrap();
        assert_eq!(tasks.len(), 1);
        let main = &tasks[0];
        assert_eq!(main.task.title, "Foundation");
        assert!(!main.is_expanded);
        assert_eq!(main.subtasks.len(), 2);

        let dig = &main.subtasks[0];
        assert_eq!(dig.status, TaskStatus::Completed);
        assert_eq!(dig.completed_by.as_deref(), Some("admin"));
        assert!(dig.completed_at.is_some());
        assert!(dig.locked);

        let pour = &main.subtasks[1];
        assert!(pour.start_time.is_none());
        assert!(pour.end_time.is_none());
        assert!(pour.completed_at.is_none());
        assert!(!pour.locked);
    }

    #[test]
    fn missing_is_expanded_defaults_to_true() {
        let json = r#"[{"id":"task-1","title":"A","status":"Not Started","progress":0,"subtasks":[]}]"#;
        let tasks = parse_tasks(json).unwrap();
        assert!(tasks[0].is_expanded);
    }

    #[test]
    fn subtask_expanded_flag_is_kept() {
        let json = r#"[{"id":"task-1","title":"A","status":"Not Started","progress":0,
            "subtasks":[
              {"id":"subtask-1","title":"B","status":"Not Started","progress":0,"isExpanded":false},
              {"id":"subtask-2","title":"C","status":"Not Started","progress":0}]}]"#;
        let tasks = parse_tasks(json).unwrap();
        assert_eq!(tasks[0].subtasks[0].expanded, Some(false));
        assert_eq!(tasks[0].subtasks[1].expanded, None);

        let doc: serde_json::Value = serde_json::from_str(&serialize_tasks(&tasks).unwrap()).unwrap();
        let subs = &doc[0]["subtasks"];
        assert_eq!(subs[0]["isExpanded"], false);
        assert!(subs[1].get("isExpanded").is_none());
    }

    #[test]
    fn nested_subtasks_are_rejected() {
        let json = r#"[{"id":"task-1","title":"A","status":"Not Started","progress":0,
            "subtasks":[{"id":"subtask-1","title":"B","status":"Not Started","progress":0,
              "subtasks":[{"id":"deep","title":"C","status":"Not Started","progress":0,"subtasks":[]}]}]}]"#;
        let err = parse_tasks(json).unwrap_err();
        assert!(matches!(err, DecodeError::NestedSubtask(ref id) if id == "subtask-1"));
    }

    #[test]
    fn progress_over_100_is_rejected() {
        let json = r#"[{"id":"task-1","title":"A","status":"Not Started","progress":150,"subtasks":[]}]"#;
        assert!(matches!(
            parse_tasks(json),
            Err(DecodeError::ProgressOutOfRange { progress: 150, .. })
        ));
    }

    #[test]
    fn malformed_time_is_rejected() {
        let json = r#"[{"id":"task-1","title":"A","startTime":"8am","status":"Not Started","progress":0,"subtasks":[]}]"#;
        assert!(matches!(parse_tasks(json), Err(DecodeError::BadTime { .. })));
    }

    #[test]
    fn serialize_then_parse_preserves_tree() {
        let tasks = parse_tasks(SAMPLE).unwrap();
        let text = serialize_tasks(&tasks).unwrap();
        assert!(text.contains("\"startTime\": \"\""));
        assert!(text.contains("\"isExpanded\": false"));
        let again = parse_tasks(&text).unwrap();
        assert_eq!(again, tasks);
    }
}
