use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One of the two fixed scheduling contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Build,
    Destroy,
}

impl ProjectType {
    pub const ALL: [ProjectType; 2] = [ProjectType::Build, ProjectType::Destroy];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Build => "build",
            ProjectType::Destroy => "destroy",
        }
    }

    /// Title used when a project is created or saved without one
    pub fn default_title(self) -> &'static str {
        match self {
            ProjectType::Build => "Build Day",
            ProjectType::Destroy => "Destroy Day",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(ProjectType::Build),
            "destroy" => Ok(ProjectType::Destroy),
            "" => Err("project identifier is required".to_string()),
            _ => Err(format!(
                "unknown project '{}' (expected: build, destroy)",
                s
            )),
        }
    }
}

/// Project metadata as stored in projects.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_type: ProjectType,
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Default record for a project identifier
    pub fn with_defaults(project_type: ProjectType, now: DateTime<Utc>) -> Self {
        Project {
            project_type,
            title: project_type.default_title().to_string(),
            date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_project_type() {
        assert_eq!("build".parse::<ProjectType>(), Ok(ProjectType::Build));
        assert_eq!("destroy".parse::<ProjectType>(), Ok(ProjectType::Destroy));
        assert!("".parse::<ProjectType>().is_err());
        assert!("Build".parse::<ProjectType>().is_err());
    }

    #[test]
    fn default_titles() {
        let now = Utc::now();
        assert_eq!(Project::with_defaults(ProjectType::Build, now).title, "Build Day");
        assert_eq!(
            Project::with_defaults(ProjectType::Destroy, now).title,
            "Destroy Day"
        );
    }

    #[test]
    fn project_json_shape() {
        let json = r#"{
            "project_type": "destroy",
            "title": "Teardown",
            "date": "2025-07-13",
            "created_at": "2025-07-01T08:00:00.000Z",
            "updated_at": "2025-07-02T08:00:00.000Z"
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.project_type, ProjectType::Destroy);
        assert_eq!(project.date, NaiveDate::from_ymd_opt(2025, 7, 13));

        let null_date = r#"{"project_type":"build","title":"Build Day","date":null,
            "created_at":"2025-07-01T08:00:00Z","updated_at":"2025-07-01T08:00:00Z"}"#;
        let project: Project = serde_json::from_str(null_date).unwrap();
        assert!(project.date.is_none());
    }
}
