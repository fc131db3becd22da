use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: String,
    pub deadline: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Upcoming Task")]
    Upcoming,
    #[serde(rename = "Ongoing Task")]
    Ongoing,
    #[serde(rename = "Successful Task")]
    Successful,
    #[serde(rename = "Failed Task")]
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Upcoming,
        TaskStatus::Ongoing,
        TaskStatus::Successful,
        TaskStatus::Failed,
    ];

    /// Label used on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming Task",
            Self::Ongoing => "Ongoing Task",
            Self::Successful => "Successful Task",
            Self::Failed => "Failed Task",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Accepts the wire label or a short name (`upcoming`, `done`, `failed`, ...).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Some(status) = Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
        {
            return Ok(status);
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "successful" | "success" | "done" => Ok(Self::Successful),
            "failed" | "failure" => Ok(Self::Failed),
            _ => Err(format!("unknown status '{trimmed}'")),
        }
    }
}

/// Body of a create request, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NewTask {
    Simple {
        #[serde(rename = "textInput")]
        text_input: String,
    },
    Custom {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time: Option<String>,
        deadline: String,
    },
}

/// Partial field set for `PUT /task/:id`. `description: Some(None)` is sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    /// Every editable field of `task`, unchanged.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            start_time: Some(task.start_time.clone()),
            deadline: Some(task.deadline.clone()),
            status: Some(task.status),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_time.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
    }
}
