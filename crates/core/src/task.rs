//! Task record types for the async task substrate (C6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn pending(id: Uuid) -> Self {
        Self {
            id,
            state: TaskState::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, TaskState::Success | TaskState::Failure)
    }
}

/// The `/v1/tasks/status/{id}` response shape (spec 4.6): a flat object
/// `{task_id, status, result?, error?}`, not an internally-tagged enum,
/// so it's modeled as a plain struct with a status tag field.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
}

impl From<&TaskRecord> for TaskStatusResponse {
    fn from(record: &TaskRecord) -> Self {
        match record.state {
            TaskState::Pending | TaskState::Started => TaskStatusResponse {
                task_id: record.id,
                status: TaskStatus::InProgress,
                result: None,
                error: None,
            },
            TaskState::Success => TaskStatusResponse {
                task_id: record.id,
                status: TaskStatus::Completed,
                result: Some(record.result.clone().unwrap_or_default()),
                error: None,
            },
            TaskState::Failure => TaskStatusResponse {
                task_id: record.id,
                status: TaskStatus::Failed,
                result: None,
                error: Some(record.error.clone().unwrap_or_else(|| "unknown error".to_string())),
            },
        }
    }
}
