use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Path of the todo collection, shared by the router and the browser client.
pub const TODO_API_PATH: &str = "/api/todo";

/// Path of the change-notification stream.
pub const TODO_EVENTS_PATH: &str = "/api/todo/events";

/// A todo as the API exposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    #[serde(rename = "todo")]
    pub text: String,
    #[serde(rename = "isCompleted")]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Todo {
    /// Case-insensitive substring match used by the list filter.
    pub fn matches_filter(&self, filter: &str) -> bool {
        matches_filter(&self.text, filter)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateTodoRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }
}

/// Body of a successful create or update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoResponse {
    pub success: bool,
    pub todo: Todo,
}

/// Body of a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Payload of one change-stream event. Receivers treat every event as a
/// signal to re-fetch; the payload is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("text required")]
pub struct EmptyText;

/// Trims `raw` and rejects it if nothing is left.
pub fn normalize_text(raw: &str) -> Result<String, EmptyText> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(EmptyText)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn matches_filter(text: &str, filter: &str) -> bool {
    filter.is_empty() || text.to_lowercase().contains(&filter.to_lowercase())
}
