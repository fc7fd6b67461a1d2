//! Task records and the identifiers that scope them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on task text, in characters.
pub const MAX_TASK_TEXT_LEN: usize = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque task identifier.
///
/// Stores hand these out; callers never parse them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wrap an identifier produced by a store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Stable identity of an authenticated end user.
///
/// Taken from the `sub` claim of a verified bearer credential and used to
/// scope every task operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────────────────────────

/// A single todo item owned by exactly one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub owner_id: SubjectId,
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub text: String,
}

/// Body of `PATCH /api/tasks/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_wire_format_is_snake_case() {
        let task = Task {
            id: TaskId::new("t-1"),
            text: "buy milk".to_string(),
            completed: false,
            created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
            owner_id: SubjectId::new("user-1"),
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "t-1");
        assert_eq!(json["owner_id"], "user-1");
        assert_eq!(json["completed"], false);
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn test_task_completed_defaults_to_false() {
        let json = r#"{
            "id": "t-2",
            "text": "walk dog",
            "created_at": "2024-05-01T10:00:00Z",
            "owner_id": "user-1"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(!task.completed);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(TaskId::generate(), TaskId::generate());
    }
}
