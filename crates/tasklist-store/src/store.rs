//! The `TaskStore` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tasklist_types::{MAX_TASK_TEXT_LEN, SubjectId, Task, TaskId};

use crate::error::{Result, StoreError};

/// Owner-scoped task storage.
///
/// Implementations must filter every read, update and delete on `owner`.
/// A row that exists but belongs to someone else is indistinguishable from
/// a row that does not exist.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// List the owner's tasks, newest first.
    async fn list_tasks(&self, owner: &SubjectId) -> Result<Vec<Task>>;

    /// Create a task with `completed = false`.
    ///
    /// Fails with [`StoreError::Validation`] for empty text; nothing is
    /// written in that case.
    async fn create_task(&self, owner: &SubjectId, text: &str) -> Result<Task>;

    /// Delete a task matched by both `id` and `owner`.
    ///
    /// Returns `false` when nothing matched.
    async fn delete_task(&self, owner: &SubjectId, id: &TaskId) -> Result<bool>;

    /// Set the completion flag on a task matched by both `id` and `owner`.
    async fn set_completed(
        &self,
        owner: &SubjectId,
        id: &TaskId,
        completed: bool,
    ) -> Result<Option<Task>>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Shared store handle injected into request handlers.
pub type SharedTaskStore = Arc<dyn TaskStore>;

/// Validate task text and return it trimmed.
pub fn validate_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation("task text must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TASK_TEXT_LEN {
        return Err(StoreError::Validation(format!(
            "task text must be at most {} characters",
            MAX_TASK_TEXT_LEN
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_trims() {
        assert_eq!(validate_text("  buy milk \n").unwrap(), "buy milk");
    }

    #[test]
    fn test_validate_text_rejects_empty() {
        assert!(matches!(validate_text(""), Err(StoreError::Validation(_))));
        assert!(matches!(validate_text(" \t\n"), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_validate_text_rejects_too_long() {
        let long = "x".repeat(MAX_TASK_TEXT_LEN + 1);
        assert!(matches!(validate_text(&long), Err(StoreError::Validation(_))));

        let limit = "x".repeat(MAX_TASK_TEXT_LEN);
        assert!(validate_text(&limit).is_ok());
    }
}
