//! Tasks API.

use tasklist_types::{CreateTaskRequest, Task, UpdateTaskRequest};

use crate::client::TasklistClient;
use crate::error::Result;

/// Tasks API client.
pub struct TasksApi {
    client: TasklistClient,
}

impl TasksApi {
    pub(crate) fn new(client: TasklistClient) -> Self {
        Self { client }
    }

    /// List the caller's tasks, newest first.
    pub async fn list(&self) -> Result<Vec<Task>> {
        self.client.get("tasks").await
    }

    /// Create a task.
    pub async fn create(&self, text: &str) -> Result<Task> {
        let request = CreateTaskRequest {
            text: text.to_string(),
        };
        self.client.post("tasks", &request).await
    }

    /// Mark a task done or not done.
    pub async fn set_completed(&self, id: &str, completed: bool) -> Result<Task> {
        self.client
            .patch(&format!("tasks/{}", id), &UpdateTaskRequest { completed })
            .await
    }

    /// Delete a task. Succeeds whether or not the task existed.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("tasks/{}", id)).await
    }
}
