//! Remote task table reached over the managed database's REST interface.
//!
//! Requests follow PostgREST conventions: `column=eq.value` filters,
//! `order=created_at.desc`, and `Prefer: return=representation` so writes
//! echo the affected rows back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tasklist_types::{SubjectId, Task, TaskId};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::{TaskStore, validate_text};

/// Connection settings for the remote table.
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Base URL of the managed database, e.g. `https://xyz.example.co`.
    pub base_url: String,
    /// Service key sent as both `apikey` and bearer credential.
    pub service_key: String,
    /// Table name.
    pub table: String,
    pub timeout: Duration,
}

impl RestStoreConfig {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: service_key.into(),
            table: "tasks".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Row as returned by the remote table.
///
/// The id column may be numeric or textual depending on how the table was
/// created, so it is kept as raw JSON and rendered as an opaque string.
#[derive(Debug, Deserialize)]
struct RemoteRow {
    id: serde_json::Value,
    text: String,
    #[serde(default)]
    completed: bool,
    created_at: DateTime<Utc>,
    owner_id: String,
}

impl From<RemoteRow> for Task {
    fn from(row: RemoteRow) -> Self {
        let id = match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Task {
            id: TaskId::new(id),
            text: row.text,
            completed: row.completed,
            created_at: row.created_at,
            owner_id: SubjectId::new(row.owner_id),
        }
    }
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    text: &'a str,
    owner_id: &'a str,
    completed: bool,
}

#[derive(Debug, Serialize)]
struct CompletedPatch {
    completed: bool,
}

/// Task store backed by a remote REST table.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    config: RestStoreConfig,
}

impl RestStore {
    /// Create a store with its own HTTP client.
    pub fn new(config: RestStoreConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Create a store sharing an existing HTTP client.
    pub fn with_client(client: Client, config: RestStoreConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RestStoreConfig {
        &self.config
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.table_url())
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    /// Turn a non-success response into [`StoreError::Upstream`], keeping
    /// the remote `message` field when the body carries one.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);

        Err(StoreError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    async fn rows(response: Response) -> Result<Vec<RemoteRow>> {
        let response = Self::check(response).await?;
        response
            .json::<Vec<RemoteRow>>()
            .await
            .map_err(|e| StoreError::InvalidData(format!("Failed to parse rows: {}", e)))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl TaskStore for RestStore {
    async fn list_tasks(&self, owner: &SubjectId) -> Result<Vec<Task>> {
        let response = self
            .request(Method::GET)
            .query(&[
                ("select", "*".to_string()),
                ("owner_id", eq(owner.as_str())),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;

        let rows = Self::rows(response).await?;
        debug!(owner = %owner, count = rows.len(), "Listed remote tasks");
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn create_task(&self, owner: &SubjectId, text: &str) -> Result<Task> {
        let text = validate_text(text)?;

        let response = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&InsertRow {
                text,
                owner_id: owner.as_str(),
                completed: false,
            })
            .send()
            .await?;

        let row = Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidData("insert returned no rows".to_string()))?;

        let task = Task::from(row);
        debug!(task_id = %task.id, owner = %owner, "Inserted remote task");
        Ok(task)
    }

    async fn delete_task(&self, owner: &SubjectId, id: &TaskId) -> Result<bool> {
        let response = self
            .request(Method::DELETE)
            .header("Prefer", "return=representation")
            .query(&[("id", eq(id.as_str())), ("owner_id", eq(owner.as_str()))])
            .send()
            .await?;

        let deleted = Self::rows(response).await?;
        debug!(task_id = %id, owner = %owner, rows_affected = deleted.len(), "Deleted remote task");
        Ok(!deleted.is_empty())
    }

    async fn set_completed(
        &self,
        owner: &SubjectId,
        id: &TaskId,
        completed: bool,
    ) -> Result<Option<Task>> {
        let response = self
            .request(Method::PATCH)
            .header("Prefer", "return=representation")
            .query(&[("id", eq(id.as_str())), ("owner_id", eq(owner.as_str()))])
            .json(&CompletedPatch { completed })
            .send()
            .await?;

        Ok(Self::rows(response).await?.into_iter().next().map(Task::from))
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
