//! Typed HTTP client for tasklist.
//!
//! Works against the backend directly (bearer token) or through the session
//! bridge (session cookie); the API surface is the same either way.
//!
//! # Example
//!
//! ```no_run
//! use tasklist_client::{Result, TasklistClient};
//!
//! # async fn example() -> Result<()> {
//! let client = TasklistClient::builder()
//!     .base_url("http://localhost:3000")
//!     .session_cookie("tasklist-session", "eyJhY2Nlc3NfdG9rZW4iOi4uLn0")
//!     .build()?;
//!
//! let task = client.tasks().create("buy milk").await?;
//! client.tasks().set_completed(task.id.as_str(), true).await?;
//! client.tasks().delete(task.id.as_str()).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;

pub use api::{HealthApi, HealthResponse, TasksApi};
pub use client::{BRIDGE_PREFIX, ClientBuilder, DIRECT_PREFIX, TasklistClient};
pub use error::{Error, Result};
pub use tasklist_types::{Task, TaskId};
