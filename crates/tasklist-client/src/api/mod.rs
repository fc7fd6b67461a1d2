//! API endpoint implementations.

mod health;
mod tasks;

pub use health::{HealthApi, HealthResponse};
pub use tasks::TasksApi;
