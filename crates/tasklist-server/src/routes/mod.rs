//! API routes.

pub mod health;
pub mod tasks;

pub use health::{HealthResponse, health_routes};
pub use tasks::{
    create_task_handler, delete_task_handler, list_tasks_handler, update_task_handler,
};
