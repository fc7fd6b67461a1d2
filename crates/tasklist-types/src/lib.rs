//! Shared types for the tasklist services.
//!
//! The backend, the session bridge, the record store and the client all
//! speak in terms of these types, so they live in a leaf crate with no
//! dependencies beyond serde, chrono and uuid.

pub mod task;

pub use task::{
    CreateTaskRequest, MAX_TASK_TEXT_LEN, SubjectId, Task, TaskId, UpdateTaskRequest,
};
