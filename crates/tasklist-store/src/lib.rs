//! Owner-scoped task storage.
//!
//! Every operation takes the caller's [`SubjectId`] and filters on it, so a
//! subject can never read, update or delete another subject's rows. Two
//! implementations share the [`TaskStore`] trait:
//!
//! - [`RestStore`] - a remote table on the managed database, reached over its
//!   REST interface with a service key
//! - [`SqliteStore`] - a local SQLite table for development and tests
//!
//! [`SubjectId`]: tasklist_types::SubjectId

pub mod error;
pub mod rest;
pub mod sqlite;
pub mod store;

pub use error::{Result, StoreError};
pub use rest::{RestStore, RestStoreConfig};
pub use sqlite::SqliteStore;
pub use store::{SharedTaskStore, TaskStore, validate_text};
