//! Configuration system for the tasklist services.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (XDG user config + project-local overrides)
//! - Environment variable overrides for deployment secrets and URLs
//! - Per-command validation (`serve` needs a signing secret, `bridge`
//!   needs backend and identity provider URLs)
//!
//! Cookie attributes for cross-site deployments (`SameSite=None; Secure`)
//! are ordinary settings under `[bridge.cookie]`.

pub mod discovery;
pub mod env;
pub mod error;
pub mod types;

pub use discovery::{LoadedConfig, SearchPaths, load_config, load_config_file, xdg_config_dir};
pub use env::apply_env_overrides;
pub use error::{ConfigError, Result};
pub use types::*;
