//! Finding config files and folding them into one [`TasklistConfig`].
//!
//! Without `--config`, two files are read when present, user-wide first:
//! `$TASKLIST_CONFIG_DIR/config.toml` (or the platform config dir) and
//! `./tasklist.toml`. With `--config`, exactly that file is read and it must
//! exist. Environment overrides go on top either way.

use std::path::{Path, PathBuf};

use crate::env::apply_env_overrides;
use crate::{ConfigError, Result, TasklistConfig};

const PROJECT_CONFIG_FILE: &str = "tasklist.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "TASKLIST_CONFIG_DIR";

/// Where config files are looked up.
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    /// A single file to read instead of discovering any.
    pub explicit: Option<PathBuf>,
    /// Directory holding the user config; `None` means [`xdg_config_dir`].
    pub user_dir: Option<PathBuf>,
    /// Directory holding `tasklist.toml`; `None` means the working directory.
    pub project_dir: Option<PathBuf>,
}

impl SearchPaths {
    /// Read only `path`.
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
            ..Self::default()
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let user = self
            .user_dir
            .clone()
            .or_else(xdg_config_dir)
            .map(|dir| dir.join(USER_CONFIG_FILE));
        let project = match &self.project_dir {
            Some(dir) => dir.join(PROJECT_CONFIG_FILE),
            None => PathBuf::from(PROJECT_CONFIG_FILE),
        };
        user.into_iter().chain(Some(project)).collect()
    }
}

/// A merged config plus what went into it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TasklistConfig,
    /// Files that were read, lowest precedence first.
    pub loaded_from: Vec<PathBuf>,
    /// Unreadable layers and secrets found in files.
    pub warnings: Vec<String>,
}

/// Read the config files named by `search`, then apply environment
/// overrides from `env`.
///
/// A discovered file that fails to parse is skipped with a warning; an
/// explicit file that is missing or broken is an error.
pub fn load_config<F>(search: &SearchPaths, env: F) -> Result<LoadedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut loaded = LoadedConfig {
        config: TasklistConfig::new(),
        loaded_from: Vec::new(),
        warnings: Vec::new(),
    };

    if let Some(path) = &search.explicit {
        let layer = load_config_file(path)?;
        loaded.add_layer(path, layer);
    } else {
        for path in search.candidates() {
            if !path.is_file() {
                continue;
            }
            match load_config_file(&path) {
                Ok(layer) => loaded.add_layer(&path, layer),
                Err(e) => loaded
                    .warnings
                    .push(format!("Skipping {}: {}", path.display(), e)),
            }
        }
    }

    apply_env_overrides(&mut loaded.config, env);
    Ok(loaded)
}

impl LoadedConfig {
    fn add_layer(&mut self, path: &Path, layer: TasklistConfig) {
        for field in plaintext_secrets(&layer) {
            self.warnings.push(format!(
                "{} holds a plaintext {}; prefer {}",
                path.display(),
                field.0,
                field.1
            ));
        }
        self.config.merge(layer);
        self.loaded_from.push(path.to_path_buf());
    }
}

/// Parse one config file.
pub fn load_config_file(path: &Path) -> Result<TasklistConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    TasklistConfig::from_toml(&contents)
}

/// The user config directory: `TASKLIST_CONFIG_DIR`, else
/// `<platform config dir>/tasklist`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join("tasklist"))
}

/// Secret fields set in a file layer, with the variable that should carry
/// them instead.
fn plaintext_secrets(layer: &TasklistConfig) -> Vec<(&'static str, &'static str)> {
    let mut found = Vec::new();
    if layer.auth.as_ref().is_some_and(|a| a.jwt_secret.is_some()) {
        found.push(("[auth] jwt_secret", crate::env::JWT_SECRET_ENV));
    }
    if layer.store.as_ref().is_some_and(|s| s.service_key.is_some()) {
        found.push(("[store] service_key", crate::env::STORE_KEY_ENV));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    /// User dir and project dir, each in its own temp dir.
    fn search_dirs() -> (TempDir, TempDir, SearchPaths) {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let search = SearchPaths {
            explicit: None,
            user_dir: Some(user.path().to_path_buf()),
            project_dir: Some(project.path().to_path_buf()),
        };
        (user, project, search)
    }

    #[test]
    fn test_nothing_found_gives_defaults() {
        let (_user, _project, search) = search_dirs();
        let loaded = load_config(&search, no_env).unwrap();
        assert!(loaded.loaded_from.is_empty());
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.config.server().port, 8080);
    }

    #[test]
    fn test_project_file_overrides_user_file() {
        let (user, project, search) = search_dirs();
        fs::write(
            user.path().join("config.toml"),
            "[server]\nport = 7000\n\n[bridge]\nbackend_url = \"http://127.0.0.1:7000\"\n",
        )
        .unwrap();
        fs::write(project.path().join("tasklist.toml"), "[server]\nport = 7100\n").unwrap();

        let loaded = load_config(&search, no_env).unwrap();
        assert_eq!(loaded.config.server().port, 7100);
        assert_eq!(
            loaded.config.bridge().backend_url.as_deref(),
            Some("http://127.0.0.1:7000")
        );
        assert_eq!(
            loaded.loaded_from,
            vec![
                user.path().join("config.toml"),
                project.path().join("tasklist.toml")
            ]
        );
    }

    #[test]
    fn test_env_beats_files() {
        let (_user, project, search) = search_dirs();
        fs::write(
            project.path().join("tasklist.toml"),
            "[bridge]\nbackend_url = \"http://from-file:8080\"\n",
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("TASKLIST_BACKEND_URL", "http://from-env:8080"),
            ("TASKLIST_JWT_SECRET", "env-secret"),
        ]
        .into();

        let loaded = load_config(&search, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(
            loaded.config.bridge().backend_url.as_deref(),
            Some("http://from-env:8080")
        );
        assert_eq!(loaded.config.auth().jwt_secret.as_deref(), Some("env-secret"));
        // Secrets that only arrive through the environment are not flagged.
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_secret_in_file_names_file_and_variable() {
        let (user, project, search) = search_dirs();
        fs::write(user.path().join("config.toml"), "[store]\nservice_key = \"k\"\n").unwrap();
        fs::write(project.path().join("tasklist.toml"), "[auth]\njwt_secret = \"s\"\n").unwrap();

        let loaded = load_config(&search, no_env).unwrap();
        assert_eq!(loaded.warnings.len(), 2);
        assert!(loaded.warnings[0].contains("config.toml"));
        assert!(loaded.warnings[0].contains("TASKLIST_STORE_KEY"));
        assert!(loaded.warnings[1].contains("tasklist.toml"));
        assert!(loaded.warnings[1].contains("plaintext [auth] jwt_secret"));
        assert!(loaded.warnings[1].contains("TASKLIST_JWT_SECRET"));
    }

    #[test]
    fn test_broken_discovered_file_is_skipped() {
        let (user, project, search) = search_dirs();
        fs::write(user.path().join("config.toml"), "[server]\nport = 7000\n").unwrap();
        fs::write(project.path().join("tasklist.toml"), "[server\nport=").unwrap();

        let loaded = load_config(&search, no_env).unwrap();
        assert_eq!(loaded.config.server().port, 7000);
        assert_eq!(loaded.loaded_from.len(), 1);
        assert!(loaded.warnings[0].starts_with("Skipping"));
    }

    #[test]
    fn test_explicit_file_replaces_discovery() {
        let (user, _project, _search) = search_dirs();
        fs::write(user.path().join("config.toml"), "[server]\nport = 7000\n").unwrap();
        let explicit = user.path().join("other.toml");
        fs::write(&explicit, "[auth]\njwt_secret = \"s\"\n").unwrap();

        let search = SearchPaths {
            user_dir: Some(user.path().to_path_buf()),
            ..SearchPaths::explicit(&explicit)
        };
        let loaded = load_config(&search, no_env).unwrap();
        assert_eq!(loaded.loaded_from, vec![explicit]);
        assert_eq!(loaded.config.server().port, 8080);
        assert!(loaded.warnings[0].contains("plaintext"));
    }

    #[test]
    fn test_explicit_file_must_exist_and_parse() {
        let dir = TempDir::new().unwrap();
        let missing = SearchPaths::explicit(dir.path().join("missing.toml"));
        assert!(matches!(
            load_config(&missing, no_env).unwrap_err(),
            ConfigError::ReadFile { .. }
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "not toml {{{{").unwrap();
        assert!(matches!(
            load_config(&SearchPaths::explicit(&broken), no_env).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
