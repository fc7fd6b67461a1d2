//! Environment variable overrides.
//!
//! Deployment secrets and URLs usually arrive through the environment
//! rather than a checked-in file. Each variable overrides one field:
//!
//! | Variable | Field |
//! |---|---|
//! | `TASKLIST_JWT_SECRET` | `auth.jwt_secret` |
//! | `TASKLIST_BACKEND_URL` | `bridge.backend_url` |
//! | `TASKLIST_IDP_URL` | `bridge.identity.url` |
//! | `TASKLIST_IDP_KEY` | `bridge.identity.anon_key` |
//! | `TASKLIST_STORE_URL` | `store.url` (and selects the REST store) |
//! | `TASKLIST_STORE_KEY` | `store.service_key` |
//! | `TASKLIST_ALLOWED_ORIGINS` | `server.allowed_origins` and `bridge.allowed_origins` |

use crate::types::{StoreBackend, TasklistConfig};

pub const JWT_SECRET_ENV: &str = "TASKLIST_JWT_SECRET";
pub const BACKEND_URL_ENV: &str = "TASKLIST_BACKEND_URL";
pub const IDP_URL_ENV: &str = "TASKLIST_IDP_URL";
pub const IDP_KEY_ENV: &str = "TASKLIST_IDP_KEY";
pub const STORE_URL_ENV: &str = "TASKLIST_STORE_URL";
pub const STORE_KEY_ENV: &str = "TASKLIST_STORE_KEY";
pub const ALLOWED_ORIGINS_ENV: &str = "TASKLIST_ALLOWED_ORIGINS";

/// Apply overrides using `lookup` to read variables.
///
/// Empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut TasklistConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(secret) = get(JWT_SECRET_ENV) {
        config.auth.get_or_insert_with(Default::default).jwt_secret = Some(secret);
    }

    if let Some(url) = get(STORE_URL_ENV) {
        let store = config.store.get_or_insert_with(Default::default);
        store.url = Some(url);
        store.backend = StoreBackend::Rest;
    }
    if let Some(key) = get(STORE_KEY_ENV) {
        config.store.get_or_insert_with(Default::default).service_key = Some(key);
    }

    if let Some(url) = get(BACKEND_URL_ENV) {
        config.bridge.get_or_insert_with(Default::default).backend_url = Some(url);
    }
    if let Some(url) = get(IDP_URL_ENV) {
        config
            .bridge
            .get_or_insert_with(Default::default)
            .identity
            .url = Some(url);
    }
    if let Some(key) = get(IDP_KEY_ENV) {
        config
            .bridge
            .get_or_insert_with(Default::default)
            .identity
            .anon_key = Some(key);
    }

    if let Some(origins) = get(ALLOWED_ORIGINS_ENV) {
        let origins: Vec<String> = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        config
            .server
            .get_or_insert_with(Default::default)
            .allowed_origins = origins.clone();
        config
            .bridge
            .get_or_insert_with(Default::default)
            .allowed_origins = origins;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_secret_and_urls() {
        let mut config = TasklistConfig::new();
        apply_env_overrides(
            &mut config,
            lookup(&[
                (JWT_SECRET_ENV, "from-env"),
                (BACKEND_URL_ENV, "http://backend:8080"),
                (IDP_URL_ENV, "https://id.example.com"),
                (IDP_KEY_ENV, "anon"),
            ]),
        );

        assert_eq!(config.auth().jwt_secret.as_deref(), Some("from-env"));
        let bridge = config.bridge();
        assert_eq!(bridge.backend_url.as_deref(), Some("http://backend:8080"));
        assert_eq!(bridge.identity.url.as_deref(), Some("https://id.example.com"));
        assert_eq!(bridge.identity.anon_key.as_deref(), Some("anon"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = TasklistConfig::from_toml(
            r#"
[auth]
jwt_secret = "from-file"
audience = "authenticated"
"#,
        )
        .unwrap();
        apply_env_overrides(&mut config, lookup(&[(JWT_SECRET_ENV, "from-env")]));

        let auth = config.auth();
        assert_eq!(auth.jwt_secret.as_deref(), Some("from-env"));
        assert_eq!(auth.audience.as_deref(), Some("authenticated"));
    }

    #[test]
    fn test_store_url_selects_rest_backend() {
        let mut config = TasklistConfig::new();
        apply_env_overrides(
            &mut config,
            lookup(&[(STORE_URL_ENV, "https://db.example.com"), (STORE_KEY_ENV, "k")]),
        );
        let store = config.store();
        assert_eq!(store.backend, StoreBackend::Rest);
        assert_eq!(store.service_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_allowed_origins_split() {
        let mut config = TasklistConfig::new();
        apply_env_overrides(
            &mut config,
            lookup(&[(
                ALLOWED_ORIGINS_ENV,
                "https://a.example.com, https://b.example.com,",
            )]),
        );
        assert_eq!(
            config.server().allowed_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert_eq!(config.bridge().allowed_origins.len(), 2);
    }

    #[test]
    fn test_empty_values_ignored() {
        let mut config = TasklistConfig::new();
        apply_env_overrides(&mut config, lookup(&[(JWT_SECRET_ENV, "  ")]));
        assert!(config.auth.is_none());
    }
}
