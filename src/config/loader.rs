//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::{ProxyConfig, TtlSetting};
use crate::config::validation::{validate_config, ValidationError};

/// Environment keys recognized by [`apply_env_overrides`].
pub const ENV_SPACES_URL: &str = "DO_SPACES_URL";
pub const ENV_BUCKET: &str = "AROI_BUCKET";
pub const ENV_STORAGE_ORDER: &str = "STORAGE_ORDER";
pub const ENV_TTL_LATEST: &str = "CACHE_TTL_LATEST";
pub const ENV_TTL_HISTORICAL: &str = "CACHE_TTL_HISTORICAL";
pub const ENV_CORS_ALLOW_ORIGIN: &str = "CORS_ALLOW_ORIGIN";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then process environment, then
/// validation.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_config_with_env(path, std::env::vars())
}

/// Same as [`load_config`] with an explicit environment.
pub fn load_config_with_env<I>(path: Option<&Path>, vars: I) -> Result<ProxyConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, vars);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay the recognized environment keys onto `config`. Empty values are
/// treated as unset.
pub fn apply_env_overrides<I>(config: &mut ProxyConfig, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if value.trim().is_empty() {
            continue;
        }
        match key.as_str() {
            ENV_SPACES_URL => config.storage.spaces_url = Some(value),
            ENV_BUCKET => config.storage.bucket_path = Some(PathBuf::from(value)),
            ENV_STORAGE_ORDER => config.storage.order = value,
            ENV_TTL_LATEST => config.cache.ttl_latest = Some(TtlSetting::Text(value)),
            ENV_TTL_HISTORICAL => config.cache.ttl_historical = Some(TtlSetting::Text(value)),
            ENV_CORS_ALLOW_ORIGIN => config.headers.cors_allow_origin = Some(value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = load_config_with_env(None, Vec::new()).unwrap();
        assert!(config.storage.spaces_url.is_none());
        assert!(config.storage.bucket_path.is_none());
        assert_eq!(config.storage.order, "do,r2");
        assert!(config.headers.cors_allow_origin.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[storage]\nspaces_url = \"https://file.example.com\"\norder = \"do\"\n"
        )
        .unwrap();

        let config = load_config_with_env(
            Some(file.path()),
            env(&[
                (ENV_SPACES_URL, "https://env.example.com/base/"),
                (ENV_BUCKET, "/srv/bucket"),
                (ENV_STORAGE_ORDER, "r2,do"),
                (ENV_TTL_LATEST, "120"),
                (ENV_CORS_ALLOW_ORIGIN, "*"),
                ("UNRELATED", "x"),
            ]),
        )
        .unwrap();

        assert_eq!(config.storage.spaces_url.as_deref(), Some("https://env.example.com/base/"));
        assert_eq!(config.storage.bucket_path, Some(PathBuf::from("/srv/bucket")));
        assert_eq!(config.storage.order, "r2,do");
        assert_eq!(config.cache.ttl_latest.and_then(|t| t.seconds()), Some(120));
        assert_eq!(config.headers.cors_allow_origin.as_deref(), Some("*"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let config = load_config_with_env(None, env(&[(ENV_SPACES_URL, ""), (ENV_STORAGE_ORDER, "  ")])).unwrap();
        assert!(config.storage.spaces_url.is_none());
        assert_eq!(config.storage.order, "do,r2");
    }

    #[test]
    fn test_invalid_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage\norder = ").unwrap();
        let err = load_config_with_env(Some(file.path()), Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = load_config_with_env(None, env(&[(ENV_SPACES_URL, "not a url")])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
