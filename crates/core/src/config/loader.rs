//! Configuration file loader for the `.crewmon/` directory.
//!
//! Settings are resolved in this order, later sources winning:
//! 1. Built-in defaults (a backend on `localhost:8000`)
//! 2. `.crewmon/config.toml` under the given root
//! 3. The `CREWMON_API_URL` environment variable
//!
//! Command-line flags are applied on top by the binaries.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use cm_protocol::ConsoleConfig;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Directory holding the console configuration.
pub const CONFIG_DIR: &str = ".crewmon";

/// Environment variable overriding `api-base-url`.
pub const API_URL_ENV: &str = "CREWMON_API_URL";

/// Loads and validates the console configuration.
///
/// # Arguments
///
/// * `root` - Directory containing the `.crewmon/` folder
///
/// # Returns
///
/// The merged `ConsoleConfig`. A missing `.crewmon/` directory or
/// `config.toml` yields the defaults rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - `config.toml` exists but cannot be read
/// - `config.toml` is not valid TOML for `ConsoleConfig`
/// - The merged settings fail validation
///
/// # Example
///
/// ```rust,no_run
/// use cm_core::config::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Backend at {}", config.api_base_url);
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<ConsoleConfig> {
    let config_path = root.join(CONFIG_DIR).join("config.toml");

    let config = if config_path.exists() {
        let content = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|source| ConfigError::FileRead {
                path: config_path.clone(),
                source,
            })?;

        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?
    } else {
        debug!(path = %config_path.display(), "no config file, using defaults");
        ConsoleConfig::default()
    };

    let config = apply_api_url_override(config, std::env::var(API_URL_ENV).ok());
    validate(&config, &config_path)?;
    Ok(config)
}

/// Replace the API base URL when an override is given.
///
/// Blank overrides are ignored.
pub fn apply_api_url_override(mut config: ConsoleConfig, api_url: Option<String>) -> ConsoleConfig {
    if let Some(api_url) = api_url {
        let api_url = api_url.trim();
        if !api_url.is_empty() {
            debug!(api_url, "overriding api base url");
            config.api_base_url = api_url.to_string();
        }
    }
    config
}

/// Check the settings the console cannot work without.
///
/// # Errors
///
/// Returns `ConfigError::InvalidConfig` when `max-logs` or
/// `request-timeout-ms` is 0, or `api-base-url` is not an absolute http(s)
/// URL. `source` only names the
/// origin in the error.
pub fn validate(config: &ConsoleConfig, source: &Path) -> ConfigResult<()> {
    let invalid = |reason: String| ConfigError::InvalidConfig {
        path: source.to_path_buf(),
        reason,
    };

    if config.max_logs == 0 {
        return Err(invalid("max-logs must be at least 1".to_string()));
    }
    if config.request_timeout_ms == 0 {
        return Err(invalid("request-timeout-ms must be at least 1".to_string()));
    }

    let url = Url::parse(&config.api_base_url)
        .map_err(|e| invalid(format!("api-base-url '{}': {}", config.api_base_url, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "api-base-url '{}' must use http or https",
            config.api_base_url
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(root: &Path, content: &str) {
        let dir = root.join(CONFIG_DIR);
        fs::create_dir_all(&dir).expect("Failed to create .crewmon");
        fs::write(dir.join("config.toml"), content).expect("Failed to write config.toml");
    }

    #[tokio::test]
    async fn test_load_config_full_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_config(
            dir.path(),
            r#"
api-base-url = "https://crews.example.com/api/v1"
max-logs = 250

[stream]
reconnect-attempts = 7
reconnect-delay-ms = 500
"#,
        );

        let config = load_config(dir.path()).await.expect("Failed to load config");

        // The env override may be set on a developer machine; only assert it
        // when absent.
        if std::env::var(API_URL_ENV).is_err() {
            assert_eq!(config.api_base_url, "https://crews.example.com/api/v1");
        }
        assert_eq!(config.max_logs, 250);
        assert_eq!(config.stream.reconnect_attempts, 7);
        assert_eq!(config.stream.reconnect_delay_ms, 500);
    }

    #[tokio::test]
    async fn test_load_config_missing_directory_gives_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");

        let config = load_config(dir.path())
            .await
            .expect("Should handle missing .crewmon");

        assert_eq!(config.max_logs, 1000);
        assert_eq!(config.stream.reconnect_attempts, 3);
        assert_eq!(config.stream.reconnect_delay_ms, 2000);
    }

    #[tokio::test]
    async fn test_load_config_partial_file_keeps_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_config(dir.path(), "max-logs = 10");

        let config = load_config(dir.path()).await.expect("Should handle partial config");

        assert_eq!(config.max_logs, 10);
        assert_eq!(config.stream.reconnect_attempts, 3);
    }

    #[tokio::test]
    async fn test_load_config_invalid_toml() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_config(dir.path(), "max-logs = [invalid toml");

        let result = load_config(dir.path()).await;

        if let Err(ConfigError::TomlParse { path, .. }) = result {
            assert!(path.ends_with("config.toml"));
        } else {
            panic!("Expected TomlParse error");
        }
    }

    #[tokio::test]
    async fn test_load_config_rejects_zero_capacity() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_config(dir.path(), "max-logs = 0");

        let result = load_config(dir.path()).await;

        assert!(matches!(result, Err(ConfigError::InvalidConfig { .. })));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let config = ConsoleConfig {
            api_base_url: "ws://localhost:8000/api/v1".to_string(),
            ..ConsoleConfig::default()
        };

        let err = validate(&config, Path::new("config.toml")).unwrap_err();
        assert!(err.to_string().contains("must use http or https"));
    }

    #[test]
    fn test_validate_rejects_zero_request_timeout() {
        let config = ConsoleConfig {
            request_timeout_ms: 0,
            ..ConsoleConfig::default()
        };

        let err = validate(&config, Path::new("config.toml")).unwrap_err();
        assert!(err.to_string().contains("request-timeout-ms must be at least 1"));
    }

    #[test]
    fn test_api_url_override() {
        let config = apply_api_url_override(
            ConsoleConfig::default(),
            Some("https://prod.example.com/api/v1".to_string()),
        );
        assert_eq!(config.api_base_url, "https://prod.example.com/api/v1");

        let config = apply_api_url_override(ConsoleConfig::default(), Some("  ".to_string()));
        assert_eq!(config.api_base_url, "http://localhost:8000/api/v1");

        let config = apply_api_url_override(ConsoleConfig::default(), None);
        assert_eq!(config.api_base_url, "http://localhost:8000/api/v1");
    }
}
