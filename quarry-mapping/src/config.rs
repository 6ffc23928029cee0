//! Configuration file parsing for `quarry.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{MappingError, MappingResult};
use crate::mapper::{DEFAULT_DISCRIMINATOR_KEY, MapperOptions};

/// Main configuration structure for `quarry.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuarryConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Mapping settings.
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Query defaults.
    #[serde(default)]
    pub query: QueryConfig,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl QuarryConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> MappingResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MappingError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> MappingResult<Self> {
        let expanded = expand_env_vars(content)?;
        let config: Self =
            toml::from_str(&expanded).map_err(|e| MappingError::TomlError { source: e })?;
        config.check()?;
        Ok(config)
    }

    /// Get the connection URI.
    pub fn database_uri(&self) -> Option<&str> {
        self.database.uri.as_deref()
    }

    /// Options for a [`Mapper`](crate::Mapper) built from this configuration.
    pub fn mapper_options(&self) -> MapperOptions {
        MapperOptions {
            discriminator_key: self.mapping.discriminator_key.as_str().into(),
        }
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            if let Some(db) = overrides.database {
                if let Some(uri) = db.uri {
                    self.database.uri = Some(uri);
                }
                if let Some(database) = db.database {
                    self.database.database = Some(database);
                }
                if let Some(read_preference) = db.read_preference {
                    self.database.read_preference = Some(read_preference);
                }
            }
            if let Some(debug) = overrides.debug {
                if let Some(log_queries) = debug.log_queries {
                    self.debug.log_queries = log_queries;
                }
            }
        }
        self
    }

    fn check(&self) -> MappingResult<()> {
        let key = self.mapping.discriminator_key.as_str();
        if key.is_empty() || key.contains('.') || key.starts_with('$') {
            return Err(MappingError::ConfigError {
                message: format!("invalid discriminator key `{key}`"),
            });
        }
        Ok(())
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URI (supports `${ENV_VAR}` interpolation).
    pub uri: Option<String>,

    /// Database name.
    pub database: Option<String>,

    /// Application name reported to the server.
    pub app_name: Option<String>,

    /// Read preference mode (`primary`, `secondaryPreferred`, ...).
    pub read_preference: Option<String>,

    /// Read concern level (`local`, `majority`, ...).
    pub read_concern: Option<String>,
}

/// Mapping configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    /// Document key holding the discriminator.
    #[serde(default = "default_discriminator_key")]
    pub discriminator_key: String,

    /// Store empty lists and maps instead of omitting them.
    #[serde(default)]
    pub store_empties: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            discriminator_key: default_discriminator_key(),
            store_empties: false,
        }
    }
}

fn default_discriminator_key() -> String {
    DEFAULT_DISCRIMINATOR_KEY.to_string()
}

/// Query defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Validate field names and value types by default.
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Default cursor batch size.
    pub batch_size: Option<u32>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            validate: true,
            batch_size: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Debug/logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every compiled query.
    #[serde(default)]
    pub log_queries: bool,
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Database overrides.
    pub database: Option<DatabaseOverride>,

    /// Debug overrides.
    pub debug: Option<DebugOverride>,
}

/// Database configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseOverride {
    /// Override connection URI.
    pub uri: Option<String>,

    /// Override database name.
    pub database: Option<String>,

    /// Override read preference.
    pub read_preference: Option<String>,
}

/// Debug configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOverride {
    /// Override log_queries.
    pub log_queries: Option<bool>,
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> MappingResult<String> {
    let re = regex_lite::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
        MappingError::ConfigError {
            message: e.to_string(),
        }
    })?;

    let expanded = re.replace_all(content, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = QuarryConfig::default();
        assert_eq!(config.mapping.discriminator_key, "className");
        assert!(config.query.validate);
        assert!(config.database_uri().is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [database]
            uri = "mongodb://localhost:27017"
            database = "shop"
            read_preference = "secondaryPreferred"

            [mapping]
            discriminator_key = "_t"

            [query]
            validate = false
            batch_size = 500
        "#;

        let config = QuarryConfig::from_str(toml).unwrap();
        assert_eq!(config.database_uri(), Some("mongodb://localhost:27017"));
        assert_eq!(config.database.database.as_deref(), Some("shop"));
        assert_eq!(config.mapper_options().discriminator_key, "_t");
        assert!(!config.query.validate);
        assert_eq!(config.query.batch_size, Some(500));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = QuarryConfig::from_str("[mapping]\nunknown = 1\n").unwrap_err();
        assert!(matches!(err, MappingError::TomlError { .. }));
    }

    #[test]
    fn test_invalid_discriminator_key() {
        let err = QuarryConfig::from_str("[mapping]\ndiscriminator_key = \"a.b\"\n").unwrap_err();
        assert!(matches!(err, MappingError::ConfigError { .. }));
    }

    #[test]
    fn test_environment_override() {
        let toml = r#"
            [database]
            uri = "mongodb://localhost"

            [environments.production.database]
            uri = "mongodb://prod"

            [environments.production.debug]
            log_queries = true
        "#;

        let config = QuarryConfig::from_str(toml)
            .unwrap()
            .with_environment("production");
        assert_eq!(config.database_uri(), Some("mongodb://prod"));
        assert!(config.debug.log_queries);
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("QUARRY_TEST_MONGO_URI", "mongodb://test");
        }
        let expanded = expand_env_vars("uri = \"${QUARRY_TEST_MONGO_URI}\"").unwrap();
        assert_eq!(expanded, "uri = \"mongodb://test\"");
        unsafe {
            std::env::remove_var("QUARRY_TEST_MONGO_URI");
        }

        let untouched = expand_env_vars("uri = \"${QUARRY_TEST_UNSET_VAR}\"").unwrap();
        assert_eq!(untouched, "uri = \"${QUARRY_TEST_UNSET_VAR}\"");
    }
}
