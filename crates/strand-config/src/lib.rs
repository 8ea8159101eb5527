//! Configuration management for Strand.
//!
//! Parses `strand.toml` configuration files with serde and discovers them in
//! the input file's directory or its parents.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `paths.project_root`
//! - `paths.doc_root`
//! - `database.dsn`
//! - `database.user`
//! - `database.password`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
/// Paths must already be absolute.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override project root (`file` and `dir` resolution).
    pub project_root: Option<PathBuf>,
    /// Override doc root (`import` resolution).
    pub doc_root: Option<PathBuf>,
    /// Override database DSN.
    pub dsn: Option<String>,
    /// Override database user.
    pub db_user: Option<String>,
    /// Override database password.
    pub db_password: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "strand.toml";

/// Default bound on nested imports.
const DEFAULT_MAX_IMPORT_DEPTH: usize = 32;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root paths (relative strings from TOML).
    paths: PathsConfigRaw,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Template rendering settings.
    pub render: RenderConfig,

    /// Resolved root paths (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw paths configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PathsConfigRaw {
    project_root: Option<String>,
    doc_root: Option<String>,
}

/// Resolved root paths.
///
/// `None` means the root defaults to the input file's directory.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PathsConfig {
    pub project_root: Option<PathBuf>,
    pub doc_root: Option<PathBuf>,
}

/// Database connection settings.
///
/// Without a DSN no connection is attempted and introspection calls render
/// a "not connected" message.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `mysql://localhost:3306/app` or `sqlite://app.db`.
    pub dsn: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Template rendering settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum nesting of `engine.import` calls.
    pub max_import_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`database.password`").
        field: String,
        /// Error message (e.g., "${`DB_PASSWORD`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a DSN with a supported scheme.
fn require_supported_dsn(dsn: &str, field: &str) -> Result<(), ConfigError> {
    const SCHEMES: [&str; 3] = ["mysql:", "mariadb:", "sqlite:"];

    let lower = dsn.to_ascii_lowercase();
    if !SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return Err(ConfigError::Validation(format!(
            "{field} must start with mysql://, mariadb:// or sqlite:"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise, searches
    /// for `strand.toml` in `start_dir` and its parents; without one, defaults
    /// are used.
    ///
    /// CLI settings are applied after loading and path resolution, allowing
    /// CLI arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        start_dir: &Path,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config(start_dir) {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(project_root) = &settings.project_root {
            self.paths_resolved.project_root = Some(project_root.clone());
        }
        if let Some(doc_root) = &settings.doc_root {
            self.paths_resolved.doc_root = Some(doc_root.clone());
        }
        if let Some(dsn) = &settings.dsn {
            self.database.dsn = Some(dsn.clone());
        }
        if let Some(user) = &settings.db_user {
            self.database.user = Some(user.clone());
        }
        if let Some(password) = &settings.db_password {
            self.database.password = Some(password.clone());
        }
    }

    /// Search for config file in `start_dir` and its parents.
    fn discover_config(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dsn) = &self.database.dsn {
            require_non_empty(dsn, "database.dsn")?;
            require_supported_dsn(dsn, "database.dsn")?;
        }
        if self.render.max_import_depth == 0 {
            return Err(ConfigError::Validation(
                "render.max_import_depth must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.paths.project_root =
            expand::expand_env_opt(self.paths.project_root.as_ref(), "paths.project_root")?;
        self.paths.doc_root =
            expand::expand_env_opt(self.paths.doc_root.as_ref(), "paths.doc_root")?;

        self.database.dsn = expand::expand_env_opt(self.database.dsn.as_ref(), "database.dsn")?;
        self.database.user =
            expand::expand_env_opt(self.database.user.as_ref(), "database.user")?;
        self.database.password =
            expand::expand_env_opt(self.database.password.as_ref(), "database.password")?;

        Ok(())
    }

    /// Resolve relative paths against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>| path.map(|p| config_dir.join(p));

        self.paths_resolved = PathsConfig {
            project_root: resolve(self.paths.project_root.as_deref()),
            doc_root: resolve(self.paths.doc_root.as_deref()),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths_resolved, PathsConfig::default());
        assert!(config.database.dsn.is_none());
        assert_eq!(config.render.max_import_depth, 32);
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.render.max_import_depth, 32);
        assert!(config.database.user.is_none());
    }

    #[test]
    fn test_parse_database_config() {
        let toml = r#"
[database]
dsn = "mysql://localhost:3306/app"
user = "reader"
password = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.database.dsn.as_deref(),
            Some("mysql://localhost:3306/app")
        );
        assert_eq!(config.database.user.as_deref(), Some("reader"));
        assert_eq!(config.database.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_parse_render_config() {
        let toml = r"
[render]
max_import_depth = 8
";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.render.max_import_depth, 8);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[paths]
project_root = "."
doc_root = "docs"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.paths_resolved,
            PathsConfig {
                project_root: Some(PathBuf::from("/project/.")),
                doc_root: Some(PathBuf::from("/project/docs")),
            }
        );
    }

    #[test]
    fn test_resolve_paths_absolute_kept() {
        let toml = r#"
[paths]
project_root = "/srv/app"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.paths_resolved.project_root,
            Some(PathBuf::from("/srv/app"))
        );
        assert!(config.paths_resolved.doc_root.is_none());
    }

    #[test]
    fn test_expand_env_vars_defaults() {
        let toml = r#"
[database]
dsn = "mysql://${STRAND_TEST_SURELY_UNSET_HOST:-db}/app"
password = "${STRAND_TEST_SURELY_UNSET_PW:-}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.database.dsn.as_deref(), Some("mysql://db/app"));
        assert_eq!(config.database.password.as_deref(), Some(""));
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let toml = r#"
[database]
user = "${STRAND_TEST_SURELY_UNSET_USER}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(
            matches!(err, ConfigError::EnvVar { ref field, .. } if field == "database.user"),
            "Expected ConfigError::EnvVar, got {err:?}"
        );
    }

    #[test]
    fn test_validate_unsupported_dsn() {
        let toml = r#"
[database]
dsn = "postgres://localhost/app"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("database.dsn"));
    }

    #[test]
    fn test_validate_empty_dsn() {
        let config: Config = toml::from_str("[database]\ndsn = \"\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database.dsn cannot be empty"));
    }

    #[test]
    fn test_validate_zero_depth() {
        let config: Config = toml::from_str("[render]\nmax_import_depth = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_import_depth"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        config.database.user = Some("from-file".to_owned());
        let overrides = CliSettings {
            project_root: Some(PathBuf::from("/custom")),
            dsn: Some("sqlite::memory:".to_owned()),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.paths_resolved.project_root,
            Some(PathBuf::from("/custom"))
        );
        assert!(config.paths_resolved.doc_root.is_none());
        assert_eq!(config.database.dsn.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.database.user.as_deref(), Some("from-file")); // Unchanged
    }

    #[test]
    fn test_load_discovers_config_in_parent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("docs/guides");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILENAME),
            "[paths]\ndoc_root = \"docs\"\n",
        )
        .unwrap();

        let config = Config::load(None, &nested, None).unwrap();

        assert_eq!(
            config.config_path,
            Some(temp_dir.path().join(CONFIG_FILENAME))
        );
        assert_eq!(
            config.paths_resolved.doc_root,
            Some(temp_dir.path().join("docs"))
        );
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("custom.toml");

        let err = Config::load(Some(&missing), temp_dir.path(), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(ref p) if *p == missing));
    }

    #[test]
    fn test_load_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[render]\nmax_import_depth = \"deep\"\n").unwrap();

        let err = Config::load(Some(&path), temp_dir.path(), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_cli_settings_validated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = CliSettings {
            dsn: Some("oracle://db".to_owned()),
            ..Default::default()
        };

        let err = Config::load(None, temp_dir.path(), Some(&settings)).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
